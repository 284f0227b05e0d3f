use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 级别由 `RUST_LOG` 控制，默认 info；重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
