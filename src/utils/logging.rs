/// 日志工具模块
///
/// 提供启动 / 统计横幅和文本截断的辅助函数
use tracing::info;

/// 记录程序启动信息
///
/// # 参数
/// - `model`: 视觉模型名称
/// - `image_count`: 待分析的选票图片数量
pub fn log_startup(model: &str, image_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 选票缺失椭圆检查");
    info!("🤖 视觉模型: {}", model);
    info!("🗳️ 待分析选票: {} 张", image_count);
    info!("{}", "=".repeat(60));
}

/// 记录候选人数据加载信息
pub fn log_contests_loaded(data_id: &str, contest_count: usize) {
    info!("✓ 候选人数据已上传 (data_id: {})", data_id);
    info!("📋 共 {} 场选举\n", contest_count);
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 完成数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `total_issues`: 所有完成任务发现的问题总数
/// - `sessions_dir`: 会话日志目录
pub fn print_final_stats(
    success: usize,
    failed: usize,
    total: usize,
    total_issues: usize,
    sessions_dir: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部分析完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 完成: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("🔎 发现问题: {}", total_issues);
    info!("{}", "=".repeat(60));
    info!("\n会话日志保存在: {}", sessions_dir);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
