use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- OpenAI 配置 ---
    pub openai_api_key: String,
    pub openai_api_base_url: String,
    pub vision_model_name: String,
    /// 单次分析的最大输出 token 数
    pub max_output_tokens: u32,
    /// 采样温度（越低结果越稳定）
    pub temperature: f32,
    // --- 存储配置 ---
    /// 上传图片存放目录
    pub upload_folder: String,
    /// 会话日志目录（每个任务一个 .log 文件）
    pub sessions_dir: String,
    /// 上传文件大小上限（字节）
    pub max_content_length: u64,
    /// 允许上传的图片扩展名
    pub allowed_extensions: Vec<String>,
    // --- 命令行批量分析 ---
    /// 待分析的选票图片
    pub image_paths: Vec<String>,
    /// 候选人定义文本文件
    pub contest_file: String,
    /// 轮询任务状态的间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_api_base_url: "https://api.openai.com/v1".to_string(),
            vision_model_name: "gpt-4o".to_string(),
            max_output_tokens: 1500,
            temperature: 0.1,
            upload_folder: "./uploads".to_string(),
            sessions_dir: "./openai-sessions".to_string(),
            max_content_length: 52_428_800,
            allowed_extensions: vec!["png".to_string()],
            image_paths: Vec::new(),
            contest_file: "contests.txt".to_string(),
            poll_interval_ms: 1000,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 只从环境变量加载（缺省值兜底）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，未出现的字段使用默认值
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::Config(ConfigError::FileNotFound(display.clone()))
            } else {
                AppError::file_read_failed(display.clone(), e)
            }
        })?;

        toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: display,
                source: e,
            })
        })
    }

    /// 启动时使用：`BALLOT_CONFIG` 指向的文件（如果设置）+ 环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("BALLOT_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// 用 `lookup` 提供的值覆盖当前配置；无法解析的值保持原样
    pub fn with_overrides(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let list = |key: &str| {
            lookup(key).map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
        };

        Self {
            openai_api_key: lookup("OPENAI_API_KEY").unwrap_or(self.openai_api_key),
            openai_api_base_url: lookup("OPENAI_API_BASE_URL").unwrap_or(self.openai_api_base_url),
            vision_model_name: lookup("OPENAI_MODEL").unwrap_or(self.vision_model_name),
            max_output_tokens: parse_var(&lookup, "OPENAI_MAX_TOKENS").unwrap_or(self.max_output_tokens),
            temperature: parse_var(&lookup, "OPENAI_TEMPERATURE").unwrap_or(self.temperature),
            upload_folder: lookup("UPLOAD_FOLDER").unwrap_or(self.upload_folder),
            sessions_dir: lookup("OPENAI_SESSIONS_DIR").unwrap_or(self.sessions_dir),
            max_content_length: parse_var(&lookup, "MAX_CONTENT_LENGTH").unwrap_or(self.max_content_length),
            allowed_extensions: list("ALLOWED_EXTENSIONS")
                .map(|exts| exts.into_iter().map(|e| e.to_lowercase()).collect())
                .unwrap_or(self.allowed_extensions),
            image_paths: list("BALLOT_IMAGES").unwrap_or(self.image_paths),
            contest_file: lookup("CONTEST_FILE").unwrap_or(self.contest_file),
            poll_interval_ms: parse_var(&lookup, "POLL_INTERVAL_MS").unwrap_or(self.poll_interval_ms),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
