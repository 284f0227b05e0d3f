use thiserror::Error;

/// 应用程序错误类型
///
/// Display 文本会直接进入任务状态（`job.error`）和会话日志，因此使用英文，
/// 面向选务人员可读。
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验错误
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// 资源不存在
    #[error("{0}")]
    NotFound(#[from] NotFoundError),
    /// 任务尚未完成
    #[error("Analysis not completed yet (job {job_id} is {status})")]
    NotCompleted { job_id: String, status: String },
    /// 文件操作错误
    #[error("{0}")]
    File(#[from] FileError),
    /// LLM 服务错误
    #[error("{0}")]
    Llm(#[from] LlmError),
    /// 业务逻辑错误
    #[error("{0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("{0}")]
    Other(String),
}

/// 输入校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 没有选择文件
    #[error("No file selected")]
    EmptyFilename,
    /// 文件扩展名不在允许列表中
    #[error("Only {allowed} files are allowed (got '{filename}')")]
    DisallowedExtension { filename: String, allowed: String },
    /// 文件过大
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
    /// 图片无效
    #[error("Invalid image file: {0}")]
    InvalidImage(String),
    /// 候选人文本为空
    #[error("Contest text cannot be empty")]
    EmptyContestText,
}

/// 资源不存在错误
#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("Analysis job not found: {0}")]
    Job(String),
    #[error("Image not found: {0}")]
    Image(String),
    #[error("Contest data not found: {0}")]
    ContestData(String),
    #[error("No logs found for this job: {0}")]
    SessionLog(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("Failed to parse TOML {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// JSON 序列化失败
    #[error("JSON serialization failed: {0}")]
    Json(#[source] serde_json::Error),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("Vision model call failed ({model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 构建请求失败
    #[error("Failed to build vision request: {0}")]
    RequestBuildFailed(String),
    /// 返回结果为空
    #[error("Vision model returned no choices ({model})")]
    EmptyResponse { model: String },
    /// 返回内容为空
    #[error("Vision model returned empty content ({model})")]
    EmptyContent { model: String },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 任务状态转换非法
    #[error("Invalid job transition for {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: String,
        to: String,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件不存在
    #[error("Config file not found: {0}")]
    FileNotFound(String),
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::Json(err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: err,
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

impl From<async_openai::error::OpenAIError> for AppError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        AppError::Llm(LlmError::RequestBuildFailed(err.to_string()))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建非法状态转换错误
    pub fn invalid_transition(
        job_id: impl Into<String>,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        AppError::Business(BusinessError::InvalidTransition {
            job_id: job_id.into(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// 错误分类，写入 `job.error_type` 和会话日志
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::NotCompleted { .. } => "not_completed",
            AppError::File(_) => "file",
            AppError::Llm(_) => "llm",
            AppError::Business(_) => "business",
            AppError::Config(_) => "config",
            AppError::Other(_) => "other",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
