//! 会话日志服务 - 业务能力层
//!
//! 只负责"记录与模型的往来"能力：每个任务一个文件，条目只追加不修改。
//!
//! 文件格式：每条是缩进 2 空格的 JSON，后面跟分隔符 `\n---\n`。
//! 请求里内嵌的 base64 图片在写入前一律替换成占位符。

use std::path::{Path, PathBuf};

use async_openai::types::chat::{ChatCompletionRequestMessage, CreateChatCompletionResponse};
use chrono::Local;
use serde_json::{json, Value as JsonValue};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{AppError, AppResult, NotFoundError};
use crate::models::session_log::{LogRecord, SessionEventType, SessionLogEntry};

pub const ENTRY_SEPARATOR: &str = "\n---\n";
pub const REDACTED_IMAGE_MARKER: &str = "[BASE64_IMAGE_DATA_REDACTED]";

/// 会话日志服务
///
/// 写入失败只记 `tracing::error!`，不会让调用方失败。
#[derive(Debug, Clone)]
pub struct SessionLogger {
    sessions_dir: PathBuf,
}

impl SessionLogger {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// 任务对应的日志文件
    pub fn log_path(&self, job_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{}.log", job_id))
    }

    /// 追加一条日志
    ///
    /// request 类型的 `messages` 在写入前统一脱敏。
    pub async fn log(
        &self,
        job_id: &str,
        event_type: SessionEventType,
        data: JsonValue,
        error: Option<String>,
    ) {
        let data = match event_type {
            SessionEventType::Request => redact_request(data),
            _ => data,
        };

        let entry = SessionLogEntry {
            timestamp: Local::now(),
            job_id: job_id.to_string(),
            event_type,
            data,
            error,
        };

        if let Err(e) = self.append(&entry).await {
            error!("❌ [Job {}] 写入会话日志失败: {}", job_id, e);
        }
    }

    pub async fn metadata(&self, job_id: &str, data: JsonValue) {
        self.log(job_id, SessionEventType::Metadata, data, None).await;
    }

    /// 记录发出的请求（图片已脱敏）
    pub async fn log_request(
        &self,
        job_id: &str,
        model: &str,
        messages: &[ChatCompletionRequestMessage],
        max_tokens: u32,
        temperature: f32,
    ) {
        let messages = match serde_json::to_value(messages) {
            Ok(value) => value,
            Err(e) => {
                error!("❌ [Job {}] 请求消息序列化失败: {}", job_id, e);
                return;
            }
        };

        let data = json!({
            "model": model,
            "messages": messages,
            "parameters": {
                "max_tokens": max_tokens,
                "temperature": compact_f32(temperature),
            },
        });

        self.log(job_id, SessionEventType::Request, data, None).await;
    }

    /// 记录模型返回；无法转换时退回到 Debug 文本
    pub async fn log_response(&self, job_id: &str, response: &CreateChatCompletionResponse) {
        match response_data(response) {
            Ok(data) => self.log(job_id, SessionEventType::Response, data, None).await,
            Err(e) => {
                let data = json!({ "raw_response": format!("{:?}", response) });
                self.log(job_id, SessionEventType::Response, data, Some(e.to_string()))
                    .await
            }
        }
    }

    /// 读回某个任务的全部日志
    ///
    /// 任务 ID 不是合法 UUID 或文件不存在都返回 not found。
    pub async fn read_entries(&self, job_id: &str) -> AppResult<Vec<LogRecord>> {
        if Uuid::parse_str(job_id).is_err() {
            return Err(NotFoundError::SessionLog(job_id.to_string()).into());
        }

        let path = self.log_path(job_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(NotFoundError::SessionLog(job_id.to_string()).into());
            }
            Err(e) => return Err(AppError::file_read_failed(path.display().to_string(), e)),
        };

        let records = content
            .split(ENTRY_SEPARATOR)
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| match serde_json::from_str::<SessionLogEntry>(chunk) {
                Ok(entry) => LogRecord::Entry(entry),
                Err(_) => LogRecord::Raw {
                    raw: chunk.to_string(),
                },
            })
            .collect();

        Ok(records)
    }

    async fn append(&self, entry: &SessionLogEntry) -> AppResult<()> {
        let dir = self.sessions_dir.display().to_string();
        tokio::fs::create_dir_all(&self.sessions_dir)
            .await
            .map_err(|e| AppError::file_write_failed(&dir, e))?;

        let mut text = serde_json::to_string_pretty(entry)?;
        text.push_str(ENTRY_SEPARATOR);

        let path = self.log_path(&entry.job_id);
        let path_str = path.display().to_string();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;

        file.write_all(text.as_bytes())
            .await
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;
        file.flush()
            .await
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;

        debug!(
            "📝 [Job {}] 会话日志 {:?} 已写入 ({} 字节)",
            entry.job_id,
            entry.event_type,
            text.len()
        );
        Ok(())
    }
}

/// 把消息里 `data:image...` 形式的图片替换成占位符
///
/// 其余内容（文本、外链图片、字符串形式的 content）原样保留。
pub fn sanitize_messages(messages: &JsonValue) -> JsonValue {
    match messages.as_array() {
        Some(list) => JsonValue::Array(list.iter().map(sanitize_message).collect()),
        None => messages.clone(),
    }
}

fn redact_request(mut data: JsonValue) -> JsonValue {
    if let Some(messages) = data.get("messages").map(sanitize_messages) {
        data["messages"] = messages;
    }
    data
}

fn sanitize_message(message: &JsonValue) -> JsonValue {
    let mut message = message.clone();
    if let Some(parts) = message.get_mut("content").and_then(JsonValue::as_array_mut) {
        for part in parts.iter_mut() {
            if let Some(redacted) = redact_image_part(part) {
                *part = redacted;
            }
        }
    }
    message
}

fn redact_image_part(part: &JsonValue) -> Option<JsonValue> {
    if part.get("type").and_then(JsonValue::as_str) != Some("image_url") {
        return None;
    }

    let image_url = part.get("image_url")?;
    let url = image_url.get("url").and_then(JsonValue::as_str)?;
    if !url.starts_with("data:image") {
        return None;
    }

    let detail = image_url
        .get("detail")
        .filter(|d| !d.is_null())
        .cloned()
        .unwrap_or_else(|| json!("auto"));

    Some(json!({
        "type": "image_url",
        "image_url": {
            "url": REDACTED_IMAGE_MARKER,
            "detail": detail,
            "original_length": url.len(),
        },
    }))
}

fn response_data(response: &CreateChatCompletionResponse) -> serde_json::Result<JsonValue> {
    let choices = response
        .choices
        .iter()
        .map(|choice| -> serde_json::Result<JsonValue> {
            Ok(json!({
                "index": choice.index,
                "message": {
                    "role": serde_json::to_value(&choice.message.role)?,
                    "content": choice.message.content,
                },
                "finish_reason": serde_json::to_value(&choice.finish_reason)?,
            }))
        })
        .collect::<serde_json::Result<Vec<_>>>()?;

    Ok(json!({
        "id": response.id,
        "object": serde_json::to_value(&response.object)?,
        "created": response.created,
        "model": response.model,
        "choices": choices,
        "usage": serde_json::to_value(&response.usage)?,
    }))
}

/// f32 直接转 JSON 会带出 0.10000000149 这样的尾巴
fn compact_f32(value: f32) -> JsonValue {
    value
        .to_string()
        .parse::<f64>()
        .map(JsonValue::from)
        .unwrap_or(JsonValue::Null)
}
