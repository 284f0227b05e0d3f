use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 会话日志事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    Request,
    Response,
    Error,
    Metadata,
}

/// 一条会话日志，写入后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionLogEntry {
    pub timestamp: DateTime<Local>,
    pub job_id: String,
    pub event_type: SessionEventType,
    pub data: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// 读回来的日志条目：解析失败的片段原样保留
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LogRecord {
    Entry(SessionLogEntry),
    Raw { raw: String },
}

impl LogRecord {
    pub fn entry(&self) -> Option<&SessionLogEntry> {
        match self {
            LogRecord::Entry(entry) => Some(entry),
            LogRecord::Raw { .. } => None,
        }
    }
}

/// 日志查询的返回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLogView {
    pub job_id: String,
    pub log_file: String,
    pub entry_count: usize,
    pub logs: Vec<LogRecord>,
}
