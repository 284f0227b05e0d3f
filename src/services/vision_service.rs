//! 视觉模型服务 - 业务能力层
//!
//! 只负责"把一张选票图片交给视觉模型"能力，不关心任务状态
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use std::future::Future;
use std::path::Path;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ImageDetail, ImageUrl,
    },
    Client,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};

/// 固定的选票校对提示词
pub const BALLOT_PROMPT: &str = "I am trying to proof some drafts of ballots for an upcoming election, before we send them to the printer to create the actual ballots. I am attaching a PNG file of one of the ballots, I would like you to look at it carefully and try to see if there are any mistakes. I am specifically worried that the ovals near each candidate might be missing - sometimes the software drops them.

The ballot is laid out as three columns, read top to bottom and then left to right. There will be several contests in each column, with the election name starting each election and some instructions on how many to vote for, and then the candidates to vote for, and there should be an oval in front of each candidate. There may also be referendum questions present, which won't have candidates but will have a 'Yes' or a 'No' as an option - and again will have an oval in front of those choices.

Please examine the ballot systematically and report:
1. Any candidates or choices that appear to be missing their voting ovals
2. Your confidence level for each finding (high/medium/low)
3. The specific location where you found the issue (contest name and candidate name)
4. Any other visual anomalies you notice

Please be thorough but focus primarily on missing ovals as that is our main concern.";

/// 视觉模型
///
/// 一次请求对应一次回答，不做重试。测试里用假的实现替换。
pub trait VisionModel: Send + Sync + 'static {
    fn model_name(&self) -> &str;

    fn complete(
        &self,
        request: CreateChatCompletionRequest,
    ) -> impl Future<Output = AppResult<CreateChatCompletionResponse>> + Send;
}

/// OpenAI 兼容接口的视觉模型
pub struct OpenAiVision {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiVision {
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.vision_model_name.clone(),
        }
    }
}

impl VisionModel for OpenAiVision {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(
        &self,
        request: CreateChatCompletionRequest,
    ) -> AppResult<CreateChatCompletionResponse> {
        debug!("调用视觉模型 API，模型: {}", self.model_name);

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("视觉模型 API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("视觉模型 API 调用成功，choices: {}", response.choices.len());
        Ok(response)
    }
}

/// 单次请求的参数
#[derive(Debug, Clone, PartialEq)]
pub struct VisionSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl VisionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.vision_model_name.clone(),
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }
}

/// 按扩展名推断图片 MIME 类型，未知时按 PNG 处理
pub fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// 图片内容编码为 base64
pub fn encode_image(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn data_uri(mime: &str, encoded: &str) -> String {
    format!("data:{};base64,{}", mime, encoded)
}

/// 图片内容编码为 `data:<mime>;base64,...`
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    data_uri(mime, &encode_image(bytes))
}

/// 构建选票分析请求：一条用户消息，文本 + 高精度图片
pub fn build_ballot_request(
    settings: &VisionSettings,
    image_data_uri: &str,
) -> AppResult<CreateChatCompletionRequest> {
    let content_parts = vec![
        ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartText {
                text: BALLOT_PROMPT.to_string(),
            },
        ),
        ChatCompletionRequestUserMessageContentPart::ImageUrl(
            ChatCompletionRequestMessageContentPartImage {
                image_url: ImageUrl {
                    url: image_data_uri.to_string(),
                    detail: Some(ImageDetail::High),
                },
            },
        ),
    ];

    let user_msg = ChatCompletionRequestUserMessageArgs::default()
        .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
        .build()?;

    let request = CreateChatCompletionRequestArgs::default()
        .model(&settings.model)
        .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
        .temperature(settings.temperature)
        .max_tokens(settings.max_tokens)
        .build()?;

    Ok(request)
}

/// 取第一个 choice 的文本
///
/// 没有 choice 或内容为空都算模型调用失败。
/// 空白回答也报错，不会被解析成 "No issues detected"。
pub fn first_choice_text(response: &CreateChatCompletionResponse) -> AppResult<String> {
    let choice = response.choices.first().ok_or_else(|| LlmError::EmptyResponse {
        model: response.model.clone(),
    })?;

    match choice.message.content.as_deref() {
        Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
        _ => Err(LlmError::EmptyContent {
            model: response.model.clone(),
        }
        .into()),
    }
}
