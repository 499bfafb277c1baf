//! LLM 类型定义

use serde::Serialize;
use serde_json::Value;

/// 消息内容片段
///
/// `Media` 的 url 为内联数据引用（`data:<mime>;base64,...`），原样透传给模型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// 文本片段
    Text { text: String },
    /// 媒体片段（图片）
    Media { url: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn media(url: impl Into<String>) -> Self {
        Self::Media { url: url.into() }
    }
}

/// 聊天消息
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// 角色
    pub role: String,
    /// 消息内容片段
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content: parts,
        }
    }
}

/// 单条指令：按顺序排列的文本和媒体片段
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instruction {
    pub parts: Vec<ContentPart>,
}

impl Instruction {
    /// 指令中的媒体片段数量
    pub fn media_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, ContentPart::Media { .. }))
            .count()
    }

    /// 转换为发送给模型的消息列表
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::user(self.parts.clone())]
    }
}

/// 要求模型遵循的输出结构（JSON Schema）
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    /// 结构名称（OpenAI json_schema 名 / Anthropic 工具名）
    pub name: String,
    /// 结构说明
    pub description: String,
    /// JSON Schema
    pub schema: Value,
}

/// 调用选项
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// 温度参数
    pub temperature: Option<f64>,
    /// 最大 token 数
    pub max_tokens: Option<u32>,
}

/// LLM 错误类型
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP 请求错误
    #[error("HTTP 请求失败: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API 返回错误
    #[error("API 错误 ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// 超时错误
    #[error("请求超时")]
    Timeout,

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 模型回复不可用（无内容、非 JSON 等）
    #[error("模型回复无效: {0}")]
    InvalidReply(String),
}

impl LlmError {
    /// 是否属于传输/端点层面的失败
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LlmError::HttpError(_) | LlmError::ApiError { .. } | LlmError::Timeout | LlmError::ConfigError(_)
        )
    }
}
