//! Anthropic Messages API 实现
//!
//! 结构化输出通过强制调用单个工具实现：工具的 input_schema 即要求的输出结构。

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use super::format::{build_anthropic_endpoint, extract_json_object, split_data_uri};
use super::types::{ChatMessage, ChatOptions, ContentPart, LlmError, OutputSchema};

/// Anthropic 请求载荷
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    tools: Vec<AnthropicTool>,
    tool_choice: ToolChoice,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    choice_type: &'static str,
    name: String,
}

/// Anthropic 响应
#[derive(Deserialize, Debug)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// 转换消息内容，媒体片段拆分为 base64 图片块
fn convert_parts(parts: Vec<ContentPart>) -> Result<Vec<AnthropicContent>, LlmError> {
    parts
        .into_iter()
        .map(|part| match part {
            ContentPart::Text { text } => Ok(AnthropicContent::Text { text }),
            ContentPart::Media { url } => {
                let (media_type, data) = split_data_uri(&url).ok_or_else(|| {
                    LlmError::ConfigError("Anthropic 仅支持 base64 data URI 图片".to_string())
                })?;
                Ok(AnthropicContent::Image {
                    source: ImageSource {
                        source_type: "base64",
                        media_type: media_type.to_string(),
                        data: data.to_string(),
                    },
                })
            }
        })
        .collect()
}

/// 调用 Anthropic API，返回符合 schema 的 JSON 值
pub async fn generate_anthropic(
    client: &Client,
    api_key: &str,
    base_url: &str,
    messages: Vec<ChatMessage>,
    schema: &OutputSchema,
    model: &str,
    options: &ChatOptions,
) -> Result<Value, LlmError> {
    let endpoint = build_anthropic_endpoint(base_url);

    let anthropic_messages = messages
        .into_iter()
        .map(|msg| {
            Ok(AnthropicMessage {
                role: msg.role,
                content: convert_parts(msg.content)?,
            })
        })
        .collect::<Result<Vec<_>, LlmError>>()?;

    let payload = AnthropicRequest {
        model: model.to_string(),
        messages: anthropic_messages,
        max_tokens: options.max_tokens.unwrap_or(4096),
        temperature: options.temperature,
        tools: vec![AnthropicTool {
            name: schema.name.clone(),
            description: schema.description.clone(),
            input_schema: schema.schema.clone(),
        }],
        tool_choice: ToolChoice {
            choice_type: "tool",
            name: schema.name.clone(),
        },
    };

    debug!("Anthropic API request: endpoint={}, model={}", endpoint, model);

    let response = client
        .post(&endpoint)
        .header("Content-Type", "application/json")
        .header("x-api-key", api_key)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("anthropic-version", "2023-06-01")
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        let error_text = response.text().await.unwrap_or_default();
        error!(
            "Anthropic API error: status={}, body={}",
            status_code,
            error_text.chars().take(500).collect::<String>()
        );
        return Err(LlmError::ApiError {
            status: status_code,
            message: error_text,
        });
    }

    let body = response.text().await?;
    let parsed: AnthropicResponse = serde_json::from_str(&body)
        .map_err(|e| LlmError::InvalidReply(format!("unexpected response envelope: {}", e)))?;

    debug!("Anthropic reply: stop_reason={:?}", parsed.stop_reason);

    let mut fallback_text = String::new();
    for block in parsed.content {
        match block {
            AnthropicBlock::ToolUse { name, input } if name == schema.name => return Ok(input),
            AnthropicBlock::Text { text } => fallback_text.push_str(&text),
            _ => {}
        }
    }

    // 模型未调用工具时，尝试从文本中解析
    let json = extract_json_object(&fallback_text)
        .ok_or_else(|| LlmError::InvalidReply("reply contains no tool call or JSON object".to_string()))?;
    serde_json::from_str(json)
        .map_err(|e| LlmError::InvalidReply(format!("reply is not valid JSON: {}", e)))
}
