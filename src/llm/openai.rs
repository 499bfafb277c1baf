//! OpenAI Chat Completions API 实现（结构化输出，非流式）

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use super::format::{build_openai_endpoint, extract_json_object};
use super::types::{ChatMessage, ChatOptions, ContentPart, LlmError, OutputSchema};

/// OpenAI 请求载荷
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: Vec<OpenAiContent>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContent {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    description: String,
    schema: Value,
    strict: bool,
}

/// OpenAI 响应
#[derive(Deserialize, Debug)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize, Debug)]
struct OpenAiChoice {
    message: OpenAiReplyMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpenAiReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl From<ChatMessage> for OpenAiMessage {
    fn from(msg: ChatMessage) -> Self {
        let content = msg
            .content
            .into_iter()
            .map(|part| match part {
                ContentPart::Text { text } => OpenAiContent::Text { text },
                ContentPart::Media { url } => OpenAiContent::ImageUrl {
                    image_url: ImageUrl { url },
                },
            })
            .collect();

        Self {
            role: msg.role,
            content,
        }
    }
}

/// 调用 OpenAI API，返回符合 schema 的 JSON 值
pub async fn generate_openai(
    client: &Client,
    api_key: &str,
    base_url: &str,
    messages: Vec<ChatMessage>,
    schema: &OutputSchema,
    model: &str,
    options: &ChatOptions,
) -> Result<Value, LlmError> {
    let endpoint = build_openai_endpoint(base_url);

    let payload = OpenAiRequest {
        model: model.to_string(),
        messages: messages.into_iter().map(OpenAiMessage::from).collect(),
        stream: false,
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        response_format: ResponseFormat {
            format_type: "json_schema",
            json_schema: JsonSchemaFormat {
                name: schema.name.clone(),
                description: schema.description.clone(),
                schema: schema.schema.clone(),
                strict: true,
            },
        },
    };

    debug!("OpenAI API request: endpoint={}, model={}", endpoint, model);

    let response = client
        .post(&endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        let error_text = response.text().await.unwrap_or_default();
        error!(
            "OpenAI API error: status={}, body={}",
            status_code,
            truncate(&error_text, 500)
        );
        return Err(LlmError::ApiError {
            status: status_code,
            message: error_text,
        });
    }

    let body = response.text().await?;
    let parsed: OpenAiResponse = serde_json::from_str(&body)
        .map_err(|e| LlmError::InvalidReply(format!("unexpected response envelope: {}", e)))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidReply("response has no choices".to_string()))?;

    if let Some(refusal) = choice.message.refusal {
        return Err(LlmError::InvalidReply(format!("model refused: {}", refusal)));
    }

    let content = choice.message.content.unwrap_or_default();
    debug!(
        "OpenAI reply: finish_reason={:?}, length={}",
        choice.finish_reason,
        content.len()
    );

    let json = extract_json_object(&content)
        .ok_or_else(|| LlmError::InvalidReply("reply does not contain a JSON object".to_string()))?;

    serde_json::from_str(json)
        .map_err(|e| LlmError::InvalidReply(format!("reply is not valid JSON: {}", e)))
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn schema() -> OutputSchema {
        OutputSchema {
            name: "answer".to_string(),
            description: "test".to_string(),
            schema: json!({"type": "object"}),
        }
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::user(vec![
            ContentPart::text("hello"),
            ContentPart::media("data:image/png;base64,AAAA"),
        ])]
    }

    #[test]
    fn test_message_conversion_maps_media_to_image_url() {
        let msg: OpenAiMessage = messages().remove(0).into();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][1]["type"], "image_url");
        assert_eq!(value["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn test_generate_parses_content_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "stream": false,
                "response_format": {
                    "type": "json_schema",
                    "json_schema": {
                        "name": "answer",
                        "schema": {"type": "object"},
                        "strict": true
                    }
                },
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "hello"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"content": "{\"answer\": 42}"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new();
        let value = generate_openai(
            &client,
            "sk-test",
            &server.uri(),
            messages(),
            &schema(),
            "gpt-4o",
            &ChatOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(value, json!({"answer": 42}));
    }

    #[tokio::test]
    async fn test_generate_reports_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = Client::new();
        let err = generate_openai(
            &client,
            "sk-test",
            &server.uri(),
            messages(),
            &schema(),
            "gpt-4o",
            &ChatOptions::default(),
        )
        .await
        .unwrap_err();

        match err {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_non_json_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "I cannot help with that."}}]
            })))
            .mount(&server)
            .await;

        let client = Client::new();
        let err = generate_openai(
            &client,
            "sk-test",
            &server.uri(),
            messages(),
            &schema(),
            "gpt-4o",
            &ChatOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LlmError::InvalidReply(_)));
    }
}
