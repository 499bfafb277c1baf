//! 统一 LLM 客户端

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::anthropic::generate_anthropic;
use super::format::{detect_api_format, ApiFormat};
use super::openai::generate_openai;
use super::types::{ChatMessage, ChatOptions, LlmError, OutputSchema};

/// 统一 LLM 客户端
///
/// 支持 OpenAI 和 Anthropic API 格式，根据模型名称自动选择
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::ConfigError("API Key is required".to_string()));
        }

        // 构建 HTTP 客户端
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30).min(timeout))
            .pool_max_idle_per_host(2)
            .build()
            .map_err(LlmError::HttpError)?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
        })
    }

    /// 发起一次结构化输出请求（自动检测 API 格式）
    ///
    /// 只发送一次请求，不做重试
    pub async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        schema: &OutputSchema,
        model: &str,
        options: &ChatOptions,
    ) -> Result<Value, LlmError> {
        let api_format = detect_api_format(model);
        info!("LLM request: model={}, api_format={:?}", model, api_format);

        let result = match api_format {
            ApiFormat::OpenAi => {
                generate_openai(
                    &self.client,
                    &self.api_key,
                    &self.base_url,
                    messages,
                    schema,
                    model,
                    options,
                )
                .await
            }
            ApiFormat::Anthropic => {
                generate_anthropic(
                    &self.client,
                    &self.api_key,
                    &self.base_url,
                    messages,
                    schema,
                    model,
                    options,
                )
                .await
            }
        };

        result.map_err(|e| match e {
            LlmError::HttpError(err) if err.is_timeout() => LlmError::Timeout,
            other => other,
        })
    }
}
