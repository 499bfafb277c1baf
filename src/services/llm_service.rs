//! LLM 服务封装
//!
//! 封装 LlmClient，与配置系统集成，作为生产环境的 ModelClient

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{get_config, AppConfig};
use crate::llm::{ChatOptions, Instruction, LlmClient, LlmError, OutputSchema};

use super::model_client::ModelClient;

/// LLM 服务
///
/// 每次调用都重新读取配置，配置更新后无需重启
pub struct LlmService {
    config_source: fn() -> AppConfig,
}

impl LlmService {
    /// 使用全局配置创建
    pub fn new() -> Self {
        Self {
            config_source: get_config,
        }
    }

    #[cfg(test)]
    pub fn with_config_source(config_source: fn() -> AppConfig) -> Self {
        Self { config_source }
    }

    /// 根据当前配置构建客户端
    fn build_client(config: &AppConfig) -> Result<LlmClient, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::ConfigError(
                "API Key not configured. Please set it in Settings.".to_string(),
            ));
        }

        LlmClient::new(
            &config.api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }
}

impl Default for LlmService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for LlmService {
    async fn generate(
        &self,
        instruction: &Instruction,
        schema: &OutputSchema,
    ) -> Result<Value, LlmError> {
        let config = (self.config_source)();
        let client = Self::build_client(&config)?;

        let options = ChatOptions {
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        };

        client
            .generate(instruction.to_messages(), schema, &config.model, &options)
            .await
    }

    fn model_name(&self) -> String {
        (self.config_source)().model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ContentPart;
    use serde_json::json;

    fn unconfigured() -> AppConfig {
        AppConfig {
            api_key: String::new(),
            ..AppConfig::default()
        }
    }

    fn configured() -> AppConfig {
        AppConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let service = LlmService::with_config_source(unconfigured);
        let instruction = Instruction {
            parts: vec![ContentPart::text("hi")],
        };
        let schema = OutputSchema {
            name: "x".to_string(),
            description: String::new(),
            schema: json!({}),
        };

        let err = service.generate(&instruction, &schema).await.unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn test_model_name_follows_config() {
        let service = LlmService::with_config_source(configured);
        assert_eq!(service.model_name(), "gpt-4o-mini");
    }
}
