//! 配置管理端点

use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::{get_config, update_config, AppConfig};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// 配置响应（隐藏 api_key 的实际值）
#[derive(Serialize)]
pub struct ConfigResponse {
    /// 是否已设置 API 密钥
    pub api_key_set: bool,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl From<AppConfig> for ConfigResponse {
    fn from(config: AppConfig) -> Self {
        Self {
            api_key_set: !config.api_key.is_empty(),
            base_url: config.base_url,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        }
    }
}

/// 配置更新请求
#[derive(Deserialize)]
pub struct ConfigUpdateRequest {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl ConfigUpdateRequest {
    /// 检查取值范围
    fn validate(&self) -> Result<(), AppError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(AppError::BadRequest("temperature must be between 0 and 2".to_string()));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(AppError::BadRequest("max_tokens must be positive".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(AppError::BadRequest("timeout_secs must be positive".to_string()));
        }
        if let Some(base_url) = &self.base_url {
            url::Url::parse(base_url)
                .map_err(|e| AppError::BadRequest(format!("invalid base_url: {}", e)))?;
        }
        Ok(())
    }

    /// 应用到配置
    fn apply(self, config: &mut AppConfig) {
        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
    }
}

/// 配置更新响应
#[derive(Serialize)]
pub struct ConfigUpdateResponse {
    pub success: bool,
    pub message: String,
}

/// 获取当前配置
async fn get_config_handler() -> Json<ConfigResponse> {
    Json(ConfigResponse::from(get_config()))
}

/// 更新配置
async fn update_config_handler(
    Json(req): Json<ConfigUpdateRequest>,
) -> AppResult<Json<ConfigUpdateResponse>> {
    req.validate()?;
    let config = update_config(|config| req.apply(config))?;
    info!("Config updated: model={}, base_url={}", config.model, config.base_url);

    Ok(Json(ConfigUpdateResponse {
        success: true,
        message: "Config updated successfully".to_string(),
    }))
}

/// 创建配置路由
pub fn config_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/config", get(get_config_handler).put(update_config_handler))
}
