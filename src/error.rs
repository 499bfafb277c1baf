//! 统一错误处理模块
//!
//! 定义应用级错误类型，并实现 axum 的 IntoResponse trait 以便自动转换为 HTTP 响应。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::FieldErrors;
use crate::services::SuggestionError;

/// 应用错误枚举
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 请求参数错误
    #[error("请求错误: {0}")]
    BadRequest(String),

    /// 建议服务错误
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    /// 资源未找到
    #[error("未找到: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, reason) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Suggestion(e) => {
                let status = match e {
                    SuggestionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    SuggestionError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    SuggestionError::ContractViolation(_) => StatusCode::BAD_GATEWAY,
                    SuggestionError::Busy => StatusCode::CONFLICT,
                };
                (status, e.kind())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        };

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
            "reason": reason
        });

        // 校验失败时附带字段级消息
        if let AppError::Suggestion(SuggestionError::InvalidRequest(report)) = &self {
            body["fields"] = json!(FieldErrors::from(report));
        }

        (status, Json(body)).into_response()
    }
}

/// 便捷类型别名
pub type AppResult<T> = Result<T, AppError>;
