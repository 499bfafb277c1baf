//! 表单校验端点

use axum::{extract::rejection::JsonRejection, routing::post, Json, Router};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{FieldErrors, ValidateFormPayload, ValidateFormResponse};
use crate::services::validate_form;
use crate::state::AppState;

/// 校验表单字段，返回每个出错字段的提示
async fn validate_handler(
    payload: Result<Json<ValidateFormPayload>, JsonRejection>,
) -> AppResult<Json<ValidateFormResponse>> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let report = validate_form(&req.url, &req.current_locator);
    Ok(Json(ValidateFormResponse {
        valid: report.is_valid(),
        errors: FieldErrors::from(&report),
    }))
}

/// 创建校验路由
pub fn validate_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/validate", post(validate_handler))
}
