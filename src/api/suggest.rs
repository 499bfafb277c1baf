//! 定位器建议端点

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{DataUri, SuggestLocatorPayload, SuggestionResponse};
use crate::state::AppState;

/// 截图上传大小上限
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// 获取定位器建议（JSON，截图为 data URI）
async fn suggest_locator(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SuggestLocatorPayload>, JsonRejection>,
) -> AppResult<Json<SuggestionResponse>> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let response = state
        .suggestions
        .suggest(&req.url, &req.current_locator, req.screenshot.as_deref())
        .await?;

    Ok(Json(response))
}

/// 获取定位器建议（multipart 表单，截图为原始文件）
///
/// 上传的文件在这里编码为 data URI
async fn suggest_locator_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<SuggestionResponse>> {
    let mut url = String::new();
    let mut current_locator = String::new();
    let mut screenshot: Option<DataUri> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "url" => {
                url = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
            }
            "currentLocator" => {
                current_locator = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
            }
            "screenshot" => {
                let mime = guess_mime_type(field.content_type(), field.file_name());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                info!("Received screenshot upload: {} bytes, mime={}", bytes.len(), mime);
                if !bytes.is_empty() {
                    screenshot = Some(DataUri::encode(&mime, &bytes));
                }
            }
            other => debug!("Ignoring unknown multipart field: {}", other),
        }
    }

    let response = state
        .suggestions
        .suggest(&url, &current_locator, screenshot.as_ref().map(DataUri::as_str))
        .await?;

    Ok(Json(response))
}

/// 推断上传文件的 mime 类型：优先使用声明的类型，其次按扩展名
fn guess_mime_type(content_type: Option<&str>, file_name: Option<&str>) -> String {
    if let Some(ct) = content_type {
        let ct = ct.trim();
        if !ct.is_empty() && ct != "application/octet-stream" {
            return ct.to_string();
        }
    }

    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// 创建建议路由
pub fn suggest_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/suggest-locator", post(suggest_locator))
        .route("/api/suggest-locator/upload", post(suggest_locator_upload))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type(Some("image/jpeg"), Some("a.png")), "image/jpeg");
        assert_eq!(
            guess_mime_type(Some("application/octet-stream"), Some("shot.PNG")),
            "image/png"
        );
        assert_eq!(guess_mime_type(None, Some("shot.webp")), "image/webp");
        assert_eq!(guess_mime_type(None, Some("shot")), "application/octet-stream");
        assert_eq!(guess_mime_type(None, None), "application/octet-stream");
    }
}
