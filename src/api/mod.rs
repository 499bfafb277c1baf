//! API 路由模块

mod config;
mod health;
mod suggest;
mod validate;

pub use config::config_routes;
pub use health::health_routes;
pub use suggest::suggest_routes;
pub use validate::validate_routes;

use axum::Router;

use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;

/// 未匹配的路由
async fn not_found() -> AppError {
    AppError::NotFound("route".to_string())
}

/// 创建所有 API 路由
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(config_routes())
        .merge(validate_routes())
        .merge(suggest_routes())
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::services::testing::ScriptedModel;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with(model: Arc<ScriptedModel>) -> Router {
        create_api_routes(Arc::new(AppState::new(model)))
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_suggest_locator_returns_model_reply() {
        let reply = json!({
            "suggestedLocators": ["#loginBtn", "[data-testid=login]"],
            "reasoning": "ID is present but generic; prefer a test-id attribute."
        });
        let model = ScriptedModel::replying(Ok(reply.clone()));
        let app = app_with(model.clone());

        let response = app
            .oneshot(json_request(
                "/api/suggest-locator",
                json!({
                    "url": "https://dev-dash.janitri.in/",
                    "currentLocator": "#login-button",
                    "screenshot": "data:image/png;base64,AAAA"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, reply);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_without_outbound_call() {
        let model = ScriptedModel::replying(Ok(json!({"suggestedLocators": [], "reasoning": ""})));
        let app = app_with(model.clone());

        let response = app
            .oneshot(json_request(
                "/api/suggest-locator",
                json!({
                    "url": "not-a-url",
                    "currentLocator": "#login-button",
                    "screenshot": "data:image/png;base64,AAAA"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["reason"], "invalid_request");
        assert_eq!(body["fields"]["url"], "Please enter a valid URL.");
        assert!(body["fields"].get("currentLocator").is_none());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_screenshot_is_rejected() {
        let model = ScriptedModel::replying(Ok(json!({"suggestedLocators": [], "reasoning": ""})));
        let app = app_with(model.clone());

        let response = app
            .oneshot(json_request(
                "/api/suggest-locator",
                json!({"url": "https://example.com", "currentLocator": "#a"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["fields"]["screenshot"], "Please choose a screenshot image.");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_503_and_clears_busy_flag() {
        let model = ScriptedModel::replying(Err(LlmError::Timeout));
        let state = Arc::new(AppState::new(model));
        let app = create_api_routes(Arc::clone(&state));

        let response = app
            .oneshot(json_request(
                "/api/suggest-locator",
                json!({
                    "url": "https://example.com",
                    "currentLocator": "#a",
                    "screenshot": "data:image/png;base64,AAAA"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["reason"], "service_unavailable");
        assert!(!state.suggestions.is_busy());
    }

    #[tokio::test]
    async fn test_malformed_reply_maps_to_502() {
        let model = ScriptedModel::replying(Ok(json!({"suggestedLocators": ["#a"]})));
        let app = app_with(model);

        let response = app
            .oneshot(json_request(
                "/api/suggest-locator",
                json!({
                    "url": "https://example.com",
                    "currentLocator": "#a",
                    "screenshot": "data:image/png;base64,AAAA"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["reason"], "contract_violation");
    }

    #[tokio::test]
    async fn test_upload_encodes_file_as_data_uri() {
        let model = ScriptedModel::replying(Ok(json!({"suggestedLocators": ["#a"], "reasoning": "r"})));
        let app = app_with(model.clone());

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"url\"\r\n\r\nhttps://example.com/login\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"currentLocator\"\r\n\r\n#login-button\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"screenshot\"; filename=\"shot.png\"\r\n\
             Content-Type: image/png\r\n\r\nabc\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/suggest-locator/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(model.calls(), 1);
        let seen = model.seen();
        assert!(seen[0]
            .parts
            .contains(&crate::llm::ContentPart::media("data:image/png;base64,YWJj")));
    }

    #[tokio::test]
    async fn test_validate_endpoint_reports_fields() {
        let app = app_with(ScriptedModel::replying(Err(LlmError::Timeout)));

        let response = app
            .oneshot(json_request(
                "/api/validate",
                json!({"url": "not-a-url", "currentLocator": "   "}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["errors"]["url"], "Please enter a valid URL.");
        assert_eq!(body["errors"]["currentLocator"], "Current locator cannot be empty.");
    }

    #[tokio::test]
    async fn test_validate_malformed_body_uses_json_error_shape() {
        let app = app_with(ScriptedModel::replying(Err(LlmError::Timeout)));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/validate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["reason"], "bad_request");
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let app = app_with(ScriptedModel::replying(Err(LlmError::Timeout)));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok", "busy": false}));

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
