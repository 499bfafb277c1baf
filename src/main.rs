//! Locator Suggest - Rust Backend
//!
//! 使用 axum 框架构建的后端服务：校验表单输入，把截图和当前定位器交给多模态 LLM，
//! 返回更稳定的候选 CSS 定位器和推理说明。

use axum::Router;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod llm;
mod models;
mod services;
mod state;
mod utils;

use api::create_api_routes;
use config::get_config;
use state::create_shared_state;

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locator_suggest=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting locator suggestion backend...");

    let config = get_config();
    if config.api_key.is_empty() {
        warn!("API Key 未配置，建议请求将返回 503，请通过 /api/config 或 LOCATOR_API_KEY 设置");
    }
    info!("Model: {} ({})", config.model, config.base_url);

    // 创建共享状态
    let state = create_shared_state();

    // 配置 CORS（浏览器表单可能由其他端口提供）
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 构建路由
    let app = Router::new()
        .merge(create_api_routes(Arc::clone(&state)))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("无效的监听地址 {}:{}: {}", config.host, config.port, e);
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定 {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Server listening on: {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
