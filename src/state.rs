//! 应用状态管理
//!
//! 定义在请求处理器之间共享的状态。

use std::sync::Arc;

use crate::services::{LlmService, ModelClient, SuggestionService};
use crate::utils::RequestLogger;

/// 应用共享状态
///
/// 使用 Arc 包裹以便在多个处理器之间安全共享
pub struct AppState {
    /// 定位器建议服务（持有在途标记）
    pub suggestions: SuggestionService,
}

impl AppState {
    /// 使用指定的模型客户端创建状态
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            suggestions: SuggestionService::new(client),
        }
    }

    /// 启用请求日志
    pub fn with_logger(self, logger: Arc<RequestLogger>) -> Self {
        Self {
            suggestions: self.suggestions.with_logger(logger),
        }
    }
}

/// 创建可共享的应用状态（生产配置）
pub fn create_shared_state() -> Arc<AppState> {
    let state = AppState::new(Arc::new(LlmService::new()))
        .with_logger(Arc::new(RequestLogger::default()));
    Arc::new(state)
}
