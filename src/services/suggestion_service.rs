//! 定位器建议服务
//!
//! 校验请求 -> 构建指令 -> 调用一次模型 -> 按要求的结构解析回复。
//! 同一时间只允许一个请求在途，不缓存、不重试。

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::llm::LlmError;
use crate::models::{SuggestionRequest, SuggestionResponse};
use crate::utils::RequestLogger;

use super::model_client::ModelClient;
use super::prompt_service::{suggestion_output_schema, PromptService};
use super::validator::ValidationReport;

/// 建议服务错误
#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    /// 请求未通过校验
    #[error("{0}")]
    InvalidRequest(ValidationReport),

    /// 传输/端点失败，只能由用户手动重新提交
    #[error("Suggestion service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 模型回复不符合要求的结构
    #[error("Model reply did not match the expected shape: {0}")]
    ContractViolation(String),

    /// 已有请求在途
    #[error("A suggestion request is already in progress")]
    Busy,
}

impl SuggestionError {
    /// 机器可读的错误类型
    pub fn kind(&self) -> &'static str {
        match self {
            SuggestionError::InvalidRequest(_) => "invalid_request",
            SuggestionError::ServiceUnavailable(_) => "service_unavailable",
            SuggestionError::ContractViolation(_) => "contract_violation",
            SuggestionError::Busy => "busy",
        }
    }
}

/// 将模型层错误归类为服务错误
pub fn classify_llm_error(error: LlmError) -> SuggestionError {
    if error.is_transport() {
        SuggestionError::ServiceUnavailable(error.to_string())
    } else {
        SuggestionError::ContractViolation(error.to_string())
    }
}

/// 按要求的结构解析模型回复
pub fn parse_reply(reply: Value) -> Result<SuggestionResponse, SuggestionError> {
    serde_json::from_value(reply).map_err(|e| SuggestionError::ContractViolation(e.to_string()))
}

/// 在途标记
///
/// 派发前置位，[`InFlightGuard`] 释放时清除，无论成功还是失败
#[derive(Debug, Default)]
pub struct InFlight {
    busy: AtomicBool,
}

impl InFlight {
    /// 尝试置位，已在途时返回 None
    pub fn try_acquire(&self) -> Option<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { flag: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// 在途标记的作用域守卫
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
    }
}

/// 定位器建议服务
pub struct SuggestionService {
    client: Arc<dyn ModelClient>,
    prompts: PromptService,
    in_flight: InFlight,
    logger: Option<Arc<RequestLogger>>,
}

impl SuggestionService {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            prompts: PromptService::new(),
            in_flight: InFlight::default(),
            logger: None,
        }
    }

    /// 启用请求日志
    pub fn with_logger(mut self, logger: Arc<RequestLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// 是否有请求在途
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// 校验原始输入后再发起建议请求
    ///
    /// 校验失败时不会发出任何出站调用
    pub async fn suggest(
        &self,
        url: &str,
        current_locator: &str,
        screenshot: Option<&str>,
    ) -> Result<SuggestionResponse, SuggestionError> {
        let request = SuggestionRequest::new(url, current_locator, screenshot).map_err(|report| {
            info!("Rejected suggestion request before dispatch: {}", report);
            SuggestionError::InvalidRequest(report)
        })?;
        self.suggest_locator(request).await
    }

    /// 对已校验的请求发起一次模型调用
    pub async fn suggest_locator(
        &self,
        request: SuggestionRequest,
    ) -> Result<SuggestionResponse, SuggestionError> {
        let _guard = self.in_flight.try_acquire().ok_or_else(|| {
            warn!("Suggestion request rejected: another request is in flight");
            SuggestionError::Busy
        })?;

        let request_id = RequestLogger::generate_request_id();
        let start = Instant::now();
        let model = self.client.model_name();
        let log_entry = self
            .logger
            .as_ref()
            .map(|logger| logger.start(&request_id, &request, &model));

        info!(
            "Suggestion request {}: url={}, locator={:?}, screenshot={} ({} chars)",
            request_id,
            request.url(),
            request.current_locator(),
            request.screenshot().mime_type(),
            request.screenshot().payload_len()
        );

        let instruction = self.prompts.instruction_for(&request);
        let schema = suggestion_output_schema();

        let result = match self.client.generate(&instruction, &schema).await {
            Ok(reply) => parse_reply(reply),
            Err(e) => Err(classify_llm_error(e)),
        };

        match &result {
            Ok(response) => {
                info!(
                    "Suggestion request {} completed: {} locators in {}ms",
                    request_id,
                    response.suggested_locators.len(),
                    start.elapsed().as_millis()
                );
                if let (Some(logger), Some(entry)) = (&self.logger, log_entry) {
                    logger.log_success(entry, start, response.suggested_locators.len());
                }
            }
            Err(e) => {
                warn!("Suggestion request {} failed ({}): {}", request_id, e.kind(), e);
                if let (Some(logger), Some(entry)) = (&self.logger, log_entry) {
                    logger.log_error(entry, start, e.kind(), &e.to_string());
                }
            }
        }

        result
    }
}
