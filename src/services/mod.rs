//! 服务层模块

mod llm_service;
mod model_client;
mod prompt_service;
mod suggestion_service;
#[cfg(test)]
pub(crate) mod testing;
pub mod validator;

pub use llm_service::LlmService;
pub use model_client::ModelClient;
pub use suggestion_service::{SuggestionError, SuggestionService};
pub use validator::validate_form;
