//! 数据模型

mod api;
mod suggestion;

pub use api::{FieldErrors, SuggestLocatorPayload, ValidateFormPayload, ValidateFormResponse};
pub use suggestion::{DataUri, SuggestionRequest, SuggestionResponse};
