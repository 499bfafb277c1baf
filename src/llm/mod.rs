//! LLM 模块
//!
//! 提供统一的 LLM 客户端，支持 OpenAI 和 Anthropic API 格式的多模态结构化输出调用。

mod anthropic;
mod client;
mod format;
mod openai;
mod types;

pub use client::LlmClient;
pub use format::split_data_uri;
pub use types::*;
