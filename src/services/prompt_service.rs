//! Prompt 构建服务
//!
//! 负责把截图、当前定位器和固定的定位器质量准则组装成一条模型指令，
//! 并给出要求模型遵循的输出结构

use serde_json::json;

use crate::llm::{ContentPart, Instruction, OutputSchema};
use crate::models::{DataUri, SuggestionRequest};

/// 定位器质量准则
pub const LOCATOR_GUIDELINES: &str = r#"When suggesting locators, follow these guidelines:
- Prefer stable, unique attributes: element IDs, data-testid / data-test / data-qa attributes, name and aria-label attributes, and meaningful class names.
- Avoid locators that rely on visible text, element position (nth-child, nth-of-type, index-based paths), or deeply nested structural chains.
- Avoid auto-generated or hashed class names and IDs (for example css-1x2y3z or ember123) because they change between builds.
- Favor attributes that are unlikely to change when the page layout, styling or copy is updated.
- Every suggestion must be a valid CSS selector, ordered from most to least recommended."#;

const ROLE_PREAMBLE: &str = "You are an expert in web test automation and CSS locators. \
Analyze the screenshot of the web page and the current locator below, then suggest more robust alternative locators for the same element.";

/// 输出结构名称
pub const OUTPUT_SCHEMA_NAME: &str = "locator_suggestions";

/// 构建模型指令
///
/// 截图作为内联媒体片段嵌入，定位器原样代入
pub fn build_instruction(guidelines: &str, locator: &str, image: &DataUri) -> Instruction {
    Instruction {
        parts: vec![
            ContentPart::text(ROLE_PREAMBLE),
            ContentPart::text("Screenshot:"),
            ContentPart::media(image.as_str()),
            ContentPart::text(format!("Current locator: {}", locator)),
            ContentPart::text(guidelines),
            ContentPart::text(
                "Respond with the suggested locators and a short explanation of your reasoning.",
            ),
        ],
    }
}

/// 要求的输出结构：候选定位器列表 + 推理说明
pub fn suggestion_output_schema() -> OutputSchema {
    OutputSchema {
        name: OUTPUT_SCHEMA_NAME.to_string(),
        description: "Suggested alternative CSS locators and the reasoning behind them".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "suggestedLocators": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Suggested CSS locators, most recommended first"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Why these locators are more robust than the current one"
                }
            },
            "required": ["suggestedLocators", "reasoning"],
            "additionalProperties": false
        }),
    }
}

/// Prompt 服务
pub struct PromptService {
    guidelines: String,
}

impl PromptService {
    /// 使用默认准则创建
    pub fn new() -> Self {
        Self::with_guidelines(LOCATOR_GUIDELINES)
    }

    pub fn with_guidelines(guidelines: impl Into<String>) -> Self {
        Self {
            guidelines: guidelines.into(),
        }
    }

    /// 为请求构建指令
    pub fn instruction_for(&self, request: &SuggestionRequest) -> Instruction {
        build_instruction(&self.guidelines, request.current_locator(), request.screenshot())
    }
}

impl Default for PromptService {
    fn default() -> Self {
        Self::new()
    }
}
