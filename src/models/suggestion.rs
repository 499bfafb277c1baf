//! 定位器建议的请求/响应记录

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::llm::split_data_uri;
use crate::services::validator::{
    validate_locator, validate_screenshot, validate_url, ValidationError, ValidationReport,
};

/// 截图的 data URI：`data:<mime-type>;base64,<encoded-bytes>`
///
/// 只校验结构，内容原样透传给模型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DataUri(String);

impl DataUri {
    /// 解析并校验 data URI 结构
    pub fn parse(input: impl Into<String>) -> Result<Self, ValidationError> {
        let input = input.into();
        validate_screenshot(Some(&input))?;
        Ok(Self(input))
    }

    /// 将原始字节编码为 data URI
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> &str {
        split_data_uri(&self.0).map(|(mime, _)| mime).unwrap_or_default()
    }

    /// base64 负载长度（字符数）
    pub fn payload_len(&self) -> usize {
        split_data_uri(&self.0).map(|(_, data)| data.len()).unwrap_or(0)
    }
}

/// 经过校验的建议请求
///
/// 只能通过 [`SuggestionRequest::new`] 构造，保证字段都已通过校验
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    url: Url,
    current_locator: String,
    screenshot: DataUri,
}

impl SuggestionRequest {
    /// 校验全部字段后构造请求，失败时报告每个出错字段
    ///
    /// 定位器按原文保存，不做裁剪
    pub fn new(
        url: &str,
        current_locator: &str,
        screenshot: Option<&str>,
    ) -> Result<Self, ValidationReport> {
        let mut report = ValidationReport::default();

        let url = ValidationReport::from_result(validate_url(url), &mut report);
        ValidationReport::from_result(validate_locator(current_locator), &mut report);
        let screenshot = ValidationReport::from_result(
            screenshot
                .ok_or(ValidationError::MissingScreenshot)
                .and_then(DataUri::parse),
            &mut report,
        );

        match (url, screenshot) {
            (Some(url), Some(screenshot)) if report.is_valid() => Ok(Self {
                url,
                current_locator: current_locator.to_string(),
                screenshot,
            }),
            _ => Err(report),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn current_locator(&self) -> &str {
        &self.current_locator
    }

    pub fn screenshot(&self) -> &DataUri {
        &self.screenshot
    }
}

/// 模型返回的建议
///
/// 两个字段都必须出现；多余字段忽略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    /// 候选 CSS 选择器，按推荐顺序排列
    pub suggested_locators: Vec<String>,
    /// 推理说明
    pub reasoning: String,
}
