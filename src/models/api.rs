//! REST API 请求/响应模型

use serde::{Deserialize, Serialize};

use crate::services::validator::{Field, ValidationReport};

/// 定位器建议请求（JSON 形式）
///
/// 字段缺失时按空值处理，交给校验器给出字段级提示
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestLocatorPayload {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub current_locator: String,
    #[serde(default)]
    pub screenshot: Option<String>,
}

/// 表单校验请求
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateFormPayload {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub current_locator: String,
}

/// 字段级错误消息
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_locator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl From<&ValidationReport> for FieldErrors {
    fn from(report: &ValidationReport) -> Self {
        Self {
            url: report.message_for(Field::Url),
            current_locator: report.message_for(Field::CurrentLocator),
            screenshot: report.message_for(Field::Screenshot),
        }
    }
}

/// 表单校验响应
#[derive(Debug, Serialize)]
pub struct ValidateFormResponse {
    pub valid: bool,
    pub errors: FieldErrors,
}
