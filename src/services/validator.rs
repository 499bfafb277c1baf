//! 表单输入校验
//!
//! 在发起任何网络请求之前校验 URL、定位器和截图。纯函数，无副作用。

use serde::Serialize;
use std::fmt;
use url::Url;

use crate::llm::split_data_uri;

/// 字段级校验错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a valid URL.")]
    InvalidUrl,

    #[error("Current locator cannot be empty.")]
    EmptyLocator,

    #[error("Please choose a screenshot image.")]
    MissingScreenshot,

    #[error("Screenshot must be a data URI of the form data:<mime-type>;base64,<data>.")]
    MalformedScreenshot,
}

impl ValidationError {
    /// 对应的表单字段名
    pub fn field(&self) -> Field {
        match self {
            ValidationError::InvalidUrl => Field::Url,
            ValidationError::EmptyLocator => Field::CurrentLocator,
            ValidationError::MissingScreenshot | ValidationError::MalformedScreenshot => {
                Field::Screenshot
            }
        }
    }
}

/// 表单字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Url,
    CurrentLocator,
    Screenshot,
}

/// 校验 URL：必须是带 scheme 和 host 的绝对地址
pub fn validate_url(input: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(input.trim()).map_err(|_| ValidationError::InvalidUrl)?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ValidationError::InvalidUrl),
    }
}

/// 校验定位器：至少包含一个非空白字符
pub fn validate_locator(input: &str) -> Result<(), ValidationError> {
    if input.trim().is_empty() {
        Err(ValidationError::EmptyLocator)
    } else {
        Ok(())
    }
}

/// 校验截图 data URI 的结构（不解码内容）
pub fn validate_screenshot(input: Option<&str>) -> Result<(), ValidationError> {
    let input = match input {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err(ValidationError::MissingScreenshot),
    };
    split_data_uri(input)
        .map(|_| ())
        .ok_or(ValidationError::MalformedScreenshot)
}

/// 校验结果报告，每个失败字段一条消息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn push(&mut self, error: ValidationError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// 指定字段的错误消息
    pub fn message_for(&self, field: Field) -> Option<String> {
        self.errors
            .iter()
            .find(|e| e.field() == field)
            .map(|e| e.to_string())
    }

    pub(crate) fn from_result<T>(result: Result<T, ValidationError>, report: &mut Self) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                report.push(e);
                None
            }
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join(" "))
    }
}

impl From<ValidationError> for ValidationReport {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// 校验表单中用户直接输入的两个字段
pub fn validate_form(url: &str, locator: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    if let Err(e) = validate_url(url) {
        report.push(e);
    }
    if let Err(e) = validate_locator(locator) {
        report.push(e);
    }
    report
}
