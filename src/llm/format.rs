//! API 格式检测、URL 构建和回复解析工具

/// API 格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    /// OpenAI Chat Completions API
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
}

/// 根据模型名称检测 API 格式
///
/// 规则：模型名包含 "claude" 则使用 Anthropic 格式，否则使用 OpenAI 格式
pub fn detect_api_format(model: &str) -> ApiFormat {
    if model.to_lowercase().contains("claude") {
        ApiFormat::Anthropic
    } else {
        ApiFormat::OpenAi
    }
}

/// 修复 base_url
///
/// - 移除末尾斜杠
/// - 修复双斜杠（保留协议部分）
pub fn fix_base_url(base_url: &str) -> String {
    let mut url = base_url.trim().trim_end_matches('/').to_string();

    if let Some(pos) = url.find("://") {
        let (protocol, rest) = url.split_at(pos + 3);
        let fixed_rest = rest.replace("//", "/");
        url = format!("{}{}", protocol, fixed_rest);
    }

    url
}

/// 构建 OpenAI Chat Completions 端点
pub fn build_openai_endpoint(base_url: &str) -> String {
    let url = fix_base_url(base_url);

    if url.ends_with("/chat/completions") {
        url
    } else if url.ends_with("/v1") {
        format!("{}/chat/completions", url)
    } else {
        format!("{}/v1/chat/completions", url)
    }
}

/// 构建 Anthropic Messages 端点
pub fn build_anthropic_endpoint(base_url: &str) -> String {
    let url = fix_base_url(base_url);

    if url.ends_with("/messages") {
        url
    } else if url.ends_with("/v1") {
        format!("{}/messages", url)
    } else {
        format!("{}/v1/messages", url)
    }
}

/// 拆分 data URI，返回 (mime 类型, base64 负载)
///
/// 只检查结构，不解码负载
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    if mime.trim().is_empty() || payload.is_empty() {
        return None;
    }
    Some((mime, payload))
}

/// 从模型文本回复中提取 JSON 对象
///
/// 支持以下格式：
/// 1. 纯 JSON
/// 2. 被 markdown 代码块包裹: ` ```json { ... } ``` `
/// 3. 前后夹杂说明文字的 JSON 对象
pub fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    // 尝试查找 ```json ... ``` 格式
    if let Some(start) = trimmed.find("```json") {
        let after_marker = &trimmed[start + 7..];
        if let Some(end) = after_marker.find("```") {
            return Some(after_marker[..end].trim());
        }
    }

    // 尝试查找 ``` ... ``` 格式（没有 json 标记）
    if let Some(start) = trimmed.find("```") {
        let after_marker = &trimmed[start + 3..];
        if let Some(end) = after_marker.find("```") {
            let block = after_marker[..end].trim();
            if let Some(json_start) = block.find('{') {
                return Some(&block[json_start..]);
            }
        }
    }

    // 最后兜底：第一个 { 到最后一个 }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end > start {
        Some(&trimmed[start..=end])
    } else {
        None
    }
}
