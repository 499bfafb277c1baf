//! 建议请求日志记录器
//!
//! 把每次定位器建议调用记录到 JSONL 文件，便于调试和分析。
//! 截图内容本身不落盘，只记录 mime 类型和大小。

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

use crate::models::SuggestionRequest;

/// 请求日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// 请求 ID
    pub request_id: String,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
    /// 页面 URL
    pub page_url: String,
    /// 当前定位器
    pub current_locator: String,
    /// 截图 mime 类型
    pub screenshot_mime: String,
    /// 截图 base64 长度
    pub screenshot_size: usize,
    /// 模型名称
    pub model: String,
    /// 状态：pending / success / error
    pub status: String,
    /// 持续时间（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// 返回的建议数量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_count: Option<usize>,
    /// 错误类型
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// 错误信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// 已打开的日志文件及其行数
#[derive(Default)]
struct LogFile {
    file: Option<File>,
    lines: usize,
}

/// 请求日志记录器
pub struct RequestLogger {
    log_path: PathBuf,
    max_entries: usize,
    state: Mutex<LogFile>,
}

impl RequestLogger {
    /// 创建新的日志记录器
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        let log_dir = log_dir.unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("storage")
        });

        // 确保目录存在
        if let Err(e) = fs::create_dir_all(&log_dir) {
            warn!("无法创建日志目录 {}: {}", log_dir.display(), e);
        }

        Self {
            log_path: log_dir.join("locator_requests.jsonl"),
            max_entries: 1000,
            state: Mutex::new(LogFile::default()),
        }
    }

    /// 设置保留的最大条目数
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// 生成请求 ID
    pub fn generate_request_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }

    /// 截断字符串
    fn truncate(s: &str, max_len: usize) -> String {
        match s.char_indices().nth(max_len) {
            Some((idx, _)) => format!("{}...", &s[..idx]),
            None => s.to_string(),
        }
    }

    /// 记录请求开始
    pub fn start(&self, request_id: &str, request: &SuggestionRequest, model: &str) -> LogEntry {
        LogEntry {
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
            page_url: request.url().to_string(),
            current_locator: Self::truncate(request.current_locator(), 200),
            screenshot_mime: request.screenshot().mime_type().to_string(),
            screenshot_size: request.screenshot().payload_len(),
            model: model.to_string(),
            status: "pending".to_string(),
            duration_ms: None,
            suggestion_count: None,
            error_kind: None,
            error_message: None,
        }
    }

    /// 记录成功
    pub fn log_success(&self, mut entry: LogEntry, start_time: Instant, suggestion_count: usize) {
        entry.status = "success".to_string();
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.suggestion_count = Some(suggestion_count);
        self.write_entry(&entry);
    }

    /// 记录错误
    pub fn log_error(
        &self,
        mut entry: LogEntry,
        start_time: Instant,
        error_kind: &str,
        error_message: &str,
    ) {
        entry.status = "error".to_string();
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.error_kind = Some(error_kind.to_string());
        entry.error_message = Some(Self::truncate(error_message, 500));
        self.write_entry(&entry);
    }

    /// 写入日志条目
    ///
    /// 行数只在打开文件时统计一次，超过上限才重写文件
    fn write_entry(&self, entry: &LogEntry) {
        let mut state = self.state.lock();

        // 懒加载文件
        if state.file.is_none() {
            match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
            {
                Ok(f) => {
                    state.lines = self.read_lines().len();
                    state.file = Some(f);
                }
                Err(e) => warn!("无法打开请求日志 {}: {}", self.log_path.display(), e),
            }
        }

        let Some(file) = state.file.as_mut() else {
            return;
        };
        let Ok(json) = serde_json::to_string(entry) else {
            return;
        };
        if writeln!(file, "{}", json).and_then(|_| file.flush()).is_err() {
            warn!("写入请求日志失败: {}", self.log_path.display());
            return;
        }
        state.lines += 1;

        if state.lines > self.max_entries {
            // 文件被重写，下次写入时重新打开
            state.file = None;
            match self.truncate_to_latest() {
                Ok(()) => state.lines = self.max_entries,
                Err(e) => warn!("清理请求日志失败: {}", e),
            }
        }
    }

    fn read_lines(&self) -> Vec<String> {
        let Ok(file) = File::open(&self.log_path) else {
            return Vec::new();
        };
        BufReader::new(file).lines().map_while(Result::ok).collect()
    }

    /// 只保留最近 max_entries 条
    fn truncate_to_latest(&self) -> std::io::Result<()> {
        let lines = self.read_lines();
        let keep_lines = &lines[lines.len().saturating_sub(self.max_entries)..];
        let mut file = File::create(&self.log_path)?;
        for line in keep_lines {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// 读取最近的日志条目
    pub fn read_entries(&self) -> Vec<LogEntry> {
        self.read_lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new(None)
    }
}
