//! 应用配置管理
//!
//! 提供配置的加载、保存、更新功能，使用全局单例模式管理配置状态。
//! 加载顺序：默认值 -> config.json -> 环境变量。

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::AppError;

/// 获取配置文件路径
fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("LOCATOR_CONFIG") {
        return PathBuf::from(path);
    }

    // 配置文件位于可执行文件同级目录
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.json")
}

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM API 密钥
    #[serde(default)]
    pub api_key: String,

    /// LLM API 基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 模型名称（需支持图片输入）
    #[serde(default = "default_model")]
    pub model: String,

    /// 温度参数 (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// 最大 token 数
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 单次模型调用超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8765
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// 应用环境变量覆盖
    ///
    /// `lookup` 用于读取变量，便于测试时替换
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("LOCATOR_API_KEY") {
            self.api_key = api_key;
        }
        if let Some(base_url) = lookup("LOCATOR_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(model) = lookup("LOCATOR_MODEL") {
            self.model = model;
        }
        if let Some(port) = lookup("LOCATOR_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!("忽略无效的 LOCATOR_PORT: {}", port),
            }
        }
        if let Some(timeout) = lookup("LOCATOR_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!("忽略无效的 LOCATOR_TIMEOUT_SECS: {}", timeout),
            }
        }
    }
}

/// 配置的两层：文件层与生效层
///
/// 只有文件层会写回磁盘，环境变量只叠加在生效层上
struct ConfigLayers {
    file: AppConfig,
    effective: AppConfig,
}

impl ConfigLayers {
    fn new<F>(file: AppConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut effective = file.clone();
        effective.apply_env_overrides(lookup);
        Self { file, effective }
    }

    /// 修改文件层并保存，再重新叠加环境变量
    fn update<U, F>(&mut self, updater: U, path: &Path, lookup: F) -> Result<AppConfig, AppError>
    where
        U: FnOnce(&mut AppConfig),
        F: Fn(&str) -> Option<String>,
    {
        let mut file = self.file.clone();
        updater(&mut file);
        save_config_to_file(&file, path)?;
        *self = Self::new(file, lookup);
        Ok(self.effective.clone())
    }
}

/// 全局配置单例
static CONFIG: Lazy<RwLock<ConfigLayers>> = Lazy::new(|| {
    let file = load_config_from_file().unwrap_or_default();
    RwLock::new(ConfigLayers::new(file, |key| std::env::var(key).ok()))
});

/// 从文件加载配置
fn load_config_from_file() -> Option<AppConfig> {
    let path = get_config_path();
    if path.exists() {
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("配置文件解析失败 {}: {}", path.display(), e);
                None
            }
        }
    } else {
        None
    }
}

/// 保存配置到文件
fn save_config_to_file(config: &AppConfig, path: &Path) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Config(format!("序列化配置失败: {}", e)))?;
    fs::write(path, content)
        .map_err(|e| AppError::Config(format!("写入配置文件失败: {}", e)))?;
    Ok(())
}

/// 获取当前生效的配置（克隆）
pub fn get_config() -> AppConfig {
    CONFIG.read().effective.clone()
}

/// 更新配置
///
/// 闭包修改的是文件层，保存后返回叠加环境变量后的生效配置
pub fn update_config<F>(updater: F) -> Result<AppConfig, AppError>
where
    F: FnOnce(&mut AppConfig),
{
    CONFIG
        .write()
        .update(updater, &get_config_path(), |key| std::env::var(key).ok())
}
