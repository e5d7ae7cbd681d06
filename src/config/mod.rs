// 配置管理模块

use crate::uploader::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 后端接口配置
    #[serde(default)]
    pub backend: BackendConfig,
    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            upload: UploadConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 单个日志文件最大大小（字节，默认 50MB）
    #[serde(default = "default_log_max_file_size")]
    pub max_file_size: u64,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
            max_file_size: default_log_max_file_size(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// CORS允许的源
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18890,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// 后端接口配置
///
/// 会话、分片地址、进度查询等接口都挂在 `base_url` 下
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 接口基础地址，如 `https://api.example.com`
    pub base_url: String,
    /// 访问令牌（以 Bearer 方式发送，登录流程不在本服务内）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            auth_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// 请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 上传配置
///
/// 默认值即服务端约定的线上参数：
/// - 分片 5MB，超过 150MB 的文件走分片上传
/// - 每轮最多 3 个分片并发
/// - 单分片最多重试 3 次，固定间隔 1 秒
/// - 完成校验 3 轮，间隔 2s/4s/8s
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 分片大小（字节）
    #[serde(default = "default_part_size")]
    pub part_size: u64,
    /// 分片阈值（字节），仅用于与服务端决策对比
    #[serde(default = "default_chunk_threshold")]
    pub chunk_threshold: u64,
    /// 每轮最大并发分片数
    #[serde(default = "default_max_concurrent_parts")]
    pub max_concurrent_parts: usize,
    /// 单分片最大重试次数
    #[serde(default = "default_max_part_retries")]
    pub max_part_retries: u32,
    /// 分片重试间隔（毫秒）
    #[serde(default = "default_part_retry_delay_ms")]
    pub part_retry_delay_ms: u64,
    /// 所有分片结束后等待后端收敛的时间（毫秒）
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// 完成校验轮数
    #[serde(default = "default_verify_rounds")]
    pub verify_rounds: u32,
    /// 完成校验首轮等待（毫秒）
    #[serde(default = "default_verify_base_delay_ms")]
    pub verify_base_delay_ms: u64,
    /// 完成校验等待倍数
    #[serde(default = "default_verify_multiplier")]
    pub verify_multiplier: u32,
    /// 单批最大文件数（只在 HTTP 入口校验，核心引擎不做限制）
    #[serde(default = "default_max_batch_files")]
    pub max_batch_files: usize,
}

fn default_part_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_chunk_threshold() -> u64 {
    150 * 1024 * 1024 // 150MB
}

fn default_max_concurrent_parts() -> usize {
    3
}

fn default_max_part_retries() -> u32 {
    3
}

fn default_part_retry_delay_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_verify_rounds() -> u32 {
    3
}

fn default_verify_base_delay_ms() -> u64 {
    2000
}

fn default_verify_multiplier() -> u32 {
    2
}

fn default_max_batch_files() -> usize {
    5
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: default_part_size(),
            chunk_threshold: default_chunk_threshold(),
            max_concurrent_parts: default_max_concurrent_parts(),
            max_part_retries: default_max_part_retries(),
            part_retry_delay_ms: default_part_retry_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            verify_rounds: default_verify_rounds(),
            verify_base_delay_ms: default_verify_base_delay_ms(),
            verify_multiplier: default_verify_multiplier(),
            max_batch_files: default_max_batch_files(),
        }
    }
}

impl UploadConfig {
    /// 单分片重试策略（固定间隔）
    pub fn part_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.max_part_retries,
            Duration::from_millis(self.part_retry_delay_ms),
        )
    }

    /// 完成校验策略（指数退避）
    pub fn verify_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.verify_rounds,
            Duration::from_millis(self.verify_base_delay_ms),
            self.verify_multiplier,
        )
    }

    /// 收敛等待时间
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<()> {
        if self.part_size == 0 {
            anyhow::bail!("分片大小必须大于 0");
        }
        if self.max_concurrent_parts == 0 {
            anyhow::bail!("并发分片数至少为 1");
        }
        if self.verify_rounds == 0 {
            anyhow::bail!("完成校验轮数至少为 1");
        }
        if self.max_batch_files == 0 {
            anyhow::bail!("单批文件数上限至少为 1");
        }
        Ok(())
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        config
            .upload
            .validate()
            .context("配置文件中的上传参数校验失败")?;

        Ok(config)
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        self.upload
            .validate()
            .context("保存配置失败：上传参数不合法")?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // 确保父目录存在
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        tracing::info!("✓ 配置已保存: {}", path);

        Ok(())
    }

    /// 加载或创建默认配置
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {}", e);
                let default_config = Self::default();

                // 尝试保存默认配置
                if let Err(e) = default_config.save_to_file(path).await {
                    tracing::error!("保存默认配置失败: {}", e);
                }

                default_config
            }
        }
    }
}
