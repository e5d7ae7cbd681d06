// 分片划分与分片状态
//
// 分片规则（与后端约定）：
// - 分片大小固定 5MB
// - 文件 > 150MB 时服务端会要求分片上传，但最终以会话中的 isChunked 为准
// - 分片序号从 1 开始，分片索引从 0 开始

use crate::backend::FileMetadata;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// 分片大小: 5MB
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// 分片阈值: 150MB
pub const CHUNK_THRESHOLD: u64 = 150 * 1024 * 1024;

/// 每轮最大并发分片数
pub const MAX_CONCURRENT_UPLOADS: usize = 3;

/// 分片字节范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRange {
    /// 分片索引（从 0 开始）
    pub index: usize,
    /// 字节范围
    pub range: Range<u64>,
}

impl PartRange {
    pub fn new(index: usize, range: Range<u64>) -> Self {
        Self { index, range }
    }

    /// 分片序号（从 1 开始）
    pub fn part_number(&self) -> u32 {
        self.index as u32 + 1
    }

    /// 分片大小
    pub fn size(&self) -> u64 {
        self.range.end - self.range.start
    }
}

/// 按固定大小划分分片
///
/// 最后一个分片可能小于 `part_size`；空文件没有分片
pub fn split_parts(total_size: u64, part_size: u64) -> Vec<PartRange> {
    let part_size = part_size.max(1);
    let mut parts = Vec::with_capacity(expected_part_count(total_size, part_size) as usize);
    let mut offset = 0u64;

    while offset < total_size {
        let end = std::cmp::min(offset + part_size, total_size);
        parts.push(PartRange::new(parts.len(), offset..end));
        offset = end;
    }

    parts
}

/// 预计分片数量 = ceil(size / part_size)
pub fn expected_part_count(total_size: u64, part_size: u64) -> u32 {
    total_size.div_ceil(part_size.max(1)) as u32
}

/// 客户端侧的分片判断（仅用于与服务端决策对比）
pub fn should_chunk(total_size: u64, threshold: u64) -> bool {
    total_size > threshold
}

/// 分片状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartState {
    Pending,
    Uploading,
    Completed,
    Error,
}

/// 单个分片的上传状态
///
/// 状态只能按 pending → uploading → completed/error 流转，error 可重新进入 uploading
#[derive(Debug, Clone)]
pub struct PartStatus {
    /// 分片序号（从 1 开始）
    pub part_number: u32,
    /// 存储端摘要（去掉引号）
    pub digest: Option<String>,
    /// 分片大小
    pub byte_size: u64,
    /// 已尝试次数
    pub attempts: u32,
    /// 最近一次尝试时间
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// 当前状态
    pub state: PartState,
}

impl PartStatus {
    pub fn new(part_number: u32, byte_size: u64) -> Self {
        Self {
            part_number,
            digest: None,
            byte_size,
            attempts: 0,
            last_attempt_at: None,
            state: PartState::Pending,
        }
    }

    /// 开始一次尝试，`max_attempts` 为允许的总尝试次数
    ///
    /// 返回 false 表示状态不允许或次数已用尽
    pub fn begin_attempt(&mut self, max_attempts: u32) -> bool {
        let allowed = matches!(self.state, PartState::Pending | PartState::Error);
        if !allowed || self.attempts >= max_attempts {
            return false;
        }
        self.state = PartState::Uploading;
        self.attempts += 1;
        self.last_attempt_at = Some(Utc::now());
        true
    }

    /// 标记完成
    pub fn complete(&mut self, digest: Option<String>) -> bool {
        if self.state != PartState::Uploading {
            return false;
        }
        self.state = PartState::Completed;
        self.digest = digest;
        true
    }

    /// 标记失败
    pub fn fail(&mut self) -> bool {
        if self.state != PartState::Uploading {
            return false;
        }
        self.state = PartState::Error;
        true
    }
}

/// 文件数据来源
#[derive(Debug, Clone)]
pub enum FileSource {
    /// 本地文件
    Path(PathBuf),
    /// 内存数据
    Memory(Arc<Vec<u8>>),
}

/// 待上传文件
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub metadata: FileMetadata,
    pub source: FileSource,
}

impl UploadFile {
    /// 从本地文件创建，文件大小与 MIME 类型自动获取
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("无法读取文件信息: {:?}", path))?;
        if !meta.is_file() {
            anyhow::bail!("不是普通文件: {:?}", path);
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("文件名无效: {:?}", path))?
            .to_string();

        Ok(Self {
            metadata: FileMetadata::new(filename, meta.len(), guess_mime_type(path)),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// 从内存数据创建
    pub fn from_bytes(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        let size = data.len() as u64;
        Self {
            metadata: FileMetadata::new(filename, size, mime_type),
            source: FileSource::Memory(Arc::new(data)),
        }
    }

    /// 文件大小
    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    /// 读取指定范围的数据
    pub async fn read_range(&self, range: Range<u64>) -> Result<Vec<u8>> {
        if range.end > self.size() || range.start > range.end {
            anyhow::bail!(
                "读取范围越界: {}..{}, 文件大小={}",
                range.start,
                range.end,
                self.size()
            );
        }

        match &self.source {
            FileSource::Memory(data) => Ok(data[range.start as usize..range.end as usize].to_vec()),
            FileSource::Path(path) => {
                let mut file = File::open(path).await.context("打开上传文件失败")?;
                file.seek(SeekFrom::Start(range.start))
                    .await
                    .context("文件定位失败")?;

                let mut buffer = vec![0u8; (range.end - range.start) as usize];
                file.read_exact(&mut buffer)
                    .await
                    .context("读取分片数据失败")?;

                debug!(
                    "读取数据: {:?}, bytes={}..{}",
                    path, range.start, range.end
                );
                Ok(buffer)
            }
        }
    }

    /// 读取整个文件
    pub async fn read_all(&self) -> Result<Vec<u8>> {
        self.read_range(0..self.size()).await
    }
}

/// 根据扩展名推断 MIME 类型
pub fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
