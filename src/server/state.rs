// 应用状态

use crate::backend::{SessionStatus, UploadSession};
use crate::config::AppConfig;
use crate::uploader::{BatchUploader, UploadBatch, UploadError, UploadFile, UploadProgress};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// 批次状态（面向 UI）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// 服务端保存的批次记录
pub struct BatchEntry {
    pub batch: Arc<UploadBatch>,
    pub channel_id: String,
    /// 与会话顺序一致
    pub files: Vec<UploadFile>,
    pub created_at: DateTime<Utc>,
    state: RwLock<BatchState>,
    error: RwLock<Option<String>>,
}

/// 批次详情
#[derive(Debug, Serialize)]
pub struct BatchView {
    pub batch_id: String,
    pub channel_id: String,
    pub state: BatchState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub files: Vec<String>,
    pub sessions: Vec<UploadSession>,
    pub progress: HashMap<String, UploadProgress>,
}

impl BatchEntry {
    pub fn new(batch: Arc<UploadBatch>, channel_id: String, files: Vec<UploadFile>) -> Self {
        Self {
            batch,
            channel_id,
            files,
            created_at: Utc::now(),
            state: RwLock::new(BatchState::Running),
            error: RwLock::new(None),
        }
    }

    pub fn state(&self) -> BatchState {
        *self.state.read()
    }

    pub fn set_running(&self) {
        *self.state.write() = BatchState::Running;
        *self.error.write() = None;
    }

    /// 记录批次运行结果
    pub fn finish(&self, result: Result<(), UploadError>) {
        let state = match &result {
            Ok(()) => BatchState::Completed,
            Err(e) if e.is_cancelled() => BatchState::Cancelled,
            Err(_) => BatchState::Failed,
        };
        *self.state.write() = state;
        *self.error.write() = result.err().map(|e| e.to_string());
    }

    /// 手动重试结束后，根据全部会话状态重新计算批次状态
    pub fn refresh_after_retry(&self, result: Result<(), UploadError>) {
        if self.batch.is_cancelled() {
            *self.state.write() = BatchState::Cancelled;
            return;
        }
        let all_completed = self
            .batch
            .sessions()
            .iter()
            .all(|s| s.status == SessionStatus::Completed);

        if all_completed {
            *self.state.write() = BatchState::Completed;
            *self.error.write() = None;
        } else {
            *self.state.write() = BatchState::Failed;
            if let Err(e) = result {
                *self.error.write() = Some(e.to_string());
            }
        }
    }

    /// 按会话找到对应的待上传文件
    pub fn file_for(&self, upload_id: &str) -> Option<&UploadFile> {
        let index = self
            .batch
            .sessions()
            .iter()
            .position(|s| s.upload_id == upload_id)?;
        self.files.get(index)
    }

    pub fn view(&self, progress: &crate::uploader::ProgressTracker) -> BatchView {
        let sessions = self.batch.sessions();
        let progress = sessions
            .iter()
            .filter_map(|s| progress.get(&s.upload_id).map(|p| (s.upload_id.clone(), p)))
            .collect();
        BatchView {
            batch_id: self.batch.id().to_string(),
            channel_id: self.channel_id.clone(),
            state: self.state(),
            error: self.error.read().clone(),
            created_at: self.created_at,
            files: self.files.iter().map(|f| f.metadata.filename.clone()).collect(),
            sessions,
            progress,
        }
    }
}

/// 应用全局状态
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Arc<AppConfig>,
    /// 批量上传管理器
    pub uploader: Arc<BatchUploader>,
    /// 批次记录
    pub batches: Arc<DashMap<String, Arc<BatchEntry>>>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let uploader = BatchUploader::from_config(&config)?;
        Ok(Self::with_uploader(config, uploader))
    }

    pub fn with_uploader(config: AppConfig, uploader: BatchUploader) -> Self {
        Self {
            config: Arc::new(config),
            uploader: Arc::new(uploader),
            batches: Arc::new(DashMap::new()),
        }
    }

    pub fn batch(&self, batch_id: &str) -> Option<Arc<BatchEntry>> {
        self.batches.get(batch_id).map(|e| e.value().clone())
    }

    /// 移除批次记录及其全部进度条目
    pub fn remove_batch(&self, batch_id: &str) -> Option<Arc<BatchEntry>> {
        let (_, entry) = self.batches.remove(batch_id)?;
        let progress = self.uploader.progress();
        for session in entry.batch.sessions() {
            progress.remove(&session.upload_id);
        }
        Some(entry)
    }

    /// 关闭时取消所有仍在运行的批次
    pub fn shutdown(&self) {
        for entry in self.batches.iter() {
            if entry.state() == BatchState::Running {
                entry.batch.cancel();
            }
        }
    }
}
