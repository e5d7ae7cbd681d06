// 批量上传管理器
//
// 一次批量调用申请全部会话，随后各文件独立并发上传；
// 单个文件失败不影响同批次的其他文件，全部结束后返回第一个失败

use crate::backend::{
    BatchApiClient, BatchBackend, PartStorage, PresignedPutClient, SessionStatus, UploadSession,
};
use crate::config::{AppConfig, UploadConfig};
use crate::uploader::cancel::UploadBatch;
use crate::uploader::chunk::UploadFile;
use crate::uploader::engine::FileUploadEngine;
use crate::uploader::error::UploadError;
use crate::uploader::progress::ProgressTracker;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info};

/// 批量上传管理器
pub struct BatchUploader {
    backend: Arc<dyn BatchBackend>,
    progress: Arc<ProgressTracker>,
    engine: FileUploadEngine,
}

impl BatchUploader {
    /// 创建管理器
    ///
    /// # 参数
    /// * `backend` - 上传后端
    /// * `storage` - 分片存储
    /// * `progress` - 进度跟踪服务（与 UI 共享）
    /// * `config` - 上传参数
    pub fn new(
        backend: Arc<dyn BatchBackend>,
        storage: Arc<dyn PartStorage>,
        progress: Arc<ProgressTracker>,
        config: UploadConfig,
    ) -> Self {
        let engine = FileUploadEngine::new(backend.clone(), storage, progress.clone(), config);
        Self {
            backend,
            progress,
            engine,
        }
    }

    /// 从应用配置创建，使用 HTTP 后端与预签名地址直传
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        config.upload.validate()?;
        let backend = Arc::new(BatchApiClient::new(&config.backend)?);
        let storage = Arc::new(PresignedPutClient::new(config.backend.request_timeout())?);
        Ok(Self::new(
            backend,
            storage,
            Arc::new(ProgressTracker::new()),
            config.upload.clone(),
        ))
    }

    pub fn progress(&self) -> Arc<ProgressTracker> {
        self.progress.clone()
    }

    pub fn config(&self) -> &UploadConfig {
        self.engine.config()
    }

    /// 创建新批次（持有取消令牌）
    pub fn new_batch(&self) -> Arc<UploadBatch> {
        Arc::new(UploadBatch::new(self.progress.clone()))
    }

    /// 上传一批文件
    pub async fn upload_files(
        &self,
        channel_id: &str,
        files: &[UploadFile],
    ) -> Result<Vec<UploadSession>, UploadError> {
        let batch = self.new_batch();
        self.run_batch(&batch, channel_id, files).await
    }

    /// 在指定批次中上传文件
    ///
    /// 会话顺序与 `files` 一致；文件数量上限由调用方控制
    pub async fn run_batch(
        &self,
        batch: &UploadBatch,
        channel_id: &str,
        files: &[UploadFile],
    ) -> Result<Vec<UploadSession>, UploadError> {
        if files.is_empty() {
            return Err(UploadError::EmptyBatch);
        }
        if batch.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        info!(
            "开始批量上传: batch_id={}, channel_id={}, 文件数={}",
            batch.id(),
            channel_id,
            files.len()
        );

        let metadata: Vec<_> = files.iter().map(|f| f.metadata.clone()).collect();
        let sessions = self
            .backend
            .init_batch(channel_id, &metadata)
            .await
            .map_err(|e| {
                error!("申请上传会话失败: {:#}", e);
                UploadError::SessionInit(format!("{:#}", e))
            })?;

        if sessions.len() != files.len() {
            return Err(UploadError::SessionCountMismatch {
                expected: files.len(),
                actual: sessions.len(),
            });
        }
        batch.set_sessions(sessions.clone());

        let results = join_all(
            files
                .iter()
                .zip(sessions.iter())
                .map(|(file, session)| self.run_file(batch, file, session)),
        )
        .await;

        let mut first_error = None;
        let mut failed = 0;
        for (session, result) in sessions.iter().zip(results) {
            if let Err(e) = result {
                failed += 1;
                if first_error.is_none() {
                    first_error = Some(e.for_file(&session.upload_id));
                }
            }
        }

        info!(
            "批量上传结束: batch_id={}, 成功={}, 失败={}",
            batch.id(),
            files.len() - failed,
            failed
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(batch.sessions()),
        }
    }

    /// 手动重试一个失败的文件，沿用批次中已有的会话
    pub async fn retry_file(
        &self,
        batch: &UploadBatch,
        file: &UploadFile,
        upload_id: &str,
    ) -> Result<(), UploadError> {
        let session = batch
            .session(upload_id)
            .ok_or_else(|| UploadError::UnknownUpload(upload_id.to_string()))?;

        // 只有失败的文件可以重试
        if !self.progress.rearm(upload_id) {
            return Err(UploadError::NotRetryable(upload_id.to_string()));
        }
        batch.set_session_status(upload_id, SessionStatus::Uploading);

        let result = self.engine.retry_file(file, &session, batch.token()).await;
        self.settle(batch, &session, result)
    }

    async fn run_file(
        &self,
        batch: &UploadBatch,
        file: &UploadFile,
        session: &UploadSession,
    ) -> Result<(), UploadError> {
        batch.set_session_status(&session.upload_id, SessionStatus::Uploading);
        let result = self.engine.upload_file(file, session, batch.token()).await;
        self.settle(batch, session, result)
    }

    /// 根据结果同步会话状态与进度
    fn settle(
        &self,
        batch: &UploadBatch,
        session: &UploadSession,
        result: Result<(), UploadError>,
    ) -> Result<(), UploadError> {
        match result {
            Ok(()) => {
                batch.set_session_status(&session.upload_id, SessionStatus::Completed);
                Ok(())
            }
            Err(e) => {
                error!("文件上传失败: upload_id={}, 错误: {}", session.upload_id, e);
                self.progress.mark_error(&session.upload_id, e.to_string());
                batch.set_session_status(&session.upload_id, SessionStatus::Error);
                Err(e)
            }
        }
    }
}
