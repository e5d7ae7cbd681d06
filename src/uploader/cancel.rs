// 批次句柄与取消控制
//
// 每次 upload_files 调用创建一个批次，持有取消令牌与后端签发的会话；
// 取消后不再发起新的网络请求，正在进行的请求结果被丢弃。

use crate::backend::{SessionStatus, UploadSession};
use crate::uploader::error::UploadError;
use crate::uploader::progress::{ProgressTracker, UploadState};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// 上传批次
pub struct UploadBatch {
    id: String,
    token: CancellationToken,
    cancelled: AtomicBool,
    progress: Arc<ProgressTracker>,
    sessions: RwLock<Vec<UploadSession>>,
}

impl UploadBatch {
    pub fn new(progress: Arc<ProgressTracker>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token: CancellationToken::new(),
            cancelled: AtomicBool::new(false),
            progress,
            sessions: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 批次的取消令牌，传递给所有网络操作
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 取消批次
    ///
    /// 所有未完成的上传进入 error 状态，错误信息为 "Upload cancelled"。
    /// 重复取消不产生任何效果，返回 false
    pub fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();

        let message = UploadError::Cancelled.to_string();
        let mut sessions = self.sessions.write();
        let mut affected = 0;
        for session in sessions.iter_mut() {
            let finished = self
                .progress
                .get(&session.upload_id)
                .map_or(false, |p| p.state == UploadState::Completed);
            if finished {
                continue;
            }
            self.progress.mark_error(&session.upload_id, message.as_str());
            session.status = SessionStatus::Error;
            affected += 1;
        }

        info!("批次已取消: batch_id={}, 受影响的上传数={}", self.id, affected);
        true
    }

    /// 保存后端签发的会话
    pub fn set_sessions(&self, sessions: Vec<UploadSession>) {
        *self.sessions.write() = sessions;
    }

    pub fn sessions(&self) -> Vec<UploadSession> {
        self.sessions.read().clone()
    }

    pub fn session(&self, upload_id: &str) -> Option<UploadSession> {
        self.sessions
            .read()
            .iter()
            .find(|s| s.upload_id == upload_id)
            .cloned()
    }

    /// 同步本地会话状态
    pub fn set_session_status(&self, upload_id: &str, status: SessionStatus) {
        if let Some(session) = self
            .sessions
            .write()
            .iter_mut()
            .find(|s| s.upload_id == upload_id)
        {
            session.status = status;
        }
    }
}
