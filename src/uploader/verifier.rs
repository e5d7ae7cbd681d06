// 完成校验
//
// 所有分片都被单独确认之后，后端合并分片仍可能滞后，
// 因此在最终确认前轮询服务端进度，直到服务端报告全部分片完成

use crate::backend::BatchBackend;
use crate::uploader::error::UploadError;
use crate::uploader::retry::{sleep_or_cancel, RetryPolicy};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 完成校验器
pub struct CompletionVerifier {
    backend: Arc<dyn BatchBackend>,
    policy: RetryPolicy,
}

impl CompletionVerifier {
    pub fn new(backend: Arc<dyn BatchBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 轮询服务端进度
    ///
    /// 服务端报告 `completedCount == total_parts` 且状态为 completed 时返回 true；
    /// 所有轮次用尽仍未满足时返回 false，由调用方决定是否致命。
    /// 两轮之间等待 `base_delay * multiplier^round`（默认 2s、4s），最后一轮后不再等待。
    pub async fn verify(
        &self,
        upload_id: &str,
        total_parts: u32,
        cancel: &CancellationToken,
    ) -> Result<bool, UploadError> {
        for round in 0..self.policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            match self.backend.get_progress(upload_id).await {
                Ok(report) if report.is_fully_completed(total_parts) => {
                    info!(
                        "服务端已确认全部分片: upload_id={}, 第 {} 轮",
                        upload_id,
                        round + 1
                    );
                    return Ok(true);
                }
                Ok(report) => {
                    debug!(
                        "服务端尚未完成合并: upload_id={}, {}/{}, status={:?}",
                        upload_id, report.completed_count, total_parts, report.status
                    );
                }
                Err(e) => {
                    warn!("查询上传进度失败: upload_id={}, 错误: {:#}", upload_id, e);
                }
            }

            if round + 1 == self.policy.max_attempts {
                break;
            }

            let delay = self.policy.delay_for(round);
            debug!("等待 {:?} 后重新校验: upload_id={}", delay, upload_id);
            if !sleep_or_cancel(delay, cancel).await {
                return Err(UploadError::Cancelled);
            }
        }

        warn!(
            "完成校验失败，已轮询 {} 轮: upload_id={}",
            self.policy.max_attempts, upload_id
        );
        Ok(false)
    }
}
