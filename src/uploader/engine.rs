// 单文件上传引擎
//
// 上传流程：
// 1. 非分片：整体 PUT 到 part_urls[0]，进度 0 → 100，随后确认完成
// 2. 分片：本地划分分片并与会话的 totalParts 比对
// 3. 按每轮最多 3 个分片并发上传，单个分片失败时先在本地重试
// 4. 本地重试耗尽的分片在所有轮次结束后走批量补传
// 5. 等待服务端收敛后进行完成校验，校验通过才确认完成

use crate::backend::{normalize_etag, BatchBackend, PartRecord, PartStorage, UploadSession};
use crate::config::UploadConfig;
use crate::uploader::chunk::{should_chunk, split_parts, PartRange, PartStatus, UploadFile};
use crate::uploader::error::UploadError;
use crate::uploader::progress::ProgressTracker;
use crate::uploader::retry::sleep_or_cancel;
use crate::uploader::verifier::CompletionVerifier;
use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 取消后不再发起新的网络请求
fn ensure_active(cancel: &CancellationToken) -> Result<(), UploadError> {
    if cancel.is_cancelled() {
        Err(UploadError::Cancelled)
    } else {
        Ok(())
    }
}

/// 单文件上传引擎
pub struct FileUploadEngine {
    backend: Arc<dyn BatchBackend>,
    storage: Arc<dyn PartStorage>,
    progress: Arc<ProgressTracker>,
    verifier: CompletionVerifier,
    config: UploadConfig,
}

impl FileUploadEngine {
    pub fn new(
        backend: Arc<dyn BatchBackend>,
        storage: Arc<dyn PartStorage>,
        progress: Arc<ProgressTracker>,
        config: UploadConfig,
    ) -> Self {
        let verifier = CompletionVerifier::new(backend.clone(), config.verify_policy());
        Self {
            backend,
            storage,
            progress,
            verifier,
            config,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// 按会话上传一个文件
    ///
    /// 分片与否完全以会话的 `is_chunked` 为准，客户端阈值判断只用于记录不一致
    pub async fn upload_file(
        &self,
        file: &UploadFile,
        session: &UploadSession,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        ensure_active(cancel)?;

        let expected_chunked = should_chunk(file.size(), self.config.chunk_threshold);
        if expected_chunked != session.is_chunked {
            warn!(
                "客户端与服务端分片判断不一致，以服务端为准: upload_id={}, size={}, 客户端={}, 服务端={}",
                session.upload_id,
                file.size(),
                expected_chunked,
                session.is_chunked
            );
        }

        info!(
            "开始上传文件: {} (upload_id={}, size={}, chunked={})",
            file.metadata.filename,
            session.upload_id,
            file.size(),
            session.is_chunked
        );

        if session.is_chunked {
            self.upload_chunked(file, session, cancel).await
        } else {
            self.upload_whole(file, session, cancel).await
        }
    }

    /// 整体上传（非分片）
    async fn upload_whole(
        &self,
        file: &UploadFile,
        session: &UploadSession,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let upload_id = session.upload_id.as_str();
        let url = session
            .part_urls
            .first()
            .ok_or_else(|| UploadError::MissingPartUrl {
                upload_id: upload_id.to_string(),
                part_number: 1,
            })?;

        self.progress.register(upload_id, 1);

        ensure_active(cancel)?;
        self.storage
            .put_file(url, file)
            .await
            .map_err(|e| UploadError::PartUpload {
                upload_id: upload_id.to_string(),
                part_number: 1,
                attempts: 1,
                message: format!("{:#}", e),
            })?;
        ensure_active(cancel)?;

        self.progress.update_progress(upload_id, 1, 1);
        self.complete(upload_id, cancel).await?;

        info!("文件上传完成: {} (upload_id={})", file.metadata.filename, upload_id);
        Ok(())
    }

    /// 分片上传
    async fn upload_chunked(
        &self,
        file: &UploadFile,
        session: &UploadSession,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let upload_id = session.upload_id.as_str();
        let total = session.total_parts;
        let parts = split_parts(file.size(), self.config.part_size);

        if parts.len() as u32 != total {
            error!(
                "分片数量不一致: upload_id={}, 本地={}, 会话={}",
                upload_id,
                parts.len(),
                total
            );
            return Err(UploadError::ChunkCountMismatch {
                upload_id: upload_id.to_string(),
                expected: total,
                actual: parts.len() as u32,
            });
        }
        if session.part_urls.len() < parts.len() {
            return Err(UploadError::MissingPartUrl {
                upload_id: upload_id.to_string(),
                part_number: session.part_urls.len() as u32 + 1,
            });
        }

        self.progress.register(upload_id, total);

        let wave_size = self.config.max_concurrent_parts.max(1);
        let mut failed_parts = Vec::new();

        for (wave_index, wave) in parts.chunks(wave_size).enumerate() {
            ensure_active(cancel)?;
            debug!(
                "开始第 {} 轮分片上传: upload_id={}, 分片数={}",
                wave_index + 1,
                upload_id,
                wave.len()
            );

            let results = join_all(wave.iter().map(|part| {
                let url = session.part_urls[part.index].clone();
                self.upload_part(file, upload_id, part, url, total, cancel)
            }))
            .await;

            for (part, result) in wave.iter().zip(results) {
                match result {
                    Ok(()) => {}
                    Err(UploadError::Cancelled) => return Err(UploadError::Cancelled),
                    Err(e) => {
                        warn!("分片本地重试已耗尽，等待批量补传: {}", e);
                        failed_parts.push(part.part_number());
                    }
                }
            }
        }

        if !failed_parts.is_empty() {
            warn!(
                "上传轮次结束，存在失败分片: upload_id={}, 分片={:?}",
                upload_id, failed_parts
            );
            self.retry_failed_parts(file, upload_id, total, cancel)
                .await?;
        }

        self.finalize(upload_id, total, cancel).await?;
        info!(
            "文件上传完成: {} (upload_id={}, 分片数={})",
            file.metadata.filename, upload_id, total
        );
        Ok(())
    }

    /// 上传单个分片（带本地重试）
    ///
    /// 每次失败后：若服务端已持有该分片则视为成功；否则重新获取上传地址，
    /// 固定等待后重试，重试次数耗尽后返回 `PartUpload`
    pub async fn upload_part(
        &self,
        file: &UploadFile,
        upload_id: &str,
        part: &PartRange,
        url: String,
        total_parts: u32,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let policy = self.config.part_retry_policy();
        let part_number = part.part_number();
        let mut status = PartStatus::new(part_number, part.size());

        let data = file
            .read_range(part.range.clone())
            .await
            .map_err(|e| UploadError::FileRead(format!("{:#}", e)))?;

        let mut url = url;
        let mut retries_left = policy.max_attempts;

        loop {
            ensure_active(cancel)?;
            if !status.begin_attempt(policy.max_attempts + 1) {
                return Err(UploadError::PartUpload {
                    upload_id: upload_id.to_string(),
                    part_number,
                    attempts: status.attempts,
                    message: "分片状态不允许再次尝试".to_string(),
                });
            }

            let error = match self
                .try_upload_part(upload_id, part_number, &url, data.clone(), cancel)
                .await
            {
                Ok(digest) => {
                    status.complete(Some(digest));
                    self.progress
                        .mark_part_completed(upload_id, part_number, total_parts);
                    debug!(
                        "分片上传成功: upload_id={}, part={}, 尝试次数={}",
                        upload_id, part_number, status.attempts
                    );
                    return Ok(());
                }
                Err(e) => e,
            };

            status.fail();
            ensure_active(cancel)?;

            if retries_left == 0 {
                return Err(UploadError::PartUpload {
                    upload_id: upload_id.to_string(),
                    part_number,
                    attempts: status.attempts,
                    message: format!("{:#}", error),
                });
            }
            retries_left -= 1;

            warn!(
                "分片上传失败: upload_id={}, part={}, 第 {} 次尝试, 剩余重试 {} 次, 错误: {:#}",
                upload_id, part_number, status.attempts, retries_left, error
            );

            // 写入可能已成功，只是记录前失败
            if self.confirmed_by_backend(upload_id, part_number).await {
                info!(
                    "服务端已持有该分片，视为成功: upload_id={}, part={}",
                    upload_id, part_number
                );
                self.progress
                    .mark_part_completed(upload_id, part_number, total_parts);
                return Ok(());
            }

            ensure_active(cancel)?;
            match self.backend.refresh_part_url(upload_id, part_number).await {
                Ok(fresh) => url = fresh,
                Err(e) => warn!(
                    "重新获取分片地址失败，沿用原地址: upload_id={}, part={}, 错误: {:#}",
                    upload_id, part_number, e
                ),
            }

            let delay = policy.delay_for(status.attempts - 1);
            if !sleep_or_cancel(delay, cancel).await {
                return Err(UploadError::Cancelled);
            }
        }
    }

    /// 单次尝试：写入存储并向后端记录
    async fn try_upload_part(
        &self,
        upload_id: &str,
        part_number: u32,
        url: &str,
        data: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let size = data.len() as u64;
        let etag = self.storage.put_part(url, data).await?;
        let digest = normalize_etag(&etag);

        if cancel.is_cancelled() {
            anyhow::bail!("上传已取消，丢弃分片结果");
        }

        let record = PartRecord {
            part_number,
            digest: digest.clone(),
            size,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.backend.record_part(upload_id, &record).await?;
        Ok(digest)
    }

    /// 查询服务端是否已记录该分片
    async fn confirmed_by_backend(&self, upload_id: &str, part_number: u32) -> bool {
        match self.backend.verify_parts(upload_id).await {
            Ok(parts) => parts
                .iter()
                .any(|p| p.part_number == part_number && p.is_complete),
            Err(e) => {
                warn!("查询服务端分片状态失败: upload_id={}, 错误: {:#}", upload_id, e);
                false
            }
        }
    }

    /// 批量补传服务端仍缺失的分片
    ///
    /// 以服务端返回的列表为准重新切片，补传失败不再兜底
    pub async fn retry_failed_parts(
        &self,
        file: &UploadFile,
        upload_id: &str,
        total_parts: u32,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        ensure_active(cancel)?;

        let outstanding = self
            .backend
            .retry_failed_parts(upload_id)
            .await
            .map_err(|e| UploadError::BulkRetry {
                upload_id: upload_id.to_string(),
                message: format!("{:#}", e),
            })?;

        info!(
            "批量补传: upload_id={}, 待补传分片={:?}",
            upload_id,
            outstanding.iter().map(|p| p.part_number()).collect::<Vec<_>>()
        );

        let parts = split_parts(file.size(), self.config.part_size);
        let mut jobs = Vec::with_capacity(outstanding.len());
        for retry in outstanding {
            let part = parts
                .get(retry.part_index as usize)
                .cloned()
                .ok_or_else(|| UploadError::BulkRetry {
                    upload_id: upload_id.to_string(),
                    message: format!(
                        "part index {} out of range ({} parts)",
                        retry.part_index,
                        parts.len()
                    ),
                })?;
            jobs.push((part, retry.url));
        }

        for wave in jobs.chunks(self.config.max_concurrent_parts.max(1)) {
            ensure_active(cancel)?;
            let results = join_all(wave.iter().map(|(part, url)| {
                self.upload_part(file, upload_id, part, url.clone(), total_parts, cancel)
            }))
            .await;

            for result in results {
                match result {
                    Ok(()) => {}
                    Err(UploadError::Cancelled) => return Err(UploadError::Cancelled),
                    Err(e) => {
                        error!("批量补传失败: upload_id={}, 错误: {}", upload_id, e);
                        return Err(UploadError::BulkRetry {
                            upload_id: upload_id.to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// 手动重试：沿用已有会话，只补传服务端缺失的分片
    pub async fn retry_file(
        &self,
        file: &UploadFile,
        session: &UploadSession,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        ensure_active(cancel)?;
        info!("手动重试上传: upload_id={}", session.upload_id);

        if !session.is_chunked {
            return self.upload_whole(file, session, cancel).await;
        }

        self.retry_failed_parts(file, &session.upload_id, session.total_parts, cancel)
            .await?;
        self.finalize(&session.upload_id, session.total_parts, cancel)
            .await
    }

    /// 等待服务端收敛，校验通过后确认完成
    async fn finalize(
        &self,
        upload_id: &str,
        total_parts: u32,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        if !sleep_or_cancel(self.config.settle_delay(), cancel).await {
            return Err(UploadError::Cancelled);
        }

        if !self.verifier.verify(upload_id, total_parts, cancel).await? {
            error!("服务端未确认全部分片: upload_id={}", upload_id);
            return Err(UploadError::VerificationTimeout {
                upload_id: upload_id.to_string(),
            });
        }

        self.complete(upload_id, cancel).await
    }

    async fn complete(&self, upload_id: &str, cancel: &CancellationToken) -> Result<(), UploadError> {
        ensure_active(cancel)?;
        self.backend
            .complete_upload(upload_id)
            .await
            .map_err(|e| UploadError::Completion {
                upload_id: upload_id.to_string(),
                message: format!("{:#}", e),
            })?;
        self.progress.mark_completed(upload_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploader::mock::{MockBackend, MockStorage};
    use crate::uploader::progress::UploadState;

    const PART: u64 = 1024;

    fn test_config() -> UploadConfig {
        UploadConfig {
            part_size: PART,
            chunk_threshold: 150 * PART,
            ..UploadConfig::default()
        }
    }

    struct Harness {
        backend: Arc<MockBackend>,
        storage: Arc<MockStorage>,
        progress: Arc<ProgressTracker>,
        engine: FileUploadEngine,
    }

    fn harness() -> Harness {
        let backend = Arc::new(MockBackend::new());
        let storage = Arc::new(MockStorage::new(backend.clone()));
        let progress = Arc::new(ProgressTracker::new());
        let engine = FileUploadEngine::new(
            backend.clone(),
            storage.clone(),
            progress.clone(),
            test_config(),
        );
        Harness {
            backend,
            storage,
            progress,
            engine,
        }
    }

    fn file_of(size: u64) -> UploadFile {
        UploadFile::from_bytes("video.mp4", "video/mp4", vec![7u8; size as usize])
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_shot_upload() {
        let h = harness();
        let session = h.backend.add_session("up-1", false, 1);
        let file = file_of(10 * PART);

        let mut rx = h.progress.subscribe();
        h.engine
            .upload_file(&file, &session, &CancellationToken::new())
            .await
            .unwrap();

        let puts = h.storage.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].1 as u64, 10 * PART);
        assert_eq!(h.backend.complete_calls("up-1"), 1);

        assert!(matches!(
            rx.recv().await.unwrap(),
            crate::uploader::ProgressEvent::Registered { .. }
        ));
        let p = h.progress.get("up-1").unwrap();
        assert_eq!(p.percent_complete, 100);
        assert_eq!(p.state, UploadState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunked_upload_all_parts_succeed() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 40);
        let file = file_of(200 * PART / 5);

        h.engine
            .upload_file(&file, &session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(h.storage.puts().len(), 40);
        assert_eq!(h.backend.records().len(), 40);
        assert!(h.storage.max_in_flight("up-1") <= 3);
        assert_eq!(h.storage.max_in_flight("up-1"), 3);
        assert_eq!(h.backend.progress_polls("up-1"), 1);
        assert_eq!(h.backend.complete_calls("up-1"), 1);
        assert!(h.backend.bulk_retries().is_empty());

        let p = h.progress.get("up-1").unwrap();
        assert_eq!(p.completed_part_count, 40);
        assert_eq!(p.state, UploadState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_carry_unquoted_digest() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 2);
        h.engine
            .upload_file(&file_of(2 * PART), &session, &CancellationToken::new())
            .await
            .unwrap();

        let records = h.backend.records();
        assert!(records.iter().all(|(_, r)| !r.digest.contains('"')));
        assert!(records.iter().all(|(_, r)| r.size == PART && r.timestamp > 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_part_failure_recovers() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 40);
        h.storage.fail_part("up-1", 7, 2);

        h.engine
            .upload_file(&file_of(40 * PART), &session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(h.storage.puts_for("up-1", 7), 3);
        assert_eq!(h.backend.records_for("up-1", 7), 1);
        // 每次重试都使用新地址
        let refreshed: Vec<_> = h
            .backend
            .refreshes()
            .into_iter()
            .filter(|(_, n)| *n == 7)
            .collect();
        assert_eq!(refreshed.len(), 2);
        assert!(h.backend.bulk_retries().is_empty());

        let p = h.progress.get("up-1").unwrap();
        assert_eq!(p.completed_part_count, 40);
        assert_eq!(p.state, UploadState::Completed);
        assert_eq!(h.backend.complete_calls("up-1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_parts_go_through_bulk_retry() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 40);
        // 1 次初始尝试 + 3 次重试全部失败
        h.storage.fail_part("up-1", 3, 4);
        h.storage.fail_part("up-1", 19, 4);

        h.engine
            .upload_file(&file_of(40 * PART), &session, &CancellationToken::new())
            .await
            .unwrap();

        let bulk = h.backend.bulk_retries();
        assert_eq!(bulk.len(), 1);
        assert_eq!(bulk[0].1, vec![3, 19]);
        assert_eq!(h.storage.puts_for("up-1", 3), 5);
        assert_eq!(h.storage.puts_for("up-1", 19), 5);
        assert_eq!(h.backend.records_for("up-1", 3), 1);
        assert_eq!(h.progress.get("up-1").unwrap().state, UploadState::Completed);
        assert_eq!(h.backend.complete_calls("up-1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_retry_failure_is_fatal() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 4);
        h.storage.fail_part("up-1", 2, 100);

        let err = h
            .engine
            .upload_file(&file_of(4 * PART), &session, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::BulkRetry { .. }));
        assert_eq!(h.backend.bulk_retries().len(), 1);
        // 初始 4 次 + 补传 4 次
        assert_eq!(h.storage.puts_for("up-1", 2), 8);
        assert_eq!(h.backend.complete_calls("up-1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_part_attempts_stop_at_ceiling() {
        let h = harness();
        h.backend.add_session("up-1", true, 4);
        h.storage.fail_part("up-1", 2, 100);
        let parts = split_parts(4 * PART, PART);

        let err = h
            .engine
            .upload_part(
                &file_of(4 * PART),
                "up-1",
                &parts[1],
                "mem://up-1/2".to_string(),
                4,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            UploadError::PartUpload {
                part_number,
                attempts,
                ..
            } => {
                assert_eq!(part_number, 2);
                assert_eq!(attempts, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(h.storage.puts_for("up-1", 2), 4);
        assert_eq!(h.backend.records_for("up-1", 2), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_written_but_unrecorded_part_is_not_retried() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 3);
        h.storage.lose_ack("up-1", 2);

        h.engine
            .upload_file(&file_of(3 * PART), &session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(h.storage.puts_for("up-1", 2), 1);
        assert_eq!(h.backend.verify_calls(), 1);
        assert!(h.backend.refreshes().is_empty());
        assert_eq!(h.progress.get("up-1").unwrap().completed_part_count, 3);
        assert_eq!(h.backend.complete_calls("up-1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_never_converges() {
        let h = harness();
        let session = h.backend.add_session("up-77", true, 4);
        h.backend.never_converge("up-77");

        let err = h
            .engine
            .upload_file(&file_of(4 * PART), &session, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::VerificationTimeout { .. }));
        assert!(err.to_string().contains("up-77"));
        assert_eq!(h.backend.progress_polls("up-77"), 3);
        assert_eq!(h.backend.complete_calls("up-77"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_count_mismatch_before_any_put() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 5);

        let err = h
            .engine
            .upload_file(&file_of(40 * PART), &session, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            UploadError::ChunkCountMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 40);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.storage.puts().is_empty());
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_decision_wins_over_threshold() {
        let h = harness();
        // 低于阈值但服务端要求分片
        let session = h.backend.add_session("up-1", true, 3);
        h.engine
            .upload_file(&file_of(3 * PART), &session, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(h.storage.puts().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_network_calls() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 40);
        let cancel = CancellationToken::new();
        h.storage.cancel_after_puts(5, cancel.clone());

        let err = h
            .engine
            .upload_file(&file_of(40 * PART), &session, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());

        let puts = h.storage.puts().len();
        let calls = h.backend.calls();
        assert!(puts <= 6);
        assert_eq!(h.backend.complete_calls("up-1"), 0);

        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert_eq!(h.storage.puts().len(), puts);
        assert_eq!(h.backend.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_file_uploads_only_missing_parts() {
        let h = harness();
        let session = h.backend.add_session("up-1", true, 6);
        h.backend.force_complete("up-1", 1);
        h.backend.force_complete("up-1", 2);
        h.backend.force_complete("up-1", 3);
        h.progress.register("up-1", 6);

        h.engine
            .retry_file(&file_of(6 * PART), &session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(h.storage.puts().len(), 3);
        assert_eq!(h.backend.bulk_retries()[0].1, vec![4, 5, 6]);
        assert_eq!(h.backend.complete_calls("up-1"), 1);
        assert_eq!(h.progress.get("up-1").unwrap().state, UploadState::Completed);
    }
}
