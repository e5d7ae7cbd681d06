// 测试用内存后端与内存存储
//
// 预签名地址格式: mem://{upload_id}/{part_number}[?附加参数]

use crate::backend::{
    BatchBackend, FileMetadata, PartRecord, PartStorage, PartVerification, ProgressReport,
    RetryPart, SessionStatus, UploadSession,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) fn part_url(upload_id: &str, part_number: u32) -> String {
    format!("mem://{}/{}", upload_id, part_number)
}

fn parse_url(url: &str) -> Result<(String, u32)> {
    let rest = url
        .strip_prefix("mem://")
        .ok_or_else(|| anyhow!("unexpected url: {}", url))?;
    let path = rest.split('?').next().unwrap_or(rest);
    let (id, n) = path
        .rsplit_once('/')
        .ok_or_else(|| anyhow!("unexpected url: {}", url))?;
    Ok((id.to_string(), n.parse()?))
}

#[derive(Default)]
struct BackendState {
    sessions: Vec<UploadSession>,
    totals: HashMap<String, u32>,
    stored: HashMap<String, BTreeSet<u32>>,
    records: Vec<(String, PartRecord)>,
    completes: Vec<String>,
    polls: HashMap<String, u32>,
    refreshes: Vec<(String, u32)>,
    bulk_retries: Vec<(String, Vec<u32>)>,
    verify_calls: usize,
    never_converge: HashSet<String>,
    init_error: Option<String>,
    calls: usize,
}

/// 内存后端
#[derive(Default)]
pub(crate) struct MockBackend {
    state: Mutex<BackendState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个 init_batch 将返回的会话
    pub fn add_session(&self, upload_id: &str, is_chunked: bool, total_parts: u32) -> UploadSession {
        let part_urls = (1..=total_parts.max(1))
            .map(|n| part_url(upload_id, n))
            .collect();
        let session = UploadSession {
            upload_id: upload_id.to_string(),
            is_chunked,
            part_urls,
            total_parts,
            status: SessionStatus::Initialized,
        };
        let mut state = self.state.lock();
        state.sessions.push(session.clone());
        state.totals.insert(upload_id.to_string(), total_parts);
        session
    }

    pub fn fail_init(&self, message: &str) {
        self.state.lock().init_error = Some(message.to_string());
    }

    /// 服务端永远不报告完成
    pub fn never_converge(&self, upload_id: &str) {
        self.state.lock().never_converge.insert(upload_id.to_string());
    }

    /// 直接标记服务端已持有某个分片
    pub fn force_complete(&self, upload_id: &str, part_number: u32) {
        self.state
            .lock()
            .stored
            .entry(upload_id.to_string())
            .or_default()
            .insert(part_number);
    }

    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    pub fn records_for(&self, upload_id: &str, part_number: u32) -> usize {
        self.state
            .lock()
            .records
            .iter()
            .filter(|(id, r)| id == upload_id && r.part_number == part_number)
            .count()
    }

    pub fn records(&self) -> Vec<(String, PartRecord)> {
        self.state.lock().records.clone()
    }

    pub fn complete_calls(&self, upload_id: &str) -> usize {
        self.state
            .lock()
            .completes
            .iter()
            .filter(|id| id.as_str() == upload_id)
            .count()
    }

    pub fn progress_polls(&self, upload_id: &str) -> u32 {
        self.state.lock().polls.get(upload_id).copied().unwrap_or(0)
    }

    pub fn refreshes(&self) -> Vec<(String, u32)> {
        self.state.lock().refreshes.clone()
    }

    pub fn bulk_retries(&self) -> Vec<(String, Vec<u32>)> {
        self.state.lock().bulk_retries.clone()
    }

    pub fn verify_calls(&self) -> usize {
        self.state.lock().verify_calls
    }

    fn total_of(state: &BackendState, upload_id: &str) -> Result<u32> {
        state
            .totals
            .get(upload_id)
            .copied()
            .ok_or_else(|| anyhow!("unknown upload: {}", upload_id))
    }
}

#[async_trait]
impl BatchBackend for MockBackend {
    async fn init_batch(
        &self,
        _channel_id: &str,
        _files: &[FileMetadata],
    ) -> Result<Vec<UploadSession>> {
        let mut state = self.state.lock();
        state.calls += 1;
        if let Some(message) = &state.init_error {
            bail!("{}", message);
        }
        Ok(state.sessions.clone())
    }

    async fn complete_upload(&self, upload_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.completes.push(upload_id.to_string());
        Ok(())
    }

    async fn get_progress(&self, upload_id: &str) -> Result<ProgressReport> {
        let mut state = self.state.lock();
        state.calls += 1;
        *state.polls.entry(upload_id.to_string()).or_default() += 1;

        let total = Self::total_of(&state, upload_id)?;
        let completed = state.stored.get(upload_id).map_or(0, |s| s.len() as u32);
        let converged = completed == total && !state.never_converge.contains(upload_id);
        Ok(ProgressReport {
            progress: if total == 0 { 100.0 } else { completed as f64 / total as f64 * 100.0 },
            completed_count: completed,
            total_parts: total,
            status: if converged {
                SessionStatus::Completed
            } else {
                SessionStatus::Uploading
            },
            error: None,
        })
    }

    async fn retry_failed_parts(&self, upload_id: &str) -> Result<Vec<RetryPart>> {
        let mut state = self.state.lock();
        state.calls += 1;
        let total = Self::total_of(&state, upload_id)?;
        let stored = state.stored.get(upload_id).cloned().unwrap_or_default();
        let outstanding: Vec<u32> = (1..=total).filter(|n| !stored.contains(n)).collect();
        state
            .bulk_retries
            .push((upload_id.to_string(), outstanding.clone()));
        Ok(outstanding
            .into_iter()
            .map(|n| RetryPart {
                part_index: n - 1,
                url: format!("{}?bulk", part_url(upload_id, n)),
            })
            .collect())
    }

    async fn refresh_part_url(&self, upload_id: &str, part_number: u32) -> Result<String> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.refreshes.push((upload_id.to_string(), part_number));
        Ok(format!(
            "{}?v={}",
            part_url(upload_id, part_number),
            state.refreshes.len()
        ))
    }

    async fn record_part(&self, upload_id: &str, record: &PartRecord) -> Result<()> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.records.push((upload_id.to_string(), record.clone()));
        state
            .stored
            .entry(upload_id.to_string())
            .or_default()
            .insert(record.part_number);
        Ok(())
    }

    async fn verify_parts(&self, upload_id: &str) -> Result<Vec<PartVerification>> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.verify_calls += 1;
        Ok(state
            .stored
            .get(upload_id)
            .map(|parts| {
                parts
                    .iter()
                    .map(|&n| PartVerification {
                        part_number: n,
                        digest: Some(format!("etag-{}-{}", upload_id, n)),
                        size: 0,
                        is_complete: true,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct StorageState {
    failures: HashMap<(String, u32), u32>,
    lost_acks: HashSet<(String, u32)>,
    puts: Vec<(String, usize)>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
    cancel_after: Option<(usize, CancellationToken)>,
}

/// 内存存储
pub(crate) struct MockStorage {
    backend: Arc<MockBackend>,
    latency: Duration,
    state: Mutex<StorageState>,
}

impl MockStorage {
    pub fn new(backend: Arc<MockBackend>) -> Self {
        Self {
            backend,
            latency: Duration::from_millis(10),
            state: Mutex::new(StorageState::default()),
        }
    }

    /// 指定分片的前 `times` 次写入失败
    pub fn fail_part(&self, upload_id: &str, part_number: u32, times: u32) {
        self.state
            .lock()
            .failures
            .insert((upload_id.to_string(), part_number), times);
    }

    /// 写入成功但响应丢失
    pub fn lose_ack(&self, upload_id: &str, part_number: u32) {
        self.state
            .lock()
            .lost_acks
            .insert((upload_id.to_string(), part_number));
    }

    /// 第 `count` 次写入开始时触发取消
    pub fn cancel_after_puts(&self, count: usize, token: CancellationToken) {
        self.state.lock().cancel_after = Some((count, token));
    }

    pub fn puts(&self) -> Vec<(String, usize)> {
        self.state.lock().puts.clone()
    }

    pub fn puts_for(&self, upload_id: &str, part_number: u32) -> usize {
        self.state
            .lock()
            .puts
            .iter()
            .filter(|(url, _)| {
                parse_url(url).map_or(false, |(id, n)| id == upload_id && n == part_number)
            })
            .count()
    }

    pub fn max_in_flight(&self, upload_id: &str) -> usize {
        self.state
            .lock()
            .max_in_flight
            .get(upload_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PartStorage for MockStorage {
    async fn put_part(&self, url: &str, data: Vec<u8>) -> Result<String> {
        let (upload_id, part_number) = parse_url(url)?;
        {
            let mut state = self.state.lock();
            state.puts.push((url.to_string(), data.len()));
            let current = {
                let entry = state.in_flight.entry(upload_id.clone()).or_default();
                *entry += 1;
                *entry
            };
            let max = state.max_in_flight.entry(upload_id.clone()).or_default();
            *max = (*max).max(current);

            let put_count = state.puts.len();
            if let Some((count, token)) = &state.cancel_after {
                if put_count >= *count {
                    token.cancel();
                }
            }
        }

        tokio::time::sleep(self.latency).await;

        let key = (upload_id.clone(), part_number);
        let mut state = self.state.lock();
        if let Some(n) = state.in_flight.get_mut(&upload_id) {
            *n -= 1;
        }
        if let Some(remaining) = state.failures.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                bail!("simulated write failure for part {}", part_number);
            }
        }
        if state.lost_acks.remove(&key) {
            self.backend.force_complete(&upload_id, part_number);
            bail!("connection reset after write");
        }
        Ok(format!("\"etag-{}-{}\"", upload_id, part_number))
    }
}
