//! 上传进度跟踪
//!
//! 以 upload_id 为键保存每个上传的进度，所有写入都经过同一个入口重新计算百分比与状态。
//! DashMap 的分片锁保证同一个键的写入串行化，不会出现丢失更新。

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;
use tracing::debug;

/// 事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// 上传状态（面向 UI）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Uploading,
    Completed,
    Error,
}

/// 单个上传的进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    /// 进度百分比 0..=100
    pub percent_complete: u8,
    /// 已完成分片数
    pub completed_part_count: u32,
    /// 分片总数
    pub total_parts: u32,
    /// 当前状态
    pub state: UploadState,
    /// 错误信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl UploadProgress {
    fn new(total_parts: u32) -> Self {
        Self {
            percent_complete: 0,
            completed_part_count: 0,
            total_parts,
            state: UploadState::Uploading,
            error_message: None,
        }
    }
}

/// 进度事件（推送给 UI）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// 开始跟踪
    Registered { upload_id: String, total_parts: u32 },
    /// 进度更新
    Progress {
        upload_id: String,
        percent_complete: u8,
        completed_part_count: u32,
        total_parts: u32,
    },
    /// 上传完成
    Completed { upload_id: String },
    /// 上传失败
    Failed { upload_id: String, error: String },
}

#[derive(Debug)]
struct ProgressEntry {
    progress: UploadProgress,
    /// 已计数的分片序号，保证同一分片只计一次
    completed_parts: HashSet<u32>,
}

impl ProgressEntry {
    fn new(total_parts: u32) -> Self {
        Self {
            progress: UploadProgress::new(total_parts),
            completed_parts: HashSet::new(),
        }
    }

    /// 重新计算百分比与状态
    ///
    /// 已进入 error 的上传不再接受更新；已完成分片数与百分比只增不减
    fn apply(&mut self, upload_id: &str, completed: u32, total: u32) -> Option<ProgressEvent> {
        let p = &mut self.progress;
        if p.state == UploadState::Error {
            return None;
        }

        p.total_parts = total;
        p.completed_part_count = p.completed_part_count.max(completed).min(total);

        let percent = if total == 0 {
            100
        } else {
            (p.completed_part_count as f64 / total as f64 * 100.0).round() as u8
        };
        p.percent_complete = p.percent_complete.max(percent.min(100));

        if p.completed_part_count == total {
            p.state = UploadState::Completed;
            p.percent_complete = 100;
            Some(ProgressEvent::Completed {
                upload_id: upload_id.to_string(),
            })
        } else {
            p.state = UploadState::Uploading;
            Some(ProgressEvent::Progress {
                upload_id: upload_id.to_string(),
                percent_complete: p.percent_complete,
                completed_part_count: p.completed_part_count,
                total_parts: total,
            })
        }
    }
}

/// 进度跟踪服务
///
/// 作为显式依赖注入到引擎各组件中，UI 侧只读
#[derive(Debug)]
pub struct ProgressTracker {
    entries: DashMap<String, ProgressEntry>,
    events: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: DashMap::new(),
            events,
        }
    }

    /// 订阅进度事件
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ProgressEvent) {
        // 没有订阅者时发送失败是正常情况
        let _ = self.events.send(event);
    }

    /// 开始跟踪一个上传（已存在时重置）
    pub fn register(&self, upload_id: &str, total_parts: u32) {
        self.entries
            .insert(upload_id.to_string(), ProgressEntry::new(total_parts));
        self.emit(ProgressEvent::Registered {
            upload_id: upload_id.to_string(),
            total_parts,
        });
    }

    /// 更新进度（唯一的计数写入入口）
    ///
    /// 返回更新后的进度；上传已失败时忽略并返回 None
    pub fn update_progress(
        &self,
        upload_id: &str,
        completed: u32,
        total: u32,
    ) -> Option<UploadProgress> {
        let (event, snapshot) = {
            let mut entry = self
                .entries
                .entry(upload_id.to_string())
                .or_insert_with(|| ProgressEntry::new(total));
            let event = entry.apply(upload_id, completed, total)?;
            (event, entry.progress.clone())
        };

        debug!(
            "进度更新: upload_id={}, {}/{} ({}%)",
            upload_id, snapshot.completed_part_count, snapshot.total_parts, snapshot.percent_complete
        );
        self.emit(event);
        Some(snapshot)
    }

    /// 记录一个分片完成，同一分片重复记录时不会重复计数
    ///
    /// 返回是否为首次计数
    pub fn mark_part_completed(&self, upload_id: &str, part_number: u32, total: u32) -> bool {
        let event = {
            let mut entry = self
                .entries
                .entry(upload_id.to_string())
                .or_insert_with(|| ProgressEntry::new(total));
            if entry.progress.state == UploadState::Error
                || !entry.completed_parts.insert(part_number)
            {
                return false;
            }
            let count = entry.completed_parts.len() as u32;
            entry.apply(upload_id, count, total)
        };

        if let Some(event) = event {
            self.emit(event);
        }
        true
    }

    /// 标记上传完成（100%）
    pub fn mark_completed(&self, upload_id: &str) {
        if let Some(mut entry) = self.entries.get_mut(upload_id) {
            let p = &mut entry.progress;
            p.completed_part_count = p.total_parts;
            p.percent_complete = 100;
            p.state = UploadState::Completed;
            p.error_message = None;
        } else {
            return;
        }
        self.emit(ProgressEvent::Completed {
            upload_id: upload_id.to_string(),
        });
    }

    /// 标记上传失败
    pub fn mark_error(&self, upload_id: &str, message: impl Into<String>) {
        let message = message.into();
        {
            let mut entry = self
                .entries
                .entry(upload_id.to_string())
                .or_insert_with(|| ProgressEntry::new(0));
            entry.progress.state = UploadState::Error;
            entry.progress.error_message = Some(message.clone());
        }
        self.emit(ProgressEvent::Failed {
            upload_id: upload_id.to_string(),
            error: message,
        });
    }

    /// 失败后重新进入上传状态（手动重试），保留已计数的分片
    pub fn rearm(&self, upload_id: &str) -> bool {
        let Some(mut entry) = self.entries.get_mut(upload_id) else {
            return false;
        };
        if entry.progress.state != UploadState::Error {
            return false;
        }
        entry.progress.state = UploadState::Uploading;
        entry.progress.error_message = None;
        true
    }

    /// 获取单个上传的进度
    pub fn get(&self, upload_id: &str) -> Option<UploadProgress> {
        self.entries.get(upload_id).map(|e| e.progress.clone())
    }

    /// 获取全部进度
    pub fn snapshot(&self) -> HashMap<String, UploadProgress> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.progress.clone()))
            .collect()
    }

    /// 批次结束后移除
    pub fn remove(&self, upload_id: &str) -> Option<UploadProgress> {
        self.entries.remove(upload_id).map(|(_, e)| e.progress)
    }
}
