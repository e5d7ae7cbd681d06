// 上传引擎模块
//
// - 分片划分与分片状态（chunk）
// - 单分片重试与批量补传（engine）
// - 完成校验（verifier）
// - 进度跟踪（progress）
// - 批次与取消控制（cancel）
// - 批量上传调度（manager）

pub mod cancel;
pub mod chunk;
pub mod engine;
pub mod error;
pub mod manager;
pub mod progress;
pub mod retry;
pub mod verifier;

#[cfg(test)]
pub(crate) mod mock;

pub use cancel::UploadBatch;
pub use chunk::{
    expected_part_count, guess_mime_type, should_chunk, split_parts, FileSource, PartRange,
    PartState, PartStatus, UploadFile, CHUNK_THRESHOLD, DEFAULT_PART_SIZE, MAX_CONCURRENT_UPLOADS,
};
pub use engine::FileUploadEngine;
pub use error::UploadError;
pub use manager::BatchUploader;
pub use progress::{ProgressEvent, ProgressTracker, UploadProgress, UploadState};
pub use retry::{sleep_or_cancel, RetryPolicy};
pub use verifier::CompletionVerifier;
