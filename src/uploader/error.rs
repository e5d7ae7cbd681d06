//! 上传引擎错误类型

/// 上传过程中的错误
///
/// 分片级错误在本地重试与批量补传中被吸收，只有耗尽恢复手段后才会上抛为文件级错误
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no files to upload")]
    EmptyBatch,

    #[error("failed to initialise upload sessions: {0}")]
    SessionInit(String),

    #[error("backend returned {actual} sessions for {expected} files")]
    SessionCountMismatch { expected: usize, actual: usize },

    #[error("upload {upload_id}: local split produced {actual} parts but session expects {expected}")]
    ChunkCountMismatch {
        upload_id: String,
        expected: u32,
        actual: u32,
    },

    #[error("upload {upload_id}: no upload url for part {part_number}")]
    MissingPartUrl { upload_id: String, part_number: u32 },

    #[error("failed to read file data: {0}")]
    FileRead(String),

    #[error("upload {upload_id}: part {part_number} failed after {attempts} attempts: {message}")]
    PartUpload {
        upload_id: String,
        part_number: u32,
        attempts: u32,
        message: String,
    },

    #[error("upload {upload_id}: retrying failed parts did not succeed: {message}")]
    BulkRetry { upload_id: String, message: String },

    #[error("upload {upload_id}: backend did not confirm completion")]
    VerificationTimeout { upload_id: String },

    #[error("upload {upload_id}: failed to finalize: {message}")]
    Completion { upload_id: String, message: String },

    #[error("unknown upload: {0}")]
    UnknownUpload(String),

    #[error("upload {0} is not in a failed state")]
    NotRetryable(String),

    #[error("Upload cancelled")]
    Cancelled,

    #[error("upload {upload_id} failed: {source}")]
    UploadFailed {
        upload_id: String,
        #[source]
        source: Box<UploadError>,
    },
}

impl UploadError {
    /// 是否由用户取消引起
    pub fn is_cancelled(&self) -> bool {
        match self {
            UploadError::Cancelled => true,
            UploadError::UploadFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// 包装为文件级错误
    pub fn for_file(self, upload_id: &str) -> Self {
        match self {
            UploadError::UploadFailed { .. } => self,
            other => UploadError::UploadFailed {
                upload_id: upload_id.to_string(),
                source: Box::new(other),
            },
        }
    }
}
