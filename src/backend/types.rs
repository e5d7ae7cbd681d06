// 后端接口数据类型
//
// 所有 JSON 字段使用 camelCase，与后端约定一致

use serde::{Deserialize, Serialize};

/// 待上传文件的描述信息（会话创建之前）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// 文件名
    pub filename: String,
    /// 文件大小（字节）
    pub size: u64,
    /// MIME 类型
    pub mime_type: String,
}

impl FileMetadata {
    pub fn new(filename: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            size,
            mime_type: mime_type.into(),
        }
    }
}

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Initialized,
    Uploading,
    Completed,
    Error,
}

/// 上传会话（由后端签发）
///
/// 除 `status` 外不可变，`status` 由本地按后端状态同步
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// 上传 ID（不透明字符串）
    pub upload_id: String,
    /// 是否分片上传
    pub is_chunked: bool,
    /// 每个分片一个预签名地址；非分片上传时第一个地址用于整体上传
    #[serde(default)]
    pub part_urls: Vec<String>,
    /// 分片总数
    pub total_parts: u32,
    /// 会话状态
    pub status: SessionStatus,
}

/// 批量初始化请求
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitBatchRequest<'a> {
    pub channel_id: &'a str,
    pub files: &'a [FileMetadata],
}

/// 服务端进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    /// 进度百分比
    #[serde(default)]
    pub progress: f64,
    /// 已完成分片数
    pub completed_count: u32,
    /// 分片总数
    pub total_parts: u32,
    /// 上传状态
    pub status: SessionStatus,
    /// 错误信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressReport {
    /// 服务端是否已确认全部分片
    pub fn is_fully_completed(&self, total_parts: u32) -> bool {
        self.completed_count == total_parts && self.status == SessionStatus::Completed
    }
}

/// 批量重签返回的待补传分片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPart {
    /// 分片索引（从 0 开始，对应字节范围序号）
    pub part_index: u32,
    /// 新的预签名地址
    pub url: String,
}

impl RetryPart {
    /// 分片序号（从 1 开始）
    pub fn part_number(&self) -> u32 {
        self.part_index + 1
    }
}

/// 单分片重签响应
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUrlResponse {
    pub presigned_url: String,
}

/// 分片完成记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRecord {
    /// 分片序号（从 1 开始）
    pub part_number: u32,
    /// 分片摘要（已去掉引号）
    pub digest: String,
    /// 分片大小（字节）
    pub size: u64,
    /// 客户端时间戳（毫秒）
    pub timestamp: i64,
}

/// 服务端逐分片校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartVerification {
    pub part_number: u32,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub is_complete: bool,
}

/// 去掉 ETag 两侧的引号
///
/// 存储端返回的 ETag 形如 `"a54357aff0632cce46d942af68356b38"`
pub fn normalize_etag(etag: &str) -> String {
    let trimmed = etag.trim();
    let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    trimmed.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_etag() {
        assert_eq!(normalize_etag("\"abc123\""), "abc123");
        assert_eq!(normalize_etag("abc123"), "abc123");
        assert_eq!(normalize_etag(" \"abc\" "), "abc");
        assert_eq!(normalize_etag("W/\"weak\""), "weak");
    }

    #[test]
    fn test_session_deserialize() {
        let json = r#"{
            "uploadId": "up-1",
            "isChunked": true,
            "partUrls": ["https://s/1", "https://s/2"],
            "totalParts": 2,
            "status": "initialized"
        }"#;
        let session: UploadSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.upload_id, "up-1");
        assert!(session.is_chunked);
        assert_eq!(session.part_urls.len(), 2);
        assert_eq!(session.status, SessionStatus::Initialized);
    }

    #[test]
    fn test_file_metadata_serialize() {
        let meta = FileMetadata::new("a.mp4", 10, "video/mp4");
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["mimeType"], "video/mp4");
        assert_eq!(value["filename"], "a.mp4");
    }

    #[test]
    fn test_progress_report_completion() {
        let json = r#"{"progress": 100, "completedCount": 4, "totalParts": 4, "status": "completed"}"#;
        let report: ProgressReport = serde_json::from_str(json).unwrap();
        assert!(report.is_fully_completed(4));
        assert!(!report.is_fully_completed(5));

        let report = ProgressReport {
            status: SessionStatus::Uploading,
            ..report
        };
        assert!(!report.is_fully_completed(4));
    }

    #[test]
    fn test_retry_part_number() {
        let part = RetryPart {
            part_index: 2,
            url: "u".to_string(),
        };
        assert_eq!(part.part_number(), 3);
    }
}
