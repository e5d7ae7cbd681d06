// 上传后端接口模块
//
// - BatchBackend：会话初始化、分片记录、进度查询、地址重签、完成确认
// - PartStorage：向预签名地址直接写入分片

pub mod client;
pub mod storage;
pub mod types;

pub use client::BatchApiClient;
pub use storage::PresignedPutClient;
pub use types::*;

use crate::uploader::UploadFile;
use anyhow::Result;
use async_trait::async_trait;

/// 批量上传后端接口
///
/// 引擎只通过该 trait 访问后端，测试中替换为内存实现
#[async_trait]
pub trait BatchBackend: Send + Sync {
    /// 批量申请上传会话，返回顺序与 `files` 一致
    async fn init_batch(&self, channel_id: &str, files: &[FileMetadata])
        -> Result<Vec<UploadSession>>;

    /// 确认整个上传完成
    async fn complete_upload(&self, upload_id: &str) -> Result<()>;

    /// 查询服务端记录的上传进度
    async fn get_progress(&self, upload_id: &str) -> Result<ProgressReport>;

    /// 批量重签：返回服务端认为仍未完成的分片及新地址
    async fn retry_failed_parts(&self, upload_id: &str) -> Result<Vec<RetryPart>>;

    /// 为单个分片重新签发上传地址（分片序号从 1 开始）
    async fn refresh_part_url(&self, upload_id: &str, part_number: u32) -> Result<String>;

    /// 记录单个分片已完成
    async fn record_part(&self, upload_id: &str, record: &PartRecord) -> Result<()>;

    /// 获取服务端逐分片的完成情况
    async fn verify_parts(&self, upload_id: &str) -> Result<Vec<PartVerification>>;
}

/// 分片存储写入接口
#[async_trait]
pub trait PartStorage: Send + Sync {
    /// 将分片数据写入预签名地址，返回存储端给出的摘要（ETag 原值，可能带引号）
    async fn put_part(&self, url: &str, data: Vec<u8>) -> Result<String>;

    /// 整体写入一个文件，默认一次性读入内存后调用 `put_part`
    async fn put_file(&self, url: &str, file: &UploadFile) -> Result<String> {
        let data = file.read_all().await?;
        self.put_part(url, data).await
    }
}
