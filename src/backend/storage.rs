// 预签名地址直传

use crate::backend::PartStorage;
use crate::uploader::{FileSource, UploadFile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use reqwest::{Body, Client};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// 预签名地址 PUT 客户端
///
/// 预签名地址自带凭证，不携带后端访问令牌
#[derive(Debug, Clone)]
pub struct PresignedPutClient {
    client: Client,
}

impl PresignedPutClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    async fn put_body(&self, url: &str, body: Body, size: u64) -> Result<String> {
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .context("分片写入请求发送失败")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("分片写入失败: {} - {}", status.as_u16(), body);
        }

        let etag = response
            .headers()
            .get(ETAG)
            .context("分片写入响应缺少 ETag")?
            .to_str()
            .context("ETag 不是合法字符串")?
            .to_string();

        debug!("分片写入成功: size={}, etag={}", size, etag);
        Ok(etag)
    }
}

#[async_trait]
impl PartStorage for PresignedPutClient {
    async fn put_part(&self, url: &str, data: Vec<u8>) -> Result<String> {
        let size = data.len() as u64;
        self.put_body(url, Body::from(data), size).await
    }

    /// 磁盘文件以流的方式写入，不整体读入内存
    async fn put_file(&self, url: &str, file: &UploadFile) -> Result<String> {
        match &file.source {
            FileSource::Path(path) => {
                let handle = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("打开上传文件失败: {:?}", path))?;
                let body = Body::wrap_stream(ReaderStream::new(handle));
                self.put_body(url, body, file.size()).await
            }
            FileSource::Memory(data) => self.put_part(url, data.to_vec()).await,
        }
    }
}
