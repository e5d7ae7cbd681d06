// 批量上传后端客户端实现

use crate::backend::{
    BatchBackend, FileMetadata, InitBatchRequest, PartRecord, PartUrlResponse, PartVerification,
    ProgressReport, RetryPart, UploadSession,
};
use crate::config::BackendConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

/// 批量上传后端客户端
#[derive(Debug, Clone)]
pub struct BatchApiClient {
    /// HTTP客户端
    client: Client,
    /// 接口基础地址（不带结尾斜杠）
    base_url: String,
    /// 访问令牌
    auth_token: Option<String>,
}

impl BatchApiClient {
    /// 创建新的后端客户端
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        info!("初始化后端客户端: base_url={}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 发送请求并校验状态码，返回响应体文本
    async fn send(&self, request: RequestBuilder, action: &str) -> Result<String> {
        let response: Response = self
            .with_auth(request)
            .send()
            .await
            .with_context(|| format!("{}请求发送失败", action))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("读取{}响应失败", action))?;

        debug!("{}响应: status={}, body={}", action, status, body);

        if !status.is_success() {
            error!("{}失败: status={}, body={}", action, status, body);
            anyhow::bail!("{}失败: {} - {}", action, status.as_u16(), body);
        }

        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, action: &str) -> Result<T> {
        let body = self.send(request, action).await?;
        serde_json::from_str(&body)
            .with_context(|| format!("解析{}响应失败: body={}", action, body))
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[async_trait]
impl BatchBackend for BatchApiClient {
    async fn init_batch(
        &self,
        channel_id: &str,
        files: &[FileMetadata],
    ) -> Result<Vec<UploadSession>> {
        info!("批量初始化上传会话: channel={}, 文件数={}", channel_id, files.len());

        let body = InitBatchRequest { channel_id, files };
        let request = self.client.post(self.url("/batch/init")).json(&body);
        let sessions: Vec<UploadSession> = self.send_json(request, "批量初始化").await?;

        info!("获取到 {} 个上传会话", sessions.len());
        Ok(sessions)
    }

    async fn complete_upload(&self, upload_id: &str) -> Result<()> {
        let url = self.url(&format!("/batch/complete/{}", encode(upload_id)));
        self.send(self.client.post(url), "完成上传").await?;
        info!("上传已确认完成: upload_id={}", upload_id);
        Ok(())
    }

    async fn get_progress(&self, upload_id: &str) -> Result<ProgressReport> {
        let url = self.url(&format!("/batch/progress/{}", encode(upload_id)));
        self.send_json(self.client.get(url), "查询进度").await
    }

    async fn retry_failed_parts(&self, upload_id: &str) -> Result<Vec<RetryPart>> {
        let url = self.url(&format!("/batch/retry/{}", encode(upload_id)));
        let parts: Vec<RetryPart> = self.send_json(self.client.post(url), "批量重签").await?;
        info!(
            "批量重签: upload_id={}, 待补传分片数={}",
            upload_id,
            parts.len()
        );
        Ok(parts)
    }

    async fn refresh_part_url(&self, upload_id: &str, part_number: u32) -> Result<String> {
        let url = self.url(&format!(
            "/batch/retry/{}/{}",
            encode(upload_id),
            part_number
        ));
        let response: PartUrlResponse = self.send_json(self.client.get(url), "分片重签").await?;
        Ok(response.presigned_url)
    }

    async fn record_part(&self, upload_id: &str, record: &PartRecord) -> Result<()> {
        let url = self.url(&format!("/batch/chunk/{}", encode(upload_id)));
        self.send(self.client.post(url).json(record), "记录分片")
            .await?;
        Ok(())
    }

    async fn verify_parts(&self, upload_id: &str) -> Result<Vec<PartVerification>> {
        let url = self.url(&format!("/batch/verify/{}", encode(upload_id)));
        self.send_json(self.client.get(url), "分片校验").await
    }
}
