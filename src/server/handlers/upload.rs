// 上传API处理器

use crate::server::state::{BatchEntry, BatchState, BatchView};
use crate::server::AppState;
use crate::uploader::{UploadFile, UploadProgress, UploadState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::ApiResponse;

/// 创建批量上传请求
#[derive(Debug, Deserialize)]
pub struct CreateBatchUploadRequest {
    /// 目标频道
    pub channel_id: String,
    /// 本地文件路径列表
    pub files: Vec<String>,
}

/// 创建批量上传响应
#[derive(Debug, Serialize)]
pub struct BatchUploadCreated {
    pub batch_id: String,
}

/// POST /api/v1/uploads/batch
/// 创建批量上传并在后台开始上传
pub async fn create_batch_upload(
    State(app_state): State<AppState>,
    Json(req): Json<CreateBatchUploadRequest>,
) -> Result<Json<ApiResponse<BatchUploadCreated>>, StatusCode> {
    info!(
        "API: 创建批量上传: channel_id={}, 文件数={}",
        req.channel_id,
        req.files.len()
    );

    if req.files.is_empty() {
        return Ok(Json(ApiResponse::error(400, "No files to upload".to_string())));
    }

    let max_files = app_state.uploader.config().max_batch_files;
    if req.files.len() > max_files {
        warn!("批量上传文件数超出上限: {} > {}", req.files.len(), max_files);
        return Ok(Json(ApiResponse::error(
            400,
            format!("At most {} files per batch", max_files),
        )));
    }

    let mut files = Vec::with_capacity(req.files.len());
    for path in &req.files {
        match UploadFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                error!("读取待上传文件失败: {}, 错误: {:#}", path, e);
                return Ok(Json(ApiResponse::error(
                    400,
                    format!("Invalid file {}: {:#}", path, e),
                )));
            }
        }
    }

    let batch = app_state.uploader.new_batch();
    let batch_id = batch.id().to_string();
    let entry = Arc::new(BatchEntry::new(batch, req.channel_id, files));
    app_state.batches.insert(batch_id.clone(), entry.clone());

    let uploader = app_state.uploader.clone();
    tokio::spawn(async move {
        let result = uploader
            .run_batch(&entry.batch, &entry.channel_id, &entry.files)
            .await
            .map(|_| ());
        entry.finish(result);
    });

    Ok(Json(ApiResponse::success(BatchUploadCreated { batch_id })))
}

/// GET /api/v1/uploads/batch/:id
/// 获取批次详情
pub async fn get_batch_upload(
    State(app_state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<ApiResponse<BatchView>>, StatusCode> {
    let entry = app_state.batch(&batch_id).ok_or(StatusCode::NOT_FOUND)?;
    let progress = app_state.uploader.progress();
    Ok(Json(ApiResponse::success(entry.view(&progress))))
}

/// POST /api/v1/uploads/batch/:id/cancel
/// 取消批次
pub async fn cancel_batch_upload(
    State(app_state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    let entry = app_state.batch(&batch_id).ok_or(StatusCode::NOT_FOUND)?;

    if entry.batch.cancel() {
        info!("API: 批次已取消: {}", batch_id);
    } else {
        info!("API: 批次已处于取消状态: {}", batch_id);
    }
    Ok(Json(ApiResponse::success(batch_id)))
}

/// POST /api/v1/uploads/batch/:id/retry/:upload_id
/// 手动重试失败的文件
pub async fn retry_batch_file(
    State(app_state): State<AppState>,
    Path((batch_id, upload_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    let entry = app_state.batch(&batch_id).ok_or(StatusCode::NOT_FOUND)?;

    if entry.batch.is_cancelled() {
        return Ok(Json(ApiResponse::error(
            409,
            "Batch has been cancelled".to_string(),
        )));
    }

    if entry.state() == BatchState::Running {
        return Ok(Json(ApiResponse::error(
            409,
            "Batch is still running".to_string(),
        )));
    }

    let Some(file) = entry.file_for(&upload_id).cloned() else {
        return Err(StatusCode::NOT_FOUND);
    };

    let failed = app_state
        .uploader
        .progress()
        .get(&upload_id)
        .map_or(false, |p| p.state == UploadState::Error);
    if !failed {
        return Ok(Json(ApiResponse::error(
            409,
            format!("Upload {} is not in a failed state", upload_id),
        )));
    }

    info!("API: 手动重试: batch_id={}, upload_id={}", batch_id, upload_id);
    entry.set_running();

    let uploader = app_state.uploader.clone();
    let id = upload_id.clone();
    tokio::spawn(async move {
        let result = uploader.retry_file(&entry.batch, &file, &id).await;
        entry.refresh_after_retry(result);
    });

    Ok(Json(ApiResponse::success(upload_id)))
}

/// DELETE /api/v1/uploads/batch/:id
/// 移除已结束的批次及其进度记录
pub async fn delete_batch_upload(
    State(app_state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    let entry = app_state.batch(&batch_id).ok_or(StatusCode::NOT_FOUND)?;

    if entry.state() == BatchState::Running {
        return Ok(Json(ApiResponse::error(
            409,
            "Batch is still running".to_string(),
        )));
    }

    app_state.remove_batch(&batch_id);
    info!("API: 批次已移除: {}", batch_id);
    Ok(Json(ApiResponse::success(batch_id)))
}

/// GET /api/v1/uploads/progress
/// 获取全部上传进度
pub async fn get_upload_progress(
    State(app_state): State<AppState>,
) -> Result<Json<ApiResponse<HashMap<String, UploadProgress>>>, StatusCode> {
    let snapshot = app_state.uploader.progress().snapshot();
    Ok(Json(ApiResponse::success(snapshot)))
}
