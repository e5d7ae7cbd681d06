// Batch Uploader Library
// 视频平台分片批量上传客户端核心库

// 上传后端接口模块
pub mod backend;

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// Web服务器模块
pub mod server;

// 上传引擎模块
pub mod uploader;

// 导出常用类型
pub use backend::{BatchApiClient, BatchBackend, FileMetadata, PartStorage, UploadSession};
pub use config::AppConfig;
pub use server::AppState;
pub use uploader::{
    BatchUploader, ProgressEvent, ProgressTracker, UploadBatch, UploadError, UploadFile,
    UploadProgress, UploadState,
};
