// Web服务器模块

pub mod handlers;
pub mod state;
pub mod websocket;

pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// 健康检查响应结构
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "batch-uploader".to_string(),
    })
}

/// 根据配置构建 CORS 层，`*` 表示允许任意来源
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("忽略无效的 CORS 来源: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

/// 构建完整应用路由
pub fn build_router(app_state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http()) // HTTP 请求日志
        .layer(cors_layer(&app_state.config.server.cors_origins));

    // API 路由
    let api_routes = Router::new()
        .route("/uploads/batch", post(handlers::create_batch_upload))
        .route("/uploads/batch/:id", get(handlers::get_batch_upload))
        .route("/uploads/batch/:id", delete(handlers::delete_batch_upload))
        .route("/uploads/batch/:id/cancel", post(handlers::cancel_batch_upload))
        .route(
            "/uploads/batch/:id/retry/:upload_id",
            post(handlers::retry_batch_file),
        )
        .route("/uploads/progress", get(handlers::get_upload_progress))
        .route("/ws", get(websocket::handle_websocket))
        .with_state(app_state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(middleware)
}
