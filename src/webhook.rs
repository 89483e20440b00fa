use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use teloxide::types::Update;

use crate::bot::{self, AppState};

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_get).post(handle_post))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("webhook listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn handle_get() -> (StatusCode, &'static str) {
    (StatusCode::OK, "askbot webhook is running")
}

async fn handle_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Update>, JsonRejection>,
) -> (StatusCode, &'static str) {
    if !is_secret_token_valid(&state, &headers) {
        return (StatusCode::BAD_REQUEST, "Wrong secret token");
    }

    let update = match body {
        Ok(Json(update)) => update,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "rejected webhook body");
            return (StatusCode::BAD_REQUEST, "Invalid update");
        }
    };

    let update_id = update.id.0;
    match bot::process_update(&state, update).await {
        Ok(()) => (StatusCode::OK, "Success"),
        Err(err) => {
            tracing::error!(update_id, error = %err, "update processing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error")
        }
    }
}

fn is_secret_token_valid(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.config.webhook_secret.as_deref() else {
        return true;
    };
    headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected)
}
