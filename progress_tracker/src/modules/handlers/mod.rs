pub mod student;

use crate::modules::students::PgStudentStore;
use axum::{extract::Extension, http::StatusCode};
use std::sync::Arc;

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness(Extension(store): Extension<Arc<PgStudentStore>>) -> StatusCode {
    if store.ping().await.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
