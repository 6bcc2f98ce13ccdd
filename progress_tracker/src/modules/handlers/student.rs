use crate::modules::students::{PgStudentStore, StoreError, StudentStore};
use crate::modules::sync::dispatch::{SyncDispatcher, SyncTrigger};
use crate::modules::sync::SyncService;
use crate::types::tables::{NewStudent, Student, StudentChanges};
use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use progress_tracker_libs::codeforces::client::CodeforcesClient;
use progress_tracker_libs::mail::SendGridMailer;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

pub type AppSyncService = SyncService<CodeforcesClient, PgStudentStore, SendGridMailer>;
pub type AppSyncDispatcher = SyncDispatcher<CodeforcesClient, PgStudentStore, SendGridMailer>;

type ErrorResponse = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 50))]
    pub handle: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub handle: Option<String>,
    pub email_reminders_enabled: Option<bool>,
}

fn store_error_response(e: &StoreError) -> ErrorResponse {
    let status = match e {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Conflict => StatusCode::BAD_REQUEST,
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "message": e.to_string() })))
}

fn validation_error_response(rejection: validator::ValidationErrors) -> ErrorResponse {
    tracing::error!("validation error: {}", rejection);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": rejection.to_string().replace('\n', ", ") })),
    )
}

pub async fn list_students(
    Extension(store): Extension<Arc<PgStudentStore>>,
) -> Result<Json<Vec<Student>>, ErrorResponse> {
    match store.find_all().await {
        Ok(students) => Ok(Json(students)),
        Err(e) => {
            tracing::error!("failed to list students: {}", e);
            Err(store_error_response(&e))
        }
    }
}

pub async fn get_student(
    Path(id): Path<i64>,
    Extension(store): Extension<Arc<PgStudentStore>>,
) -> Result<Json<Student>, ErrorResponse> {
    match store.find_by_id(id).await {
        Ok(student) => Ok(Json(student)),
        Err(e) => {
            tracing::error!("failed to fetch student {}: {}", id, e);
            Err(store_error_response(&e))
        }
    }
}

pub async fn create_student(
    Extension(store): Extension<Arc<PgStudentStore>>,
    Extension(dispatcher): Extension<AppSyncDispatcher>,
    Json(payload): Json<CreateStudentPayload>,
) -> Result<(StatusCode, Json<Value>), ErrorResponse> {
    payload.validate().map_err(validation_error_response)?;

    let new = NewStudent {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        handle: payload.handle,
    };
    let student = store.create(&new).await.map_err(|e| {
        tracing::error!("failed to create student {}: {}", new.handle, e);
        store_error_response(&e)
    })?;

    // The caller gets its response immediately; the initial data sync
    // catches up in the background.
    dispatcher.dispatch(student.clone(), SyncTrigger::Created);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "student created, data sync in progress",
            "student": student,
        })),
    ))
}

pub async fn update_student(
    Path(id): Path<i64>,
    Extension(store): Extension<Arc<PgStudentStore>>,
    Extension(dispatcher): Extension<AppSyncDispatcher>,
    Json(payload): Json<UpdateStudentPayload>,
) -> Result<Json<Student>, ErrorResponse> {
    payload.validate().map_err(validation_error_response)?;

    let before = store.find_by_id(id).await.map_err(|e| {
        tracing::error!("failed to fetch student {}: {}", id, e);
        store_error_response(&e)
    })?;

    let changes = StudentChanges {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        handle: payload.handle,
        email_reminders_enabled: payload.email_reminders_enabled,
    };
    let student = store.update_profile(id, &changes).await.map_err(|e| {
        tracing::error!("failed to update student {}: {}", id, e);
        store_error_response(&e)
    })?;

    if student.handle != before.handle {
        dispatcher.dispatch(student.clone(), SyncTrigger::HandleChanged);
    }

    Ok(Json(student))
}

pub async fn delete_student(
    Path(id): Path<i64>,
    Extension(store): Extension<Arc<PgStudentStore>>,
) -> Result<Json<Value>, ErrorResponse> {
    store.delete(id).await.map_err(|e| {
        tracing::error!("failed to delete student {}: {}", id, e);
        store_error_response(&e)
    })?;

    Ok(Json(json!({ "message": "student removed successfully" })))
}

/// Manual force-sync: the one trigger path that waits for the result.
pub async fn force_sync(
    Path(id): Path<i64>,
    Extension(store): Extension<Arc<PgStudentStore>>,
    Extension(service): Extension<Arc<AppSyncService>>,
) -> Result<Json<Value>, ErrorResponse> {
    let student = store.find_by_id(id).await.map_err(|e| {
        tracing::error!("failed to fetch student {}: {}", id, e);
        store_error_response(&e)
    })?;

    match service.sync_one(&student).await {
        Ok(updated) => Ok(Json(json!({
            "message": "sync successful",
            "student": updated,
        }))),
        Err(e) => {
            tracing::error!("manual sync failed for {}: {}", student.handle, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "sync failed" })),
            ))
        }
    }
}

pub async fn download_csv(
    Extension(store): Extension<Arc<PgStudentStore>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let students = store.find_all().await.map_err(|e| {
        tracing::error!("failed to export students: {}", e);
        store_error_response(&e)
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"students.csv\"",
            ),
        ],
        students_csv(&students),
    ))
}

fn students_csv(students: &[Student]) -> String {
    let mut csv =
        String::from("name,email,phone,handle,current_rating,max_rating,last_synced_at\n");

    for student in students {
        let last_synced_at = student
            .last_synced_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        let row = [
            csv_field(&student.name),
            csv_field(&student.email),
            csv_field(&student.phone),
            csv_field(&student.handle),
            student.current_rating.to_string(),
            student.max_rating.to_string(),
            last_synced_at,
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    csv
}

fn csv_field(value: &str) -> String {
    if value.contains(|c| c == '"' || c == ',' || c == '\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        String::from(value)
    }
}
