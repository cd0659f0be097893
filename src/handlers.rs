use crate::aggregator::{DashboardQuery, DashboardView, build_view};
use crate::auth::Authorized;
use crate::errors::AppError;
use crate::importer::run_import;
use crate::models::{HealthResponse, ImportResponse, ManualEntry, Record, StoredRecord, Upload};
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::MultipartRejection,
        rejection::QueryRejection,
    },
};
use std::sync::Arc;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn import(
    State(state): State<AppState>,
    _auth: Authorized,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportResponse>, AppError> {
    let upload = read_upload(multipart?).await?;
    let summary = run_import(Arc::clone(&state.store), upload).await?;

    Ok(Json(ImportResponse {
        message: "Data imported successfully".to_string(),
        imported: summary.imported,
    }))
}

pub async fn get_data(State(state): State<AppState>) -> Result<Json<Vec<StoredRecord>>, AppError> {
    Ok(Json(load_records(&state).await?))
}

pub async fn dashboard(
    State(state): State<AppState>,
    _auth: Authorized,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Result<Json<DashboardView>, AppError> {
    let Query(query) = query?;
    let records: Vec<Record> = load_records(&state)
        .await?
        .into_iter()
        .map(|stored| stored.record)
        .collect();

    Ok(Json(build_view(&records, &query)))
}

async fn load_records(state: &AppState) -> Result<Vec<StoredRecord>, AppError> {
    let store = Arc::clone(&state.store);
    let records = tokio::task::spawn_blocking(move || store.all())
        .await
        .map_err(AppError::internal)??;
    Ok(records)
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut upload = Upload::default();
    let mut manual = ManualEntry::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("Multipart error: {err}")))?
    {
        let field_name = field.name().map(|name| name.to_string());
        match field_name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(format!("Read error: {err}")))?;
                upload.file = Some(bytes.to_vec());
            }
            Some("date") => manual.date = read_text(field).await?,
            Some("patient_data") => manual.patient_data = read_text(field).await?,
            _ => {}
        }
    }

    if manual.is_complete() {
        upload.manual = Some(manual);
    }
    Ok(upload)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    let text = field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("Read error: {err}")))?;
    Ok(text.trim().to_string())
}
