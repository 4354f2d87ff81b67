use axum::{
    extract::{Extension, State},
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::error::Result;
use crate::models::user::Identity;
use crate::routes::attachment;
use crate::utils::time::{file_stamp, now};
use crate::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub async fn enrollees(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse> {
    let body = state.export_service.enrollees(&identity).await?;
    Ok(csv_response("enrollees", body))
}

pub async fn exiters(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse> {
    let body = state.export_service.exiters(&identity).await?;
    Ok(csv_response("exiters", body))
}

fn csv_response(report: &str, body: Vec<u8>) -> impl IntoResponse {
    let filename = format!("{}_{}.csv", report, file_stamp(now()));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, attachment(&filename)),
        ],
        body,
    )
}
