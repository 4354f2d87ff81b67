use axum::{
    body::Body,
    extract::{Extension, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::{flash_redirect, Error, Result};
use crate::models::{
    document::{Document, EntityKind, EntityRef},
    user::Identity,
};
use crate::routes::{attachment, Flash, Page};
use crate::services::document_service::NewUpload;
use crate::AppState;

fn entity_ref(entity_type: &str, entity_id: Uuid) -> Result<EntityRef> {
    let kind: EntityKind = entity_type.parse()?;
    Ok(EntityRef { kind, id: entity_id })
}

fn vault_path(entity: EntityRef) -> String {
    format!("/documents/{}/{}", entity.kind, entity.id)
}

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
    Query(flash): Query<Flash>,
) -> Result<Json<Page<Vec<Document>>>> {
    let entity = entity_ref(&entity_type, entity_id)?;
    let documents = state.document_service.list(&identity, entity).await?;
    Ok(Json(Page::new(flash, documents)))
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
    multipart: Multipart,
) -> Result<Redirect> {
    let entity = entity_ref(&entity_type, entity_id)?;
    let outcome = match read_upload(multipart).await {
        Ok(upload) => state
            .document_service
            .upload(&identity, entity, upload)
            .await
            .map(|document| format!("Uploaded {}", document.title)),
        Err(e) => Err(e),
    };
    flash_redirect(&vault_path(entity), outcome)
}

/// Expects `category`, an optional `title` and one `file` part.
async fn read_upload(mut multipart: Multipart) -> Result<NewUpload> {
    let mut category = None;
    let mut title = None;
    let mut file: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "category" => category = Some(field.text().await?),
            "title" => title = Some(field.text().await?),
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                file = Some((filename, content_type, data));
            }
            other => tracing::debug!(field = other, "Ignoring unexpected upload field"),
        }
    }

    let category = category.ok_or_else(|| Error::Validation("Choose a document category".to_string()))?;
    let (filename, content_type, data) =
        file.ok_or_else(|| Error::Validation("Choose a file to upload".to_string()))?;
    Ok(NewUpload {
        category,
        title,
        filename,
        content_type,
        data,
    })
}

pub async fn archive(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse> {
    let entity = entity_ref(&entity_type, entity_id)?;
    let (filename, spool) = state.document_service.archive(&identity, entity).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&filename)),
        ],
        Body::from_stream(ReaderStream::new(spool)),
    ))
}

pub async fn download(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let (document, file) = state.document_service.open(&identity, id).await?;
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.mime_type.clone()),
            (header::CONTENT_DISPOSITION, attachment(&document.original_filename)),
        ],
        body,
    )
        .into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Redirect> {
    match state.document_service.delete(&identity, id).await {
        Ok(document) => {
            let back = document
                .entity()
                .map(vault_path)
                .unwrap_or_else(|| "/dashboard".to_string());
            flash_redirect(&back, Ok(format!("Deleted {}", document.title)))
        }
        Err(e) => flash_redirect("/dashboard", Err(e)),
    }
}
