use bytes::Bytes;
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tokio::fs::File;
use uuid::Uuid;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::models::{
    document::{Document, DocumentCategory, EntityKind, EntityRef},
    user::Identity,
};
use crate::services::storage_service::{display_filename, StorageService};
use crate::utils::time::{file_stamp, now};

const DOCUMENT_COLUMNS: &str = r#"
    d.id, d.student_id, d.employer_id, d.category, d.title, d.original_filename,
    d.stored_path, d.mime_type, d.size_bytes, d.uploaded_by_user_id, d.created_at
"#;

/// A file as received from the upload form.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub category: String,
    pub title: Option<String>,
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, FromRow)]
struct OwnedDocument {
    #[sqlx(flatten)]
    document: Document,
    owner_user_id: Option<Uuid>,
}

/// One stored file to be copied into a bulk download.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub folder: String,
    pub filename: String,
    pub source: PathBuf,
}

#[derive(Clone)]
pub struct DocumentService {
    pool: PgPool,
    storage: StorageService,
    max_upload_bytes: usize,
}

impl DocumentService {
    pub fn new(pool: PgPool, storage: StorageService, max_upload_bytes: usize) -> Self {
        Self {
            pool,
            storage,
            max_upload_bytes,
        }
    }

    pub async fn upload(&self, actor: &Identity, entity: EntityRef, upload: NewUpload) -> Result<Document> {
        let owner = self.entity_owner(entity).await?;
        actor.require_owner_or_admin(owner)?;

        let category: DocumentCategory = upload.category.parse()?;
        if upload.data.is_empty() {
            return Err(Error::Validation("Choose a file to upload".to_string()));
        }
        if upload.data.len() > self.max_upload_bytes {
            return Err(Error::Validation(format!(
                "File is larger than the {} MB limit",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }

        let original_filename = display_filename(&upload.filename);
        let title = upload
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| original_filename.clone());
        let mime_type = upload
            .content_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let stored_path =
            StorageService::relative_path(entity, category, &original_filename, now());
        self.storage.write(&stored_path, &upload.data).await?;

        let (student_id, employer_id) = match entity.kind {
            EntityKind::Student => (Some(entity.id), None),
            EntityKind::Employer => (None, Some(entity.id)),
        };
        let inserted = sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO documents AS d (
                student_id, employer_id, category, title, original_filename,
                stored_path, mime_type, size_bytes, uploaded_by_user_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(student_id)
        .bind(employer_id)
        .bind(category)
        .bind(&title)
        .bind(&original_filename)
        .bind(&stored_path)
        .bind(&mime_type)
        .bind(upload.data.len() as i64)
        .bind(actor.user_id)
        .fetch_one(&self.pool)
        .await;

        let document = match inserted {
            Ok(document) => document,
            Err(e) => {
                self.storage.remove_best_effort(&stored_path).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            document_id = %document.id,
            entity = %entity.kind,
            entity_id = %entity.id,
            category = %category,
            size_bytes = document.size_bytes,
            actor = %actor.user_id,
            "Document uploaded"
        );
        Ok(document)
    }

    pub async fn list(&self, actor: &Identity, entity: EntityRef) -> Result<Vec<Document>> {
        let owner = self.entity_owner(entity).await?;
        actor.require_owner_or_admin(owner)?;
        self.list_unchecked(entity).await
    }

    /// Existence is checked before ownership, so a missing document is
    /// NotFound for everyone while someone else's is Forbidden.
    pub async fn get(&self, actor: &Identity, id: Uuid) -> Result<Document> {
        let owned = sqlx::query_as::<_, OwnedDocument>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS}, COALESCE(s.user_id, e.user_id) AS owner_user_id
            FROM documents d
            LEFT JOIN students s ON s.id = d.student_id
            LEFT JOIN employers e ON e.id = d.employer_id
            WHERE d.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;

        match owned.owner_user_id {
            Some(owner) => actor.require_owner_or_admin(owner)?,
            None => actor.require_admin()?,
        }
        Ok(owned.document)
    }

    pub async fn open(&self, actor: &Identity, id: Uuid) -> Result<(Document, File)> {
        let document = self.get(actor, id).await?;
        let file = self.storage.open(&document.stored_path).await.map_err(|e| {
            if matches!(e, Error::NotFound(_)) {
                tracing::warn!(document_id = %document.id, path = %document.stored_path, "Document file missing from storage");
            }
            e
        })?;
        tracing::info!(document_id = %document.id, actor = %actor.user_id, "Document downloaded");
        Ok((document, file))
    }

    /// Zips every document the entity owns, one folder per category, into
    /// an anonymous temp file and hands it back rewound for streaming. Files
    /// missing from disk are skipped.
    pub async fn archive(&self, actor: &Identity, entity: EntityRef) -> Result<(String, File)> {
        let owner = self.entity_owner(entity).await?;
        actor.require_owner_or_admin(owner)?;

        let documents = self.list_unchecked(entity).await?;
        let entries = documents
            .iter()
            .map(|document| -> Result<ArchiveEntry> {
                Ok(ArchiveEntry {
                    folder: document.category.as_str().to_string(),
                    filename: document.original_filename.clone(),
                    source: self.storage.locate(&document.stored_path)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let (spool, included) = tokio::task::spawn_blocking(move || -> Result<(fs::File, usize)> {
            let (mut spool, included) = write_archive(tempfile::tempfile()?, &entries)?;
            spool.seek(SeekFrom::Start(0))?;
            Ok((spool, included))
        })
        .await
        .map_err(|e| Error::Internal(format!("Archive task failed: {}", e)))??;

        tracing::info!(
            entity = %entity.kind,
            entity_id = %entity.id,
            documents = documents.len(),
            included,
            actor = %actor.user_id,
            "Document archive built"
        );
        let filename = format!("{}_{}_{}.zip", entity.kind, entity.id, file_stamp(now()));
        Ok((filename, File::from_std(spool)))
    }

    /// The row goes first; a file that cannot be removed afterwards is logged
    /// and left behind.
    pub async fn delete(&self, actor: &Identity, id: Uuid) -> Result<Document> {
        let document = self.get(actor, id).await?;
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.storage.remove_best_effort(&document.stored_path).await;
        tracing::info!(document_id = %id, actor = %actor.user_id, "Document deleted");
        Ok(document)
    }

    async fn list_unchecked(&self, entity: EntityRef) -> Result<Vec<Document>> {
        let column = match entity.kind {
            EntityKind::Student => "student_id",
            EntityKind::Employer => "employer_id",
        };
        let documents = sqlx::query_as::<_, Document>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS}
            FROM documents d
            WHERE d.{column} = $1
            ORDER BY d.created_at DESC
            "#
        ))
        .bind(entity.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    async fn entity_owner(&self, entity: EntityRef) -> Result<Uuid> {
        let (sql, missing) = match entity.kind {
            EntityKind::Student => ("SELECT user_id FROM students WHERE id = $1", "Student not found"),
            EntityKind::Employer => ("SELECT user_id FROM employers WHERE id = $1", "Employer not found"),
        };
        let owner: (Uuid,) = sqlx::query_as(sql)
            .bind(entity.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(missing.to_string()))?;
        Ok(owner.0)
    }
}

/// Copies each entry into a zip written to `writer`, returning the writer
/// and how many files went in. Entries whose source is gone are skipped.
pub fn write_archive<W: Write + Seek>(writer: W, entries: &[ArchiveEntry]) -> Result<(W, usize)> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = HashSet::new();
    let mut included = 0;

    for entry in entries {
        let mut source = match fs::File::open(&entry.source) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    path = %entry.source.display(),
                    filename = %entry.filename,
                    "Skipping document missing from storage"
                );
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let name = unique_entry_name(&mut used, &entry.folder, &entry.filename);
        zip.start_file(name, options)?;
        io::copy(&mut source, &mut zip)?;
        included += 1;
    }
    Ok((zip.finish()?, included))
}

/// `folder/name.ext`, then `folder/name (2).ext`, `folder/name (3).ext`, ...
fn unique_entry_name(used: &mut HashSet<String>, folder: &str, filename: &str) -> String {
    let candidate = format!("{}/{}", folder, filename);
    if used.insert(candidate.clone()) {
        return candidate;
    }
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
        _ => (filename, String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}/{} ({}){}", folder, stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
