use crate::error::IngestError;
use crate::extractor::{extract_page_texts, PageText};
use crate::models::PageDocument;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// All `.pdf` files under `folder`, recursively, in sorted order.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Loads every PDF page under `folder` as a `PageDocument`, in file then page
/// order. This never fails: a missing or empty folder yields an empty vec
/// with a warning, and files that cannot be read or parsed are skipped with
/// a warning naming the path and reason.
pub fn load_documents(folder: &Path) -> Vec<PageDocument> {
    let files = discover_pdf_files(folder);

    if files.is_empty() {
        warn!(folder = %folder.display(), "no pdf files found");
        return Vec::new();
    }

    let mut documents = Vec::new();

    for path in files {
        match load_file_pages(&path) {
            Ok(pages) => documents.extend(pages),
            Err(error) => {
                warn!(path = %path.display(), reason = %error, "skipped pdf");
            }
        }
    }

    documents
}

fn load_file_pages(path: &Path) -> Result<Vec<PageDocument>, IngestError> {
    let checksum = digest_file(path)?;
    let title = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?
        .to_string();

    let document_id = generate_document_id(path);
    let source_path = path.to_string_lossy().to_string();
    let loaded_at = Utc::now();

    let pages = extract_page_texts(path)?;
    Ok(pages
        .into_iter()
        .map(|PageText { number, text }| PageDocument {
            document_id: document_id.clone(),
            title: title.clone(),
            source_path: source_path.clone(),
            checksum: checksum.clone(),
            page: number,
            text,
            loaded_at,
        })
        .collect())
}

fn generate_document_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}
