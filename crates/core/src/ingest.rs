use crate::chunking::{build_chunks, ChunkingConfig};
use crate::extractor::extract_document_text;
use crate::{Document, DocumentChunk, IngestError, IngestionOptions};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_documents(folder: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| match item {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(folder = %folder.display(), error = %error, "skipping unreadable entry");
                None
            }
        })
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let matches_filter = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
            });

        if matches_filter {
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

#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    pub documents: Vec<Document>,
    pub skipped_files: Vec<SkippedDocument>,
}

/// Loads every matching document under `folder`, skipping files that cannot
/// be read. Only a missing or unreadable directory is an error.
pub fn load_documents_best_effort(
    folder: &Path,
    extensions: &[String],
) -> Result<IngestionReport, IngestError> {
    if !folder.is_dir() {
        return Err(IngestError::MissingDirectory(folder.display().to_string()));
    }

    let files = discover_documents(folder, extensions);
    if files.is_empty() {
        warn!(folder = %folder.display(), ?extensions, "no documents found");
    }

    let mut report = IngestionReport::default();

    for path in files {
        match load_document(&path) {
            Ok(document) => report.documents.push(document),
            Err(error) => {
                warn!(path = %path.display(), reason = %error, "skipped document");
                report.skipped_files.push(SkippedDocument {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    info!(
        folder = %folder.display(),
        loaded = report.documents.len(),
        skipped = report.skipped_files.len(),
        "documents loaded"
    );

    Ok(report)
}

pub fn load_document(path: &Path) -> Result<Document, IngestError> {
    let checksum = digest_file(path)?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?;
    let text = extract_document_text(path)?;

    Ok(Document {
        document_id: generate_document_id(path),
        title: name.to_string(),
        source_path: path.to_string_lossy().to_string(),
        text,
        checksum,
        loaded_at: Utc::now(),
    })
}

pub struct ChunkedCorpus {
    pub chunks: Vec<DocumentChunk>,
    pub document_count: usize,
    pub skipped_files: Vec<SkippedDocument>,
}

pub fn ingest_folder_chunks(
    folder: &Path,
    options: &IngestionOptions,
) -> Result<ChunkedCorpus, IngestError> {
    let config = ChunkingConfig::from(options);
    config.validate()?;

    let report = load_documents_best_effort(folder, &options.extensions)?;
    let chunks = build_chunks(&report.documents, config)?;

    info!(
        documents = report.documents.len(),
        chunks = chunks.len(),
        chunk_size = config.max_chars,
        chunk_overlap = config.overlap_chars,
        "documents chunked"
    );

    Ok(ChunkedCorpus {
        chunks,
        document_count: report.documents.len(),
        skipped_files: report.skipped_files,
    })
}

fn generate_document_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::write_docx;
    use std::fs;
    use tempfile::tempdir;

    fn docx_only() -> Vec<String> {
        vec!["docx".to_string()]
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_does_not_stop_discovery() -> Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        fs::write(dir.path().join("top.docx"), b"x")?;
        let locked = dir.path().join("locked");
        fs::create_dir(&locked)?;
        fs::write(locked.join("hidden.docx"), b"x")?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

        let readable_anyway = fs::read_dir(&locked).is_ok();
        let files = discover_documents(dir.path(), &["docx".to_string()]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;

        if readable_anyway {
            // root ignores directory permissions
            assert_eq!(files.len(), 2);
        } else {
            assert_eq!(files, vec![dir.path().join("top.docx")]);
        }
        Ok(())
    }
    #[test]
    fn discover_documents_is_recursive_and_filtered() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        write_docx(&base.join("a.docx"), &["first"])?;
        write_docx(&nested.join("b.DOCX"), &["second"])?;
        fs::write(base.join("notes.txt"), "ignored")?;

        let files = discover_documents(base, &docx_only());
        assert_eq!(files.len(), 2);

        let files = discover_documents(base, &[".txt".to_string(), "docx".to_string()]);
        assert_eq!(files.len(), 3);
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file_path = dir.path().join("a.docx");
        fs::write(&file_path, b"abc")?;

        let first = digest_file(&file_path)?;
        let second = digest_file(&file_path)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn missing_directory_is_reported() {
        let result = load_documents_best_effort(Path::new("/definitely/not/here"), &docx_only());
        assert!(matches!(result, Err(IngestError::MissingDirectory(_))));
    }

    #[test]
    fn empty_directory_yields_empty_report() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let report = load_documents_best_effort(dir.path(), &docx_only())?;
        assert!(report.documents.is_empty());
        assert!(report.skipped_files.is_empty());
        Ok(())
    }

    #[test]
    fn best_effort_skips_unreadable_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.docx"), b"PK\x03\x04broken")?;
        write_docx(&dir.path().join("readable.docx"), &["Office hours: Monday 9-11."])?;

        let report = load_documents_best_effort(dir.path(), &docx_only())?;

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].title, "readable.docx");
        assert_eq!(report.documents[0].text, "Office hours: Monday 9-11.");
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(
            report.skipped_files[0]
                .path
                .file_name()
                .and_then(|name| name.to_str()),
            Some("unreadable.docx")
        );
        Ok(())
    }

    #[test]
    fn folder_is_chunked_with_options() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let long = "The graduate school accepts applications twice a year. ".repeat(10);
        write_docx(&dir.path().join("grad.docx"), &[long.as_str()])?;

        let options = IngestionOptions {
            chunk_max_chars: 100,
            chunk_overlap_chars: 10,
            extensions: docx_only(),
        };
        let corpus = ingest_folder_chunks(dir.path(), &options)?;

        assert_eq!(corpus.document_count, 1);
        assert!(corpus.chunks.len() > 1);
        assert!(corpus
            .chunks
            .iter()
            .all(|chunk| chunk.text.chars().count() <= 100 && chunk.title == "grad.docx"));
        Ok(())
    }

    #[test]
    fn invalid_chunk_options_fail_before_loading() {
        let options = IngestionOptions {
            chunk_max_chars: 10,
            chunk_overlap_chars: 10,
            extensions: docx_only(),
        };
        let result = ingest_folder_chunks(Path::new("/definitely/not/here"), &options);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }
}
