//! Project export to JSONL, TSV or CSV.
//!
//! # Responsibility
//! - Serialize a project's documents and spans into a fresh file under the
//!   configured export directory.
//!
//! # Invariants
//! - Documents are written in id order, spans in `start` order.
//! - The format is parsed before any file is touched.
//! - Output names are `project_{id}_{YYYYMMDD_HHMMSS}.{ext}` (UTC); an
//!   existing file is never overwritten, a `_{n}` suffix is added instead.

use crate::config::CoreConfig;
use crate::model::document::{Document, DocumentId};
use crate::model::project::ProjectId;
use crate::model::span::Span;
use crate::model::EntityRef;
use crate::repo::document_repo::{DocumentPage, DocumentRepository, SqliteDocumentRepository};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::span_repo::{SpanRepository, SqliteSpanRepository};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::logged;
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DELIMITED_HEADER: [&str; 5] = ["doc_id", "start", "end", "label", "fragment"];
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One `{"text", "labels": [[start, end, label], ...]}` object per line.
    Jsonl,
    Tsv,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Tsv => "tsv",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Ok(Self::Jsonl),
            "tsv" => Ok(Self::Tsv),
            "csv" => Ok(Self::Csv),
            _ => Err(ServiceError::UnsupportedFormat(value.to_string())),
        }
    }
}

/// One document with its spans in export order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub document: Document,
    pub spans: Vec<Span>,
}

#[derive(Serialize)]
struct JsonlRecord<'a> {
    text: &'a str,
    labels: Vec<(i64, i64, &'a str)>,
}

/// Export service bound to one open connection.
pub struct ExportService<'a> {
    conn: &'a Connection,
    config: &'a CoreConfig,
}

impl<'a> ExportService<'a> {
    pub fn new(conn: &'a Connection, config: &'a CoreConfig) -> Self {
        Self { conn, config }
    }

    /// Writes an export file and returns its path.
    ///
    /// `doc_ids` restricts the export to those documents of the project;
    /// ids belonging elsewhere are ignored.
    pub fn export_project(
        &self,
        project_id: ProjectId,
        format: &str,
        doc_ids: Option<&[DocumentId]>,
    ) -> ServiceResult<PathBuf> {
        logged(
            "project_export",
            self.export_project_inner(project_id, format, doc_ids),
        )
    }

    fn export_project_inner(
        &self,
        project_id: ProjectId,
        format: &str,
        doc_ids: Option<&[DocumentId]>,
    ) -> ServiceResult<PathBuf> {
        let format = ExportFormat::from_str(format)?;
        let documents = self.collect_documents(project_id, doc_ids)?;

        let export_dir = &self.config.export_dir;
        std::fs::create_dir_all(export_dir).map_err(|err| ServiceError::io(export_dir, err))?;
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let (path, file) = create_export_file(export_dir, project_id, &stamp, format)?;

        let mut writer = BufWriter::new(file);
        match format {
            ExportFormat::Jsonl => write_jsonl(&mut writer, &documents)?,
            ExportFormat::Tsv | ExportFormat::Csv => {
                write_delimited(&mut writer, &documents, format)?
            }
        }
        writer.flush().map_err(|err| ServiceError::io(&path, err))?;

        info!(
            "event=project_export module=export status=ok project_id={project_id} format={} documents={}",
            format.extension(),
            documents.len()
        );
        Ok(path)
    }

    /// Loads documents (id order) and their spans (start order).
    pub fn collect_documents(
        &self,
        project_id: ProjectId,
        doc_ids: Option<&[DocumentId]>,
    ) -> ServiceResult<Vec<ExportDocument>> {
        if SqliteProjectRepository::new(self.conn)
            .get_project(project_id)?
            .is_none()
        {
            return Err(ServiceError::NotFound(EntityRef::Project(project_id)));
        }

        let spans = SqliteSpanRepository::new(self.conn);
        let documents = SqliteDocumentRepository::new(self.conn)
            .list_documents(project_id, DocumentPage::default())?;
        documents
            .into_iter()
            .filter(|document| doc_ids.map_or(true, |ids| ids.contains(&document.id)))
            .map(|document| -> ServiceResult<ExportDocument> {
                let spans = spans.list_spans(document.id)?;
                Ok(ExportDocument { document, spans })
            })
            .collect()
    }
}

/// Writes one JSON object per document.
pub fn write_jsonl<W: Write>(writer: &mut W, documents: &[ExportDocument]) -> ServiceResult<()> {
    for entry in documents {
        let record = JsonlRecord {
            text: &entry.document.text,
            labels: entry
                .spans
                .iter()
                .map(|span| (span.start, span.end, span.label.as_str()))
                .collect(),
        };
        serde_json::to_writer(&mut *writer, &record)?;
        writer
            .write_all(b"\n")
            .map_err(|err| ServiceError::io("<export>", err))?;
    }
    Ok(())
}

/// Writes a header plus one row per (document, span) pair.
pub fn write_delimited<W: Write>(
    writer: &mut W,
    documents: &[ExportDocument],
    format: ExportFormat,
) -> ServiceResult<()> {
    let (delimiter, quote_style) = match format {
        ExportFormat::Tsv => (b'\t', csv::QuoteStyle::Never),
        _ => (b',', csv::QuoteStyle::Necessary),
    };
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(quote_style)
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(DELIMITED_HEADER)?;
    for entry in documents {
        let doc_id = entry.document.id.to_string();
        for span in &entry.spans {
            let start = span.start.to_string();
            let end = span.end.to_string();
            let fragment = entry
                .document
                .fragment(span.start, span.end)
                .unwrap_or_default()
                .replace(['\t', '\n'], " ");
            csv_writer.write_record([
                doc_id.as_str(),
                start.as_str(),
                end.as_str(),
                span.label.as_str(),
                fragment.as_str(),
            ])?;
        }
    }
    csv_writer.flush().map_err(|err| ServiceError::io("<export>", err))?;
    Ok(())
}

/// `project_{id}_{stamp}.{ext}`, or `project_{id}_{stamp}_{n}.{ext}` for
/// `attempt > 0`.
pub fn export_file_name(project_id: ProjectId, stamp: &str, format: ExportFormat, attempt: u32) -> String {
    if attempt == 0 {
        format!("project_{project_id}_{stamp}.{}", format.extension())
    } else {
        format!("project_{project_id}_{stamp}_{attempt}.{}", format.extension())
    }
}

fn create_export_file(
    dir: &Path,
    project_id: ProjectId,
    stamp: &str,
    format: ExportFormat,
) -> ServiceResult<(PathBuf, File)> {
    let mut last_path = dir.to_path_buf();
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(export_file_name(project_id, stamp, format, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => last_path = path,
            Err(err) => return Err(ServiceError::io(path, err)),
        }
    }
    Err(ServiceError::io(
        last_path,
        std::io::Error::new(ErrorKind::AlreadyExists, "no free export file name"),
    ))
}
