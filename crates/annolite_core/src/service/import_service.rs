//! File import: encoding detection, unit splitting and document creation.
//!
//! # Responsibility
//! - Turn text files into documents, one per split unit.
//!
//! # Invariants
//! - Every input file is checked, read and split before any row is written;
//!   all units of all files are inserted in one transaction.
//! - Units keep their source path and their index within that file.
//! - Line endings are normalized to `\n` before splitting.

use crate::model::document::{Document, NewDocument, STATUS_PENDING};
use crate::model::project::ProjectId;
use crate::model::EntityRef;
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::service::document_service::DocumentService;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::logged;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_FIXED_LENGTH: usize = 500;

static SENTENCE_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[。．.！？!?]").expect("valid sentence end regex"));

/// How a file's text is cut into documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Whole file as one unit.
    AsIs,
    /// Blank-line separated blocks, trimmed, empties dropped.
    Paragraph,
    /// Cut after East-Asian or Western sentence-ending punctuation.
    #[default]
    Sentence,
    /// Fixed-size character chunks; blank chunks dropped.
    Length,
}

impl SplitStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AsIs => "as_is",
            Self::Paragraph => "paragraph",
            Self::Sentence => "sentence",
            Self::Length => "length",
        }
    }
}

impl FromStr for SplitStrategy {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "as_is" => Ok(Self::AsIs),
            "paragraph" => Ok(Self::Paragraph),
            "sentence" => Ok(Self::Sentence),
            "length" => Ok(Self::Length),
            other => Err(ServiceError::UnsupportedStrategy(other.to_string())),
        }
    }
}

/// Options for `ImportService::import_txt_files`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub strategy: SplitStrategy,
    /// Chunk size for `SplitStrategy::Length`; `None` or 0 means 500.
    pub fixed_length: Option<usize>,
    /// Encoding label such as `utf-8` or `gbk`; `None` sniffs it.
    pub encoding: Option<String>,
}

/// Import service bound to one open connection.
pub struct ImportService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ImportService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Imports text files as `pending` documents, one per split unit.
    ///
    /// Returns exactly the documents created, in file then unit order.
    pub fn import_txt_files<P: AsRef<Path>>(
        &self,
        project_id: ProjectId,
        paths: &[P],
        options: &ImportOptions,
    ) -> ServiceResult<Vec<Document>> {
        logged(
            "files_import",
            self.import_txt_files_inner(project_id, paths, options),
        )
    }

    fn import_txt_files_inner<P: AsRef<Path>>(
        &self,
        project_id: ProjectId,
        paths: &[P],
        options: &ImportOptions,
    ) -> ServiceResult<Vec<Document>> {
        if SqliteProjectRepository::new(self.conn)
            .get_project(project_id)?
            .is_none()
        {
            return Err(ServiceError::NotFound(EntityRef::Project(project_id)));
        }

        let mut documents = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                return Err(ServiceError::NotFound(EntityRef::File(path.to_path_buf())));
            }

            let text = read_file_text(path, options.encoding.as_deref())?;
            let units = split_text(&text, options.strategy, options.fixed_length);
            debug!(
                "event=file_split module=import status=ok strategy={} units={}",
                options.strategy.as_str(),
                units.len()
            );

            let source_file = path.display().to_string();
            documents.extend(units.into_iter().enumerate().map(|(index, unit)| NewDocument {
                text: unit,
                status: Some(STATUS_PENDING.to_string()),
                source_file: Some(source_file.clone()),
                unit_index: Some(index as i64),
            }));
        }

        let created = DocumentService::new(self.conn).insert_documents(project_id, &documents)?;
        info!(
            "event=files_import module=import status=ok project_id={project_id} files={} documents={}",
            paths.len(),
            created.len()
        );
        Ok(created)
    }
}

/// Reads a file and decodes it with `encoding`, or a sniffed encoding.
pub fn read_file_text(path: &Path, encoding: Option<&str>) -> ServiceResult<String> {
    let bytes = std::fs::read(path).map_err(|err| ServiceError::io(path, err))?;
    let encoding = match encoding {
        Some(label) => resolve_encoding(label)?,
        None => detect_encoding(&bytes),
    };
    decode_bytes(path, &bytes, encoding)
}

/// Maps a WHATWG encoding label to an encoding.
pub fn resolve_encoding(label: &str) -> ServiceResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ServiceError::UnknownEncoding(label.to_string()))
}

/// Best-effort charset sniffing: BOM, then strict UTF-8, then a statistical
/// guess. Empty input is UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn decode_bytes(path: &Path, bytes: &[u8], encoding: &'static Encoding) -> ServiceResult<String> {
    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| ServiceError::Decode {
            path: PathBuf::from(path),
            encoding: encoding.name(),
        })
}

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Splits `text` into units according to `strategy`.
pub fn split_text(text: &str, strategy: SplitStrategy, fixed_length: Option<usize>) -> Vec<String> {
    let text = normalize_line_endings(text);
    match strategy {
        SplitStrategy::AsIs => vec![text],
        SplitStrategy::Paragraph => text
            .split("\n\n")
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        SplitStrategy::Sentence => split_sentences(&text),
        SplitStrategy::Length => {
            let size = fixed_length
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_FIXED_LENGTH);
            split_fixed_length(&text, size)
        }
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut unit_start = 0;
    for terminator in SENTENCE_END_RE.find_iter(text) {
        push_trimmed(&mut units, &text[unit_start..terminator.end()]);
        unit_start = terminator.end();
    }
    push_trimmed(&mut units, &text[unit_start..]);
    units
}

fn push_trimmed(units: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        units.push(trimmed.to_string());
    }
}

fn split_fixed_length(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect::<String>())
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_split_yields_full_chunks_and_remainder() {
        let text = "a".repeat(1200);
        let units = split_text(&text, SplitStrategy::Length, Some(500));
        let lengths: Vec<usize> = units.iter().map(|unit| unit.chars().count()).collect();
        assert_eq!(lengths, vec![500, 500, 200]);
    }

    #[test]
    fn length_split_counts_characters_and_drops_blank_chunks() {
        let text = format!("{}{}", "中".repeat(4), " ".repeat(4));
        let units = split_text(&text, SplitStrategy::Length, Some(4));
        assert_eq!(units, vec!["中中中中".to_string()]);
        assert_eq!(split_text("abc", SplitStrategy::Length, Some(0)), vec!["abc"]);
    }

    #[test]
    fn sentence_split_handles_mixed_punctuation_and_trailing_text() {
        let units = split_text(
            "今天下雨。Is it wet? Yes!  And then",
            SplitStrategy::Sentence,
            None,
        );
        assert_eq!(units, vec!["今天下雨。", "Is it wet?", "Yes!", "And then"]);
    }

    #[test]
    fn paragraph_split_normalizes_crlf_and_drops_empties() {
        let units = split_text("one\r\nline\r\n\r\n\r\n\r\ntwo  ", SplitStrategy::Paragraph, None);
        assert_eq!(units, vec!["one\nline", "two"]);
    }

    #[test]
    fn as_is_keeps_whole_text() {
        assert_eq!(split_text("a\r\nb", SplitStrategy::AsIs, None), vec!["a\nb"]);
    }

    #[test]
    fn strategy_names_parse_case_insensitively() {
        assert_eq!("AS_IS".parse::<SplitStrategy>().unwrap(), SplitStrategy::AsIs);
        assert!(matches!(
            "words".parse::<SplitStrategy>(),
            Err(ServiceError::UnsupportedStrategy(name)) if name == "words"
        ));
    }

    #[test]
    fn detect_encoding_prefers_bom_then_utf8() {
        assert_eq!(detect_encoding(b"\xEF\xBB\xBFhi"), UTF_8);
        assert_eq!(detect_encoding(b"\xFF\xFEh\x00"), encoding_rs::UTF_16LE);
        assert_eq!(detect_encoding("plain ascii and 中文".as_bytes()), UTF_8);
    }

    #[test]
    fn decode_strips_matching_bom_and_rejects_malformed_input() {
        let path = Path::new("sample.txt");
        assert_eq!(decode_bytes(path, b"\xEF\xBB\xBFhi", UTF_8).unwrap(), "hi");
        assert!(matches!(
            decode_bytes(path, b"\xFF\xFE\xFD", UTF_8),
            Err(ServiceError::Decode { encoding: "UTF-8", .. })
        ));
    }

    #[test]
    fn gbk_label_decodes_chinese_text() {
        let (bytes, _, _) = encoding_rs::GBK.encode("北京");
        let encoding = resolve_encoding("gbk").unwrap();
        assert_eq!(decode_bytes(Path::new("x"), &bytes, encoding).unwrap(), "北京");
        assert!(matches!(
            resolve_encoding("klingon"),
            Err(ServiceError::UnknownEncoding(_))
        ));
    }
}
