//! CSV export of enriched records.
//!
//! Epistemic foundation:
//! - K_i: Region columns follow the built-in region table order
//! - K_i: The file appears whole or not at all (temp file + rename)
//! - B_i: The output directory is writable (might fail → Export error)

use crate::checkpoint::Checkpoint;
use crate::models::{MatchFetchError, REGIONS, Record, Result};
use crate::pipeline::{ExportReport, Exporter};
use chrono::Local;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Characters that cannot appear in exported file names.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '.'];

/// Fallback file name stems.
const DEFAULT_PERSON: &str = "person";
const DEFAULT_JOURNEY: &str = "journey";

/// Writes one CSV row per record.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
    privacy_mode: bool,
    subject_name: Option<String>,
    paternal_code: Option<String>,
}

impl CsvExporter {
    /// Create an exporter writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            privacy_mode: false,
            subject_name: None,
            paternal_code: None,
        }
    }

    /// Anonymize identifiers and drop identifying columns.
    pub fn privacy_mode(mut self, enabled: bool) -> Self {
        self.privacy_mode = enabled;
        self
    }

    /// Name used for the file outside privacy mode.
    pub fn subject_name(mut self, name: Option<String>) -> Self {
        self.subject_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    /// The account's paternal cluster code, driving the parent column.
    pub fn paternal_code(mut self, code: Option<String>) -> Self {
        self.paternal_code = code;
        self
    }

    /// File name for a set of records exported today.
    pub fn file_name(&self, records: &[Record]) -> String {
        let stem = if self.privacy_mode {
            most_common_journey(records).unwrap_or_else(|| DEFAULT_JOURNEY.to_string())
        } else {
            self.subject_name
                .clone()
                .unwrap_or_else(|| DEFAULT_PERSON.to_string())
        };
        format!(
            "{}_{}_{}.csv",
            sanitize_file_name(&stem),
            Local::now().format("%Y%m%d"),
            records.len()
        )
    }

    fn header(&self) -> Vec<&str> {
        let fixed: &[&str] = if self.privacy_mode {
            &["ID", "Journeys", "Sub Journeys"]
        } else {
            &["Name", "ID", "Parent", "cM", "Journeys", "Sub Journeys"]
        };
        fixed
            .iter()
            .copied()
            .chain(REGIONS.iter().map(|(_, name)| *name))
            .collect()
    }

    fn row(&self, record: &Record) -> Vec<String> {
        let journeys = record
            .journey_names
            .as_deref()
            .unwrap_or_default()
            .join(";");
        let subjourneys = record
            .subjourneys
            .as_deref()
            .unwrap_or_default()
            .join(";");

        let mut row = if self.privacy_mode {
            vec![hash_id(&record.sample_id), journeys, subjourneys]
        } else {
            vec![
                record.display_name().unwrap_or_default().to_string(),
                record.sample_id.clone(),
                parent_label(self.paternal_code.as_deref(), record.cluster_code()).to_string(),
                record.shared_centimorgans().unwrap_or_default(),
                journeys,
                subjourneys,
            ]
        };

        let shares: HashMap<&str, f64> = record
            .regions
            .iter()
            .flatten()
            .map(|r| (r.key.as_str(), r.percentage))
            .collect();
        row.extend(REGIONS.iter().map(|(key, _)| match shares.get(key) {
            Some(pct) => pct.to_string(),
            None => "0".to_string(),
        }));
        row
    }

    /// Write `records` to `path` atomically.
    pub fn write(&self, records: &[Record], path: &Path) -> Result<usize> {
        let context = path.display().to_string();
        let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
        let dir = dir.unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| MatchFetchError::export(&context, e))?;

        let temp = NamedTempFile::new_in(dir).map_err(|e| MatchFetchError::export(&context, e))?;
        {
            let mut writer = csv::Writer::from_writer(BufWriter::new(temp.as_file()));
            writer
                .write_record(self.header())
                .map_err(|e| MatchFetchError::export(&context, e))?;
            for record in records {
                writer
                    .write_record(self.row(record))
                    .map_err(|e| MatchFetchError::export(&context, e))?;
            }
            let mut inner = writer
                .into_inner()
                .map_err(|e| MatchFetchError::export(&context, e.error()))?;
            inner
                .flush()
                .map_err(|e| MatchFetchError::export(&context, e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| MatchFetchError::export(&context, e))?;
        temp.persist(path)
            .map_err(|e| MatchFetchError::export(&context, e.error))?;

        debug!(path = %context, rows = records.len(), "CSV written");
        Ok(records.len())
    }
}

impl Exporter for CsvExporter {
    fn export(&self, checkpoint: &Checkpoint) -> Result<ExportReport> {
        let path = self.output_dir.join(self.file_name(&checkpoint.records));
        let rows = self.write(&checkpoint.records, &path)?;
        Ok(ExportReport { path, rows })
    }
}

/// Parent column for a match given the account's paternal code.
pub fn parent_label(paternal_code: Option<&str>, cluster_code: Option<&str>) -> &'static str {
    let Some(paternal) = paternal_code.filter(|c| matches!(*c, "p1" | "p2")) else {
        return "";
    };
    match cluster_code {
        Some(code) if code == paternal => "Paternal side",
        Some("p1" | "p2") => "Maternal side",
        Some("both") => "Both sides",
        Some("no_call") => "Unassigned",
        _ => "",
    }
}

/// Replace whitespace runs with `_` and strip characters invalid in file names.
pub fn sanitize_file_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace(FORBIDDEN_CHARS, "_")
}

fn hash_id(sample_id: &str) -> String {
    let digest = Sha256::digest(sample_id.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Most frequent journey name; ties go to the name seen first.
fn most_common_journey(records: &[Record]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for name in records.iter().filter_map(|r| r.journey_names.as_ref()).flatten() {
        let order = counts.len();
        counts.entry(name.as_str()).or_insert((0, order)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, oa)), (_, (cb, ob))| ca.cmp(cb).then(ob.cmp(oa)))
        .map(|(name, _)| name.to_string())
}
