//! Export: rank histograms as CSV, full results as JSON.
//!
//! JSON artifacts carry `schema_version` and the `config_id` of the
//! configuration that produced them. Unknown schema versions are rejected on
//! load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ConfigId;
use crate::ensemble::EnsembleResult;
use crate::trend::TrendPoint;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported schema version {found} (max supported: {max})", max = SCHEMA_VERSION)]
    UnsupportedSchema { found: u32 },
    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Payload of an exported artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Report {
    Ensemble { result: EnsembleResult },
    Trend { points: Vec<TrendPoint> },
}

/// A JSON artifact: schema version, config identity and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub schema_version: u32,
    pub config_id: ConfigId,
    pub report: Report,
}

impl Artifact {
    pub fn new(config_id: ConfigId, report: Report) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config_id,
            report,
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(artifact: &Artifact) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(artifact)?)
}

/// Parse an artifact, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<Artifact, ExportError> {
    let artifact: Artifact = serde_json::from_str(json)?;
    if artifact.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: artifact.schema_version,
        });
    }
    Ok(artifact)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Rank histogram as CSV. Columns: candidate, rank, count. Zero cells are
/// omitted.
pub fn export_histogram_csv(result: &EnsembleResult) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["candidate", "rank", "count"])?;
    write_histogram_rows(&mut wtr, result, None)?;
    finish(wtr)
}

/// Every trend point's histogram as CSV. Columns: point, fraction,
/// candidate, rank, count.
pub fn export_trend_csv(points: &[TrendPoint]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["point", "fraction", "candidate", "rank", "count"])?;
    for point in points {
        let prefix = [point.index.to_string(), format!("{:.6}", point.fraction)];
        write_histogram_rows(&mut wtr, &point.result, Some(&prefix))?;
    }
    finish(wtr)
}

fn write_histogram_rows(
    wtr: &mut csv::Writer<Vec<u8>>,
    result: &EnsembleResult,
    prefix: Option<&[String]>,
) -> Result<(), ExportError> {
    for (candidate, counts) in &result.per_candidate_rank_histogram {
        for (rank, count) in counts.iter().enumerate().filter(|(_, c)| **c > 0) {
            let mut record: Vec<String> = prefix.map(<[String]>::to_vec).unwrap_or_default();
            record.extend([candidate.to_string(), rank.to_string(), count.to_string()]);
            wtr.write_record(&record)?;
        }
    }
    Ok(())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr.into_inner().map_err(|e| ExportError::Io {
        path: PathBuf::from("<memory>"),
        source: e.into_error(),
    })?;
    Ok(String::from_utf8(data)?)
}

// ─── Files ──────────────────────────────────────────────────────────

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, contents).map_err(io_err)
}
