//! Phase exports
//!
//! Each settled phase is written once as a table: one header row, then one row
//! per successful record with subject, domain, the phase's result columns and
//! the quality marker.

use crate::error::ExportError;
use crate::types::{AnswerRecord, Phase};
use std::path::{Path, PathBuf};
use tracing::info;

pub trait PhaseExporter: Send + Sync {
    /// Write `records` for `phase` into `dir`, replacing any previous export.
    fn export(
        &self,
        phase: Phase,
        dir: &Path,
        domain_slug: &str,
        records: &[AnswerRecord],
    ) -> Result<PathBuf, ExportError>;
}

/// CSV exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

pub fn header(phase: Phase) -> Vec<&'static str> {
    let mut columns = vec!["subject", "domain"];
    columns.extend_from_slice(phase.result_columns());
    columns.push("quality");
    columns
}

impl PhaseExporter for CsvExporter {
    fn export(
        &self,
        phase: Phase,
        dir: &Path,
        domain_slug: &str,
        records: &[AnswerRecord],
    ) -> Result<PathBuf, ExportError> {
        let path = dir.join(phase.export_file_name(domain_slug));
        let write_err = |message: String| ExportError::Write {
            path: path.clone(),
            message,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(|e| write_err(e.to_string()))?;
        writer
            .write_record(header(phase))
            .map_err(|e| write_err(e.to_string()))?;

        let mut rows = 0;
        for record in records
            .iter()
            .filter(|r| r.is_success() && r.key.phase == phase)
        {
            let mut row = vec![record.key.subject.clone(), record.key.domain.clone()];
            row.extend(record.payload.column_values());
            row.push(record.quality.as_str().to_string());
            writer
                .write_record(&row)
                .map_err(|e| write_err(e.to_string()))?;
            rows += 1;
        }
        writer.flush().map_err(|e| write_err(e.to_string()))?;

        info!(phase = %phase, rows, path = %path.display(), "Exported records");
        Ok(path)
    }
}
