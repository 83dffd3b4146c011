//! Subject and domain lists
//!
//! Lists are headerless one-column CSV files. The bundled copies under `data/`
//! are compiled in and used when no file is configured.

use crate::error::ConfigError;
use std::io::Read;
use std::path::Path;

const BUNDLED_COUNTRIES: &str = include_str!("../data/countries.csv");
const BUNDLED_DOMAINS: &str = include_str!("../data/domains.csv");

/// The bundled subject list (UN member states).
pub fn default_subjects() -> Result<Vec<String>, ConfigError> {
    parse_list(BUNDLED_COUNTRIES.as_bytes(), Path::new("data/countries.csv"))
}

/// The bundled domain list.
pub fn default_domains() -> Result<Vec<String>, ConfigError> {
    parse_list(BUNDLED_DOMAINS.as_bytes(), Path::new("data/domains.csv"))
}

/// Load a list from `path`, or the bundled list when `path` is `None`.
pub fn load_subjects(path: Option<&Path>) -> Result<Vec<String>, ConfigError> {
    match path {
        Some(path) => load_list(path),
        None => default_subjects(),
    }
}

pub fn load_domains(path: Option<&Path>) -> Result<Vec<String>, ConfigError> {
    match path {
        Some(path) => load_list(path),
        None => default_domains(),
    }
}

pub fn load_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_list(file, path)
}

/// Parse the first column of every non-empty row, in file order.
fn parse_list<R: Read>(reader: R, origin: &Path) -> Result<Vec<String>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut values = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| ConfigError::Read {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(value) = row.get(0).filter(|v| !v.is_empty()) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

/// Split a comma-separated `--domains` argument.
pub fn parse_domain_arg(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}
