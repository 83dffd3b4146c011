//! Human-readable batch and cache status output.

use crate::batch::{BatchSummary, DomainStatus};
use crate::cache::{AnswerCache, SledAnswerCache};
use crate::error::CacheError;
use crate::types::{domain_display_name, domain_slug, Phase};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_elapsed(summary: &BatchSummary) -> String {
    let secs = summary.elapsed.as_secs_f64();
    if secs >= 60.0 {
        format!("{}m {:02}s", (secs / 60.0).floor() as u64, (secs % 60.0).floor() as u64)
    } else {
        format!("{:.1}s", secs)
    }
}

fn status_line(summary: &BatchSummary) -> String {
    match summary.status {
        DomainStatus::Completed | DomainStatus::CompletedWithFailures => format!(
            "{} {}: {} orgs, {} assessments",
            "✓".green(),
            summary.domain,
            summary.collection.resolved(),
            summary.assessment.resolved()
        ),
        DomainStatus::Cancelled => format!("{} {}: cancelled", "-".yellow(), summary.domain),
        DomainStatus::Failed => format!(
            "{} {}: {}",
            "✗".red(),
            summary.domain,
            summary.error.as_deref().unwrap_or("failed")
        ),
    }
}

/// Format the cross-domain batch summary (comfy-table + section heading).
pub fn format_batch_summary_text(summaries: &[BatchSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Batch Summary")));
    if summaries.is_empty() {
        out.push_str("No domains processed.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Domain",
        "Status",
        "Collected",
        "Reused",
        "Failed",
        "Assessed",
        "Reused",
        "Failed",
        "Elapsed",
    ]);
    for summary in summaries {
        table.add_row(vec![
            summary.domain.clone(),
            summary.status.as_str().to_string(),
            summary.collection.succeeded.to_string(),
            summary.collection.reused.to_string(),
            summary.collection.failed.to_string(),
            summary.assessment.succeeded.to_string(),
            summary.assessment.reused.to_string(),
            summary.assessment.failed.to_string(),
            format_elapsed(summary),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));

    for summary in summaries {
        out.push_str(&status_line(summary));
        out.push('\n');
    }

    let completed = summaries.iter().filter(|s| s.status.is_ok()).count();
    out.push_str(&format!(
        "\nTotal: {} domains, {} completed.\n",
        summaries.len(),
        completed
    ));
    out
}

/// Cached record counts for one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatusEntry {
    pub domain: String,
    pub slug: String,
    /// `None` when the phase's cache has never been created
    pub organizations: Option<usize>,
    pub assessments: Option<usize>,
    pub collection_exported: bool,
    pub assessment_exported: bool,
}

/// Read cache counts for each domain under `output_root` without creating anything.
pub fn build_cache_status(
    output_root: &Path,
    domains: &[String],
) -> Result<Vec<CacheStatusEntry>, CacheError> {
    domains
        .iter()
        .map(|domain| {
            let slug = domain_slug(domain);
            let dir = output_root.join(&slug);
            Ok(CacheStatusEntry {
                domain: domain_display_name(domain),
                organizations: phase_count(&dir, Phase::Collection)?,
                assessments: phase_count(&dir, Phase::Assessment)?,
                collection_exported: dir.join(Phase::Collection.export_file_name(&slug)).exists(),
                assessment_exported: dir.join(Phase::Assessment.export_file_name(&slug)).exists(),
                slug,
            })
        })
        .collect()
}

fn phase_count(dir: &Path, phase: Phase) -> Result<Option<usize>, CacheError> {
    let path = dir.join(phase.cache_file_name());
    if !path.exists() {
        return Ok(None);
    }
    let cache = SledAnswerCache::open(&path)?;
    Ok(Some(cache.count(phase)?))
}

/// Format cache status as human-readable text (comfy-table + section heading).
pub fn format_cache_status_text(entries: &[CacheStatusEntry], output_root: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Cache Status")));
    out.push_str(&format!("  Output root: {}\n\n", output_root.display()));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Domain", "Organizations", "Assessments", "Exports"]);
    for entry in entries {
        let count = |c: Option<usize>| c.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        let exports = match (entry.collection_exported, entry.assessment_exported) {
            (true, true) => "both",
            (true, false) => "collection",
            (false, true) => "assessment",
            (false, false) => "none",
        };
        table.add_row(vec![
            entry.domain.clone(),
            count(entry.organizations),
            count(entry.assessments),
            exports.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    let started = entries.iter().filter(|e| e.organizations.is_some()).count();
    out.push_str(&format!(
        "\nTotal: {} domains, {} with cached answers.\n",
        entries.len(),
        started
    ));
    out
}

/// Format the domain list as text.
pub fn format_domain_list_text(domains: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Domains")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Domain", "Directory"]);
    for domain in domains {
        table.add_row(vec![domain_display_name(domain), domain_slug(domain)]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
