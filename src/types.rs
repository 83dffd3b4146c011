//! Unit-of-work model: keys, work items, and settled answer records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline phase a work item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Discover the organization responsible for a domain in a subject.
    Collection,
    /// Evaluate a property of an organization found during collection.
    Assessment,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Collection => "collection",
            Phase::Assessment => "assessment",
        }
    }

    /// File name of this phase's cache store inside a domain directory.
    pub fn cache_file_name(self) -> &'static str {
        match self {
            Phase::Collection => "organization.db",
            Phase::Assessment => "organization_cyber.db",
        }
    }

    /// File name of this phase's export for a domain slug.
    pub fn export_file_name(self, domain_slug: &str) -> String {
        match self {
            Phase::Collection => format!("organization_names_{}.csv", domain_slug),
            Phase::Assessment => format!("organization_cyber_{}.csv", domain_slug),
        }
    }

    /// Result columns this phase contributes to its export, in order.
    pub fn result_columns(self) -> &'static [&'static str] {
        match self {
            Phase::Collection => &["organization_name"],
            Phase::Assessment => &["organization", "responsibility_level", "explanation"],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable composite key of one lookup: phase tag, domain, subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkKey {
    pub phase: Phase,
    pub domain: String,
    pub subject: String,
}

impl WorkKey {
    pub fn new(phase: Phase, domain: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            phase,
            domain: domain.into(),
            subject: subject.into(),
        }
    }

    /// Byte key used by the on-disk store.
    pub fn storage_key(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Key of the same subject/domain pair in another phase.
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            domain: self.domain.clone(),
            subject: self.subject.clone(),
        }
    }
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.phase, self.domain, self.subject)
    }
}

/// Request payload sent to the answering service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub prompt: String,
    /// Name of the structured answer the service is asked to produce.
    pub schema_name: String,
    /// JSON schema of the structured answer.
    pub schema: serde_json::Value,
}

/// One remote lookup. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    key: WorkKey,
    request: AnswerRequest,
}

impl WorkItem {
    pub fn new(key: WorkKey, request: AnswerRequest) -> Self {
        Self { key, request }
    }

    pub fn key(&self) -> &WorkKey {
        &self.key
    }

    pub fn request(&self) -> &AnswerRequest {
        &self.request
    }

    pub fn phase(&self) -> Phase {
        self.key.phase
    }
}

/// Unvalidated answer returned by the answering service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawAnswer {
    pub body: String,
    pub citations: Vec<String>,
}

/// Confidence the answering service reports for its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
            Confidence::None => "NONE",
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Confidence::High),
            "MEDIUM" => Ok(Confidence::Medium),
            "LOW" => Ok(Confidence::Low),
            "NONE" => Ok(Confidence::None),
            other => Err(format!("unknown confidence level '{}'", other)),
        }
    }
}

/// Level of cybersecurity responsibility held by an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponsibilityLevel {
    High,
    Low,
    None,
}

impl ResponsibilityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponsibilityLevel::High => "HIGH",
            ResponsibilityLevel::Low => "LOW",
            ResponsibilityLevel::None => "NONE",
        }
    }
}

impl FromStr for ResponsibilityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(ResponsibilityLevel::High),
            "LOW" => Ok(ResponsibilityLevel::Low),
            "NONE" => Ok(ResponsibilityLevel::None),
            other => Err(format!("unknown responsibility level '{}'", other)),
        }
    }
}

/// Organization named by a collection answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationAnswer {
    pub organization_name: String,
}

/// Cybersecurity assessment of one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyberAssessment {
    pub organization: String,
    pub country: String,
    pub responsibility_level: ResponsibilityLevel,
    pub explanation: Option<String>,
}

/// Validated result payload. The variant must match the phase of its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerPayload {
    Organization(OrganizationAnswer),
    CyberAssessment(CyberAssessment),
}

impl AnswerPayload {
    pub fn phase(&self) -> Phase {
        match self {
            AnswerPayload::Organization(_) => Phase::Collection,
            AnswerPayload::CyberAssessment(_) => Phase::Assessment,
        }
    }

    /// Values for [`Phase::result_columns`], in the same order.
    pub fn column_values(&self) -> Vec<String> {
        match self {
            AnswerPayload::Organization(org) => vec![org.organization_name.clone()],
            AnswerPayload::CyberAssessment(a) => vec![
                a.organization.clone(),
                a.responsibility_level.as_str().to_string(),
                a.explanation.clone().unwrap_or_default(),
            ],
        }
    }
}

/// Terminal status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerStatus {
    Success,
    FailedPermanent,
}

/// Settled outcome of a work item. Final truth for its key once committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub key: WorkKey,
    pub payload: AnswerPayload,
    pub quality: Confidence,
    pub status: AnswerStatus,
    pub citations: Vec<String>,
    /// Unix epoch milliseconds at which the answer was settled.
    pub answered_at_ms: u64,
}

impl AnswerRecord {
    pub fn success(
        key: WorkKey,
        payload: AnswerPayload,
        quality: Confidence,
        citations: Vec<String>,
    ) -> Self {
        Self {
            key,
            payload,
            quality,
            status: AnswerStatus::Success,
            citations,
            answered_at_ms: now_millis(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AnswerStatus::Success
    }
}

pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Display name of a domain: trimmed and title-cased per word.
pub fn domain_display_name(domain: &str) -> String {
    domain
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Directory-safe slug of a domain: lower-case, spaces and slashes replaced by `_`.
pub fn domain_slug(domain: &str) -> String {
    domain
        .trim()
        .to_lowercase()
        .replace([' ', '/'], "_")
}
