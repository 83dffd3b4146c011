//! Answer validation
//!
//! Turns a raw answer body into the phase's tagged payload and a confidence
//! marker. Any failure here is a permanent item failure.

use crate::error::AnswerError;
use crate::types::{
    AnswerPayload, Confidence, CyberAssessment, OrganizationAnswer, Phase, RawAnswer,
    ResponsibilityLevel,
};
use serde::Deserialize;

/// Validated answer ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedAnswer {
    pub payload: AnswerPayload,
    pub quality: Confidence,
}

/// Converts raw answers into payloads for a phase.
pub trait AnswerValidator: Send + Sync {
    fn validate(&self, phase: Phase, raw: &RawAnswer) -> Result<ValidatedAnswer, AnswerError>;
}

#[derive(Deserialize)]
struct OrganizationWire {
    organization_name: String,
    confidence: String,
}

#[derive(Deserialize)]
struct CyberWire {
    organization: String,
    country: String,
    responsibility_level: String,
    #[serde(default)]
    explanation: Option<String>,
    confidence: String,
}

/// JSON validator for the organization and cyber assessment answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAnswerValidator;

impl AnswerValidator for JsonAnswerValidator {
    fn validate(&self, phase: Phase, raw: &RawAnswer) -> Result<ValidatedAnswer, AnswerError> {
        let body = extract_json(&raw.body)?;
        match phase {
            Phase::Collection => {
                let wire: OrganizationWire = parse(body)?;
                let organization_name = non_empty("organization_name", wire.organization_name)?;
                Ok(ValidatedAnswer {
                    payload: AnswerPayload::Organization(OrganizationAnswer { organization_name }),
                    quality: parse_confidence(&wire.confidence)?,
                })
            }
            Phase::Assessment => {
                let wire: CyberWire = parse(body)?;
                let responsibility_level = wire
                    .responsibility_level
                    .parse::<ResponsibilityLevel>()
                    .map_err(AnswerError::Validation)?;
                Ok(ValidatedAnswer {
                    payload: AnswerPayload::CyberAssessment(CyberAssessment {
                        organization: non_empty("organization", wire.organization)?,
                        country: non_empty("country", wire.country)?,
                        responsibility_level,
                        explanation: wire
                            .explanation
                            .map(|e| e.trim().to_string())
                            .filter(|e| !e.is_empty()),
                    }),
                    quality: parse_confidence(&wire.confidence)?,
                })
            }
        }
    }
}

fn parse<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T, AnswerError> {
    serde_json::from_str(body)
        .map_err(|e| AnswerError::Validation(format!("Answer is not valid JSON: {}", e)))
}

fn parse_confidence(value: &str) -> Result<Confidence, AnswerError> {
    value.parse::<Confidence>().map_err(AnswerError::Validation)
}

fn non_empty(field: &str, value: String) -> Result<String, AnswerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AnswerError::Validation(format!("Field '{}' is empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Locate the JSON object in an answer body.
///
/// Reasoning blocks (`<think>...</think>`) and markdown code fences are dropped;
/// the object runs from the first `{` to the last `}`.
fn extract_json(body: &str) -> Result<&str, AnswerError> {
    let body = match body.rfind("</think>") {
        Some(end) => &body[end + "</think>".len()..],
        None => body,
    };
    let start = body.find('{');
    let end = body.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(AnswerError::Validation(
            "Answer does not contain a JSON object".to_string(),
        )),
    }
}
