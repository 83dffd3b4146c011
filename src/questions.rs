//! Question library: builds the work items for each phase.
//!
//! Collection asks which organization is responsible for a domain in a
//! subject country. Assessment asks whether that organization is responsible
//! for cybersecurity. Each request carries the JSON schema of the answer the
//! validator expects.

use crate::types::{
    AnswerPayload, AnswerRecord, AnswerRequest, Phase, WorkItem, WorkKey,
};
use serde_json::{json, Value};

pub const ORGANIZATION_SCHEMA_NAME: &str = "OrganizationModel";
pub const CYBER_SCHEMA_NAME: &str = "OrganizationCyberModel";

const ORGANIZATION_TEMPLATE: &str = "What is the top-level state Organ (i.e., ministry/department/agency) responsible for {domain} in {country}?";

const CYBER_TEMPLATE: &str = "Is the {organization} in {country} responsible for cybersecurity?

A ministry handles cybersecurity if it: Is explicitly mentioned in a national strategy/law/report as being responsible for cybersecurity policy, implementation, or technical coordination; Hosts a national CERT/CSIRT/CIRT; Leads or is a member of a cybersecurity committee, council, or working group; Oversees information security standards, network protection, or the like; Attends or participates in events, workshops, or press releases; or works with other countries or organizations on joint initiatives.
";

fn confidence_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "enum": ["HIGH", "MEDIUM", "LOW", "NONE"],
        "description": description,
    })
}

pub fn organization_schema() -> Value {
    json!({
        "title": ORGANIZATION_SCHEMA_NAME,
        "type": "object",
        "properties": {
            "organization_name": {
                "type": "string",
                "description": "Name of the top-level state Organ (i.e., ministry/department/agency). If no such Organ exists, return 'NONE'."
            },
            "confidence": confidence_schema("Confidence level of your assessment."),
        },
        "required": ["organization_name", "confidence"],
    })
}

pub fn cyber_schema() -> Value {
    json!({
        "title": CYBER_SCHEMA_NAME,
        "type": "object",
        "properties": {
            "organization": {
                "type": "string",
                "description": "Name of the given top-level state Organ (i.e., ministry/department/agency)."
            },
            "country": {
                "type": "string",
                "description": "Country that the organization belongs to."
            },
            "responsibility_level": {
                "type": "string",
                "enum": ["HIGH", "LOW", "NONE"],
                "description": "Level of cybersecurity responsibility"
            },
            "explanation": {
                "type": ["string", "null"],
                "description": "Explanation for the assessment including evidence and citation references after each claim."
            },
            "confidence": confidence_schema("Confidence level of this assessment"),
        },
        "required": ["organization", "country", "responsibility_level", "confidence"],
    })
}

pub fn collection_request(domain: &str, country: &str) -> AnswerRequest {
    let prompt = ORGANIZATION_TEMPLATE
        .replace("{domain}", &domain.to_uppercase())
        .replace("{country}", &country.to_uppercase());
    AnswerRequest {
        prompt,
        schema_name: ORGANIZATION_SCHEMA_NAME.to_string(),
        schema: organization_schema(),
    }
}

pub fn assessment_request(organization: &str, country: &str) -> AnswerRequest {
    let prompt = CYBER_TEMPLATE
        .replace("{organization}", organization)
        .replace("{country}", country);
    AnswerRequest {
        prompt,
        schema_name: CYBER_SCHEMA_NAME.to_string(),
        schema: cyber_schema(),
    }
}

/// One collection item per subject, in subject order.
pub fn collection_items(domain: &str, subjects: &[String]) -> Vec<WorkItem> {
    subjects
        .iter()
        .map(|subject| {
            WorkItem::new(
                WorkKey::new(Phase::Collection, domain, subject.as_str()),
                collection_request(domain, subject),
            )
        })
        .collect()
}

/// Assessment items for every successful collection record.
///
/// Records that are not SUCCESS or do not carry an organization are skipped.
pub fn assessment_items(collection: &[AnswerRecord]) -> Vec<WorkItem> {
    collection
        .iter()
        .filter(|record| record.is_success())
        .filter_map(|record| match &record.payload {
            AnswerPayload::Organization(org) => Some(WorkItem::new(
                record.key.with_phase(Phase::Assessment),
                assessment_request(&org.organization_name, &record.key.subject),
            )),
            AnswerPayload::CyberAssessment(_) => None,
        })
        .collect()
}
