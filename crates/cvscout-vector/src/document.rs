//! Derivation of the text that represents a candidate in the vector index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cvscout_core::types::{CandidateRecord, WorkExperience};

/// Metadata stored alongside each embedded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub candidate_id: i64,
    pub full_name: String,
    pub email: String,
}

impl DocumentMetadata {
    /// Metadata as the JSON object stored with the vector.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "candidate_id": self.candidate_id,
            "full_name": self.full_name,
            "email": self.email,
        })
    }
}

/// One embeddable unit derived from a candidate record.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Build the embedding document for a candidate.
///
/// The text has the shape
/// `Skills: a, b. Work Experience: Co - Role: desc; Co2 - Role2: desc2`.
/// Entries are rendered as stored, blank ones included. A section is only
/// emitted when at least one of its entries has text; a candidate with
/// neither produces `None` and stays out of the index.
pub fn build_document(candidate: &CandidateRecord) -> Option<EmbeddingDocument> {
    let mut sections = Vec::with_capacity(2);
    if candidate.skills.iter().any(|s| !s.trim().is_empty()) {
        sections.push(format!("Skills: {}", candidate.skills.join(", ")));
    }
    if candidate.work_experience.iter().any(has_text) {
        let work = candidate
            .work_experience
            .iter()
            .map(render_experience)
            .collect::<Vec<_>>()
            .join("; ");
        sections.push(format!("Work Experience: {}", work));
    }

    let text = sections.join(". ");
    if text.trim().is_empty() {
        return None;
    }

    Some(EmbeddingDocument {
        text,
        metadata: DocumentMetadata {
            candidate_id: candidate.candidate_id,
            full_name: candidate.full_name.clone(),
            email: candidate.email.clone(),
        },
    })
}

fn render_experience(exp: &WorkExperience) -> String {
    format!("{} - {}: {}", exp.company(), exp.position(), exp.description())
}

fn has_text(exp: &WorkExperience) -> bool {
    [exp.company(), exp.position(), exp.description()]
        .iter()
        .any(|field| !field.trim().is_empty())
}
