use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Candidate profile parts
// =============================================================================

/// One entry of a candidate's work history.
///
/// Every field is optional: extraction from free-form resumes regularly
/// leaves gaps, and downstream consumers substitute empty values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperience {
    pub company: Option<String>,
    pub position: Option<String>,
    /// Free-form period, e.g. "2021-2023".
    pub duration: Option<String>,
    pub description: Option<String>,
    pub achievements: Vec<String>,
}

impl WorkExperience {
    /// Company name, empty when missing.
    pub fn company(&self) -> &str {
        self.company.as_deref().unwrap_or_default()
    }

    /// Job title, empty when missing.
    pub fn position(&self) -> &str {
        self.position.as_deref().unwrap_or_default()
    }

    /// Role description, empty when missing.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// A degree or course of study.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub year: Option<String>,
}

/// A project listed on a resume.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// Candidate records
// =============================================================================

/// A candidate as held by the system of record.
///
/// `candidate_id` is the only identity the search subsystem relies on.
/// `email` is unique in the store but is never used to match index entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub candidate_id: i64,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A parsed resume profile that has not been assigned an id yet.
///
/// This is the shape handed over by the extraction pipeline; the store
/// assigns (or reuses, keyed by email) the `candidate_id`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewCandidate {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub work_experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
    pub projects: Vec<Project>,
    pub certifications: Vec<String>,
}

/// A hydrated search result returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub candidate_id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub work_experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
    pub projects: Vec<Project>,
    pub certifications: Vec<String>,
    /// Distance between query and best-matching document (lower is closer).
    pub similarity_score: f64,
}

impl CandidateMatch {
    /// Build a match from a stored profile and its distance to the query.
    pub fn from_record(record: CandidateRecord, similarity_score: f64) -> Self {
        Self {
            candidate_id: record.candidate_id,
            full_name: record.full_name,
            email: record.email,
            phone: record.phone,
            skills: record.skills,
            work_experience: record.work_experience,
            education: record.education,
            projects: record.projects,
            certifications: record.certifications,
            similarity_score,
        }
    }
}
