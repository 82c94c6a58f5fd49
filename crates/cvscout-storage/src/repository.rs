//! SQLite-backed candidate repository.
//!
//! List-valued profile fields are stored as JSON text columns. Reading is
//! lenient: a column that fails to decode yields an empty list and a warning,
//! never an error, since extraction output is often incomplete.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rusqlite::OptionalExtension;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use cvscout_core::error::{CvScoutError, Result};
use cvscout_core::source::{CandidateLookup, CandidateSource};
use cvscout_core::types::{CandidateRecord, NewCandidate};

use crate::db::Database;

const SELECT_COLUMNS: &str = "SELECT id, full_name, email, phone, education, work_experience, \
     skills, projects, certifications, created_at FROM candidates";

/// A profile from a batch that could not be saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCandidate {
    /// Position of the profile in the submitted batch.
    pub index: usize,
    pub email: String,
    pub reason: String,
}

/// Outcome of [`CandidateRepository::save_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Ids of saved candidates, in batch order.
    pub saved: Vec<i64>,
    pub skipped: Vec<SkippedCandidate>,
}

/// Repository for candidate profiles.
#[derive(Debug, Clone)]
pub struct CandidateRepository {
    db: Arc<Database>,
}

impl CandidateRepository {
    /// Create a repository over an opened database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a candidate, or update the existing row with the same email.
    ///
    /// Returns the candidate id; an update keeps the original id.
    pub fn upsert(&self, candidate: &NewCandidate) -> Result<i64> {
        let email = candidate.email.trim();
        if email.is_empty() {
            return Err(CvScoutError::Storage(
                "Cannot save candidate without an email".to_string(),
            ));
        }

        let education = encode_list(&candidate.education)?;
        let work_experience = encode_list(&candidate.work_experience)?;
        let skills = encode_list(&candidate.skills)?;
        let projects = encode_list(&candidate.projects)?;
        let certifications = encode_list(&candidate.certifications)?;

        let id = self.db.with_conn(|conn| {
            conn.query_row(
                "INSERT INTO candidates
                    (full_name, email, phone, education, work_experience, skills, projects, certifications)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(email) DO UPDATE SET
                    full_name       = excluded.full_name,
                    phone           = excluded.phone,
                    education       = excluded.education,
                    work_experience = excluded.work_experience,
                    skills          = excluded.skills,
                    projects        = excluded.projects,
                    certifications  = excluded.certifications,
                    updated_at      = strftime('%s', 'now')
                 RETURNING id",
                rusqlite::params![
                    candidate.full_name,
                    email,
                    candidate.phone,
                    education,
                    work_experience,
                    skills,
                    projects,
                    certifications,
                ],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| CvScoutError::Storage(format!("Failed to save candidate: {}", e)))
        })?;

        info!(candidate_id = id, "Saved candidate {}", candidate.full_name);
        Ok(id)
    }

    /// Save every profile in `candidates`, skipping the ones that fail.
    ///
    /// A rejected profile does not stop the rest of the batch.
    pub fn save_batch(&self, candidates: &[NewCandidate]) -> ImportReport {
        let mut report = ImportReport::default();
        for (index, candidate) in candidates.iter().enumerate() {
            match self.upsert(candidate) {
                Ok(id) => report.saved.push(id),
                Err(e) => {
                    warn!(index, email = %candidate.email, error = %e, "Skipping candidate");
                    report.skipped.push(SkippedCandidate {
                        index,
                        email: candidate.email.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            saved = report.saved.len(),
            skipped = report.skipped.len(),
            "Batch save complete"
        );
        report
    }

    /// Find a candidate by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<CandidateRecord>> {
        self.find_one(&format!("{} WHERE id = ?1", SELECT_COLUMNS), rusqlite::params![id])
    }

    /// Find a candidate by email.
    pub fn find_by_email(&self, email: &str) -> Result<Option<CandidateRecord>> {
        self.find_one(
            &format!("{} WHERE email = ?1", SELECT_COLUMNS),
            rusqlite::params![email.trim()],
        )
    }

    /// List every candidate ordered by id.
    pub fn list_all(&self) -> Result<Vec<CandidateRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("{} ORDER BY id ASC", SELECT_COLUMNS))
                .map_err(|e| CvScoutError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_candidate(row)))
                .map_err(|e| CvScoutError::Storage(e.to_string()))?;

            let mut candidates = Vec::new();
            for row in rows {
                let candidate = row.map_err(|e| CvScoutError::Storage(e.to_string()))??;
                candidates.push(candidate);
            }
            Ok(candidates)
        })
    }

    /// Delete a candidate. Returns whether a row was removed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM candidates WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| CvScoutError::Storage(format!("Failed to delete candidate: {}", e)))?;
            Ok(affected > 0)
        })
    }

    /// Count stored candidates.
    pub fn count(&self) -> Result<u64> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM candidates", [], |row| row.get(0))
                .map_err(|e| CvScoutError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    fn find_one(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<CandidateRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| CvScoutError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(params, |row| Ok(row_to_candidate(row)))
                .optional()
                .map_err(|e| CvScoutError::Storage(e.to_string()))?;

            result.transpose()
        })
    }
}

impl CandidateSource for CandidateRepository {
    fn all_candidates(&self) -> Result<Vec<CandidateRecord>> {
        self.list_all()
    }
}

impl CandidateLookup for CandidateRepository {
    fn get_candidate(&self, candidate_id: i64) -> Result<Option<CandidateRecord>> {
        self.find_by_id(candidate_id)
    }
}

fn encode_list<T: Serialize>(items: &[T]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

fn decode_list<T: DeserializeOwned>(raw: Option<String>, column: &str, id: i64) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!(candidate_id = id, column, error = %e, "Malformed list column, treating as empty");
            Vec::new()
        }
    }
}

fn row_to_candidate(row: &rusqlite::Row<'_>) -> Result<CandidateRecord> {
    let get_err = |e: rusqlite::Error| CvScoutError::Storage(e.to_string());

    let id: i64 = row.get(0).map_err(get_err)?;
    let full_name: String = row.get(1).map_err(get_err)?;
    let email: String = row.get(2).map_err(get_err)?;
    let phone: Option<String> = row.get(3).map_err(get_err)?;
    let education: Option<String> = row.get(4).map_err(get_err)?;
    let work_experience: Option<String> = row.get(5).map_err(get_err)?;
    let skills: Option<String> = row.get(6).map_err(get_err)?;
    let projects: Option<String> = row.get(7).map_err(get_err)?;
    let certifications: Option<String> = row.get(8).map_err(get_err)?;
    let created_at: i64 = row.get(9).map_err(get_err)?;

    Ok(CandidateRecord {
        candidate_id: id,
        full_name,
        email,
        phone,
        skills: decode_list(skills, "skills", id),
        work_experience: decode_list(work_experience, "work_experience", id),
        education: decode_list(education, "education", id),
        projects: decode_list(projects, "projects", id),
        certifications: decode_list(certifications, "certifications", id),
        created_at: Utc
            .timestamp_opt(created_at, 0)
            .single()
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvscout_core::types::WorkExperience;

    fn make_repo() -> CandidateRepository {
        CandidateRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn make_candidate(name: &str, email: &str, skills: &[&str]) -> NewCandidate {
        NewCandidate {
            full_name: name.to_string(),
            email: email.to_string(),
            phone: Some("+84123456789".to_string()),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            work_experience: vec![WorkExperience {
                company: Some("Acme".to_string()),
                position: Some("Engineer".to_string()),
                duration: Some("2021-2023".to_string()),
                description: Some("Built APIs".to_string()),
                achievements: vec![],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_and_find_by_id() {
        let repo = make_repo();
        let id = repo
            .upsert(&make_candidate("Jane Doe", "jane@example.com", &["Python", "SQL"]))
            .unwrap();

        let found = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(found.candidate_id, id);
        assert_eq!(found.full_name, "Jane Doe");
        assert_eq!(found.skills, vec!["Python".to_string(), "SQL".to_string()]);
        assert_eq!(found.work_experience.len(), 1);
        assert_eq!(found.work_experience[0].company(), "Acme");
    }

    #[test]
    fn test_upsert_same_email_keeps_id() {
        let repo = make_repo();
        let first = repo
            .upsert(&make_candidate("Jane Doe", "jane@example.com", &["Python"]))
            .unwrap();
        let second = repo
            .upsert(&make_candidate("Jane D.", "jane@example.com", &["Rust"]))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.count().unwrap(), 1);

        let found = repo.find_by_email("jane@example.com").unwrap().unwrap();
        assert_eq!(found.full_name, "Jane D.");
        assert_eq!(found.skills, vec!["Rust".to_string()]);
    }

    #[test]
    fn test_upsert_rejects_blank_email() {
        let repo = make_repo();
        let result = repo.upsert(&make_candidate("No Mail", "   ", &["Java"]));
        assert!(matches!(result, Err(CvScoutError::Storage(_))));
    }

    #[test]
    fn test_save_batch_skips_invalid_profiles() {
        let repo = make_repo();
        let batch = vec![
            make_candidate("Ann", "ann@example.com", &["Python"]),
            make_candidate("NoMail", "  ", &["Java"]),
            make_candidate("Bob", "bob@example.com", &["SQL"]),
        ];

        let report = repo.save_batch(&batch);
        assert_eq!(report.saved.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert!(report.skipped[0].reason.contains("email"));
        assert_eq!(repo.count().unwrap(), 2);

        let bob = repo.find_by_email("bob@example.com").unwrap().unwrap();
        assert_eq!(report.saved[1], bob.candidate_id);
    }

    #[test]
    fn test_save_batch_all_invalid() {
        let repo = make_repo();
        let report = repo.save_batch(&[make_candidate("NoMail", "", &[])]);
        assert!(report.saved.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_find_missing_returns_none() {
        let repo = make_repo();
        assert!(repo.find_by_id(99).unwrap().is_none());
        assert!(repo.get_candidate(99).unwrap().is_none());
    }

    #[test]
    fn test_list_all_ordered_by_id() {
        let repo = make_repo();
        let a = repo.upsert(&make_candidate("A", "a@example.com", &[])).unwrap();
        let b = repo.upsert(&make_candidate("B", "b@example.com", &[])).unwrap();

        let all = repo.all_candidates().unwrap();
        let ids: Vec<i64> = all.iter().map(|c| c.candidate_id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_delete() {
        let repo = make_repo();
        let id = repo.upsert(&make_candidate("A", "a@example.com", &[])).unwrap();

        assert!(repo.delete(id).unwrap());
        assert!(!repo.delete(id).unwrap());
        assert!(repo.find_by_id(id).unwrap().is_none());
    }

    #[test]
    fn test_malformed_list_column_reads_as_empty() {
        let db = Arc::new(Database::in_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO candidates (full_name, email, skills)
                 VALUES ('Broken', 'broken@example.com', 'not json')",
                [],
            )
            .map_err(|e| CvScoutError::Storage(e.to_string()))?;
            Ok(())
        })
        .unwrap();

        let repo = CandidateRepository::new(db);
        let found = repo.find_by_email("broken@example.com").unwrap().unwrap();
        assert!(found.skills.is_empty());
        assert!(found.work_experience.is_empty());
    }
}
