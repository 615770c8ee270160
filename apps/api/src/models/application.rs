use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::Job;
use crate::models::user::CandidateSummary;
use crate::screening::ScreeningResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Applied,
    Reviewing,
    Interview,
    Offer,
    Rejected,
}

#[derive(Debug, Error)]
#[error("Unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Reviewing => "REVIEWING",
            ApplicationStatus::Interview => "INTERVIEW",
            ApplicationStatus::Offer => "OFFER",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPLIED" => Ok(ApplicationStatus::Applied),
            "REVIEWING" => Ok(ApplicationStatus::Reviewing),
            "INTERVIEW" => Ok(ApplicationStatus::Interview),
            "OFFER" => Ok(ApplicationStatus::Offer),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One candidate's application to one job. `(user_id, job_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub resume_key: Option<String>,
    pub ai_score: Option<i32>,
    /// Raw screening payload as stored.
    pub ai_analysis: Option<Value>,
    pub is_reviewed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row to insert for a first-time submission.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub resume_key: String,
    pub ai_score: i32,
    pub ai_analysis: Value,
}

/// Fields replaced when a candidate overwrites an earlier submission.
/// Status and the reviewed flag are never part of a resubmission.
#[derive(Debug, Clone)]
pub struct Resubmission {
    pub resume_key: String,
    pub ai_score: i32,
    pub ai_analysis: Value,
    pub submitted_at: DateTime<Utc>,
}

impl Application {
    #[cfg(test)]
    pub fn from_new(new: NewApplication, now: DateTime<Utc>) -> Application {
        Application {
            id: new.id,
            user_id: new.user_id,
            job_id: new.job_id,
            status: ApplicationStatus::Applied,
            resume_key: Some(new.resume_key),
            ai_score: Some(new.ai_score),
            ai_analysis: Some(new.ai_analysis),
            is_reviewed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// New snapshot with the resubmission applied; `self` is left as it was.
    pub fn resubmitted(&self, patch: &Resubmission) -> Application {
        Application {
            resume_key: Some(patch.resume_key.clone()),
            ai_score: Some(patch.ai_score),
            ai_analysis: Some(patch.ai_analysis.clone()),
            updated_at: patch.submitted_at,
            ..self.clone()
        }
    }

    /// Parses the stored payload. Payloads written by older schemas yield `None`.
    pub fn analysis(&self) -> Option<ScreeningResult> {
        self.ai_analysis
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Application as returned by the API: the record plus parsed analysis and
/// whichever related entities the endpoint loads.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub analysis: Option<ScreeningResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<CandidateSummary>,
}

impl ApplicationView {
    pub fn new(application: Application) -> Self {
        let analysis = application.analysis();
        Self {
            application,
            analysis,
            job: None,
            candidate: None,
        }
    }

    pub fn with_job(mut self, job: Option<Job>) -> Self {
        self.job = job;
        self
    }

    pub fn with_candidate(mut self, candidate: Option<CandidateSummary>) -> Self {
        self.candidate = candidate;
        self
    }
}
