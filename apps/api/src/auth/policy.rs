//! Authorization policy: every role/ownership rule lives in `authorize`.
//!
//! Handlers describe what they are about to do as an `Action` and ask for a
//! verdict before touching storage. Missing resources are resolved to
//! `NotFound` by the caller first; this module only ever answers `Forbidden`.

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Role, User};

/// The authenticated principal, reduced to what policy decisions need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Action {
    CreateJob,
    /// Update or delete.
    ModifyJob { owner_id: Uuid },
    /// Read a single posting.
    ViewJob { owner_id: Uuid, is_active: bool },
    SubmitApplication,
    ReadApplication { applicant_id: Uuid, job_owner_id: Uuid },
    ToggleReviewed { job_owner_id: Uuid },
    ListJobApplications { job_owner_id: Uuid },
    ManageUsers,
}

pub fn authorize(actor: &Actor, action: Action) -> Result<(), AppError> {
    let allowed = match (actor.role, action) {
        (Role::Admin, Action::SubmitApplication) => false,
        (Role::Admin, _) => true,

        (Role::Client, Action::CreateJob) => true,
        (Role::Client, Action::ModifyJob { owner_id }) => owner_id == actor.id,
        (Role::Client, Action::ViewJob { owner_id, .. }) => owner_id == actor.id,
        (Role::Client, Action::ReadApplication { job_owner_id, .. })
        | (Role::Client, Action::ToggleReviewed { job_owner_id })
        | (Role::Client, Action::ListJobApplications { job_owner_id }) => {
            job_owner_id == actor.id
        }
        (Role::Client, _) => false,

        (Role::Candidate, Action::SubmitApplication) => true,
        (Role::Candidate, Action::ViewJob { is_active, .. }) => is_active,
        (Role::Candidate, Action::ReadApplication { applicant_id, .. }) => {
            applicant_id == actor.id
        }
        (Role::Candidate, _) => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(denial_message(actor.role, action).to_string()))
    }
}

fn denial_message(role: Role, action: Action) -> &'static str {
    match (role, action) {
        (_, Action::CreateJob) => "Not authorized to create jobs",
        (_, Action::ModifyJob { .. }) => "Not authorized to modify this job",
        (_, Action::ViewJob { .. }) => "Not authorized to view this job",
        (_, Action::SubmitApplication) => "Only candidates can apply to jobs",
        (_, Action::ReadApplication { .. }) => "Not authorized to view this application",
        (Role::Candidate, Action::ToggleReviewed { .. }) => {
            "Candidates cannot mark applications as reviewed"
        }
        (_, Action::ToggleReviewed { .. }) => "Not authorized to review this application",
        (_, Action::ListJobApplications { .. }) => {
            "Not authorized to view applications for this job"
        }
        (_, Action::ManageUsers) => "Not authorized",
    }
}
