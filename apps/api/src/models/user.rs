use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
    Candidate,
}

#[derive(Debug, Error)]
#[error("Unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Client => "client",
            Role::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "client" => Ok(Role::Client),
            "candidate" => Ok(Role::Candidate),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A user account. `(email, role)` is unique, so one person may hold
/// separate accounts under different roles.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub is_active: bool,

    // Candidate profile
    pub first_name: Option<String>,
    pub middle_initial: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub years_of_experience: Option<i32>,
    pub work_permit_type: Option<String>,
    pub linkedin_url: Option<String>,

    // Client profile
    pub company_name: Option<String>,
    pub designation: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Self-service profile changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub middle_initial: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub years_of_experience: Option<i32>,
    pub work_permit_type: Option<String>,
    pub linkedin_url: Option<String>,
    pub company_name: Option<String>,
    pub designation: Option<String>,
}

impl User {
    /// Returns a copy of this user with the profile update merged in.
    /// Mirrors the COALESCE update in `PgUserRepository`.
    #[cfg(test)]
    pub fn with_profile(&self, update: &ProfileUpdate) -> User {
        fn pick(new: &Option<String>, old: &Option<String>) -> Option<String> {
            new.clone().or_else(|| old.clone())
        }

        User {
            email: update.email.clone().unwrap_or_else(|| self.email.clone()),
            first_name: pick(&update.first_name, &self.first_name),
            middle_initial: pick(&update.middle_initial, &self.middle_initial),
            last_name: pick(&update.last_name, &self.last_name),
            phone_number: pick(&update.phone_number, &self.phone_number),
            city: pick(&update.city, &self.city),
            state: pick(&update.state, &self.state),
            years_of_experience: update.years_of_experience.or(self.years_of_experience),
            work_permit_type: pick(&update.work_permit_type, &self.work_permit_type),
            linkedin_url: pick(&update.linkedin_url, &self.linkedin_url),
            company_name: pick(&update.company_name, &self.company_name),
            designation: pick(&update.designation, &self.designation),
            ..self.clone()
        }
    }
}

/// Candidate identity attached to applications shown to recruiters.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub years_of_experience: Option<i32>,
    pub work_permit_type: Option<String>,
    pub linkedin_url: Option<String>,
}

impl From<&User> for CandidateSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            city: user.city.clone(),
            state: user.state.clone(),
            years_of_experience: user.years_of_experience,
            work_permit_type: user.work_permit_type.clone(),
            linkedin_url: user.linkedin_url.clone(),
        }
    }
}
