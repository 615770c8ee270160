use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Must-have requirements, free text.
    pub requirements: Option<String>,
    pub nice_to_have_requirements: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub is_active: bool,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub nice_to_have_requirements: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial job update; unset fields keep their stored value.
///
/// Nullable columns use `Option<Option<_>>`: `None` = keep,
/// `Some(None)` = clear, `Some(Some(v))` = set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub requirements: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub nice_to_have_requirements: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub salary_range: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub job_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub experience_level: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl Job {
    /// Returns a copy of this job with `update` merged in.
    #[cfg(test)]
    pub fn with_update(&self, update: &JobUpdate, now: DateTime<Utc>) -> Job {
        fn pick(new: &Option<Option<String>>, old: &Option<String>) -> Option<String> {
            match new {
                Some(value) => value.clone(),
                None => old.clone(),
            }
        }

        Job {
            title: update.title.clone().unwrap_or_else(|| self.title.clone()),
            description: update
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            requirements: pick(&update.requirements, &self.requirements),
            nice_to_have_requirements: pick(
                &update.nice_to_have_requirements,
                &self.nice_to_have_requirements,
            ),
            location: pick(&update.location, &self.location),
            salary_range: pick(&update.salary_range, &self.salary_range),
            job_type: pick(&update.job_type, &self.job_type),
            experience_level: pick(&update.experience_level, &self.experience_level),
            is_active: update.is_active.unwrap_or(self.is_active),
            updated_at: Some(now),
            ..self.clone()
        }
    }
}
