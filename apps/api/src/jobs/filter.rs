//! Job visibility filter: composes the role-scoped listing predicate.
//!
//! The role base predicate is applied last and always wins:
//! - admin: unrestricted, every optional filter honoured
//! - client: `owner_id = self`, whatever owner filter was requested
//! - candidate: `is_active = true`, the active filter is ignored

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::policy::Actor;
#[cfg(test)]
use crate::models::job::Job;
use crate::models::user::Role;
use crate::routes::Pagination;

/// Optional filters accepted by `GET /api/v1/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub owner_id: Option<Uuid>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Fully resolved listing predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct JobQuery {
    pub owner_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

/// Builds the listing predicate for `actor` from the requested filters.
pub fn visible_jobs(actor: &Actor, filter: JobFilter) -> JobQuery {
    let (offset, limit) = Pagination {
        skip: filter.skip,
        limit: filter.limit,
    }
    .bounds();
    let mut query = JobQuery {
        owner_id: filter.owner_id,
        is_active: filter.is_active,
        location: non_blank(filter.location),
        job_type: non_blank(filter.job_type),
        experience_level: non_blank(filter.experience_level),
        search: non_blank(filter.search),
        offset,
        limit,
    };

    match actor.role {
        Role::Admin => {}
        Role::Client => query.owner_id = Some(actor.id),
        Role::Candidate => query.is_active = Some(true),
    }

    query
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `%value%` with LIKE wildcards in the user input escaped.
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

impl JobQuery {
    /// SQL form of the predicate, including ordering and pagination.
    pub fn to_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT * FROM jobs WHERE TRUE");

        if let Some(owner_id) = self.owner_id {
            qb.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(is_active) = self.is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(location) = &self.location {
            qb.push(" AND location ILIKE ").push_bind(like_pattern(location));
        }
        if let Some(job_type) = &self.job_type {
            qb.push(" AND job_type = ").push_bind(job_type.clone());
        }
        if let Some(level) = &self.experience_level {
            qb.push(" AND experience_level = ").push_bind(level.clone());
        }
        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR requirements ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY created_at DESC OFFSET ")
            .push_bind(self.offset)
            .push(" LIMIT ")
            .push_bind(self.limit);
        qb
    }

    /// In-process evaluation of the same predicate, without pagination.
    #[cfg(test)]
    pub fn matches(&self, job: &Job) -> bool {
        if self.owner_id.is_some_and(|owner| owner != job.owner_id) {
            return false;
        }
        if self.is_active.is_some_and(|active| active != job.is_active) {
            return false;
        }
        if let Some(location) = &self.location {
            if !contains_ci(job.location.as_deref(), location) {
                return false;
            }
        }
        if let Some(job_type) = &self.job_type {
            if job.job_type.as_deref() != Some(job_type.as_str()) {
                return false;
            }
        }
        if let Some(level) = &self.experience_level {
            if job.experience_level.as_deref() != Some(level.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let hit = contains_ci(Some(&job.title), search)
                || contains_ci(Some(&job.description), search)
                || contains_ci(job.requirements.as_deref(), search);
            if !hit {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::job;

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_client_is_pinned_to_own_jobs() {
        let client = actor(Role::Client);
        let query = visible_jobs(
            &client,
            JobFilter {
                owner_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        );
        assert_eq!(query.owner_id, Some(client.id));
        assert!(query.to_sql().sql().contains("owner_id = $1"));
    }

    #[test]
    fn test_candidate_active_filter_is_ignored() {
        let query = visible_jobs(
            &actor(Role::Candidate),
            JobFilter {
                is_active: Some(false),
                ..Default::default()
            },
        );
        assert_eq!(query.is_active, Some(true));
    }

    #[test]
    fn test_admin_keeps_full_filter_set() {
        let owner = Uuid::new_v4();
        let query = visible_jobs(
            &actor(Role::Admin),
            JobFilter {
                owner_id: Some(owner),
                is_active: Some(false),
                job_type: Some("Contract".into()),
                ..Default::default()
            },
        );
        assert_eq!(query.owner_id, Some(owner));
        assert_eq!(query.is_active, Some(false));
        assert_eq!(query.job_type.as_deref(), Some("Contract"));
    }

    #[test]
    fn test_admin_without_filters_is_unrestricted() {
        let query = visible_jobs(&actor(Role::Admin), JobFilter::default());
        assert_eq!(query.owner_id, None);
        assert_eq!(query.is_active, None);
        assert_eq!(
            query.to_sql().sql(),
            "SELECT * FROM jobs WHERE TRUE ORDER BY created_at DESC OFFSET $1 LIMIT $2"
        );
    }

    #[test]
    fn test_search_is_or_across_three_columns() {
        let query = visible_jobs(
            &actor(Role::Admin),
            JobFilter {
                search: Some("python".into()),
                ..Default::default()
            },
        );
        let sql = query.to_sql().sql().to_string();
        assert!(sql.contains("(title ILIKE $1 OR description ILIKE $2 OR requirements ILIKE $3)"));
    }

    #[test]
    fn test_search_matches_case_insensitively_on_any_field() {
        let query = visible_jobs(
            &actor(Role::Admin),
            JobFilter {
                search: Some("hero".into()),
                ..Default::default()
            },
        );

        let by_title = job(Uuid::new_v4(), "Special Hero", true);
        let mut by_description = job(Uuid::new_v4(), "Normal", true);
        by_description.description = "Be a HERO".into();
        let mut by_requirements = job(Uuid::new_v4(), "Normal", true);
        by_requirements.requirements = Some("superhero skills".into());
        let miss = job(Uuid::new_v4(), "Normal Guy", true);

        assert!(query.matches(&by_title));
        assert!(query.matches(&by_description));
        assert!(query.matches(&by_requirements));
        assert!(!query.matches(&miss));
    }

    #[test]
    fn test_location_is_substring_and_type_is_exact() {
        let query = visible_jobs(
            &actor(Role::Admin),
            JobFilter {
                location: Some("remote".into()),
                job_type: Some("Full-time".into()),
                ..Default::default()
            },
        );

        let mut hit = job(Uuid::new_v4(), "Dev", true);
        hit.location = Some("Remote (US)".into());
        hit.job_type = Some("Full-time".into());
        assert!(query.matches(&hit));

        let mut wrong_type = hit.clone();
        wrong_type.job_type = Some("full-time contract".into());
        assert!(!query.matches(&wrong_type));

        let mut no_location = hit.clone();
        no_location.location = None;
        assert!(!query.matches(&no_location));
    }

    #[test]
    fn test_blank_filters_are_dropped() {
        let query = visible_jobs(
            &actor(Role::Admin),
            JobFilter {
                search: Some("   ".into()),
                location: Some(String::new()),
                ..Default::default()
            },
        );
        assert_eq!(query.search, None);
        assert_eq!(query.location, None);
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}
