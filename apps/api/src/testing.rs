//! In-memory doubles for the storage and provider seams, plus fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::applications::ApplicationRepository;
use crate::db::StoreError;
use crate::jobs::filter::JobQuery;
use crate::jobs::JobRepository;
use crate::llm_client::LlmError;
use crate::models::application::{Application, NewApplication};
use crate::models::job::{Job, JobUpdate, NewJob};
use crate::models::user::{ProfileUpdate, Role, User};
use crate::screening::{
    GapItem, GapStatus, ScreeningProvider, ScreeningRequest, ScreeningResult, ScreeningService,
};
use crate::state::AppState;
use crate::storage::{BlobError, BlobStore};

fn page<T>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[derive(Default)]
pub struct MemoryUsers {
    records: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUsers {
    pub fn insert(&self, user: User) {
        self.records
            .lock()
            .expect("users mutex poisoned")
            .insert(user.id, user);
    }
}

#[async_trait]
impl crate::users::UserRepository for MemoryUsers {
    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.records.lock().expect("users mutex poisoned").get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let guard = self.records.lock().expect("users mutex poisoned");
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .records
            .lock()
            .expect("users mutex poisoned")
            .values()
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(page(users, offset, limit))
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>, StoreError> {
        let mut guard = self.records.lock().expect("users mutex poisoned");
        Ok(guard.get_mut(&id).map(|user| {
            user.is_active = is_active;
            user.clone()
        }))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut guard = self.records.lock().expect("users mutex poisoned");
        let Some(current) = guard.get(&id) else {
            return Ok(None);
        };
        let updated = current.with_profile(update);
        let taken = guard
            .values()
            .any(|u| u.id != id && u.role == updated.role && u.email == updated.email);
        if taken {
            return Err(StoreError::UniqueViolation("uq_user_email_role".into()));
        }
        guard.insert(id, updated.clone());
        Ok(Some(updated))
    }
}

#[derive(Default)]
pub struct MemoryJobs {
    records: Mutex<HashMap<Uuid, Job>>,
}

impl MemoryJobs {
    pub fn insert(&self, job: Job) {
        self.records
            .lock()
            .expect("jobs mutex poisoned")
            .insert(job.id, job);
    }
}

#[async_trait]
impl JobRepository for MemoryJobs {
    async fn create(&self, owner_id: Uuid, new: &NewJob) -> Result<Job, StoreError> {
        let job = Job {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            description: new.description.clone(),
            requirements: new.requirements.clone(),
            nice_to_have_requirements: new.nice_to_have_requirements.clone(),
            location: new.location.clone(),
            salary_range: new.salary_range.clone(),
            job_type: new.job_type.clone(),
            experience_level: new.experience_level.clone(),
            is_active: new.is_active,
            owner_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.insert(job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.records.lock().expect("jobs mutex poisoned").get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError> {
        let guard = self.records.lock().expect("jobs mutex poisoned");
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    async fn list(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .records
            .lock()
            .expect("jobs mutex poisoned")
            .values()
            .filter(|job| query.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(jobs, query.offset, query.limit))
    }

    async fn update(&self, id: Uuid, update: &JobUpdate) -> Result<Option<Job>, StoreError> {
        let mut guard = self.records.lock().expect("jobs mutex poisoned");
        let Some(current) = guard.get(&id) else {
            return Ok(None);
        };
        let updated = current.with_update(update, Utc::now());
        guard.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.records.lock().expect("jobs mutex poisoned").remove(&id))
    }
}

/// Enforces `(user_id, job_id)` uniqueness the way the database index does.
#[derive(Default)]
pub struct MemoryApplications {
    records: Mutex<HashMap<Uuid, Application>>,
}

impl MemoryApplications {
    pub fn len(&self) -> usize {
        self.records.lock().expect("applications mutex poisoned").len()
    }

    pub fn mark_reviewed(&self, id: Uuid) {
        if let Some(app) = self
            .records
            .lock()
            .expect("applications mutex poisoned")
            .get_mut(&id)
        {
            app.is_reviewed = true;
        }
    }

    fn sorted(&self, keep: impl Fn(&Application) -> bool) -> Vec<Application> {
        let mut apps: Vec<Application> = self
            .records
            .lock()
            .expect("applications mutex poisoned")
            .values()
            .filter(|a| keep(a))
            .cloned()
            .collect();
        apps.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        apps
    }
}

#[async_trait]
impl ApplicationRepository for MemoryApplications {
    async fn get(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("applications mutex poisoned")
            .get(&id)
            .cloned())
    }

    async fn find_by_user_and_job(
        &self,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("applications mutex poisoned")
            .values()
            .find(|a| a.user_id == user_id && a.job_id == job_id)
            .cloned())
    }

    async fn create(&self, new: NewApplication) -> Result<Application, StoreError> {
        let mut guard = self.records.lock().expect("applications mutex poisoned");
        if guard
            .values()
            .any(|a| a.user_id == new.user_id && a.job_id == new.job_id)
        {
            return Err(StoreError::UniqueViolation("uq_application_user_job".into()));
        }
        let app = Application::from_new(new, Utc::now());
        guard.insert(app.id, app.clone());
        Ok(app)
    }

    async fn resubmit(&self, snapshot: &Application) -> Result<Option<Application>, StoreError> {
        let mut guard = self.records.lock().expect("applications mutex poisoned");
        let Some(current) = guard.get_mut(&snapshot.id) else {
            return Ok(None);
        };
        current.resume_key = snapshot.resume_key.clone();
        current.ai_score = snapshot.ai_score;
        current.ai_analysis = snapshot.ai_analysis.clone();
        current.updated_at = snapshot.updated_at;
        Ok(Some(current.clone()))
    }

    async fn toggle_reviewed(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let mut guard = self.records.lock().expect("applications mutex poisoned");
        Ok(guard.get_mut(&id).map(|app| {
            app.is_reviewed = !app.is_reviewed;
            app.clone()
        }))
    }

    async fn list_for_job(
        &self,
        job_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Application>, StoreError> {
        Ok(page(self.sorted(|a| a.job_id == job_id), offset, limit))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Application>, StoreError> {
        Ok(page(self.sorted(|a| a.user_id == user_id), offset, limit))
    }
}

#[derive(Default)]
pub struct MemoryBlobs {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryBlobs {
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("blobs mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<(), BlobError> {
        self.objects
            .lock()
            .expect("blobs mutex poisoned")
            .insert(key.to_string(), body);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, BlobError> {
        self.objects
            .lock()
            .expect("blobs mutex poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::Download {
                key: key.to_string(),
                message: "no such key".to_string(),
            })
    }
}

type FailureFn = Box<dyn Fn() -> LlmError + Send + Sync>;

enum Script {
    Succeed(ScreeningResult),
    Fail(FailureFn),
}

/// Screening provider that answers from a script and counts its calls.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<Script>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    last_resume_text: Mutex<Option<String>>,
}

impl ScriptedProvider {
    fn with_script(name: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(script),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last_resume_text: Mutex::new(None),
        })
    }

    pub fn ok(name: &str, result: ScreeningResult) -> Arc<Self> {
        Self::with_script(name, Script::Succeed(result))
    }

    pub fn failing(
        name: &str,
        error: impl Fn() -> LlmError + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::with_script(name, Script::Fail(Box::new(error)))
    }

    /// Sleeps before answering so concurrent callers interleave.
    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock().expect("delay mutex poisoned") = Some(delay);
        self
    }

    pub fn set_result(&self, result: ScreeningResult) {
        *self.script.lock().expect("script mutex poisoned") = Script::Succeed(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_resume_text(&self) -> Option<String> {
        self.last_resume_text
            .lock()
            .expect("resume mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl ScreeningProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, request: &ScreeningRequest<'_>) -> Result<ScreeningResult, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_resume_text.lock().expect("resume mutex poisoned") =
            Some(request.resume_text.to_string());

        let delay = *self.delay.lock().expect("delay mutex poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match &*self.script.lock().expect("script mutex poisoned") {
            Script::Succeed(result) => Ok(result.clone()),
            Script::Fail(error) => Err(error()),
        }
    }
}

/// Well-formed screening result with the given score.
pub fn sample_result(score: u32) -> ScreeningResult {
    ScreeningResult {
        score,
        match_count: 2,
        total_must_haves: 3,
        justification: format!("Scored {score} against the posted requirements"),
        gap_analysis: vec![
            GapItem {
                requirement: "Python".into(),
                status: GapStatus::Match,
                note: "6 years".into(),
            },
            GapItem {
                requirement: "Kubernetes".into(),
                status: GapStatus::Missing,
                note: "not mentioned".into(),
            },
        ],
    }
}

pub fn user(role: Role, email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        role,
        hashed_password: String::new(),
        is_active: true,
        first_name: None,
        middle_initial: None,
        last_name: None,
        phone_number: None,
        city: None,
        state: None,
        years_of_experience: None,
        work_permit_type: None,
        linkedin_url: None,
        company_name: None,
        designation: None,
        created_at: Utc::now(),
    }
}

pub fn job(owner_id: Uuid, title: &str, is_active: bool) -> Job {
    Job {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: format!("{title} wanted"),
        requirements: Some("Python, SQL, Kubernetes".into()),
        nice_to_have_requirements: Some("Rust".into()),
        location: None,
        salary_range: None,
        job_type: None,
        experience_level: None,
        is_active,
        owner_id,
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// `AppState` over in-memory stores, with handles kept for assertions.
pub struct TestApp {
    pub state: AppState,
    pub users: Arc<MemoryUsers>,
    pub jobs: Arc<MemoryJobs>,
    pub applications: Arc<MemoryApplications>,
    pub blobs: Arc<MemoryBlobs>,
}

impl TestApp {
    pub fn new(screening: ScreeningService) -> Self {
        let users = Arc::new(MemoryUsers::default());
        let jobs = Arc::new(MemoryJobs::default());
        let applications = Arc::new(MemoryApplications::default());
        let blobs = Arc::new(MemoryBlobs::default());
        let state = AppState {
            users: users.clone(),
            jobs: jobs.clone(),
            applications: applications.clone(),
            blobs: blobs.clone(),
            screening,
            max_upload_bytes: 1024 * 1024,
        };
        Self {
            state,
            users,
            jobs,
            applications,
            blobs,
        }
    }

    pub fn add_user(&self, user: User) -> User {
        self.users.insert(user.clone());
        user
    }

    pub fn add_job(&self, job: Job) -> Job {
        self.jobs.insert(job.clone());
        job
    }
}
