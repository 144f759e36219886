use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tempfile::TempDir;
use tokio::sync::{Mutex, Notify, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::db::file_store::FileStore;
use crate::db::models::{Assignment, Question, Submission, User};
use crate::db::types::{AssignmentType, Grade, QuestionLevel, QuestionType, SubmissionStatus, UserRole};
use crate::db::{Collection, Store};
use crate::repositories;
use crate::schemas::generation::{GeneratedContent, GenerationRequest};
use crate::schemas::grading::GradingResult;
use crate::services::ai_grading::Grader;
use crate::services::chat_client::AiError;
use crate::services::content_generation::ContentGenerator;
use crate::services::grading_request::GradingRequest;

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("KHTN_ENV", "test");
    std::env::set_var("KHTN_STRICT_CONFIG", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("STORE_BACKEND", "file");
    std::env::set_var("STORE_NAMESPACE", "test");
    std::env::set_var("OPENAI_API_KEY", "test-key");
    std::env::set_var("OPENAI_BASE_URL", "http://127.0.0.1:9/v1");
    std::env::remove_var("ALLOWED_IMAGE_MIME_TYPES");
    std::env::remove_var("MAX_IMAGE_SIZE_MB");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("PROJECT_NAME");
}

/// File-backed store in a fresh temp dir, namespace `test`.
pub(crate) async fn temp_store() -> (Store, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = FileStore::open(dir.path(), "test").await.expect("file store");
    (Store::new(Arc::new(backend)), dir)
}

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) grader: Arc<FakeGrader>,
    _dir: TempDir,
    _guard: OwnedMutexGuard<()>,
}

impl TestContext {
    pub(crate) async fn new(grader: FakeGrader) -> Self {
        Self::build(grader, FakeGenerator::failing(AiError::ServiceUnavailable("unused".into())), &[])
            .await
    }

    pub(crate) async fn with_generator(grader: FakeGrader, generator: FakeGenerator) -> Self {
        Self::build(grader, generator, &[]).await
    }

    pub(crate) async fn with_env(grader: FakeGrader, vars: &[(&str, &str)]) -> Self {
        Self::build(grader, FakeGenerator::failing(AiError::ServiceUnavailable("unused".into())), vars)
            .await
    }

    async fn build(grader: FakeGrader, generator: FakeGenerator, vars: &[(&str, &str)]) -> Self {
        let guard = env_lock().await;
        set_test_env();
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let settings = Settings::load().expect("settings");
        let (store, dir) = temp_store().await;
        let grader = Arc::new(grader);
        let state = AppState::new(settings, store, grader.clone(), Arc::new(generator));
        let app = api::router::router(state.clone());

        Self { state, app, grader, _dir: dir, _guard: guard }
    }

    pub(crate) async fn seed_assignment(&self, assignment: Assignment) {
        repositories::assignments::insert(self.state.store(), assignment)
            .await
            .expect("seed assignment");
    }

    pub(crate) async fn seed_pending(&self, submission: Submission) {
        repositories::submissions::create_pending(self.state.store(), submission)
            .await
            .expect("seed submission");
    }

    /// Polls until the background grading task has written a terminal state.
    pub(crate) async fn wait_for_terminal(&self, submission_id: &str) -> Submission {
        for _ in 0..200 {
            let current = repositories::submissions::find_by_id(self.state.store(), submission_id)
                .await
                .expect("find submission");
            match current {
                Some(submission) if submission.status != SubmissionStatus::Pending => return submission,
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
        panic!("submission {submission_id} never left pending");
    }
}

/// Scripted grader: returns one fixed outcome, optionally held until released.
pub(crate) struct FakeGrader {
    outcome: Result<GradingResult, AiError>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    last_request: std::sync::Mutex<Option<GradingRequest>>,
}

impl FakeGrader {
    pub(crate) fn ok(result: GradingResult) -> Self {
        Self::with_outcome(Ok(result))
    }

    pub(crate) fn failing(error: AiError) -> Self {
        Self::with_outcome(Err(error))
    }

    pub(crate) fn unused() -> Self {
        Self::failing(AiError::ServiceUnavailable("grader not expected to be called".into()))
    }

    fn with_outcome(outcome: Result<GradingResult, AiError>) -> Self {
        Self {
            outcome,
            gate: None,
            calls: AtomicUsize::new(0),
            last_request: std::sync::Mutex::new(None),
        }
    }

    /// Holds every call until `gate.notify_one()`.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<GradingRequest> {
        self.last_request.lock().expect("last request").clone()
    }
}

#[async_trait]
impl Grader for FakeGrader {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("last request") = Some(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

pub(crate) struct FakeGenerator {
    outcome: Result<GeneratedContent, AiError>,
}

impl FakeGenerator {
    pub(crate) fn ok(content: GeneratedContent) -> Self {
        Self { outcome: Ok(content) }
    }

    pub(crate) fn failing(error: AiError) -> Self {
        Self { outcome: Err(error) }
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedContent, AiError> {
        self.outcome.clone()
    }
}

pub(crate) fn essay_assignment(id: &str, question_ids: &[&str]) -> Assignment {
    Assignment {
        id: id.to_string(),
        title: format!("Bài tập {id}"),
        description: String::new(),
        questions: question_ids
            .iter()
            .map(|qid| Question {
                id: qid.to_string(),
                text: format!("Trình bày ý {qid}"),
                kind: QuestionType::Essay,
                level: QuestionLevel::Understand,
                options: None,
                correct_answer: None,
            })
            .collect(),
        grade: Grade::new(7).expect("grade"),
        subject: "KHTN".to_string(),
        kind: AssignmentType::Essay,
        rubric: "Mỗi ý đúng được điểm tối đa".to_string(),
        created_at: 1_700_000_000_000,
        folder_id: None,
    }
}

pub(crate) fn pending_submission(id: &str, assignment_id: &str, student_id: &str) -> Submission {
    Submission {
        id: id.to_string(),
        assignment_id: assignment_id.to_string(),
        student_id: student_id.to_string(),
        student_name: format!("Học sinh {student_id}"),
        image_url: String::new(),
        status: SubmissionStatus::Pending,
        result: None,
        timestamp: 1_700_000_000_000,
        online_answers: Some(BTreeMap::new()),
        error: None,
    }
}

pub(crate) fn user(id: &str, role: UserRole) -> User {
    User {
        id: id.to_string(),
        name: format!("Người dùng {id}"),
        class_name: Some("7A".to_string()),
        email: None,
        role,
        password: Some("hunter2".to_string()),
    }
}

pub(crate) async fn seed_users(store: &Store, users: Vec<User>) {
    store
        .mutate(Collection::Users, move |stored: &mut Vec<User>| stored.extend(users))
        .await
        .expect("seed users");
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
