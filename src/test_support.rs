use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::core::{config::Settings, state::AppState};
use crate::storage::MemoryStore;

/// A canned Testly server: just enough of the real API's shapes (envelopes,
/// wrapper keys, grading) to exercise the client end to end over real HTTP.
pub(crate) struct StubApi {
    pub(crate) base_url: String,
    pub(crate) state: Arc<StubState>,
}

#[derive(Default)]
pub(crate) struct StubState {
    exams: Mutex<HashMap<String, Value>>,
    attempts: Mutex<HashMap<String, Value>>,
    next_attempt: AtomicUsize,
    pub(crate) start_calls: AtomicUsize,
    pub(crate) submit_calls: AtomicUsize,
    /// Fail the next submission with a 500, then recover.
    pub(crate) fail_next_submit: AtomicBool,
    /// Answer the start endpoint with a bare attempt instead of the
    /// `{success, data}` envelope.
    pub(crate) bare_start_payload: AtomicBool,
}

impl StubApi {
    pub(crate) fn insert_exam(&self, exam: Value) {
        let id = exam["_id"].as_str().expect("exam _id").to_string();
        self.state.exams.lock().expect("exams lock").insert(id, exam);
    }

    pub(crate) fn start_calls(&self) -> usize {
        self.state.start_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.state.submit_calls.load(Ordering::SeqCst)
    }
}

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) stub: StubApi,
    pub(crate) store: Arc<MemoryStore>,
    _guard: OwnedMutexGuard<()>,
}

/// Settings are loaded from process-global env vars; serialize test setup the
/// same way the backing-service tests in the original stack do.
pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env(base_url: &str) {
    std::env::set_var("TESTLY_ENV", "test");
    std::env::set_var("TESTLY_STRICT_CONFIG", "0");
    std::env::set_var("TESTLY_API_BASE_URL", base_url);
    std::env::set_var("TESTLY_API_CONNECT_TIMEOUT_SECONDS", "5");
    std::env::set_var("TESTLY_API_TIMEOUT_SECONDS", "10");
    std::env::set_var("TESTLY_TOKEN_TTL_SECONDS", "3600");
    std::env::set_var("TESTLY_LOG_LEVEL", "warn");
}

pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;

    let stub = spawn_stub_api().await;
    set_test_env(&stub.base_url);

    let settings = Settings::load().expect("settings");
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(settings, store.clone()).expect("app state");

    TestContext { state, stub, store, _guard: guard }
}

pub(crate) async fn sign_in_student(ctx: &TestContext) {
    ctx.state.auth().sign_in("kim@example.com", "secret").await.expect("sign in");
}

pub(crate) async fn sign_in_teacher(ctx: &TestContext) {
    ctx.state.auth().sign_in("teacher@example.com", "secret").await.expect("sign in");
}

pub(crate) fn exam_doc(id: &str, title: &str, duration_minutes: u64, questions: Value) -> Value {
    json!({
        "_id": id,
        "title": title,
        "description": format!("{title} description"),
        "duration": duration_minutes,
        "passingScore": 50,
        "createdBy": "t1",
        "createdAt": "2025-03-01T09:00:00Z",
        "attempts": 0,
        "questions": questions,
    })
}

pub(crate) fn question_doc(id: &str, correct: usize, points: f64) -> Value {
    json!({
        "_id": id,
        "text": format!("Question {id}"),
        "options": ["A", "B", "C"],
        "correctAnswer": correct,
        "points": points,
    })
}

pub(crate) async fn spawn_stub_api() -> StubApi {
    let state = Arc::new(StubState::default());

    let router = Router::new()
        .route("/exam/exams/:exam_id", get(get_exam))
        .route("/exam/exams/teacher/:teacher_id", get(list_teacher_exams))
        .route("/exam/attempt/startExam", post(start_attempt))
        .route("/exam/attempts", get(list_attempts))
        .route("/exam/attempts/submit", post(submit_attempt))
        .route("/exam/attempts/:attempt_id", get(get_attempt))
        .route("/exam/teacher/exams", get(list_own_exams).post(create_exam))
        .route("/exam/teacher/exams/:exam_id", put(update_exam).delete(delete_exam))
        .route("/auth/signIn", post(sign_in))
        .route("/auth/signUp", post(sign_up))
        .route("/auth/teacher/signUp", post(sign_up))
        .route("/auth/signOut", post(sign_out))
        .route("/auth/validateToken", get(validate_token))
        .route("/auth/teachers/confirmed", get(confirmed_teachers))
        .route("/auth/teachers/selected", put(select_teachers))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub api");
    let addr = listener.local_addr().expect("stub api addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve stub api");
    });

    StubApi { base_url: format!("http://{addr}"), state }
}

type StubResponse = (StatusCode, Json<Value>);

fn envelope(data: Value) -> Value {
    json!({"success": true, "data": data, "message": "ok"})
}

fn not_found(message: &str) -> StubResponse {
    (StatusCode::NOT_FOUND, Json(json!({"message": message})))
}

async fn get_exam(
    State(state): State<Arc<StubState>>,
    Path(exam_id): Path<String>,
) -> StubResponse {
    match state.exams.lock().expect("exams lock").get(&exam_id) {
        Some(exam) => (StatusCode::OK, Json(envelope(exam.clone()))),
        None => not_found("Exam not found"),
    }
}

async fn list_teacher_exams(
    State(state): State<Arc<StubState>>,
    Path(teacher_id): Path<String>,
) -> StubResponse {
    let exams: Vec<Value> = state
        .exams
        .lock()
        .expect("exams lock")
        .values()
        .filter(|exam| exam["createdBy"].as_str() == Some(teacher_id.as_str()))
        .map(|exam| {
            // The real list endpoint strips question bodies.
            let mut stripped = exam.clone();
            stripped["questions"] = json!([]);
            stripped
        })
        .collect();
    // Wrapper-key shape, as the real endpoint uses.
    (StatusCode::OK, Json(json!({"exams": exams})))
}

async fn start_attempt(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> StubResponse {
    let Some(exam_id) = body["examId"].as_str() else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "examId is required"})));
    };
    if !state.exams.lock().expect("exams lock").contains_key(exam_id) {
        return not_found("Exam not found");
    }

    state.start_calls.fetch_add(1, Ordering::SeqCst);
    let n = state.next_attempt.fetch_add(1, Ordering::SeqCst) + 1;
    let attempt = json!({
        "_id": format!("a{n}"),
        "examId": exam_id,
        "userId": "u1",
        "startTime": "2025-03-01T09:00:00Z",
        "answers": [],
        "score": 0,
        "totalPoints": 0,
        "passed": false,
        "isCompleted": false,
    });
    state
        .attempts
        .lock()
        .expect("attempts lock")
        .insert(format!("a{n}"), attempt.clone());

    if state.bare_start_payload.load(Ordering::SeqCst) {
        (StatusCode::OK, Json(attempt))
    } else {
        (StatusCode::OK, Json(envelope(attempt)))
    }
}

async fn submit_attempt(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> StubResponse {
    state.submit_calls.fetch_add(1, Ordering::SeqCst);

    if state.fail_next_submit.swap(false, Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "grading backend down"})));
    }

    let Some(attempt_id) = body["attemptId"].as_str() else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "attemptId is required"})));
    };

    let mut attempts = state.attempts.lock().expect("attempts lock");
    let Some(attempt) = attempts.get_mut(attempt_id) else {
        return not_found("Attempt not found");
    };
    if attempt["isCompleted"].as_bool() == Some(true) {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "Attempt already completed"})));
    }

    let exam_id = attempt["examId"].as_str().unwrap_or_default().to_string();
    let exams = state.exams.lock().expect("exams lock");
    let questions = exams
        .get(&exam_id)
        .and_then(|exam| exam["questions"].as_array().cloned())
        .unwrap_or_default();
    let passing_score = exams
        .get(&exam_id)
        .and_then(|exam| exam["passingScore"].as_f64())
        .unwrap_or(50.0);
    drop(exams);

    let answers = body["answers"].as_array().cloned().unwrap_or_default();
    let (graded, score, total) = grade(&questions, &answers);

    attempt["answers"] = Value::Array(graded);
    attempt["score"] = json!(score);
    attempt["totalPoints"] = json!(total);
    attempt["passed"] = json!(total > 0.0 && score / total * 100.0 >= passing_score);
    attempt["isCompleted"] = json!(true);
    attempt["endTime"] = json!("2025-03-01T09:30:00Z");

    (StatusCode::OK, Json(envelope(attempt.clone())))
}

fn grade(questions: &[Value], answers: &[Value]) -> (Vec<Value>, f64, f64) {
    let total: f64 = questions.iter().map(|q| q["points"].as_f64().unwrap_or(0.0)).sum();
    let mut score = 0.0;

    let graded = answers
        .iter()
        .map(|answer| {
            let question = questions
                .iter()
                .find(|q| q["_id"].as_str() == answer["questionId"].as_str());
            let correct = match question {
                Some(q) => {
                    q["correctAnswer"].as_i64().is_some()
                        && q["correctAnswer"].as_i64() == answer["selectedOption"].as_i64()
                }
                None => false,
            };
            if correct {
                score += question.map(|q| q["points"].as_f64().unwrap_or(0.0)).unwrap_or(0.0);
            }
            let mut graded = answer.clone();
            graded["isCorrect"] = json!(correct);
            graded
        })
        .collect();

    (graded, score, total)
}

async fn list_attempts(State(state): State<Arc<StubState>>) -> StubResponse {
    let attempts: Vec<Value> =
        state.attempts.lock().expect("attempts lock").values().cloned().collect();
    // Bare-array shape.
    (StatusCode::OK, Json(Value::Array(attempts)))
}

async fn get_attempt(
    State(state): State<Arc<StubState>>,
    Path(attempt_id): Path<String>,
) -> StubResponse {
    match state.attempts.lock().expect("attempts lock").get(&attempt_id) {
        Some(attempt) => (StatusCode::OK, Json(envelope(attempt.clone()))),
        None => not_found("Attempt not found"),
    }
}

async fn list_own_exams(State(state): State<Arc<StubState>>) -> StubResponse {
    let exams: Vec<Value> = state.exams.lock().expect("exams lock").values().cloned().collect();
    (StatusCode::OK, Json(json!({"data": exams})))
}

async fn create_exam(
    State(state): State<Arc<StubState>>,
    Json(mut body): Json<Value>,
) -> StubResponse {
    if body["title"].as_str().map(str::is_empty).unwrap_or(true) {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "title is required"})));
    }
    let id = format!("e{}", state.exams.lock().expect("exams lock").len() + 1);
    body["_id"] = json!(id);
    if body.get("createdBy").is_none() {
        body["createdBy"] = json!("t1");
    }
    // Question drafts come without ids; assign them the way Mongo would.
    if let Some(questions) = body["questions"].as_array_mut() {
        for (i, question) in questions.iter_mut().enumerate() {
            if question.get("_id").is_none() {
                question["_id"] = json!(format!("{id}-q{i}"));
            }
        }
    }
    state.exams.lock().expect("exams lock").insert(id, body.clone());
    (StatusCode::CREATED, Json(envelope(body)))
}

async fn update_exam(
    State(state): State<Arc<StubState>>,
    Path(exam_id): Path<String>,
    Json(mut body): Json<Value>,
) -> StubResponse {
    let mut exams = state.exams.lock().expect("exams lock");
    if !exams.contains_key(&exam_id) {
        return not_found("Exam not found");
    }
    body["_id"] = json!(exam_id);
    if let Some(questions) = body["questions"].as_array_mut() {
        for (i, question) in questions.iter_mut().enumerate() {
            if question.get("_id").is_none() {
                question["_id"] = json!(format!("{exam_id}-q{i}"));
            }
        }
    }
    exams.insert(exam_id, body.clone());
    (StatusCode::OK, Json(envelope(body)))
}

async fn delete_exam(
    State(state): State<Arc<StubState>>,
    Path(exam_id): Path<String>,
) -> StubResponse {
    match state.exams.lock().expect("exams lock").remove(&exam_id) {
        Some(_) => (StatusCode::OK, Json(json!({"success": true, "message": "deleted"}))),
        None => not_found("Exam not found"),
    }
}

async fn sign_in(Json(body): Json<Value>) -> StubResponse {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if body["password"].as_str() != Some("secret") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid credentials"})));
    }
    let role = if email.starts_with("teacher") { "teacher" } else { "student" };
    (
        StatusCode::OK,
        Json(json!({
            "token": "stub-token",
            "expiresIn": 3600,
            "user": {"_id": "u1", "username": "kim", "email": email, "role": role},
        })),
    )
}

async fn sign_up() -> StubResponse {
    (StatusCode::OK, Json(json!({"success": true, "message": "Confirmation email sent"})))
}

async fn sign_out() -> StubResponse {
    (StatusCode::OK, Json(json!({"success": true})))
}

async fn validate_token(headers: axum::http::HeaderMap) -> StubResponse {
    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == "Bearer stub-token")
        .unwrap_or(false);
    if authorized {
        (StatusCode::OK, Json(json!({"valid": true})))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token"})))
    }
}

async fn confirmed_teachers() -> StubResponse {
    (
        StatusCode::OK,
        Json(json!({
            "teachers": [
                {"_id": "t1", "username": "prof", "email": "prof@example.com", "role": "teacher"},
                {"_id": "t2", "username": "doc", "email": "doc@example.com", "role": "teacher"},
            ]
        })),
    )
}

async fn select_teachers() -> StubResponse {
    (StatusCode::OK, Json(json!({"success": true})))
}
