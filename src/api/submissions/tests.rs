use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use tokio::sync::Notify;
use tower::ServiceExt;

use crate::db::types::SubmissionStatus;
use crate::schemas::grading::fixtures;
use crate::services::chat_client::AiError;
use crate::test_support::{self, FakeGrader, TestContext};

async fn submit(ctx: &TestContext, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, "/api/v1/submissions", Some(body)))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

fn submission_body(answers: serde_json::Value) -> serde_json::Value {
    json!({
        "assignmentId": "a1",
        "studentId": "u1",
        "studentName": "Nguyễn An",
        "onlineAnswers": answers
    })
}

#[tokio::test]
async fn partial_answers_are_graded_with_full_question_set() {
    let ctx = TestContext::new(FakeGrader::ok(fixtures::grading_result(&["q1", "q2", "q3"], 6.0)))
        .await;
    ctx.seed_assignment(test_support::essay_assignment("a1", &["q1", "q2", "q3"])).await;

    let (status, body) = submit(&ctx, submission_body(json!({"q1": "Ti thể"}))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "pending");
    let id = body["id"].as_str().expect("id").to_string();

    let terminal = ctx.wait_for_terminal(&id).await;
    assert_eq!(terminal.status, SubmissionStatus::Graded);
    assert_eq!(terminal.result.expect("result").question_results.len(), 3);

    let request = ctx.grader.last_request().expect("grader called");
    assert_eq!(request.official_question_ids, vec!["q1", "q2", "q3"]);
    assert_eq!(request.typed_answers.len(), 1);
    assert!(!request.has_image());
}

#[tokio::test]
async fn timeout_ends_in_error_without_result() {
    let ctx = TestContext::new(FakeGrader::failing(AiError::ServiceUnavailable(
        "request timed out".to_string(),
    )))
    .await;
    ctx.seed_assignment(test_support::essay_assignment("a1", &["q1"])).await;

    let (status, body) = submit(&ctx, submission_body(json!({"q1": "Quang hợp"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let id = body["id"].as_str().expect("id").to_string();
    ctx.wait_for_terminal(&id).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/submissions/{id}"),
            None,
        ))
        .await
        .expect("response");
    let stored = test_support::read_json(response).await;
    assert_eq!(stored["status"], "error");
    assert!(stored.get("result").is_none());
    assert_eq!(stored["error"]["kind"], "service_unavailable");
}

#[tokio::test]
async fn incomplete_result_is_recorded_as_schema_violation() {
    let ctx = TestContext::new(FakeGrader::ok(fixtures::grading_result(&["q1", "q3"], 7.0))).await;
    ctx.seed_assignment(test_support::essay_assignment("a1", &["q1", "q2", "q3"])).await;

    let (_, body) = submit(&ctx, submission_body(json!({}))).await;
    let terminal = ctx.wait_for_terminal(body["id"].as_str().expect("id")).await;

    assert_eq!(terminal.status, SubmissionStatus::Error);
    assert!(terminal.result.is_none());
    let error = terminal.error.expect("error");
    assert_eq!(error.kind.as_str(), "schema_violation");
    assert!(error.message.contains("q2"));
}

#[tokio::test]
async fn second_submission_while_pending_conflicts() {
    let gate = Arc::new(Notify::new());
    let grader = FakeGrader::ok(fixtures::grading_result(&["q1"], 9.0)).gated(gate.clone());
    let ctx = TestContext::new(grader).await;
    ctx.seed_assignment(test_support::essay_assignment("a1", &["q1"])).await;

    let (status, first) = submit(&ctx, submission_body(json!({"q1": "A"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = submit(&ctx, submission_body(json!({"q1": "B"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let id = first["id"].as_str().expect("id").to_string();
    let listed = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/submissions?assignmentId=a1&studentId=u1",
            None,
        ))
        .await
        .expect("response");
    let listed = test_support::read_json(listed).await;
    assert_eq!(listed.as_array().expect("array").len(), 1);
    assert_eq!(listed[0]["status"], "pending");

    gate.notify_one();
    let terminal = ctx.wait_for_terminal(&id).await;
    assert_eq!(terminal.status, SubmissionStatus::Graded);

    let (status, _) = submit(&ctx, submission_body(json!({"q1": "C"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn failed_submission_can_be_resubmitted() {
    let ctx = TestContext::new(FakeGrader::failing(AiError::ServiceUnavailable("down".into()))).await;
    ctx.seed_assignment(test_support::essay_assignment("a1", &["q1"])).await;

    let (_, first) = submit(&ctx, submission_body(json!({"q1": "A"}))).await;
    let first_id = first["id"].as_str().expect("id").to_string();
    ctx.wait_for_terminal(&first_id).await;

    let (status, second) = submit(&ctx, submission_body(json!({"q1": "A"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_ne!(second["id"], first["id"]);
    ctx.wait_for_terminal(second["id"].as_str().expect("id")).await;

    let stored = crate::repositories::submissions::list(ctx.state.store(), Some("a1"), Some("u1"))
        .await
        .expect("list");
    assert_eq!(stored.len(), 1);
    assert_eq!(ctx.grader.calls(), 2);
}

#[tokio::test]
async fn image_is_normalised_to_data_url() {
    let ctx = TestContext::new(FakeGrader::ok(fixtures::grading_result(&["q1"], 5.0))).await;
    ctx.seed_assignment(test_support::essay_assignment("a1", &["q1"])).await;

    let mut body = submission_body(json!({}));
    body["imageUrl"] = json!("aGVsbG8=");
    let (status, created) = submit(&ctx, body).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(created["imageUrl"], "data:image/jpeg;base64,aGVsbG8=");
    ctx.wait_for_terminal(created["id"].as_str().expect("id")).await;
    assert!(ctx.grader.last_request().expect("request").has_image());
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_grading() {
    let ctx = TestContext::new(FakeGrader::unused()).await;
    ctx.seed_assignment(test_support::essay_assignment("a1", &["q1"])).await;

    let mut blank_student = submission_body(json!({}));
    blank_student["studentId"] = json!("");
    assert_eq!(submit(&ctx, blank_student).await.0, StatusCode::BAD_REQUEST);

    let mut bad_image = submission_body(json!({}));
    bad_image["imageUrl"] = json!("data:image/png;base64,???");
    assert_eq!(submit(&ctx, bad_image).await.0, StatusCode::BAD_REQUEST);

    let mut wrong_type = submission_body(json!({}));
    wrong_type["imageUrl"] = json!("data:image/gif;base64,aGVsbG8=");
    assert_eq!(submit(&ctx, wrong_type).await.0, StatusCode::BAD_REQUEST);

    let mut unknown = submission_body(json!({}));
    unknown["assignmentId"] = json!("missing");
    assert_eq!(submit(&ctx, unknown).await.0, StatusCode::NOT_FOUND);

    assert_eq!(ctx.grader.calls(), 0);
}
