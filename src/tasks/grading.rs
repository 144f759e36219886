use std::time::Instant;

use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::repositories;
use crate::services::chat_client::AiError;
use crate::services::grading_request::{GradingRequest, ImagePayload};
use crate::services::submission_reconcile;

/// Detaches one grading round-trip. The pending record must already be
/// durable; the task always runs to completion and writes the terminal state.
pub(crate) fn spawn_grading(state: AppState, submission_id: String) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = grade_submission(&state, &submission_id).await {
            tracing::error!(
                submission_id = %submission_id,
                error = ?err,
                "Grading task failed before a terminal state was written"
            );
            metrics::counter!("grading_jobs_total", "status" => "store_error").increment(1);
        }
    })
}

/// Grades a pending submission and stores the outcome. Returns the terminal
/// record, or `None` when there was nothing to do.
pub(crate) async fn grade_submission(
    state: &AppState,
    submission_id: &str,
) -> Result<Option<Submission>> {
    let timer = Instant::now();

    let Some(submission) = repositories::submissions::find_by_id(state.store(), submission_id)
        .await
        .context("Failed to load submission")?
    else {
        tracing::warn!(submission_id, "Submission disappeared before grading");
        return Ok(None);
    };

    if submission.status != SubmissionStatus::Pending {
        tracing::info!(submission_id, status = ?submission.status, "Skipping grading");
        return Ok(None);
    }

    let assignment =
        repositories::assignments::find_by_id(state.store(), &submission.assignment_id)
            .await
            .context("Failed to load assignment")?;

    let (questions, outcome) = match assignment {
        Some(assignment) => {
            let outcome = match load_image(&submission) {
                Ok(image) => {
                    let answers = submission.online_answers.clone().unwrap_or_default();
                    let request =
                        GradingRequest::build(&submission.id, &assignment, &answers, image);
                    state.grader().grade(&request).await
                }
                Err(err) => Err(err),
            };
            (assignment.questions, outcome)
        }
        None => (
            Vec::new(),
            Err(AiError::ServiceUnavailable(format!(
                "assignment {} no longer exists",
                submission.assignment_id
            ))),
        ),
    };

    let terminal = submission_reconcile::reconcile(submission, &questions, outcome)
        .context("Failed to reconcile grading outcome")?;

    let stored = repositories::submissions::replace(state.store(), terminal.clone())
        .await
        .context("Failed to store graded submission")?;

    let status = terminal.error.as_ref().map_or("graded", |error| error.kind.as_str());
    metrics::counter!("grading_jobs_total", "status" => status).increment(1);
    metrics::histogram!("grading_duration_seconds").record(timer.elapsed().as_secs_f64());

    if !stored {
        tracing::warn!(submission_id, "Submission was deleted while grading; result discarded");
        return Ok(None);
    }

    match &terminal.error {
        None => tracing::info!(
            submission_id,
            score = terminal.result.as_ref().map(|result| result.score),
            "Submission graded"
        ),
        Some(error) => tracing::warn!(
            submission_id,
            kind = error.kind.as_str(),
            reason = %error.message,
            "Submission grading failed"
        ),
    }

    Ok(Some(terminal))
}

fn load_image(submission: &Submission) -> Result<Option<ImagePayload>, AiError> {
    if !submission.has_image() {
        return Ok(None);
    }
    ImagePayload::parse(&submission.image_url)
        .map(Some)
        .map_err(|reason| AiError::SchemaViolation(format!("stored image is unusable: {reason}")))
}
