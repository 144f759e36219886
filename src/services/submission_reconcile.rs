use std::collections::HashSet;

use thiserror::Error;

use crate::db::models::{Question, Submission, SubmissionError};
use crate::db::types::SubmissionStatus;
use crate::schemas::grading::{self, GradingResult, QuestionResult};
use crate::services::chat_client::AiError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ReconcileError {
    #[error("submission {id} is {status:?}; only pending submissions can be reconciled")]
    InvalidTransition { id: String, status: SubmissionStatus },
}

/// Turns a pending submission plus the grading outcome into its terminal
/// record. A result that does not cover exactly the assignment's questions is
/// treated as a schema violation and never attached.
pub(crate) fn reconcile(
    mut submission: Submission,
    questions: &[Question],
    outcome: Result<GradingResult, AiError>,
) -> Result<Submission, ReconcileError> {
    if submission.status != SubmissionStatus::Pending {
        return Err(ReconcileError::InvalidTransition {
            id: submission.id,
            status: submission.status,
        });
    }

    let checked = outcome.and_then(|result| {
        grading::check_score(result.score).map_err(AiError::SchemaViolation)?;
        check_coverage(questions, &result.question_results).map_err(AiError::SchemaViolation)?;
        Ok(result)
    });

    match checked {
        Ok(result) => {
            submission.status = SubmissionStatus::Graded;
            submission.result = Some(result);
            submission.error = None;
        }
        Err(err) => {
            submission.status = SubmissionStatus::Error;
            submission.result = None;
            submission.error =
                Some(SubmissionError { kind: err.kind(), message: err.message().to_string() });
        }
    }

    Ok(submission)
}

/// `questionResults` ids must equal the assignment's id set: none missing,
/// none unknown, none repeated.
pub(crate) fn check_coverage(questions: &[Question], results: &[QuestionResult]) -> Result<(), String> {
    let expected: HashSet<&str> = questions.iter().map(|question| question.id.as_str()).collect();
    let mut seen = HashSet::new();

    for item in results {
        let id = item.question_id.as_str();
        if !expected.contains(id) {
            return Err(format!("questionResults references unknown question {id}"));
        }
        if !seen.insert(id) {
            return Err(format!("questionResults lists question {id} more than once"));
        }
    }

    let missing: Vec<&str> = questions
        .iter()
        .map(|question| question.id.as_str())
        .filter(|id| !seen.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(format!("questionResults is missing {}", missing.join(", ")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::FailureKind;
    use crate::schemas::grading::fixtures;
    use crate::test_support;

    fn pending() -> Submission {
        test_support::pending_submission("s1", "a1", "u1")
    }

    fn questions() -> Vec<Question> {
        test_support::essay_assignment("a1", &["q1", "q2", "q3"]).questions
    }

    #[test]
    fn complete_result_grades_submission() {
        let result = fixtures::grading_result(&["q1", "q2", "q3"], 6.5);

        let graded = reconcile(pending(), &questions(), Ok(result.clone())).unwrap();

        assert_eq!(graded.status, SubmissionStatus::Graded);
        assert_eq!(graded.result, Some(result));
        assert!(graded.error.is_none());
    }

    #[test]
    fn missing_question_becomes_schema_violation() {
        let result = fixtures::grading_result(&["q1", "q3"], 6.5);

        let failed = reconcile(pending(), &questions(), Ok(result)).unwrap();

        assert_eq!(failed.status, SubmissionStatus::Error);
        assert!(failed.result.is_none());
        let error = failed.error.unwrap();
        assert_eq!(error.kind, FailureKind::SchemaViolation);
        assert!(error.message.contains("q2"), "{}", error.message);
    }

    #[test]
    fn unknown_and_duplicate_ids_are_rejected() {
        let unknown = fixtures::grading_result(&["q1", "q2", "q3", "q9"], 5.0);
        let duplicate = fixtures::grading_result(&["q1", "q2", "q2", "q3"], 5.0);

        assert!(check_coverage(&questions(), &unknown.question_results).unwrap_err().contains("q9"));
        assert!(check_coverage(&questions(), &duplicate.question_results)
            .unwrap_err()
            .contains("more than once"));
    }

    #[test]
    fn service_failure_stamps_error_without_result() {
        let failed = reconcile(
            pending(),
            &questions(),
            Err(AiError::ServiceUnavailable("request timed out".to_string())),
        )
        .unwrap();

        assert_eq!(failed.status, SubmissionStatus::Error);
        assert!(failed.result.is_none());
        assert_eq!(failed.error.unwrap().kind, FailureKind::ServiceUnavailable);
    }

    #[test]
    fn terminal_submission_cannot_be_reconciled_again() {
        let graded = reconcile(
            pending(),
            &questions(),
            Ok(fixtures::grading_result(&["q1", "q2", "q3"], 9.0)),
        )
        .unwrap();

        let again = reconcile(
            graded,
            &questions(),
            Err(AiError::ServiceUnavailable("late".to_string())),
        );

        assert!(matches!(
            again,
            Err(ReconcileError::InvalidTransition { status: SubmissionStatus::Graded, .. })
        ));
    }

    #[test]
    fn zero_question_assignment_requires_empty_results() {
        assert!(check_coverage(&[], &[]).is_ok());
        let stray = fixtures::grading_result(&["q1"], 5.0);
        assert!(check_coverage(&[], &stray.question_results).is_err());
    }
}
