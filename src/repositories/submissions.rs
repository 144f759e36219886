use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::db::{Collection, Store, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingInsert {
    Created,
    /// A previous `error` submission for the same pair was dropped.
    ReplacedFailed { previous_id: String },
    /// The student already has a pending or graded submission.
    Live(Box<Submission>),
}

/// Stores a new pending submission unless the student already has a live one
/// for the assignment. Check and insert happen under one store lock.
pub(crate) async fn create_pending(
    store: &Store,
    submission: Submission,
) -> Result<PendingInsert, StoreError> {
    store
        .mutate(Collection::Submissions, move |submissions: &mut Vec<Submission>| {
            let existing = submissions.iter().position(|item| {
                item.assignment_id == submission.assignment_id
                    && item.student_id == submission.student_id
            });

            match existing {
                Some(idx) if submissions[idx].status != SubmissionStatus::Error => {
                    PendingInsert::Live(Box::new(submissions[idx].clone()))
                }
                Some(idx) => {
                    let previous = submissions.remove(idx);
                    submissions.insert(0, submission);
                    PendingInsert::ReplacedFailed { previous_id: previous.id }
                }
                None => {
                    submissions.insert(0, submission);
                    PendingInsert::Created
                }
            }
        })
        .await
}

pub(crate) async fn find_by_id(store: &Store, id: &str) -> Result<Option<Submission>, StoreError> {
    let submissions: Vec<Submission> = store.list(Collection::Submissions).await?;
    Ok(submissions.into_iter().find(|submission| submission.id == id))
}

/// Newest first.
pub(crate) async fn list(
    store: &Store,
    assignment_id: Option<&str>,
    student_id: Option<&str>,
) -> Result<Vec<Submission>, StoreError> {
    let mut submissions: Vec<Submission> = store.list(Collection::Submissions).await?;
    submissions.retain(|submission| {
        assignment_id.map_or(true, |id| submission.assignment_id == id)
            && student_id.map_or(true, |id| submission.student_id == id)
    });
    submissions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(submissions)
}

/// Replaces the record with the same id in place. Returns `false` when the
/// record is gone (its assignment was deleted meanwhile); nothing is
/// re-inserted in that case. Concurrent replaces are last-write-wins.
pub(crate) async fn replace(store: &Store, submission: Submission) -> Result<bool, StoreError> {
    store
        .mutate(Collection::Submissions, move |submissions: &mut Vec<Submission>| {
            match submissions.iter_mut().find(|item| item.id == submission.id) {
                Some(slot) => {
                    *slot = submission;
                    true
                }
                None => false,
            }
        })
        .await
}

pub(crate) async fn delete_for_assignment(
    store: &Store,
    assignment_id: &str,
) -> Result<usize, StoreError> {
    store
        .mutate(Collection::Submissions, |submissions: &mut Vec<Submission>| {
            let before = submissions.len();
            submissions.retain(|submission| submission.assignment_id != assignment_id);
            before - submissions.len()
        })
        .await
}
