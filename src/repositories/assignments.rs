use crate::db::models::Assignment;
use crate::db::types::Grade;
use crate::db::{Collection, Store, StoreError};

/// Newest first.
pub(crate) async fn list(
    store: &Store,
    grade: Option<Grade>,
    folder_id: Option<&str>,
) -> Result<Vec<Assignment>, StoreError> {
    let mut assignments: Vec<Assignment> = store.list(Collection::Assignments).await?;
    assignments.retain(|assignment| {
        grade.map_or(true, |grade| assignment.grade == grade)
            && folder_id.map_or(true, |folder| assignment.folder_id.as_deref() == Some(folder))
    });
    assignments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(assignments)
}

pub(crate) async fn find_by_id(store: &Store, id: &str) -> Result<Option<Assignment>, StoreError> {
    let assignments: Vec<Assignment> = store.list(Collection::Assignments).await?;
    Ok(assignments.into_iter().find(|assignment| assignment.id == id))
}

pub(crate) async fn insert(store: &Store, assignment: Assignment) -> Result<(), StoreError> {
    store
        .mutate(Collection::Assignments, move |assignments: &mut Vec<Assignment>| {
            assignments.insert(0, assignment);
        })
        .await
}

pub(crate) async fn delete(store: &Store, id: &str) -> Result<bool, StoreError> {
    store
        .mutate(Collection::Assignments, |assignments: &mut Vec<Assignment>| {
            let before = assignments.len();
            assignments.retain(|assignment| assignment.id != id);
            assignments.len() != before
        })
        .await
}

/// Clears `folderId` on every assignment filed under the folder.
pub(crate) async fn detach_folder(store: &Store, folder_id: &str) -> Result<usize, StoreError> {
    store
        .mutate(Collection::Assignments, |assignments: &mut Vec<Assignment>| {
            let mut detached = 0;
            for assignment in assignments.iter_mut() {
                if assignment.folder_id.as_deref() == Some(folder_id) {
                    assignment.folder_id = None;
                    detached += 1;
                }
            }
            detached
        })
        .await
}
