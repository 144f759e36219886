use crate::db::models::Folder;
use crate::db::types::Grade;
use crate::db::{Collection, Store, StoreError};

pub(crate) async fn list(store: &Store, grade: Option<Grade>) -> Result<Vec<Folder>, StoreError> {
    let mut folders: Vec<Folder> = store.list(Collection::Folders).await?;
    if let Some(grade) = grade {
        folders.retain(|folder| folder.grade == grade);
    }
    Ok(folders)
}

pub(crate) async fn insert(store: &Store, folder: Folder) -> Result<(), StoreError> {
    store
        .mutate(Collection::Folders, move |folders: &mut Vec<Folder>| folders.push(folder))
        .await
}

pub(crate) async fn delete(store: &Store, id: &str) -> Result<bool, StoreError> {
    store
        .mutate(Collection::Folders, |folders: &mut Vec<Folder>| {
            let before = folders.len();
            folders.retain(|folder| folder.id != id);
            folders.len() != before
        })
        .await
}
