use crate::db::models::User;
use crate::db::types::UserRole;
use crate::db::{Collection, Store, StoreError};

pub(crate) async fn list_students(store: &Store) -> Result<Vec<User>, StoreError> {
    let mut users: Vec<User> = store.list(Collection::Users).await?;
    users.retain(|user| user.role == UserRole::Student);
    Ok(users)
}

pub(crate) async fn find_by_id(store: &Store, id: &str) -> Result<Option<User>, StoreError> {
    let users: Vec<User> = store.list(Collection::Users).await?;
    Ok(users.into_iter().find(|user| user.id == id))
}

/// Removes a student account. Teacher accounts are left alone.
pub(crate) async fn delete_student(store: &Store, id: &str) -> Result<bool, StoreError> {
    store
        .mutate(Collection::Users, |users: &mut Vec<User>| {
            let before = users.len();
            users.retain(|user| !(user.id == id && user.role == UserRole::Student));
            users.len() != before
        })
        .await
}

pub(crate) async fn current(store: &Store) -> Result<Option<User>, StoreError> {
    store.get_object(Collection::CurrentUser).await
}

pub(crate) async fn set_current(store: &Store, user: &User) -> Result<(), StoreError> {
    store.put_object(Collection::CurrentUser, Some(user)).await
}

pub(crate) async fn clear_current(store: &Store) -> Result<(), StoreError> {
    store.put_object::<User>(Collection::CurrentUser, None).await
}
