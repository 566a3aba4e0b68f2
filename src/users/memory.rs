use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::users::{
    dto::UserRequest,
    repo::{StoreError, UserStore},
    repo_types::User,
};

/// Test double with the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct InMemoryUserStore {
    rows: Mutex<Rows>,
    calls: AtomicUsize,
    failure: Option<String>,
}

#[derive(Default)]
struct Rows {
    next_id: i64,
    by_id: BTreeMap<i64, User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a backend error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<User> {
        self.rows.lock().unwrap().by_id.values().cloned().collect()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

impl Rows {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.by_id
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, fields: &UserRequest) -> Result<User, StoreError> {
        self.enter()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.email_taken(&fields.email, None) {
            return Err(StoreError::ConstraintViolation);
        }
        rows.next_id += 1;
        let user = User {
            id: rows.next_id,
            name: fields.name.clone(),
            email: fields.email.clone(),
        };
        rows.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.enter()?;
        let rows = self.rows.lock().unwrap();
        rows.by_id.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_all(&self) -> Result<Vec<User>, StoreError> {
        self.enter()?;
        Ok(self.rows.lock().unwrap().by_id.values().cloned().collect())
    }

    async fn update_by_id(&self, id: i64, fields: &UserRequest) -> Result<User, StoreError> {
        self.enter()?;
        let mut rows = self.rows.lock().unwrap();
        if !rows.by_id.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if rows.email_taken(&fields.email, Some(id)) {
            return Err(StoreError::ConstraintViolation);
        }
        let user = User {
            id,
            name: fields.name.clone(),
            email: fields.email.clone(),
        };
        rows.by_id.insert(id, user.clone());
        Ok(user)
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        self.enter()?;
        let mut rows = self.rows.lock().unwrap();
        rows.by_id.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}
