use std::sync::Arc;

use crate::users::repo::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    #[cfg(test)]
    pub fn fake(store: Arc<crate::users::memory::InMemoryUserStore>) -> Self {
        Self::new(store as Arc<dyn UserStore>)
    }
}
