//! In-memory user store behind the demo user routes.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::user::{CreateUserRequest, User};

#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, request: CreateUserRequest, created_by: Option<String>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: request.email,
            name: request.name,
            age: request.age,
            created_by,
            created_at: Utc::now(),
        };

        self.users.write().await.insert(user.id, user.clone());
        user
    }

    pub async fn get(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    /// All users, newest first.
    pub async fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }

    /// Returns `false` when no user had that id.
    pub async fn delete(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }
}
