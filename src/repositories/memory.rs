use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageResult;
use crate::models::User;
use crate::repositories::UserRepository;

/// インメモリ実装（開発・テスト用）
///
/// PostgreSQL 実装と同じく、存在しない行の更新・削除は何もせず成功する。
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> StorageResult<()> {
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn update(&self, user: &User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        if let Some(stored) = users.get_mut(&user.id) {
            stored.email = user.email.clone();
            stored.name = user.name.clone();
            stored.password = user.password.clone();
            stored.updated_at = user.updated_at;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.users.write().await.remove(id);
        Ok(())
    }

    async fn list(&self, offset: u32, limit: u32) -> StorageResult<Vec<User>> {
        let users = self.users.read().await;

        let mut result: Vec<User> = users.values().cloned().collect();
        // created_at 降順（新しい順）
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(result
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
