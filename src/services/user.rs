use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{User, UserPayload};
use crate::repositories::UserRepository;

/// ユーザー管理のユースケース
///
/// ID 採番・タイムスタンプ付与・更新/削除前の存在確認を担う。
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// UUID v4 を採番し、作成日時・更新日時を同じ時刻で設定して保存
    pub async fn create_user(&self, payload: UserPayload) -> Result<User, AppError> {
        let user = User::from_payload(Uuid::new_v4().to_string(), payload, now());

        self.repo.create(&user).await?;

        tracing::info!(user_id = %user.id, "ユーザー作成");
        Ok(user)
    }

    /// 見つからなければ `AppError::UserNotFound`
    pub async fn get_user_by_id(&self, id: &str) -> Result<User, AppError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// 存在確認してから email, name, password を置き換える
    ///
    /// `created_at` は保存済みの値を引き継ぐ。
    /// `updated_at` は保存済みの値より前に戻らない。
    pub async fn update_user(&self, id: &str, payload: UserPayload) -> Result<User, AppError> {
        let existing = self.get_user_by_id(id).await?;

        let user = User {
            id: existing.id,
            email: payload.email,
            name: payload.name,
            password: payload.password,
            created_at: existing.created_at,
            updated_at: now().max(existing.updated_at),
        };

        self.repo.update(&user).await?;

        tracing::info!(user_id = %user.id, "ユーザー更新");
        Ok(user)
    }

    /// 存在確認してから削除
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.get_user_by_id(id).await?;

        self.repo.delete(id).await?;

        tracing::info!(user_id = %id, "ユーザー削除");
        Ok(())
    }

    pub async fn list_users(&self, offset: u32, limit: u32) -> Result<Vec<User>, AppError> {
        Ok(self.repo.list(offset, limit).await?)
    }
}

/// 現在時刻（PostgreSQL の精度に合わせてマイクロ秒に切り捨て）
fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::{StorageError, StorageResult};
    use crate::repositories::InMemoryUserRepository;

    /// 書き込み系の呼び出し回数を数えるラッパー
    #[derive(Default)]
    struct CountingRepository {
        inner: InMemoryUserRepository,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl UserRepository for CountingRepository {
        async fn create(&self, user: &User) -> StorageResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.create(user).await
        }

        async fn get_by_id(&self, id: &str) -> StorageResult<Option<User>> {
            self.inner.get_by_id(id).await
        }

        async fn update(&self, user: &User) -> StorageResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update(user).await
        }

        async fn delete(&self, id: &str) -> StorageResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id).await
        }

        async fn list(&self, offset: u32, limit: u32) -> StorageResult<Vec<User>> {
            self.inner.list(offset, limit).await
        }
    }

    /// すべての操作が失敗するリポジトリ
    struct FailingRepository;

    #[async_trait]
    impl UserRepository for FailingRepository {
        async fn create(&self, _: &User) -> StorageResult<()> {
            Err(StorageError::new("error creating user", sqlx::Error::PoolTimedOut))
        }

        async fn get_by_id(&self, _: &str) -> StorageResult<Option<User>> {
            Err(StorageError::new("error getting user by id", sqlx::Error::PoolTimedOut))
        }

        async fn update(&self, _: &User) -> StorageResult<()> {
            Err(StorageError::new("error updating user", sqlx::Error::PoolTimedOut))
        }

        async fn delete(&self, _: &str) -> StorageResult<()> {
            Err(StorageError::new("error deleting user", sqlx::Error::PoolTimedOut))
        }

        async fn list(&self, _: u32, _: u32) -> StorageResult<Vec<User>> {
            Err(StorageError::new("error listing users", sqlx::Error::PoolTimedOut))
        }
    }

    fn payload(email: &str, name: &str) -> UserPayload {
        UserPayload {
            email: email.to_string(),
            name: name.to_string(),
            password: "password123".to_string(),
        }
    }

    fn create_test_service() -> (UserService, Arc<CountingRepository>) {
        let repo = Arc::new(CountingRepository::default());
        (UserService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_create_user_assigns_id_and_timestamps() {
        let (service, _) = create_test_service();

        let user = service
            .create_user(payload("test@example.com", "Test User"))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&user.id).is_ok());
        assert_eq!(user.created_at, user.updated_at);
        assert_eq!(user.created_at.nanosecond() % 1_000, 0);
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let (service, _) = create_test_service();
        let created = service
            .create_user(payload("test@example.com", "Test User"))
            .await
            .unwrap();

        let fetched = service.get_user_by_id(&created.id).await.unwrap();

        assert_eq!(fetched.email, "test@example.com");
        assert_eq!(fetched.name, "Test User");
        assert_eq!(fetched.password, "password123");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_user_returns_not_found() {
        let (service, _) = create_test_service();
        let result = service.get_user_by_id("does-not-exist").await;
        assert!(matches!(result, Err(AppError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_update_user_refreshes_updated_at() {
        let (service, _) = create_test_service();
        let created = service
            .create_user(payload("test@example.com", "Test User"))
            .await
            .unwrap();

        let updated = service
            .update_user(&created.id, payload("updated@example.com", "Updated User"))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        let stored = service.get_user_by_id(&created.id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_missing_user_does_not_touch_store() {
        let (service, repo) = create_test_service();

        let result = service
            .update_user("never-created", payload("a@x", "A"))
            .await;

        assert!(matches!(result, Err(AppError::UserNotFound)));
        assert_eq!(repo.writes.load(Ordering::SeqCst), 0);
        assert!(repo.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_twice_returns_not_found() {
        let (service, repo) = create_test_service();
        let created = service.create_user(payload("a@x", "A")).await.unwrap();

        service.delete_user(&created.id).await.unwrap();
        let second = service.delete_user(&created.id).await;

        assert!(matches!(second, Err(AppError::UserNotFound)));
        // create + 1回目の delete のみ
        assert_eq!(repo.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_list_users_newest_first() {
        let (service, _) = create_test_service();
        let mut ids = Vec::new();
        for name in ["U1", "U2", "U3"] {
            let user = service.create_user(payload("a@x", name)).await.unwrap();
            ids.push(user.id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let all = service.list_users(0, 3).await.unwrap();
        let names: Vec<&str> = all.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["U3", "U2", "U1"]);

        let tail = service.list_users(2, 2).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let service = UserService::new(Arc::new(FailingRepository));

        let err = service.create_user(payload("a@x", "A")).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(err.to_string().starts_with("error creating user"));

        // 存在確認の失敗は NotFound ではなくそのまま返す
        let err = service
            .update_user("id", payload("a@x", "A"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("error getting user by id"));

        let err = service.delete_user("id").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        let err = service.list_users(0, 10).await.unwrap_err();
        assert!(err.to_string().starts_with("error listing users"));
    }
}
