use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgExecutor};
use sqlx::PgPool;

use crate::error::{StorageError, StorageResult};
use crate::models::User;

/// ユーザーの永続化インターフェース
///
/// 更新・削除は存在確認をしない。対象がなければ 0 行の操作として成功扱いになる。
/// 存在確認はユースケース層の責務。
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// エンティティの値をそのまま挿入する
    async fn create(&self, user: &User) -> StorageResult<()>;

    /// 主キーで検索。見つからなければ `Ok(None)`
    async fn get_by_id(&self, id: &str) -> StorageResult<Option<User>>;

    /// email, name, password, updated_at を更新する
    async fn update(&self, user: &User) -> StorageResult<()>;

    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// created_at の降順で `offset` 件飛ばし、最大 `limit` 件返す
    async fn list(&self, offset: u32, limit: u32) -> StorageResult<Vec<User>>;
}

/// `with_transaction` に渡すクロージャが返す Future
pub type TxFuture<'t, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 't>>;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// トランザクション内で `f` を実行する
    ///
    /// `f` にはトランザクションに束縛された [`UserTx`] が渡される。
    /// `Ok` ならコミット、`Err` ならロールバックして元のエラーを返す。
    /// `f` が panic した場合はアンワインド中にトランザクションが drop され、
    /// ロールバックされたうえで panic が伝播する。
    ///
    /// ```ignore
    /// repo.with_transaction(|mut tx| {
    ///     Box::pin(async move {
    ///         tx.create(&user).await?;
    ///         Ok::<_, StorageError>(())
    ///     })
    /// })
    /// .await?;
    /// ```
    pub async fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'t> FnOnce(UserTx<'t>) -> TxFuture<'t, T, E>,
        E: From<StorageError>,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::new("error beginning transaction", e))?;

        let outcome = f(UserTx { conn: &mut *tx }).await;

        match outcome {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| StorageError::new("error committing transaction", e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = ?rollback_err, "トランザクションのロールバックに失敗");
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> StorageResult<()> {
        insert_user(&self.pool, user).await
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        select_user(&self.pool, id).await
    }

    async fn update(&self, user: &User) -> StorageResult<()> {
        update_user(&self.pool, user).await
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        delete_user(&self.pool, id).await
    }

    async fn list(&self, offset: u32, limit: u32) -> StorageResult<Vec<User>> {
        list_users(&self.pool, offset, limit).await
    }
}

/// トランザクションに束縛されたリポジトリ操作
pub struct UserTx<'t> {
    conn: &'t mut PgConnection,
}

impl UserTx<'_> {
    pub async fn create(&mut self, user: &User) -> StorageResult<()> {
        insert_user(&mut *self.conn, user).await
    }

    pub async fn get_by_id(&mut self, id: &str) -> StorageResult<Option<User>> {
        select_user(&mut *self.conn, id).await
    }

    pub async fn update(&mut self, user: &User) -> StorageResult<()> {
        update_user(&mut *self.conn, user).await
    }

    pub async fn delete(&mut self, id: &str) -> StorageResult<()> {
        delete_user(&mut *self.conn, id).await
    }

    pub async fn list(&mut self, offset: u32, limit: u32) -> StorageResult<Vec<User>> {
        list_users(&mut *self.conn, offset, limit).await
    }
}

async fn insert_user<'e, X>(executor: X, user: &User) -> StorageResult<()>
where
    X: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user.id.as_str())
    .bind(user.email.as_str())
    .bind(user.name.as_str())
    .bind(user.password.as_str())
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await
    .map_err(|e| StorageError::new("error creating user", e))?;

    Ok(())
}

async fn select_user<'e, X>(executor: X, id: &str) -> StorageResult<Option<User>>
where
    X: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(|e| StorageError::new("error getting user by id", e))
}

async fn update_user<'e, X>(executor: X, user: &User) -> StorageResult<()>
where
    X: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE users
        SET email = $1, name = $2, password = $3, updated_at = $4
        WHERE id = $5
        "#,
    )
    .bind(user.email.as_str())
    .bind(user.name.as_str())
    .bind(user.password.as_str())
    .bind(user.updated_at)
    .bind(user.id.as_str())
    .execute(executor)
    .await
    .map_err(|e| StorageError::new("error updating user", e))?;

    Ok(())
}

async fn delete_user<'e, X>(executor: X, id: &str) -> StorageResult<()>
where
    X: PgExecutor<'e>,
{
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(|e| StorageError::new("error deleting user", e))?;

    Ok(())
}

async fn list_users<'e, X>(executor: X, offset: u32, limit: u32) -> StorageResult<Vec<User>>
where
    X: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password, created_at, updated_at
        FROM users
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(i64::from(limit))
    .bind(i64::from(offset))
    .fetch_all(executor)
    .await
    .map_err(|e| StorageError::new("error listing users", e))
}
