use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::repositories::{PgUserRepository, UserRepository};
use crate::services::UserService;

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// リクエスト間で共有する可変状態は DB コネクションプールのみ。
#[derive(Clone)]
pub struct AppState {
    /// ユーザー管理ユースケース
    pub user_service: UserService,
    /// アプリケーション情報（Arc で共有）
    pub app: Arc<AppConfig>,
}

impl AppState {
    /// 任意のリポジトリ実装から AppState を作成
    pub fn new(user_repo: Arc<dyn UserRepository>, app: AppConfig) -> Self {
        Self {
            user_service: UserService::new(user_repo),
            app: Arc::new(app),
        }
    }

    /// PostgreSQL のコネクションプールから AppState を作成
    pub fn with_pool(db_pool: PgPool, app: AppConfig) -> Self {
        Self::new(Arc::new(PgUserRepository::new(db_pool)), app)
    }
}
