use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// リポジトリ層のエラー
///
/// sqlx のエラーに短いコンテキスト文字列を付けてラップする。
#[derive(Debug, thiserror::Error)]
#[error("{context}: {source}")]
pub struct StorageError {
    context: &'static str,
    #[source]
    source: sqlx::Error,
}

impl StorageError {
    pub fn new(context: &'static str, source: sqlx::Error) -> Self {
        Self { context, source }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// JSON のデコード失敗など
    #[error("{0}")]
    InvalidInput(String),

    /// 更新・削除・取得対象のユーザーが存在しない
    #[error("user not found")]
    UserNotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Storage(e) => {
                tracing::error!(error = ?e, "ストレージエラー");
            }
            Self::InvalidInput(msg) => {
                tracing::debug!(error = %msg, "不正なリクエスト");
            }
            Self::UserNotFound => {}
        }

        // 500 でもラップしたメッセージをそのまま返す
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
