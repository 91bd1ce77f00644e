use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// ユーザーエンティティ
///
/// `id` とタイムスタンプはユースケース層で付与する。
/// クライアントから受け取った値は使わない。
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// 平文のまま保存（ハッシュ化は行わない）
    pub password: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// 作成・更新リクエストのボディ
///
/// 欠けているフィールドは空文字列になる。
/// `id` や `created_at` などの未知フィールドは無視する。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserPayload {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl User {
    /// ペイロードから新しいエンティティを組み立てる
    pub fn from_payload(id: String, payload: UserPayload, now: OffsetDateTime) -> Self {
        Self {
            id,
            email: payload.email,
            name: payload.name,
            password: payload.password,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_missing_fields_default_to_empty() {
        let payload: UserPayload = serde_json::from_str(r#"{"email":"a@x"}"#).unwrap();
        assert_eq!(payload.email, "a@x");
        assert!(payload.name.is_empty());
        assert!(payload.password.is_empty());
    }

    #[test]
    fn test_payload_ignores_identity_fields() {
        let payload: UserPayload = serde_json::from_str(
            r#"{"id":"client-id","email":"a@x","name":"A","password":"p","created_at":"bogus"}"#,
        )
        .unwrap();
        assert_eq!(payload.name, "A");
    }

    #[test]
    fn test_user_serializes_rfc3339_timestamps() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let user = User::from_payload(
            "id-1".to_string(),
            UserPayload {
                email: "a@x".to_string(),
                name: "A".to_string(),
                password: "p".to_string(),
            },
            now,
        );

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "id-1");
        assert_eq!(json["password"], "p");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["created_at"], json["updated_at"]);
    }
}
