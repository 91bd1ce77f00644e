pub mod health;
pub mod json;
pub mod path;
pub mod user;

pub use health::health_check;
pub use user::{create_user, delete_user, get_user_by_id, list_users, update_user};
