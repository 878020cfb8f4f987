pub mod domain;
pub mod infrastructure;
pub mod test_utils;

// Persisted records field names

pub const ID_FIELD_NAME: &str = "id";
pub const RECORD_ID_FIELD_NAME: &str = "record_id";
pub const USER_ID_FIELD_NAME: &str = "user_id";
pub const AUTHOR_KIND_FIELD_NAME: &str = "author_kind";

pub const CREATED_FIELD_NAME: &str = "created_at";
pub const UPDATED_FIELD_NAME: &str = "updated_at";

// Users table, owned by the institution identity system

pub const USERS_TABLE_NAME: &str = "users";
pub const USER_NAME_FIELD_NAME: &str = "name";
pub const USER_EMAIL_FIELD_NAME: &str = "email";
pub const USER_ROLE_FIELD_NAME: &str = "role";

// expose domain module

pub use domain::*;

// expose database module

pub use infrastructure::database;
