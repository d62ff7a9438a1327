//! Database layer (SQLite via sqlx).

pub mod queries;
pub mod sqlite;

pub use sqlite::AuthDb;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    pub const USER_PASSWORDS: &str = "user_passwords";
    pub const OAUTH_ACCOUNTS: &str = "oauth_accounts";
    pub const USER_SESSIONS: &str = "user_sessions";
}
