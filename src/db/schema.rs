//! DDL for the credential store.
//! Portable between SQLite and PostgreSQL.

/// Default layout expected by the user-details lookup:
/// - `users.password` carries an encoder id prefix, e.g. `{bcrypt}$2a$...`
/// - `authorities.authority` carries the `ROLE_` prefix
/// - `(username, authority)` is unique
pub const SECURITY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    username VARCHAR(50) NOT NULL PRIMARY KEY,
    password VARCHAR(68) NOT NULL,
    enabled BOOLEAN NOT NULL
);

CREATE TABLE IF NOT EXISTS authorities (
    username VARCHAR(50) NOT NULL REFERENCES users(username),
    authority VARCHAR(50) NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS authorities_idx_1 ON authorities (username, authority);
"#;

pub const USER_BY_USERNAME: &str =
    "SELECT username, password, enabled FROM users WHERE username = $1";

pub const AUTHORITIES_BY_USERNAME: &str =
    "SELECT username, authority FROM authorities WHERE username = $1";
