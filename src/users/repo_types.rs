use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_ROLE: &str = "user";

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub address: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, never the plaintext
    pub is_active: bool,
    pub roles: Vec<String>,
    pub created_at: OffsetDateTime,
}

/// Fields supplied on insert; the store assigns id and created_at.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub address: String,
    pub password_hash: String,
    pub is_active: bool,
    pub roles: Vec<String>,
}

impl NewUser {
    pub fn new(email: String, name: String, address: String, password_hash: String) -> Self {
        Self {
            email,
            name,
            address,
            password_hash,
            is_active: true,
            roles: vec![DEFAULT_ROLE.to_string()],
        }
    }
}

/// User as returned to callers: the record without its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub address: String,
    pub is_active: bool,
    pub roles: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            address: u.address,
            is_active: u.is_active,
            roles: u.roles,
            created_at: u.created_at,
        }
    }
}
