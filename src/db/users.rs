//! User accounts: registration lookups for the auth layer.

use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::User;
use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Database {
    /// Create a new user. Fails with a conflict when the email is taken.
    ///
    /// The caller is responsible for normalizing the email and hashing the
    /// password; this layer stores exactly what it is given.
    pub fn create_user(
        &self,
        email: &str,
        name: Option<String>,
        password_hash: &str,
    ) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = now_ms();

        self.with_conn(|conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM users WHERE email = ?1",
                    params![email],
                    |_| Ok(true),
                )
                .unwrap_or(false);

            if exists {
                return Err(ApiError::conflict("User with this email already exists").into());
            }

            conn.execute(
                "INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&id, email, name, password_hash, now, now],
            )?;

            Ok(User {
                id: id.clone(),
                email: email.to_string(),
                name,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Look up a user and their password hash by email, for login.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, name, password_hash, created_at, updated_at
                 FROM users WHERE email = ?1",
            )?;

            let result = stmt.query_row(params![email], |row| {
                let user = parse_user_row(row)?;
                let password_hash: String = row.get("password_hash")?;
                Ok((user, password_hash))
            });

            match result {
                Ok(found) => Ok(Some(found)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}
