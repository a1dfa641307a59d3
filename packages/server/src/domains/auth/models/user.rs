use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::UserId;

/// User reference - identity, email and roles owned by the auth service
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl User {
    /// Find user by ID
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Insert a user record (seeding and tests; production users come from the auth service)
    pub async fn create(email: &str, roles: &[&str], pool: &PgPool) -> Result<Self> {
        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, roles)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(UserId::new())
        .bind(email)
        .bind(roles)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }
}
