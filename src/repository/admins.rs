//! Counter staff accounts

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::member::Admin};

#[derive(Clone)]
pub struct AdminsRepository {
    pool: Pool<Postgres>,
}

impl AdminsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Admin accounts with the given name, for login
    pub async fn find_by_name(&self, name: &str) -> AppResult<Vec<Admin>> {
        let admins = sqlx::query_as::<_, Admin>(
            "SELECT admin_id, name, phone, role, status FROM admin WHERE name = $1 ORDER BY admin_id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(admins)
    }
}
