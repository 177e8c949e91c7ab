use sqlx::SqlitePool;

use super::{open_pool, timestamp_now};

/// Login history, kept in its own database apart from the primary store.
#[derive(Clone)]
pub struct AuditLog {
    pub pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoginRecord {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub login_time: String,
    pub auth_token: String,
}

impl AuditLog {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            pool: open_pool(url).await?,
        })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations_audit").run(&self.pool).await?;
        Ok(())
    }

    pub async fn record_login(
        &self,
        user_id: &str,
        username: &str,
        email: &str,
        auth_token: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO login_history (user_id, username, email, login_time, auth_token) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(username)
        .bind(email)
        .bind(timestamp_now())
        .bind(auth_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn logins_for(&self, user_id: &str) -> Result<Vec<LoginRecord>, sqlx::Error> {
        sqlx::query_as::<_, LoginRecord>(
            "SELECT user_id, username, email, login_time, auth_token FROM login_history WHERE user_id = ? ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
