use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    AcademyError, AcademyResult, AggregateStatistics, CourseProgressRecord, NewUserProfile,
    ProgressPercentage, ProgressRepository, UserRepository, UserStatistics,
};

const USER_STATISTICS_QUERY: &str = r"
    SELECT u.id AS user_id,
           u.name,
           u.email,
           COUNT(ucp.id) AS total_courses_enrolled,
           COUNT(CASE WHEN ucp.progress_percentage = 100 THEN 1 END) AS courses_completed,
           COALESCE(AVG(ucp.progress_percentage), 0)::float8 AS average_progress
    FROM users u
    LEFT JOIN user_course_progress ucp ON u.id = ucp.user_id
    WHERE u.id = $1
    GROUP BY u.id, u.name, u.email
";

const COURSE_PROGRESS_QUERY: &str = r"
    SELECT course_id, progress_percentage, started_at, completed_at, last_accessed
    FROM user_course_progress
    WHERE user_id = $1
    ORDER BY last_accessed DESC NULLS LAST
";

const UPSERT_USER_QUERY: &str = r"
    INSERT INTO users (cognito_user_id, email, name, picture_url, provider, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $6)
    ON CONFLICT (cognito_user_id) DO UPDATE SET
        email = EXCLUDED.email,
        name = EXCLUDED.name,
        picture_url = EXCLUDED.picture_url,
        updated_at = EXCLUDED.updated_at
    RETURNING id
";

fn db<E: std::fmt::Display>(e: E) -> AcademyError {
    AcademyError::DatabaseError(e.to_string())
}

fn count(field: &'static str, v: i64) -> AcademyResult<u32> {
    u32::try_from(v).map_err(|_| AcademyError::DatabaseError(format!("invalid {}: {}", field, v)))
}

fn map_statistics_row(row: &PgRow) -> AcademyResult<UserStatistics> {
    Ok(UserStatistics {
        user_id: row.try_get("user_id").map_err(db)?,
        name: row.try_get("name").map_err(db)?,
        email: row.try_get("email").map_err(db)?,
        aggregate: AggregateStatistics {
            total_courses_enrolled: count(
                "total_courses_enrolled",
                row.try_get("total_courses_enrolled").map_err(db)?,
            )?,
            courses_completed: count("courses_completed", row.try_get("courses_completed").map_err(db)?)?,
            average_progress: row.try_get("average_progress").map_err(db)?,
        },
    })
}

fn map_course_row(row: &PgRow) -> AcademyResult<CourseProgressRecord> {
    let course_id: String = row.try_get("course_id").map_err(db)?;
    let raw: i32 = row.try_get("progress_percentage").map_err(db)?;

    // Out-of-range rows are refused here rather than clamped.
    let progress_percentage = ProgressPercentage::try_from(raw).map_err(|e| {
        tracing::error!("Course {} has an invalid progress value: {}", course_id, raw);
        e
    })?;

    Ok(CourseProgressRecord {
        course_id,
        progress_percentage,
        started_at: row.try_get("started_at").map_err(db)?,
        completed_at: row.try_get("completed_at").map_err(db)?,
        last_accessed: row.try_get("last_accessed").map_err(db)?,
    })
}

/// PostgreSQL-backed storage. The pool is created at startup and handed in.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close every connection in the pool
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

#[async_trait]
impl ProgressRepository for PostgresRepository {
    async fn user_statistics(&self, user_id: Uuid) -> AcademyResult<Option<UserStatistics>> {
        let row = sqlx::query(USER_STATISTICS_QUERY)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_statistics_row).transpose()
    }

    async fn course_progress(&self, user_id: Uuid) -> AcademyResult<Vec<CourseProgressRecord>> {
        let rows = sqlx::query(COURSE_PROGRESS_QUERY)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_course_row).collect()
    }

    async fn ping(&self) -> AcademyResult<()> {
        let value: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        if value != 1 {
            return Err(AcademyError::DatabaseError(format!("unexpected ping result: {}", value)));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn upsert_user(&self, profile: &NewUserProfile) -> AcademyResult<Uuid> {
        let now = Utc::now();

        let id: Uuid = sqlx::query_scalar(UPSERT_USER_QUERY)
            .bind(&profile.cognito_user_id)
            .bind(&profile.email)
            .bind(&profile.name)
            .bind(&profile.picture_url)
            .bind(&profile.provider)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!("Upserted user {} for Cognito user {}", id, profile.cognito_user_id);
        Ok(id)
    }
}
