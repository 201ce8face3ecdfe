use async_trait::async_trait;
use uuid::Uuid;

use crate::{AcademyResult, CourseProgressRecord, NewUserProfile, UserStatistics};

/// Read side of course progress storage.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Identity fields plus aggregate counters, `None` if no user has this id
    async fn user_statistics(&self, user_id: Uuid) -> AcademyResult<Option<UserStatistics>>;

    /// Per-course rows, most recently accessed first
    async fn course_progress(&self, user_id: Uuid) -> AcademyResult<Vec<CourseProgressRecord>>;

    /// Connectivity check
    async fn ping(&self) -> AcademyResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create or refresh the profile of a Cognito user, returning its id
    async fn upsert_user(&self, profile: &NewUserProfile) -> AcademyResult<Uuid>;
}
