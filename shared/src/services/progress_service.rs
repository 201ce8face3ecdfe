use uuid::Uuid;

use crate::{progress, AcademyError, AcademyResult, ProgressRepository, UserProgressResponse};

/// Assembles the progress view of a user from storage reads.
pub struct ProgressService<R> {
    repository: R,
}

impl<R: ProgressRepository> ProgressService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Load statistics and course rows for a user and reconcile them
    pub async fn get_user_progress(&self, user_id: Uuid) -> AcademyResult<UserProgressResponse> {
        tracing::info!("Getting progress for user: {}", user_id);

        let user = self
            .repository
            .user_statistics(user_id)
            .await?
            .ok_or_else(|| AcademyError::UserNotFound(user_id.to_string()))?;

        let courses = self.repository.course_progress(user_id).await?;
        let summary = progress::reconcile(Some(&user.aggregate), &courses);

        tracing::info!("Progress retrieved for user {}: {} courses", user_id, courses.len());

        Ok(UserProgressResponse {
            user,
            courses,
            summary,
        })
    }

    /// True when storage answers
    pub async fn is_healthy(&self) -> bool {
        match self.repository.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Database connection test failed: {}", e);
                false
            }
        }
    }
}
