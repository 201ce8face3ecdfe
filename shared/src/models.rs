use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::AcademyError;

/// Trigger source of a confirmed self sign-up (as opposed to a forgotten
/// password confirmation).
pub const CONFIRM_SIGN_UP_TRIGGER: &str = "PostConfirmation_ConfirmSignUp";

/// Course completion percentage, guaranteed to be within `0..=100`.
///
/// Values outside the range are rejected when the record is built, so
/// everything downstream can rely on the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct ProgressPercentage(u8);

impl ProgressPercentage {
    pub const MAX: u8 = 100;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 == Self::MAX
    }

    pub fn is_in_progress(self) -> bool {
        self.0 > 0 && self.0 < Self::MAX
    }
}

impl TryFrom<i32> for ProgressPercentage {
    type Error = AcademyError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(ProgressPercentage)
            .ok_or_else(|| {
                AcademyError::InvalidInput(format!(
                    "progress_percentage must be within 0..=100, got {}",
                    value
                ))
            })
    }
}

impl From<ProgressPercentage> for i32 {
    fn from(value: ProgressPercentage) -> Self {
        i32::from(value.0)
    }
}

impl fmt::Display for ProgressPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Progress of one user in one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgressRecord {
    pub course_id: String,
    pub progress_percentage: ProgressPercentage,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl CourseProgressRecord {
    /// Build a record without timestamps
    pub fn new(course_id: impl Into<String>, progress_percentage: i32) -> Result<Self, AcademyError> {
        Ok(Self {
            course_id: course_id.into(),
            progress_percentage: ProgressPercentage::try_from(progress_percentage)?,
            started_at: None,
            completed_at: None,
            last_accessed: None,
        })
    }
}

/// Counters computed by the aggregate query, independently of the per-course rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    pub total_courses_enrolled: u32,
    pub courses_completed: u32,
    pub average_progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_courses: u32,
    pub completed_courses: u32,
    pub in_progress_courses: u32,
    pub average_progress: f64,
}

impl ProgressSummary {
    pub fn empty() -> Self {
        Self {
            total_courses: 0,
            completed_courses: 0,
            in_progress_courses: 0,
            average_progress: 0.0,
        }
    }
}

/// Identity fields plus the aggregate counters, as returned by the statistics query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    #[serde(flatten)]
    pub aggregate: AggregateStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgressResponse {
    pub user: UserStatistics,
    pub courses: Vec<CourseProgressRecord>,
    pub summary: ProgressSummary,
}

/// Profile created when a sign-up is confirmed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUserProfile {
    pub cognito_user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture_url: Option<String>,
    pub provider: String,
}

// Custom structs to tolerate the null and missing values Cognito sends
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitoPostConfirmationRequest {
    #[serde(default)]
    pub user_attributes: HashMap<String, String>,
    pub client_metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitoPostConfirmationEvent {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub user_pool_id: String,
    pub user_name: Option<String>,
    #[serde(default)]
    pub caller_context: HashMap<String, Value>,
    #[serde(default)]
    pub trigger_source: String,
    #[serde(default)]
    pub request: CognitoPostConfirmationRequest,
    #[serde(default)]
    pub response: HashMap<String, Value>,
}

impl CognitoPostConfirmationEvent {
    pub fn is_confirm_sign_up(&self) -> bool {
        self.trigger_source == CONFIRM_SIGN_UP_TRIGGER
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub step_id: Option<u32>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub context: Option<String>,
    #[serde(default)]
    pub user: ChatUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub course_id: String,
    pub model_id: String,
}
