//! crates/learning_session_core/src/ports.rs
//!
//! Defines the service contracts (traits) the session core depends on.
//! These traits form the boundary of the hexagonal architecture, so the core
//! never knows whether replies are canned or generated, or where catalog data lives.

use crate::domain::{
    Assessment, AssessmentResult, AvatarReceipt, ClarityLevel, Course, CourseProgress, Discussion,
    DoubtContext, EnrollmentReceipt, LeaderboardEntry, LearningMode, ProfileUpdate, UserProfile,
};
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Produces the text of bot replies. Callers fall back to the canned
/// templates when a generator fails.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Answers a question raised at a point in a video.
    async fn answer_doubt(
        &self,
        question: &str,
        context: &DoubtContext,
        clarity: ClarityLevel,
        mode: LearningMode,
    ) -> PortResult<String>;

    async fn general_reply(
        &self,
        input: &str,
        clarity: ClarityLevel,
        mode: LearningMode,
    ) -> PortResult<String>;
}

/// Read-mostly access to courses, assessments, community data and the profile.
#[async_trait]
pub trait CatalogService: Send + Sync {
    // --- Courses ---
    async fn list_courses(&self) -> PortResult<Vec<Course>>;

    async fn get_course(&self, course_id: &str) -> PortResult<Course>;

    async fn list_enrolled_courses(&self) -> PortResult<Vec<Course>>;

    async fn enroll(&self, course_id: &str) -> PortResult<EnrollmentReceipt>;

    async fn get_course_progress(&self, course_id: &str) -> PortResult<CourseProgress>;

    // --- Assessments ---
    async fn list_assessments(&self) -> PortResult<Vec<Assessment>>;

    async fn get_assessment(&self, assessment_id: &str) -> PortResult<Assessment>;

    async fn submit_assessment(
        &self,
        assessment_id: &str,
        answers: &serde_json::Value,
    ) -> PortResult<AssessmentResult>;

    // --- Community ---
    async fn leaderboard(&self) -> PortResult<Vec<LeaderboardEntry>>;

    async fn discussions(&self) -> PortResult<Vec<Discussion>>;

    // --- Profile ---
    async fn get_profile(&self) -> PortResult<UserProfile>;

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<UserProfile>;

    /// The stored avatar image for `user_id`, or an empty image when none was uploaded.
    async fn get_avatar(&self, user_id: &str) -> PortResult<Vec<u8>>;

    /// Replaces the current user's avatar.
    async fn upload_avatar(&self, image: Vec<u8>) -> PortResult<AvatarReceipt>;
}
