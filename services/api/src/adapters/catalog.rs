//! services/api/src/adapters/catalog.rs
//!
//! An in-memory implementation of the `CatalogService` port. Courses,
//! assessments and community data are fixed seed data; enrollments and
//! uploaded avatars live for as long as the process does.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use learning_session_core::domain::{
    Assessment, AssessmentResult, AvatarReceipt, Course, CourseProgress, Discussion,
    EnrollmentReceipt, LeaderboardEntry, ProfileUpdate, UserProfile,
};
use learning_session_core::ports::{CatalogService, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

const CURRENT_USER_ID: &str = "user1";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A catalog adapter backed by seed data and an in-memory enrollment table.
pub struct MockCatalogAdapter {
    courses: Vec<Course>,
    assessments: Vec<Assessment>,
    leaderboard: Vec<LeaderboardEntry>,
    discussions: Vec<Discussion>,
    profile: UserProfile,
    /// Course progress keyed by course id. Presence means "enrolled".
    progress: RwLock<HashMap<String, CourseProgress>>,
    /// Uploaded avatar images keyed by user id.
    avatars: RwLock<HashMap<String, Vec<u8>>>,
}

impl Default for MockCatalogAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogAdapter {
    /// Creates a new `MockCatalogAdapter` populated with the seed data.
    pub fn new() -> Self {
        Self {
            courses: seed_courses(),
            assessments: seed_assessments(),
            leaderboard: seed_leaderboard(),
            discussions: seed_discussions(),
            profile: seed_profile(),
            progress: RwLock::new(seed_progress()),
            avatars: RwLock::new(HashMap::new()),
        }
    }

    fn find_course(&self, course_id: &str) -> PortResult<&Course> {
        self.courses
            .iter()
            .find(|course| course.id == course_id)
            .ok_or_else(|| PortError::NotFound("Course not found".to_string()))
    }

    fn with_enrollment(course: &Course, progress: &HashMap<String, CourseProgress>) -> Course {
        let mut course = course.clone();
        course.is_enrolled = course.is_enrolled || progress.contains_key(&course.id);
        course
    }
}

//=========================================================================================
// `CatalogService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogService for MockCatalogAdapter {
    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let progress = self.progress.read().await;
        Ok(self
            .courses
            .iter()
            .map(|course| Self::with_enrollment(course, &progress))
            .collect())
    }

    async fn get_course(&self, course_id: &str) -> PortResult<Course> {
        let course = self.find_course(course_id)?;
        let progress = self.progress.read().await;
        Ok(Self::with_enrollment(course, &progress))
    }

    async fn list_enrolled_courses(&self) -> PortResult<Vec<Course>> {
        let progress = self.progress.read().await;
        Ok(self
            .courses
            .iter()
            .filter(|course| progress.contains_key(&course.id))
            .map(|course| Self::with_enrollment(course, &progress))
            .collect())
    }

    async fn enroll(&self, course_id: &str) -> PortResult<EnrollmentReceipt> {
        self.find_course(course_id)?;
        let mut progress = self.progress.write().await;
        if !progress.contains_key(course_id) {
            info!("Enrolling {} in course {}", CURRENT_USER_ID, course_id);
            progress.insert(
                course_id.to_string(),
                CourseProgress {
                    course_id: course_id.to_string(),
                    user_id: CURRENT_USER_ID.to_string(),
                    completed_modules: Vec::new(),
                    percent_complete: 0.0,
                    last_accessed: Utc::now(),
                },
            );
        }
        Ok(EnrollmentReceipt {
            success: true,
            message: "Successfully enrolled in the course".to_string(),
        })
    }

    async fn get_course_progress(&self, course_id: &str) -> PortResult<CourseProgress> {
        self.progress
            .read()
            .await
            .get(course_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Course progress not found".to_string()))
    }

    async fn list_assessments(&self) -> PortResult<Vec<Assessment>> {
        Ok(self.assessments.clone())
    }

    async fn get_assessment(&self, assessment_id: &str) -> PortResult<Assessment> {
        self.assessments
            .iter()
            .find(|assessment| assessment.id == assessment_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Assessment not found".to_string()))
    }

    /// Unknown assessment ids are rejected rather than graded.
    async fn submit_assessment(
        &self,
        assessment_id: &str,
        answers: &serde_json::Value,
    ) -> PortResult<AssessmentResult> {
        self.get_assessment(assessment_id).await?;
        info!(
            "Received submission for {} ({} answer fields)",
            assessment_id,
            answers.as_object().map_or(0, |fields| fields.len())
        );
        // Grading is not modelled; every submission gets the same result.
        Ok(AssessmentResult {
            success: true,
            score: 85,
            feedback: "Great job! You've demonstrated a good understanding of the concepts."
                .to_string(),
        })
    }

    async fn leaderboard(&self) -> PortResult<Vec<LeaderboardEntry>> {
        let mut entries = self.leaderboard.clone();
        entries.sort_by(|a, b| b.points.cmp(&a.points));
        Ok(entries)
    }

    async fn discussions(&self) -> PortResult<Vec<Discussion>> {
        Ok(self.discussions.clone())
    }

    async fn get_profile(&self) -> PortResult<UserProfile> {
        Ok(self.profile.clone())
    }

    /// Echoes the merged profile. Nothing is stored, and fields missing from
    /// the update keep their current values instead of being cleared.
    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<UserProfile> {
        let current = &self.profile;
        Ok(UserProfile {
            id: current.id.clone(),
            name: update.name.clone().unwrap_or_else(|| current.name.clone()),
            email: update.email.clone().unwrap_or_else(|| current.email.clone()),
            role: update.role.clone().unwrap_or_else(|| current.role.clone()),
            avatar_url: current.avatar_url.clone(),
            bio: update.bio.clone().or_else(|| current.bio.clone()),
            skills: update.skills.clone().unwrap_or_else(|| current.skills.clone()),
            learning_focus: update
                .learning_focus
                .clone()
                .or_else(|| current.learning_focus.clone()),
        })
    }

    async fn get_avatar(&self, user_id: &str) -> PortResult<Vec<u8>> {
        Ok(self
            .avatars
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload_avatar(&self, image: Vec<u8>) -> PortResult<AvatarReceipt> {
        info!(
            "Storing a {} byte avatar for {}",
            image.len(),
            CURRENT_USER_ID
        );
        self.avatars
            .write()
            .await
            .insert(CURRENT_USER_ID.to_string(), image);
        Ok(AvatarReceipt {
            success: true,
            avatar_url: format!("/api/users/{CURRENT_USER_ID}/avatar"),
        })
    }
}

//=========================================================================================
// Seed Data
//=========================================================================================

fn seed_courses() -> Vec<Course> {
    vec![
        Course {
            id: "course1".to_string(),
            title: "Generative AI for Developers".to_string(),
            description: "Master strategies and techniques to code with Generative AI. Learn prompt engineering and how to integrate AI in your applications.".to_string(),
            course_type: "Course".to_string(),
            level: "Intermediate".to_string(),
            duration: "4h 40m".to_string(),
            instructor: "Dr. Johnson".to_string(),
            instructor_id: "instructor1".to_string(),
            enrolled_count: 17770,
            rating: Some(4.8),
            thumbnail_url: None,
            is_enrolled: false,
        },
        Course {
            id: "course2".to_string(),
            title: "Data Science Professional Certificate".to_string(),
            description: "Launch your career in data science with job-ready skills and hands-on experience.".to_string(),
            course_type: "Pathway".to_string(),
            level: "Beginner".to_string(),
            duration: "12h 30m".to_string(),
            instructor: "Prof. Sharma".to_string(),
            instructor_id: "instructor2".to_string(),
            enrolled_count: 24310,
            rating: Some(4.7),
            thumbnail_url: None,
            is_enrolled: false,
        },
        Course {
            id: "course3".to_string(),
            title: "Understanding Machine Learning Algorithms".to_string(),
            description: "Dive deep into the theory and implementation of machine learning algorithms from classification to clustering.".to_string(),
            course_type: "Course".to_string(),
            level: "Intermediate".to_string(),
            duration: "5h 15m".to_string(),
            instructor: "Dr. Johnson".to_string(),
            instructor_id: "instructor1".to_string(),
            enrolled_count: 8245,
            rating: Some(4.6),
            thumbnail_url: None,
            is_enrolled: false,
        },
    ]
}

fn seed_progress() -> HashMap<String, CourseProgress> {
    let now = Utc::now();
    [
        ("course1", vec!["module1", "module2"], 20.0, now - Duration::hours(2)),
        ("course3", vec!["module1"], 10.0, now - Duration::days(1)),
    ]
    .into_iter()
    .map(|(course_id, modules, percent_complete, last_accessed)| {
        (
            course_id.to_string(),
            CourseProgress {
                course_id: course_id.to_string(),
                user_id: CURRENT_USER_ID.to_string(),
                completed_modules: modules.into_iter().map(str::to_string).collect(),
                percent_complete,
                last_accessed,
            },
        )
    })
    .collect()
}

fn seed_assessments() -> Vec<Assessment> {
    [
        ("assessment1", "Python Fundamentals Quiz", "Quiz", 15, "20 min"),
        ("assessment2", "Machine Learning Algorithms Assessment", "Test", 25, "45 min"),
        ("assessment3", "Generative AI Assessment - Basic Level", "Certification", 15, "30 min"),
    ]
    .into_iter()
    .map(|(id, title, assessment_type, questions, time_estimate)| Assessment {
        id: id.to_string(),
        title: title.to_string(),
        assessment_type: assessment_type.to_string(),
        questions,
        time_estimate: time_estimate.to_string(),
        status: "available".to_string(),
        requirement: None,
    })
    .collect()
}

fn seed_leaderboard() -> Vec<LeaderboardEntry> {
    [
        ("user3", "Alex K.", "AI Researcher", 1250, 45, Some("Expert"), "+2", false),
        ("user4", "Maria G.", "Data Scientist", 980, 30, Some("Mentor"), "0", false),
        ("user5", "Wei L.", "ML Engineer", 940, 28, Some("Contributor"), "-1", false),
        ("user1", "Sripathi", "Data Engineer", 440, 8, None, "+1", false),
        ("user2", "Anjali", "Data Scientist", 680, 15, None, "+3", true),
    ]
    .into_iter()
    .map(
        |(user_id, name, role, points, streak, badge, change, is_online)| LeaderboardEntry {
            user_id: user_id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            points,
            streak,
            badge: badge.map(str::to_string),
            change: change.to_string(),
            is_online,
        },
    )
    .collect()
}

fn seed_discussions() -> Vec<Discussion> {
    vec![
        Discussion {
            id: "discussion1".to_string(),
            title: "Tips for optimizing deep learning models?".to_string(),
            author: "Maria G.".to_string(),
            author_id: "user4".to_string(),
            category: "Deep Learning".to_string(),
            replies: 12,
            views: 234,
            time: "2 hours ago".to_string(),
            solved: true,
        },
        Discussion {
            id: "discussion2".to_string(),
            title: "How to handle imbalanced datasets in classification problems?".to_string(),
            author: "Alex K.".to_string(),
            author_id: "user3".to_string(),
            category: "Machine Learning".to_string(),
            replies: 8,
            views: 156,
            time: "Yesterday".to_string(),
            solved: false,
        },
    ]
}

fn seed_profile() -> UserProfile {
    UserProfile {
        id: CURRENT_USER_ID.to_string(),
        name: "Sripathi".to_string(),
        email: "sripathi@example.com".to_string(),
        role: "Data Engineer".to_string(),
        avatar_url: Some(format!("/api/users/{CURRENT_USER_ID}/avatar")),
        bio: Some(
            "Data engineer passionate about building scalable data pipelines and learning ML."
                .to_string(),
        ),
        skills: ["Python", "SQL", "Data Engineering", "Spark"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        learning_focus: Some("Machine Learning".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_progress_marks_courses_enrolled() {
        let catalog = MockCatalogAdapter::new();
        let courses = catalog.list_courses().await.unwrap();
        let enrolled: Vec<&str> = courses
            .iter()
            .filter(|c| c.is_enrolled)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(enrolled, vec!["course1", "course3"]);
    }

    #[tokio::test]
    async fn enrolling_creates_empty_progress_once() {
        let catalog = MockCatalogAdapter::new();
        assert!(catalog.get_course_progress("course2").await.is_err());

        catalog.enroll("course2").await.unwrap();
        catalog.enroll("course2").await.unwrap();

        let progress = catalog.get_course_progress("course2").await.unwrap();
        assert_eq!(progress.percent_complete, 0.0);
        assert!(progress.completed_modules.is_empty());
        assert!(catalog.get_course("course2").await.unwrap().is_enrolled);
        assert_eq!(catalog.list_enrolled_courses().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let catalog = MockCatalogAdapter::new();
        assert!(matches!(
            catalog.enroll("course9").await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            catalog.get_assessment("assessment9").await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            catalog
                .submit_assessment("assessment9", &serde_json::json!({}))
                .await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn leaderboard_is_sorted_by_points() {
        let catalog = MockCatalogAdapter::new();
        let points: Vec<u32> = catalog
            .leaderboard()
            .await
            .unwrap()
            .iter()
            .map(|entry| entry.points)
            .collect();
        assert_eq!(points, vec![1250, 980, 940, 680, 440]);
    }

    #[tokio::test]
    async fn profile_update_merges_with_current_values() {
        let catalog = MockCatalogAdapter::new();
        let updated = catalog
            .update_profile(&ProfileUpdate {
                name: Some("Sri".to_string()),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.name, "Sri");
        assert_eq!(updated.email, "sripathi@example.com");
        assert_eq!(updated.learning_focus.as_deref(), Some("Machine Learning"));
        assert_eq!(updated.skills.len(), 4);
        assert!(updated.bio.is_some());
        assert_eq!(catalog.get_profile().await.unwrap().name, "Sripathi");
    }

    #[tokio::test]
    async fn avatar_defaults_to_empty_until_uploaded() {
        let catalog = MockCatalogAdapter::new();
        assert!(catalog.get_avatar("user1").await.unwrap().is_empty());

        let receipt = catalog.upload_avatar(vec![0xFF, 0xD8, 0xFF]).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.avatar_url, "/api/users/user1/avatar");
        assert_eq!(catalog.get_avatar("user1").await.unwrap(), vec![0xFF, 0xD8, 0xFF]);
        assert!(catalog.get_avatar("user2").await.unwrap().is_empty());
    }
}
