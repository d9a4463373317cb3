//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use learning_session_core::{
    domain::{
        Assessment, AssessmentResult, AvatarReceipt, Course, CourseProgress, Discussion,
        EnrollmentReceipt, LeaderboardEntry, ProfileUpdate, UserProfile,
    },
    ports::PortError,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_courses_handler,
        get_course_handler,
        list_user_courses_handler,
        enroll_handler,
        course_progress_handler,
        list_assessments_handler,
        get_assessment_handler,
        submit_assessment_handler,
        leaderboard_handler,
        discussions_handler,
        get_profile_handler,
        update_profile_handler,
        get_avatar_handler,
        upload_avatar_handler,
    ),
    components(
        schemas(ErrorBody)
    ),
    tags(
        (name = "Learning Platform API", description = "Catalog, assessment, community and profile endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The body of every failed REST response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

type RestError = (StatusCode, Json<ErrorBody>);
type RestResult<T> = Result<Json<T>, RestError>;

fn port_failure(e: PortError) -> RestError {
    match e {
        PortError::NotFound(detail) => (StatusCode::NOT_FOUND, Json(ErrorBody { detail })),
        PortError::Unexpected(reason) => {
            error!("Catalog request failed: {}", reason);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    detail: "Internal server error".to_string(),
                }),
            )
        }
    }
}

//=========================================================================================
// Course Handlers
//=========================================================================================

/// List every course, flagged with the current user's enrollment.
#[utoipa::path(
    get,
    path = "/api/courses",
    responses((status = 200, description = "All courses"))
)]
pub async fn list_courses_handler(State(app_state): State<Arc<AppState>>) -> RestResult<Vec<Course>> {
    app_state.catalog.list_courses().await.map(Json).map_err(port_failure)
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course identifier")),
    responses(
        (status = 200, description = "The course"),
        (status = 404, description = "Course not found", body = ErrorBody)
    )
)]
pub async fn get_course_handler(
    State(app_state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> RestResult<Course> {
    app_state.catalog.get_course(&course_id).await.map(Json).map_err(port_failure)
}

/// Courses the current user is enrolled in.
#[utoipa::path(
    get,
    path = "/api/users/courses",
    responses((status = 200, description = "Enrolled courses"))
)]
pub async fn list_user_courses_handler(
    State(app_state): State<Arc<AppState>>,
) -> RestResult<Vec<Course>> {
    app_state
        .catalog
        .list_enrolled_courses()
        .await
        .map(Json)
        .map_err(port_failure)
}

/// Enroll the current user. Enrolling twice is harmless.
#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/enroll",
    params(("course_id" = String, Path, description = "Course identifier")),
    responses(
        (status = 200, description = "Enrolled"),
        (status = 404, description = "Course not found", body = ErrorBody)
    )
)]
pub async fn enroll_handler(
    State(app_state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> RestResult<EnrollmentReceipt> {
    app_state.catalog.enroll(&course_id).await.map(Json).map_err(port_failure)
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/progress",
    params(("course_id" = String, Path, description = "Course identifier")),
    responses(
        (status = 200, description = "Progress through the course"),
        (status = 404, description = "Course progress not found", body = ErrorBody)
    )
)]
pub async fn course_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> RestResult<CourseProgress> {
    app_state
        .catalog
        .get_course_progress(&course_id)
        .await
        .map(Json)
        .map_err(port_failure)
}

//=========================================================================================
// Assessment Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/assessments",
    responses((status = 200, description = "All assessments"))
)]
pub async fn list_assessments_handler(
    State(app_state): State<Arc<AppState>>,
) -> RestResult<Vec<Assessment>> {
    app_state.catalog.list_assessments().await.map(Json).map_err(port_failure)
}

#[utoipa::path(
    get,
    path = "/api/assessments/{assessment_id}",
    params(("assessment_id" = String, Path, description = "Assessment identifier")),
    responses(
        (status = 200, description = "The assessment"),
        (status = 404, description = "Assessment not found", body = ErrorBody)
    )
)]
pub async fn get_assessment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(assessment_id): Path<String>,
) -> RestResult<Assessment> {
    app_state
        .catalog
        .get_assessment(&assessment_id)
        .await
        .map(Json)
        .map_err(port_failure)
}

/// Submit answers. The body is an arbitrary JSON object. Unlike a bare
/// grader, an unknown assessment id is a 404.
#[utoipa::path(
    post,
    path = "/api/assessments/{assessment_id}/submit",
    params(("assessment_id" = String, Path, description = "Assessment identifier")),
    responses(
        (status = 200, description = "Graded result"),
        (status = 404, description = "Assessment not found", body = ErrorBody)
    )
)]
pub async fn submit_assessment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(assessment_id): Path<String>,
    Json(answers): Json<serde_json::Value>,
) -> RestResult<AssessmentResult> {
    app_state
        .catalog
        .submit_assessment(&assessment_id, &answers)
        .await
        .map(Json)
        .map_err(port_failure)
}

//=========================================================================================
// Community and Profile Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/community/leaderboard",
    responses((status = 200, description = "Leaderboard, highest points first"))
)]
pub async fn leaderboard_handler(
    State(app_state): State<Arc<AppState>>,
) -> RestResult<Vec<LeaderboardEntry>> {
    app_state.catalog.leaderboard().await.map(Json).map_err(port_failure)
}

#[utoipa::path(
    get,
    path = "/api/community/discussions",
    responses((status = 200, description = "Recent discussions"))
)]
pub async fn discussions_handler(
    State(app_state): State<Arc<AppState>>,
) -> RestResult<Vec<Discussion>> {
    app_state.catalog.discussions().await.map(Json).map_err(port_failure)
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses((status = 200, description = "The current user's profile"))
)]
pub async fn get_profile_handler(State(app_state): State<Arc<AppState>>) -> RestResult<UserProfile> {
    app_state.catalog.get_profile().await.map(Json).map_err(port_failure)
}

/// Merge the given fields into the profile and return the result. Omitted
/// fields keep their current values rather than being blanked.
#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body(content_type = "application/json", description = "Profile fields to change."),
    responses((status = 200, description = "The updated profile"))
)]
pub async fn update_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Json(update): Json<ProfileUpdate>,
) -> RestResult<UserProfile> {
    app_state
        .catalog
        .update_profile(&update)
        .await
        .map(Json)
        .map_err(port_failure)
}

/// Serve a user's avatar image. Users without an upload get an empty image.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/avatar",
    params(("user_id" = String, Path, description = "User identifier")),
    responses((status = 200, description = "The avatar image (image/jpeg)"))
)]
pub async fn get_avatar_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, RestError> {
    let image = app_state
        .catalog
        .get_avatar(&user_id)
        .await
        .map_err(port_failure)?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], image))
}

/// Replace the current user's avatar with the multipart `file` field.
#[utoipa::path(
    post,
    path = "/api/users/avatar",
    request_body(content_type = "multipart/form-data", description = "The image to upload as `file`."),
    responses(
        (status = 200, description = "Avatar stored"),
        (status = 400, description = "Missing or unreadable file", body = ErrorBody)
    )
)]
pub async fn upload_avatar_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RestResult<AvatarReceipt> {
    let bad_request = |detail: String| (StatusCode::BAD_REQUEST, Json(ErrorBody { detail }));

    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Failed to read file bytes: {}", e)))?;
            image = Some(data.to_vec());
            break;
        }
    }
    let image =
        image.ok_or_else(|| bad_request("Multipart form must include a file".to_string()))?;

    app_state
        .catalog
        .upload_avatar(image)
        .await
        .map(Json)
        .map_err(port_failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockCatalogAdapter, TemplateResponder};
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        extract::FromRequest,
        http::Request,
    };

    const BOUNDARY: &str = "avatar-boundary";

    async fn multipart_with(field_name: &str, data: &[u8]) -> Multipart {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"; filename=\"me.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/users/avatar")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn app_state() -> State<Arc<AppState>> {
        let config = Config::from_lookup(|_| None).unwrap();
        State(Arc::new(AppState {
            config: Arc::new(config),
            responder: Arc::new(TemplateResponder::new()),
            catalog: Arc::new(MockCatalogAdapter::new()),
        }))
    }

    #[tokio::test]
    async fn unknown_course_is_404_with_detail() {
        let (status, Json(body)) = get_course_handler(app_state(), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.detail, "Course not found");
    }

    #[tokio::test]
    async fn enroll_then_progress_is_available() {
        let state = app_state();
        let Json(receipt) = enroll_handler(state.clone(), Path("course2".to_string()))
            .await
            .unwrap();
        assert!(receipt.success);

        let Json(progress) = course_progress_handler(state, Path("course2".to_string()))
            .await
            .unwrap();
        assert_eq!(progress.course_id, "course2");
    }

    #[tokio::test]
    async fn missing_progress_is_404() {
        let (status, Json(body)) =
            course_progress_handler(app_state(), Path("course2".to_string()))
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.detail, "Course progress not found");
    }

    #[tokio::test]
    async fn submit_returns_fixed_grade() {
        let Json(result) = submit_assessment_handler(
            app_state(),
            Path("assessment1".to_string()),
            Json(serde_json::json!({"q1": "b"})),
        )
        .await
        .unwrap();
        assert_eq!(result.score, 85);
    }

    #[tokio::test]
    async fn profile_update_echoes_merged_fields() {
        let Json(profile) = update_profile_handler(
            app_state(),
            Json(ProfileUpdate {
                learning_focus: Some("Deep Learning".to_string()),
                ..ProfileUpdate::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(profile.learning_focus.as_deref(), Some("Deep Learning"));
        assert_eq!(profile.name, "Sripathi");
    }

    #[tokio::test]
    async fn course_json_uses_camel_case() {
        let Json(courses) = list_courses_handler(app_state()).await.unwrap();
        let json = serde_json::to_value(&courses[0]).unwrap();
        assert_eq!(json["type"], "Course");
        assert_eq!(json["enrolledCount"], 17770);
        assert_eq!(json["isEnrolled"], true);
    }

    #[tokio::test]
    async fn submitting_an_unknown_assessment_is_404() {
        let (status, Json(body)) = submit_assessment_handler(
            app_state(),
            Path("assessment9".to_string()),
            Json(serde_json::json!({})),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.detail, "Assessment not found");
    }

    #[tokio::test]
    async fn profile_update_keeps_fields_it_does_not_name() {
        let Json(profile) = update_profile_handler(
            app_state(),
            Json(ProfileUpdate {
                name: Some("Sri".to_string()),
                ..ProfileUpdate::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(profile.learning_focus.as_deref(), Some("Machine Learning"));
        assert_eq!(profile.skills, vec!["Python", "SQL", "Data Engineering", "Spark"]);
        assert!(profile.bio.is_some());
    }

    #[tokio::test]
    async fn missing_avatar_is_an_empty_image() {
        let response = get_avatar_handler(app_state(), Path("user7".to_string()))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn uploaded_avatar_is_served_back() {
        let state = app_state();
        let Json(receipt) =
            upload_avatar_handler(state.clone(), multipart_with("file", b"jpeg-bytes").await)
                .await
                .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.avatar_url, "/api/users/user1/avatar");
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["avatarUrl"], "/api/users/user1/avatar");

        let response = get_avatar_handler(state, Path("user1".to_string()))
            .await
            .unwrap()
            .into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"jpeg-bytes");
    }

    #[tokio::test]
    async fn upload_without_a_file_field_is_400() {
        let (status, Json(body)) =
            upload_avatar_handler(app_state(), multipart_with("picture", b"x").await)
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.detail, "Multipart form must include a file");
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.paths.paths.len(), 13);
        assert!(doc.paths.paths.contains_key("/api/users/profile"));
        assert!(doc.paths.paths.contains_key("/api/users/{user_id}/avatar"));
        assert!(doc.paths.paths.contains_key("/api/users/avatar"));
    }
}
