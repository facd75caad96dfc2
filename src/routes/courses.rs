use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::operations::course::{
    self, Course, CourseDetail, CourseFilter, CourseWithTeacher, NewCourse,
};
use crate::db::operations::enrollment::{
    self, Enrollment, EnrollmentListItem, EnrollmentWithCourse,
};
use crate::middleware::auth::{optional_auth, require_auth, require_staff};
use crate::response::AppError;
use crate::state::AppState;

const LIST_ERROR: &str = "Server error fetching courses";
const DETAIL_ERROR: &str = "Server error fetching course";
const ENROLL_ERROR: &str = "Server error enrolling in course";
const ENROLLMENTS_ERROR: &str = "Server error fetching enrollments";
const CREATE_ERROR: &str = "Server error creating course";

pub fn router() -> axum::Router<AppState> {
    let create = post(create_course)
        .route_layer(from_fn(require_staff))
        .route_layer(from_fn(require_auth));

    axum::Router::new()
        .route("/", get(list_courses).merge(create))
        .route(
            "/my-enrollments",
            get(my_enrollments).route_layer(from_fn(require_auth)),
        )
        .route(
            "/enroll",
            post(enroll_in_course).route_layer(from_fn(require_auth)),
        )
        .route(
            "/:id",
            get(course_by_id).route_layer(from_fn(optional_auth)),
        )
}

#[derive(Debug, Deserialize)]
struct CourseListQuery {
    status: Option<String>,
    level: Option<String>,
    search: Option<String>,
}

#[derive(Serialize)]
struct CourseListResponse {
    courses: Vec<CourseWithTeacher>,
}

#[derive(Serialize)]
struct CourseDetailResponse {
    course: CourseDetail,
    enrollment: Option<Enrollment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    course_id: Option<String>,
}

#[derive(Serialize)]
struct EnrollResponse {
    enrollment: EnrollmentWithCourse,
}

#[derive(Serialize)]
struct MyEnrollmentsResponse {
    enrollments: Vec<EnrollmentListItem>,
}

#[derive(Debug, Deserialize)]
struct CreateCourseRequest {
    title: String,
    description: String,
    level: Option<String>,
    duration: Option<i32>,
    price: Option<f64>,
    tags: Option<Vec<String>>,
}

#[derive(Serialize)]
struct CreateCourseResponse {
    course: Course,
}

async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(LIST_ERROR));
    };

    let filter = CourseFilter {
        status: query.status,
        level: query.level,
        search: query.search,
    };

    let courses = course::list_courses(proxy.as_ref(), &filter)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "course list failed");
            AppError::internal(LIST_ERROR)
        })?;

    Ok(Json(CourseListResponse { courses }))
}

async fn course_by_id(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(DETAIL_ERROR));
    };

    let Some(detail) = course::get_course_detail(proxy.as_ref(), &id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "course lookup failed");
            AppError::internal(DETAIL_ERROR)
        })?
    else {
        return Err(AppError::not_found("Course not found"));
    };

    let enrollment = match auth {
        Some(Extension(user)) => {
            enrollment::find_by_user_and_course(proxy.as_ref(), &user.id, &id)
                .await
                .map_err(|err| {
                    tracing::error!(error = %err, "enrollment lookup failed");
                    AppError::internal(DETAIL_ERROR)
                })?
        }
        None => None,
    };

    Ok(Json(CourseDetailResponse {
        course: detail,
        enrollment,
    }))
}

async fn enroll_in_course(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let course_id = payload.course_id.as_deref().unwrap_or("").trim();
    if course_id.is_empty() {
        return Err(AppError::bad_request("Course ID is required"));
    }

    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(ENROLL_ERROR));
    };

    let Some(target) = course::find_course(proxy.as_ref(), course_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "course lookup failed");
            AppError::internal(ENROLL_ERROR)
        })?
    else {
        return Err(AppError::not_found("Course not found"));
    };

    let existing = enrollment::find_by_user_and_course(proxy.as_ref(), &user.id, course_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "enrollment lookup failed");
            AppError::internal(ENROLL_ERROR)
        })?;
    if existing.is_some() {
        return Err(AppError::bad_request("Already enrolled in this course"));
    }

    let enrollment = enrollment::insert_enrollment(proxy.as_ref(), &user.id, course_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "enrollment insert failed");
            AppError::internal(ENROLL_ERROR)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            enrollment: EnrollmentWithCourse {
                enrollment,
                course: target,
            },
        }),
    ))
}

async fn my_enrollments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(ENROLLMENTS_ERROR));
    };

    let enrollments = enrollment::list_for_user(proxy.as_ref(), &user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "enrollment list failed");
            AppError::internal(ENROLLMENTS_ERROR)
        })?;

    Ok(Json(MyEnrollmentsResponse { enrollments }))
}

async fn create_course(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(CREATE_ERROR));
    };

    let teacher_id = (user.role == "TEACHER").then(|| user.id.clone());
    let new_course = NewCourse {
        title: payload.title,
        description: payload.description,
        level: payload.level,
        duration: payload.duration,
        price: payload.price,
        tags: payload.tags.unwrap_or_default(),
        creator_id: user.id,
        teacher_id,
    };

    let created = course::insert_course(proxy.as_ref(), &new_course)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "course insert failed");
            AppError::internal(CREATE_ERROR)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCourseResponse { course: created }),
    ))
}
