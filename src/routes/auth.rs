use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{sign_jwt_for_user, AuthUser};
use crate::db::operations::enrollment::{self, EnrollmentWithCourseBrief};
use crate::db::operations::user::{self, AccessibilitySettings, NewUser};
use crate::middleware::auth::require_auth;
use crate::response::{AppError, FieldError};
use crate::state::AppState;

const REGISTER_ERROR: &str = "Server error during registration";
const LOGIN_ERROR: &str = "Server error during login";
const CURRENT_USER_ERROR: &str = "Server error fetching user";

pub fn router() -> axum::Router<AppState> {
    let protected = axum::Router::new()
        .route("/me", get(current_user))
        .route_layer(axum::middleware::from_fn(require_auth));

    axum::Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: Option<String>,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    role: Option<String>,
    learning_style: Option<String>,
    grade_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenUser {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    learning_style: Option<String>,
    grade_level: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    token: String,
    user: TokenUser,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    #[serde(flatten)]
    user: TokenUser,
    accessibility_settings: Option<AccessibilitySettings>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: LoginUser,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUserResponse {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    avatar: Option<String>,
    learning_style: Option<String>,
    grade_level: Option<String>,
    accessibility_settings: Option<AccessibilitySettings>,
    enrollments: Vec<EnrollmentWithCourseBrief>,
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut failures = Vec::new();

    let email = payload.email.as_deref().unwrap_or("").trim().to_string();
    if !is_valid_email(&email) {
        failures.push(FieldError {
            msg: "Valid email is required",
            path: "email",
        });
    }
    let password = payload.password.as_deref().unwrap_or("");
    if password.len() < 6 {
        failures.push(FieldError {
            msg: "Password must be at least 6 characters",
            path: "password",
        });
    }
    let first_name = payload.first_name.as_deref().unwrap_or("").trim();
    if first_name.is_empty() {
        failures.push(FieldError {
            msg: "First name is required",
            path: "firstName",
        });
    }
    let last_name = payload.last_name.as_deref().unwrap_or("").trim();
    if last_name.is_empty() {
        failures.push(FieldError {
            msg: "Last name is required",
            path: "lastName",
        });
    }
    if !failures.is_empty() {
        return Err(AppError::validation(failures));
    }

    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(REGISTER_ERROR));
    };

    let existing = user::find_by_email(proxy.as_ref(), &email)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "registration lookup failed");
            AppError::internal(REGISTER_ERROR)
        })?;
    if existing.is_some() {
        return Err(AppError::bad_request("User already exists"));
    }

    let password_hash = bcrypt::hash(password, 10).map_err(|err| {
        tracing::error!(error = %err, "password hashing failed");
        AppError::internal(REGISTER_ERROR)
    })?;

    let new_user = NewUser {
        email,
        password_hash,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        role: payload.role.unwrap_or_else(|| "STUDENT".to_string()),
        learning_style: payload.learning_style,
        grade_level: payload.grade_level,
    };

    let created = user::insert_user(proxy.as_ref(), &new_user)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "user insert failed");
            AppError::internal(REGISTER_ERROR)
        })?;

    user::create_default_accessibility_settings(proxy.as_ref(), &created.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "accessibility settings insert failed");
            AppError::internal(REGISTER_ERROR)
        })?;

    let token = sign_jwt_for_user(&created.id, &created.email, &created.role).map_err(|err| {
        tracing::error!(error = %err, "token signing failed");
        AppError::internal(REGISTER_ERROR)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token,
            user: TokenUser {
                id: created.id,
                email: created.email,
                first_name: created.first_name,
                last_name: created.last_name,
                role: created.role,
                learning_style: created.learning_style,
                grade_level: created.grade_level,
            },
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut failures = Vec::new();

    let email = payload.email.as_deref().unwrap_or("").trim().to_string();
    if !is_valid_email(&email) {
        failures.push(FieldError {
            msg: "Valid email is required",
            path: "email",
        });
    }
    let password = payload.password.as_deref().unwrap_or("");
    if password.is_empty() {
        failures.push(FieldError {
            msg: "Password is required",
            path: "password",
        });
    }
    if !failures.is_empty() {
        return Err(AppError::validation(failures));
    }

    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(LOGIN_ERROR));
    };

    let Some(account) = user::find_by_email(proxy.as_ref(), &email)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "login lookup failed");
            AppError::internal(LOGIN_ERROR)
        })?
    else {
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    if !account.is_active {
        return Err(AppError::forbidden("Account is inactive"));
    }

    if !bcrypt::verify(password, &account.password).unwrap_or(false) {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let settings = user::get_accessibility_settings(proxy.as_ref(), &account.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "accessibility settings lookup failed");
            AppError::internal(LOGIN_ERROR)
        })?;

    let token = sign_jwt_for_user(&account.id, &account.email, &account.role).map_err(|err| {
        tracing::error!(error = %err, "token signing failed");
        AppError::internal(LOGIN_ERROR)
    })?;

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            user: TokenUser {
                id: account.id,
                email: account.email,
                first_name: account.first_name,
                last_name: account.last_name,
                role: account.role,
                learning_style: account.learning_style,
                grade_level: account.grade_level,
            },
            accessibility_settings: settings,
        },
    }))
}

async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(CURRENT_USER_ERROR));
    };

    let Some(account) = user::find_by_id(proxy.as_ref(), &auth.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "current user lookup failed");
            AppError::internal(CURRENT_USER_ERROR)
        })?
    else {
        return Err(AppError::not_found("User not found"));
    };

    let settings = user::get_accessibility_settings(proxy.as_ref(), &account.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "accessibility settings lookup failed");
            AppError::internal(CURRENT_USER_ERROR)
        })?;

    let enrollments = enrollment::list_with_course_brief(proxy.as_ref(), &account.id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "enrollment lookup failed");
            AppError::internal(CURRENT_USER_ERROR)
        })?;

    Ok(Json(CurrentUserResponse {
        id: account.id,
        email: account.email,
        first_name: account.first_name,
        last_name: account.last_name,
        role: account.role,
        avatar: account.avatar,
        learning_style: account.learning_style,
        grade_level: account.grade_level,
        accessibility_settings: settings,
        enrollments,
    }))
}

fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.contains(' ') {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    domain.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("student@bulsu.edu.ph"));
        assert!(is_valid_email("a@b.co"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@missing-local.com"));
        assert!(!is_valid_email("missing-domain@"));
        assert!(!is_valid_email("spaces in@mail.com"));
        assert!(!is_valid_email("bare@tld"));
    }
}
