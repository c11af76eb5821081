//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ErrorResponse, FollowRequest, FollowResponse, HealthResponse, LimitParams, LoginRequest,
        MutualParams, PageParams, RegisterRequest, SearchParams, StatusResponse, UnfollowResponse,
        UpdateRequest,
    },
};
use crate::credentials::{login, new_user_with_password};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use socialgraph_core::{
    FollowOutcome, SocialError,
    primitives::{
        DEFAULT_LIST_LIMIT, DEFAULT_MUTUAL_LIMIT, DEFAULT_POPULAR_LIMIT, DEFAULT_RECOMMEND_LIMIT,
        DEFAULT_SEARCH_LIMIT,
    },
};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// A `SocialError` rendered as an HTTP response.
pub struct ApiError(SocialError);

impl From<SocialError> for ApiError {
    fn from(e: SocialError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SocialError::DuplicateKey(_) => StatusCode::CONFLICT,
            SocialError::NotFound(_) => StatusCode::NOT_FOUND,
            SocialError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            SocialError::SerializationError(_)
            | SocialError::IoError(_)
            | SocialError::LockPoisoned => {
                tracing::error!(error = %self.0, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Store counters.
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let response = state.session.read(|s| {
        StatusResponse::new(s.stats(), s.graph().fulltext_enabled(), s.is_persistent())
    })?;
    Ok(Json(response))
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Register a user.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = new_user_with_password(
        &request.username,
        &request.name,
        &request.email,
        &request.bio,
        &request.password,
    );
    let user = state.session.write(|s| s.register(&new))?;
    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// Verify credentials and return the profile.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let profile = state
        .session
        .read(|s| login(s, &request.username, &request.password))?;
    Ok(match profile {
        Some(p) => Json(p).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Login failed".to_string(),
            }),
        )
            .into_response(),
    })
}

/// Public profile.
pub async fn profile_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let profile = state.session.read(|s| s.profile(&username))?;
    profile
        .map(|p| Json(p).into_response())
        .ok_or_else(|| SocialError::NotFound(username).into())
}

/// Edit a profile.
pub async fn update_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = request.into_update();
    let user = state.session.write(|s| s.update(&username, &update))?;
    Ok(Json(user.profile()))
}

// =============================================================================
// RELATIONSHIPS
// =============================================================================

/// Follow a user.
pub async fn follow_handler(
    State(state): State<AppState>,
    Json(request): Json<FollowRequest>,
) -> ApiResult<FollowResponse> {
    let outcome = state
        .session
        .write(|s| s.follow_outcome(&request.src, &request.dst))?;
    Ok(Json(FollowResponse {
        ok: outcome.succeeded(),
        created: outcome == FollowOutcome::Created,
    }))
}

/// Unfollow a user.
pub async fn unfollow_handler(
    State(state): State<AppState>,
    Json(request): Json<FollowRequest>,
) -> ApiResult<UnfollowResponse> {
    let removed = state
        .session
        .write(|s| s.unfollow(&request.src, &request.dst))?;
    Ok(Json(UnfollowResponse { removed }))
}

/// Users that `username` follows.
pub async fn following_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = page.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let rows = state
        .session
        .read(|s| s.following(&username, limit, page.skip))?;
    Ok(Json(rows))
}

/// Users following `username`.
pub async fn followers_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = page.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let rows = state
        .session
        .read(|s| s.followers(&username, limit, page.skip))?;
    Ok(Json(rows))
}

/// Users followed by both `a` and `b`.
pub async fn mutual_handler(
    State(state): State<AppState>,
    Query(params): Query<MutualParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_MUTUAL_LIMIT);
    let rows = state
        .session
        .read(|s| s.mutual_connections(&params.a, &params.b, limit))?;
    Ok(Json(rows))
}

// =============================================================================
// DISCOVERY
// =============================================================================

/// Friend-of-friend recommendations.
pub async fn recommend_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECOMMEND_LIMIT);
    let rows = state.session.read(|s| s.recommend(&username, limit))?;
    Ok(Json(rows))
}

/// Ranked or substring user search.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results = state.session.read(|s| s.search(&params.q, limit))?;
    Ok(Json(results))
}

/// Users ranked by follower count.
pub async fn popular_handler(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT);
    let rows = state.session.read(|s| s.popular(limit))?;
    Ok(Json(rows))
}
