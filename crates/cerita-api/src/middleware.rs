use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use cerita_db::models::UserRow;
use cerita_types::Role;
use cerita_types::api::UserResponse;

use crate::error::ApiError;
use crate::policy::Actor;
use crate::session::{decode_token, token_from_headers};
use crate::state::{AppState, run_db};

/// The signed-in user, loaded fresh from the database on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor<'_> {
        Actor {
            id: &self.id,
            role: self.role,
        }
    }

    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            created_at: self.created_at,
        }
    }
}

impl From<UserRow> for CurrentUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            avatar: row.avatar,
            created_at: row.created_at,
        }
    }
}

/// Whoever is asking, if anyone. Routes with optional auth take this.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<CurrentUser>);

impl Viewer {
    pub fn user(&self) -> Option<&CurrentUser> {
        self.0.as_ref()
    }

    pub fn actor(&self) -> Option<Actor<'_>> {
        self.0.as_ref().map(CurrentUser::actor)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Viewer>()
            .and_then(|viewer| viewer.0.clone())
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Resolve the session token, if any, into a [`Viewer`] extension.
/// Never rejects: an invalid token or a deleted user just means no viewer.
pub async fn resolve_viewer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = token_from_headers(req.headers()).and_then(|token| decode_token(&state.auth.jwt_secret, &token));

    let user = match claims {
        Some(claims) => {
            let user_id = claims.sub.to_string();
            let row = run_db(&state, move |db| db.get_user_by_id(&user_id)).await?;
            if row.is_none() {
                debug!("Session for deleted user {}", claims.sub);
            }
            row.map(CurrentUser::from)
        }
        None => None,
    };

    req.extensions_mut().insert(Viewer(user));
    Ok(next.run(req).await)
}
