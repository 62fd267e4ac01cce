//! Session gate in front of the frontend pages.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tracing::debug;

use crate::session::{SESSION_COOKIE, clear_session_cookie, decode_token};
use crate::state::AppState;

const PUBLIC_PAGES: &[&str] = &["/", "/cerita", "/tentang", "/jurnal", "/edukasi"];
const AUTH_PAGES: &[&str] = &["/login", "/register"];
/// Never gated: the API itself, uploaded media and build assets.
const UNGATED_PREFIXES: &[&str] = &["/api", "/media", "/_next", "/favicon.ico", "/public"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Missing,
    Invalid,
    Valid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Pass { clear_cookie: bool },
    Redirect { to: &'static str, clear_cookie: bool },
}

/// `/cerita` covers `/cerita/abc` but not `/ceritaku`; `/` matches only itself.
fn under(path: &str, page: &str) -> bool {
    if page == "/" {
        return path == "/";
    }
    match path.strip_prefix(page) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn under_any(path: &str, pages: &[&str]) -> bool {
    pages.iter().any(|page| under(path, page))
}

pub fn decide(path: &str, token: TokenState) -> Gate {
    if under_any(path, UNGATED_PREFIXES) {
        return Gate::Pass { clear_cookie: false };
    }

    if under_any(path, AUTH_PAGES) {
        return match token {
            TokenState::Valid => Gate::Redirect {
                to: "/beranda",
                clear_cookie: false,
            },
            TokenState::Invalid => Gate::Pass { clear_cookie: true },
            TokenState::Missing => Gate::Pass { clear_cookie: false },
        };
    }

    if under_any(path, PUBLIC_PAGES) {
        return Gate::Pass { clear_cookie: false };
    }

    match token {
        TokenState::Valid => Gate::Pass { clear_cookie: false },
        TokenState::Missing => Gate::Redirect {
            to: "/login",
            clear_cookie: false,
        },
        TokenState::Invalid => Gate::Redirect {
            to: "/login",
            clear_cookie: true,
        },
    }
}

pub async fn page_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let token = match jar.get(SESSION_COOKIE).map(|c| c.value()).filter(|v| !v.is_empty()) {
        None => TokenState::Missing,
        Some(token) if decode_token(&state.auth.jwt_secret, token).is_some() => TokenState::Valid,
        Some(_) => TokenState::Invalid,
    };

    let path = req.uri().path().to_string();
    let (mut response, clear_cookie) = match decide(&path, token) {
        Gate::Pass { clear_cookie } => (next.run(req).await, clear_cookie),
        Gate::Redirect { to, clear_cookie } => {
            debug!("Gate redirect {} -> {}", path, to);
            (Redirect::temporary(to).into_response(), clear_cookie)
        }
    };

    if clear_cookie {
        response
            .headers_mut()
            .append(header::SET_COOKIE, clear_session_cookie(&state.auth));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_pages_always_pass() {
        for path in ["/", "/cerita", "/cerita/abc", "/tentang", "/jurnal/1", "/edukasi"] {
            assert_eq!(decide(path, TokenState::Missing), Gate::Pass { clear_cookie: false }, "{path}");
        }
    }

    #[test]
    fn protected_pages_need_a_valid_token() {
        assert_eq!(
            decide("/beranda", TokenState::Missing),
            Gate::Redirect {
                to: "/login",
                clear_cookie: false
            }
        );
        assert_eq!(
            decide("/dashboard/mood", TokenState::Invalid),
            Gate::Redirect {
                to: "/login",
                clear_cookie: true
            }
        );
        assert_eq!(decide("/beranda", TokenState::Valid), Gate::Pass { clear_cookie: false });
        // a public prefix does not leak onto lookalike paths
        assert!(matches!(decide("/ceritaku", TokenState::Missing), Gate::Redirect { .. }));
    }

    #[test]
    fn signed_in_users_skip_auth_pages() {
        assert_eq!(
            decide("/login", TokenState::Valid),
            Gate::Redirect {
                to: "/beranda",
                clear_cookie: false
            }
        );
        assert_eq!(decide("/register", TokenState::Missing), Gate::Pass { clear_cookie: false });
        assert_eq!(decide("/login", TokenState::Invalid), Gate::Pass { clear_cookie: true });
    }

    #[test]
    fn api_and_media_are_not_gated() {
        assert_eq!(decide("/api/stories", TokenState::Missing), Gate::Pass { clear_cookie: false });
        assert_eq!(decide("/media/avatars/a.png", TokenState::Invalid), Gate::Pass { clear_cookie: false });
    }
}
