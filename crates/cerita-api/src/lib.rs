pub mod announcements;
pub mod auth;
pub mod comments;
pub mod error;
pub mod extract;
pub mod gate;
pub mod journals;
pub mod middleware;
pub mod moods;
pub mod policy;
pub mod reactions;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
pub mod stories;
pub mod uploads;
pub mod users;
pub mod views;


pub use routes::router;
pub use state::{AppState, AppStateInner, AuthConfig};
