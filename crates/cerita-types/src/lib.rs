pub mod api;
pub mod models;

pub use models::{MoodType, ParseEnumError, Privacy, ReactionType, Role};
