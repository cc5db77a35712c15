pub mod auth;

pub use auth::{API_KEY_HEADER, api_key_middleware};
