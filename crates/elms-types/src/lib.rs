pub mod auth;
pub mod role;

pub use auth::{Credentials, ErrorBody, Identity, LoginResponse};
pub use role::{Role, UnknownRole};
