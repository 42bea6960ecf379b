pub mod client;
mod error;

pub use client::{ApiClient, LOGIN_PATH};
pub use reqwest::Method;
