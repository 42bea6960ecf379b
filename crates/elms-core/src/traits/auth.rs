use async_trait::async_trait;
use elms_types::{Credentials, LoginResponse};

use crate::error::Result;

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for a bearer token and identity.
    ///
    /// # Returns
    /// * `Ok(response)` when the server accepted the credentials.
    /// * `Err(ElmsError::Api { .. })` / `Err(ElmsError::Unauthorized(..))` carrying the
    ///   server message, or [`crate::error::GENERIC_LOGIN_FAILURE`] when the server gave none.
    /// * `Err(ElmsError::Transport(..))` when the server could not be reached.
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse>;
}
