pub mod bus;
pub mod error;
pub mod traits;

pub use bus::{EventBus, SessionEvent};
pub use error::{ElmsError, Result, GENERIC_LOGIN_FAILURE};
pub use traits::Authenticator;
