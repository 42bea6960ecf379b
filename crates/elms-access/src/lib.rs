pub mod navigator;
pub mod policy;
pub mod routes;

pub use navigator::Navigator;
pub use policy::{AccessDecision, AccessPolicy, RouteTable};
pub use routes::{normalize_path, RouteAccess, RouteRegistry};
