//! Request authentication and throttling middleware

pub mod rate_limit;
pub mod session;

pub use rate_limit::{rate_limit, RouteLimit};
pub use session::{optional_session, require_session};
