pub mod auth;
pub mod request_context;

pub use auth::{AuthState, Caller, auth_middleware};
pub use request_context::{REQUEST_ID_HEADER, current_request_id, request_context_middleware};
