//! REST API access: response envelope, HTTP transport, account endpoints and
//! the authenticated request pipeline.

pub mod envelope;
pub mod transport;
pub mod auth;
pub mod pipeline;

pub use envelope::Envelope;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
pub use auth::{normalize_phone, update_profile, AuthApi, LoginRequest, LogoutOutcome, ProfileUpdate, RegisterRequest, TokenRefresher};
pub use pipeline::AuthenticatedClient;
