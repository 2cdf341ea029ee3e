// Authentication module
// Holds the session credentials and the interceptor that re-authenticates on 401/440

mod credentials;
mod interceptor;
mod types;

pub use credentials::{Credentials, DEFAULT_PROVIDER};
pub use interceptor::{requires_login, SessionInterceptor, SESSIONS_PATH};
pub use types::{LoginRequest, LoginResponse};
