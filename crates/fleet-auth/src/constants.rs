//! Auth endpoint paths and client defaults
//!
//! Paths are relative to the configured API base URL.

/// Exchange email + password for a token pair
pub const LOGIN_PATH: &str = "/api/v1/auth/login";

/// Exchange a refresh token for a new token pair
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Revoke the current session server-side
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout";

/// Current user's profile
pub const PROFILE_PATH: &str = "/api/v1/auth/profile";

/// Check the bearer token sent in the Authorization header
pub const VALIDATE_PATH: &str = "/api/v1/auth/validate";

pub const CHANGE_PASSWORD_PATH: &str = "/api/v1/auth/change-password";

/// Connect/response timeout applied to every call
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Store key for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Store key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
