//! Authenticated API client for the fleet dashboard backend
//!
//! `ApiClient` attaches the stored bearer token to every call, recovers from
//! one expired access token per request by refreshing the token pair, and
//! resolves every call to a `ResponseEnvelope` instead of failing. When a
//! refresh is rejected the stored tokens are wiped and the injected
//! `LoginRedirect` is invoked.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use fleet_api::{ApiClient, ClientConfig, LogRedirect};
//! use fleet_auth::MemoryTokenStore;
//!
//! let client = ApiClient::new(
//!     ClientConfig::new("https://fleet.example.com"),
//!     Arc::new(MemoryTokenStore::new()),
//!     Arc::new(LogRedirect),
//! )?;
//! let login = client.login("a@b.com", "pw").await;
//! if login.is_success() {
//!     let profile = client.get_profile().await.into_result()?;
//!     println!("{} ({})", profile.display_name, profile.role.as_str());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod profile;
pub mod redirect;

#[cfg(test)]
mod test_support;

pub use client::{ApiClient, ClientConfig, RequestOptions};
pub use envelope::ResponseEnvelope;
pub use error::{ApiError, Error, ErrorCode, Result};
pub use profile::{Acknowledgement, EntityId, ProfileDto, Role, TokenValidation, UserProfile};
pub use redirect::{LogRedirect, LoginRedirect};
pub use reqwest::Method;
