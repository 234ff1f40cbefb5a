//! Token types and persistence for the fleet dashboard API
//!
//! Holds everything about credentials that does not involve HTTP: the
//! access/refresh pair, the wire DTOs for the auth endpoints, and the
//! `TokenStore` seam with its file and memory backends. The request
//! pipeline that uses them lives in `fleet-api`.
//!
//! Token lifecycle:
//! 1. `POST /api/v1/auth/login` returns a `TokenPair`, saved via `TokenStore::save`
//! 2. Every request reads the pair via `TokenStore::load`
//! 3. On 401 the client posts a `RefreshRequest` and saves the new pair
//! 4. Logout or an irrecoverable refresh failure calls `TokenStore::clear`

pub mod constants;
pub mod error;
pub mod file_store;
pub mod store;
pub mod tokens;

pub use constants::*;
pub use error::{Error, Result};
pub use file_store::FileTokenStore;
pub use store::{MemoryTokenStore, StoreBackend, StoreFuture, TokenStore, open_store};
pub use tokens::{ChangePasswordRequest, LoginRequest, RefreshRequest, TokenPair};
