//! Consumed identity/storage collaborators
//!
//! The graph store, document store, and token issuance subsystem live outside
//! this crate; the services here only need the narrow surfaces below. The
//! HTTP layer wires in the real implementations.

use crate::error::RelayResult;

use async_trait::async_trait;

/// Session-token verification, backed by the external token service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessTokens: Send + Sync {
    /// Resolve an access token to the username it was issued for.
    /// Fails with `RelayError::Auth` on an invalid or expired token.
    async fn verify(&self, token: &str) -> RelayResult<String>;
}

/// User records in the graph store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletDirectory: Send + Sync {
    /// Look up the smart wallet address bound to a username.
    /// Fails with `RelayError::UserNotFound` for unknown users.
    async fn wallet_address(&self, username: &str) -> RelayResult<String>;

    /// Write a single field on the user's node
    async fn write_field(&self, username: &str, field: &str, value: &str) -> RelayResult<()>;
}
