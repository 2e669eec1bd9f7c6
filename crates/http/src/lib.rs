//! Sports-club booking API client
//!
//! Wire types shared with the booking backend and type-safe reqwest clients
//! for its public and bearer-authenticated endpoints.

pub mod client;
pub mod types;

pub use client::{AuthenticatedClubClient, PublicClubClient, TypedClientBuilder, error::ClientError};
pub use types::Role;
