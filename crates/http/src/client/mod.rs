//! Booking API client

pub mod auth;
pub mod classes;
pub mod courses;
pub mod error;
pub mod typed;

pub use error::ClientError;
pub use typed::{AuthenticatedClubClient, DEFAULT_BASE_URL, PublicClubClient, TypedClientBuilder};
