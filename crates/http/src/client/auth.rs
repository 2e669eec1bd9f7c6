//! Authentication endpoints

use super::ClientError;
use super::typed::{AuthenticatedClubClient, PublicClubClient};
use crate::types::{
    AuthResponse, EnrolledClass, LoginRequest, MessageResponse, RegisterRequest, UserProfile,
};
use reqwest::Method;

impl PublicClubClient {
    /// Create an account; the backend logs the new account in immediately
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let req = self.request(Method::POST, "/auth/register").json(request);
        self.execute(req).await
    }

    /// Exchange credentials for an access/refresh token pair
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let req = self.request(Method::POST, "/auth/login").json(request);
        self.execute(req).await
    }

    /// Mint a new access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ClientError> {
        let req = self.request_with_bearer(Method::POST, "/auth/refresh", refresh_token);
        self.execute(req).await
    }
}

impl AuthenticatedClubClient {
    /// Profile of the token's owner
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let req = self.request(Method::GET, "/auth/me");
        self.execute(req).await
    }

    /// Classes joined by the current user, as reported by the auth blueprint
    pub async fn my_classes(&self) -> Result<Vec<EnrolledClass>, ClientError> {
        let req = self.request(Method::GET, "/auth/my-classes");
        self.execute(req).await
    }

    /// Permanently delete the current account
    pub async fn delete_account(&self) -> Result<MessageResponse, ClientError> {
        let req = self.request(Method::DELETE, "/auth/delete-account");
        self.execute(req).await
    }
}
