//! Class membership endpoints

use super::ClientError;
use super::typed::AuthenticatedClubClient;
use crate::types::{ClassMember, MessageResponse};
use reqwest::Method;

impl AuthenticatedClubClient {
    /// Register the current user for a single class
    pub async fn join_class(&self, class_id: i64) -> Result<MessageResponse, ClientError> {
        let req = self.request(Method::POST, &format!("/classes/{class_id}/join"));
        self.execute(req).await
    }

    /// Drop the current user's registration for a class
    pub async fn leave_class(&self, class_id: i64) -> Result<MessageResponse, ClientError> {
        let req = self.request(Method::POST, &format!("/classes/{class_id}/leave"));
        self.execute(req).await
    }

    /// Roster of a class (admin)
    pub async fn class_members(&self, class_id: i64) -> Result<Vec<ClassMember>, ClientError> {
        let req = self.request(Method::GET, &format!("/classes/{class_id}/members"));
        self.execute(req).await
    }
}
