//! Course endpoints

use super::ClientError;
use super::typed::{AuthenticatedClubClient, PublicClubClient};
use crate::types::{
    ClassCreated, ClassUpdate, Course, CourseClass, CourseCreated, CourseUpdate, EnrolledClass,
    EnrolledClassesBody, MessageResponse, MyCourse, NewClass, NewCourse,
};
use reqwest::Method;

impl PublicClubClient {
    /// All courses with their remaining spots
    pub async fn public_courses(&self) -> Result<Vec<Course>, ClientError> {
        let req = self.request(Method::GET, "/courses/public");
        self.execute(req).await
    }

    /// Cheap liveness probe against the public listing
    pub async fn ping(&self) -> Result<(), ClientError> {
        let response = self.request(Method::GET, "/courses/public").send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, body))
        }
    }
}

impl AuthenticatedClubClient {
    pub async fn public_courses(&self) -> Result<Vec<Course>, ClientError> {
        self.to_public().public_courses().await
    }

    /// Courses the current user has joined
    pub async fn my_courses(&self) -> Result<Vec<MyCourse>, ClientError> {
        let req = self.request(Method::GET, "/courses/my-courses");
        self.execute(req).await
    }

    /// Join a course, taking one of its available spots
    pub async fn join_course(&self, course_id: i64) -> Result<MessageResponse, ClientError> {
        let req = self.request(Method::POST, &format!("/courses/{course_id}/join"));
        self.execute(req).await
    }

    /// Classes scheduled for a course
    pub async fn course_classes(&self, course_id: i64) -> Result<Vec<CourseClass>, ClientError> {
        let req = self.request(Method::GET, &format!("/courses/{course_id}/classes"));
        self.execute(req).await
    }

    /// Classes the current user is registered for, as reported by the courses blueprint
    pub async fn enrolled_classes(&self) -> Result<Vec<EnrolledClass>, ClientError> {
        let req = self.request(Method::GET, "/courses/my-classes");
        let body: EnrolledClassesBody = self.execute(req).await?;
        Ok(body.into_classes())
    }

    // Admin

    pub async fn create_course(&self, course: &NewCourse) -> Result<CourseCreated, ClientError> {
        let req = self.request(Method::POST, "/courses/").json(course);
        self.execute(req).await
    }

    pub async fn update_course(
        &self,
        course_id: i64,
        update: &CourseUpdate,
    ) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::PUT, &format!("/courses/{course_id}"))
            .json(update);
        self.execute(req).await
    }

    /// Delete a course together with all of its classes
    pub async fn delete_course(&self, course_id: i64) -> Result<MessageResponse, ClientError> {
        let req = self.request(Method::DELETE, &format!("/courses/{course_id}"));
        self.execute(req).await
    }

    pub async fn add_class(
        &self,
        course_id: i64,
        class: &NewClass,
    ) -> Result<ClassCreated, ClientError> {
        let req = self
            .request(Method::POST, &format!("/courses/{course_id}/classes"))
            .json(class);
        self.execute(req).await
    }

    pub async fn update_class(
        &self,
        course_id: i64,
        class_id: i64,
        update: &ClassUpdate,
    ) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(
                Method::PUT,
                &format!("/courses/{course_id}/classes/{class_id}"),
            )
            .json(update);
        self.execute(req).await
    }

    pub async fn delete_class(
        &self,
        course_id: i64,
        class_id: i64,
    ) -> Result<MessageResponse, ClientError> {
        let req = self.request(
            Method::DELETE,
            &format!("/courses/{course_id}/classes/{class_id}"),
        );
        self.execute(req).await
    }
}
