//! Request and response types for the booking API

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format the backend uses for class dates
pub const CLASS_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Authorization tier of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string is neither `user` nor `admin`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// Auth

/// Account registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Serialized as `YYYY-MM-DD`
    pub date_of_birth: NaiveDate,
    pub phone_number: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tokens returned by register, login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Profile of the logged-in account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub role: Role,
}

/// Generic `{"message": ...}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body returned by the backend
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

// Courses

/// Course as listed publicly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available_spots: i64,
}

/// Course the current user has joined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyCourse {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Course creation request (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub name: String,
    pub description: String,
    pub available_spots: i64,
}

/// Partial course update (admin); absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_spots: Option<i64>,
}

impl CourseUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.available_spots.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseCreated {
    pub message: String,
    pub course_id: i64,
}

// Classes

/// A scheduled class of a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseClass {
    pub id: i64,
    /// `YYYY-MM-DD HH:MM`
    pub date: String,
    pub location: String,
    pub trainer: String,
}

impl CourseClass {
    /// Parsed class date, if the backend sent a well-formed one
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date, CLASS_DATE_FORMAT).ok()
    }
}

/// A class the current user is enrolled in.
///
/// `/auth/my-classes` and `/courses/my-classes` return different subsets of
/// these fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrolledClass {
    pub id: i64,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub trainer: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub course_date: Option<String>,
    #[serde(default)]
    pub day_of_week: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub available_spots: Option<i64>,
    #[serde(default)]
    pub total_max_spots: Option<i64>,
}

/// `/courses/my-classes` answers either a bare list or an empty wrapper
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum EnrolledClassesBody {
    List(Vec<EnrolledClass>),
    Wrapped { classes: Vec<EnrolledClass> },
}

impl EnrolledClassesBody {
    pub(crate) fn into_classes(self) -> Vec<EnrolledClass> {
        match self {
            Self::List(classes) | Self::Wrapped { classes } => classes,
        }
    }
}

/// Class creation request (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClass {
    pub date: String,
    pub location: String,
    pub trainer: String,
}

impl NewClass {
    pub fn new(date: NaiveDateTime, location: impl Into<String>, trainer: impl Into<String>) -> Self {
        Self {
            date: date.format(CLASS_DATE_FORMAT).to_string(),
            location: location.into(),
            trainer: trainer.into(),
        }
    }
}

/// Partial class update (admin)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trainer: Option<String>,
}

impl ClassUpdate {
    pub fn with_date(mut self, date: NaiveDateTime) -> Self {
        self.date = Some(date.format(CLASS_DATE_FORMAT).to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.location.is_none() && self.trainer.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassCreated {
    pub message: String,
    pub class_id: i64,
}

/// Member of a class roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMember {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
