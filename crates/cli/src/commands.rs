//! CLI commands
//!
//! Each command stands in for one page visit of the browser client: the
//! stored session is refreshed if needed, the expiry is pushed forward, and
//! then a single backend call is made.

use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Subcommand;
use sportclub_http::types::{
    CLASS_DATE_FORMAT, ClassUpdate, CourseUpdate, EnrolledClass, NewClass, NewCourse,
    RegisterRequest, UserProfile,
};
use sportclub_session::{
    RefreshOutcome, SessionClient, SessionError, SessionEvent, SessionStatus, format_countdown,
};
use std::io::Write;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

/// Shared state for one CLI invocation
#[derive(Debug, Clone)]
pub struct Context {
    client: SessionClient,
}

impl Context {
    pub fn new(client: SessionClient) -> Self {
        Self { client }
    }

    /// Startup refresh, backend verification, then the navigation expiry
    /// reset.
    ///
    /// Verification re-reads the role from the backend and clears the
    /// session when the backend no longer accepts it. The verified profile
    /// is returned so callers need not fetch it again.
    async fn enter(&self, route: &str) -> Result<Option<UserProfile>> {
        let profile = match self.client.coordinator().on_startup().await? {
            RefreshOutcome::LoggedOut(reason) => {
                debug!(%reason, "No usable session");
                None
            }
            RefreshOutcome::Reused(_) | RefreshOutcome::Refreshed(_) => {
                match self.client.verify().await {
                    Ok(profile) => Some(profile),
                    Err(SessionError::Store(e)) => return Err(e.into()),
                    Err(e) => {
                        debug!(error = %e, "Stored session rejected by backend");
                        None
                    }
                }
            }
        };
        self.client.resetter().on_navigate(route)?;
        Ok(profile)
    }

    fn require_admin(&self) -> Result<()> {
        match self.client.manager().role()? {
            Some(role) if role.is_admin() => Ok(()),
            Some(_) => bail!("Admin access required"),
            None => Err(SessionError::NotAuthenticated.into()),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and start a session
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        date_of_birth: NaiveDate,
        #[arg(long)]
        phone_number: String,
        #[arg(long, env = "SPORTCLUB_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SPORTCLUB_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the current session
    Logout,

    /// Show the logged-in account as seen by the backend
    Whoami,

    /// Inspect and maintain the local session
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Browse and join courses
    Courses {
        #[command(subcommand)]
        command: CourseCommands,
    },

    /// Class enrollment
    Classes {
        #[command(subcommand)]
        command: ClassCommands,
    },

    /// Course and class management (admin only)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Account management
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Show the stored session without touching it
    Status,
    /// Exchange the refresh token for a new access token now
    Refresh,
    /// Keep the session timers running and print the countdown
    Watch,
}

#[derive(Subcommand)]
pub enum CourseCommands {
    /// List all courses with free spots
    List,
    /// Courses you have joined
    Mine,
    /// Join a course
    Join { course_id: i64 },
    /// Scheduled classes of a course
    Classes { course_id: i64 },
}

#[derive(Subcommand)]
pub enum ClassCommands {
    /// Classes from your account profile
    Mine,
    /// Classes of the courses you are enrolled in
    Enrolled,
    /// Sign up for a class
    Join { class_id: i64 },
    /// Cancel a class sign-up
    Leave { class_id: i64 },
    /// Participants of a class
    Members { class_id: i64 },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    CourseCreate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        spots: i64,
    },
    CourseUpdate {
        course_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        spots: Option<i64>,
    },
    /// Delete a course and all of its classes
    CourseDelete { course_id: i64 },
    ClassAdd {
        course_id: i64,
        /// Start time (YYYY-MM-DD HH:MM)
        #[arg(long, value_parser = parse_class_date)]
        date: NaiveDateTime,
        #[arg(long)]
        location: String,
        #[arg(long)]
        trainer: String,
    },
    ClassUpdate {
        course_id: i64,
        class_id: i64,
        /// Start time (YYYY-MM-DD HH:MM)
        #[arg(long, value_parser = parse_class_date)]
        date: Option<NaiveDateTime>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        trainer: Option<String>,
    },
    ClassDelete { course_id: i64, class_id: i64 },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Permanently delete your account
    Delete {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn parse_class_date(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, CLASS_DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD HH:MM: {e}"))
}

impl Commands {
    /// Route name used for the navigation expiry reset.
    ///
    /// `None` for commands that create, clear or only inspect the session.
    pub fn route(&self) -> Option<&'static str> {
        match self {
            Self::Register { .. } | Self::Login { .. } | Self::Logout => None,
            Self::Whoami => Some("profile"),
            Self::Session { command } => match command {
                SessionCommands::Status | SessionCommands::Refresh => None,
                SessionCommands::Watch => Some("session"),
            },
            Self::Courses { .. } => Some("courses"),
            Self::Classes { .. } => Some("classes"),
            Self::Admin { .. } => Some("admin"),
            Self::Account { .. } => Some("account"),
        }
    }

    /// Whether the command runs until interrupted
    pub fn is_long_running(&self) -> bool {
        matches!(
            self,
            Self::Session {
                command: SessionCommands::Watch
            }
        )
    }

    pub async fn execute(self, ctx: &Context) -> Result<()> {
        let verified = match self.route() {
            Some(route) => ctx.enter(route).await?,
            None => None,
        };

        match self {
            Self::Register {
                first_name,
                last_name,
                email,
                date_of_birth,
                phone_number,
                password,
            } => {
                let request = RegisterRequest {
                    first_name,
                    last_name,
                    email,
                    password,
                    date_of_birth,
                    phone_number,
                };
                let role = ctx.client.register(&request).await?;
                println!("Registered and logged in as {}", request.email);
                print_role(role);
                Ok(())
            }
            Self::Login { email, password } => {
                let role = ctx.client.login(&email, &password).await?;
                println!("Logged in as {email}");
                print_role(role);
                Ok(())
            }
            Self::Logout => {
                ctx.client.logout()?;
                println!("Logged out");
                Ok(())
            }
            Self::Whoami => {
                let me = match verified {
                    Some(profile) => profile,
                    None => ctx.client.verify().await?,
                };
                let last_name = me.last_name.unwrap_or_default();
                println!("{} {} <{}>", me.first_name, last_name, me.email);
                if let Some(phone) = me.phone_number {
                    println!("Phone: {phone}");
                }
                println!("Role: {}", me.role);
                Ok(())
            }
            Self::Session { command } => command.execute(ctx).await,
            Self::Courses { command } => command.execute(ctx).await,
            Self::Classes { command } => command.execute(ctx).await,
            Self::Admin { command } => {
                ctx.require_admin()?;
                command.execute(ctx).await
            }
            Self::Account { command } => command.execute(ctx).await,
        }
    }
}

impl SessionCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            Self::Status => {
                let manager = ctx.client.manager();
                match manager.status()? {
                    SessionStatus::Anonymous => println!("Not logged in"),
                    SessionStatus::Active { expires_at } => {
                        let left = manager.time_left()?.as_secs();
                        println!("Logged in, expires at {expires_at} ({})", format_countdown(left));
                    }
                    SessionStatus::Expired {
                        expired_at: Some(at),
                    } => println!("Session expired at {at}"),
                    SessionStatus::Expired { expired_at: None } => {
                        println!("Session has no expiry and will be cleared");
                    }
                }
                print_role(manager.role()?);
                Ok(())
            }
            Self::Refresh => match ctx.client.coordinator().refresh_now().await? {
                RefreshOutcome::Refreshed(_) | RefreshOutcome::Reused(_) => {
                    let left = ctx.client.manager().time_left()?.as_secs();
                    println!("Session refreshed ({})", format_countdown(left));
                    Ok(())
                }
                RefreshOutcome::LoggedOut(reason) => {
                    bail!("Refresh failed ({reason}), please log in again")
                }
            },
            Self::Watch => watch(ctx).await,
        }
    }
}

/// Run the session timers in the foreground until the session ends or the
/// user interrupts
async fn watch(ctx: &Context) -> Result<()> {
    let manager = ctx.client.manager();
    if !manager.status()?.is_active() {
        return Err(SessionError::NotAuthenticated.into());
    }

    let mut events = manager.subscribe();
    let (tasks, mut remaining) = ctx.client.start_background();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stdout = std::io::stdout();

    info!("Watching session");
    let ended = loop {
        tokio::select! {
            changed = remaining.changed() => {
                if changed.is_err() {
                    break None;
                }
                let left = *remaining.borrow_and_update();
                write!(stdout, "\rSession expires in {:<8}", format_countdown(left))?;
                stdout.flush()?;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::LoggedOut { reason }) => break Some(reason),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break None,
            },
            _ = &mut ctrl_c => break None,
        }
    };
    writeln!(stdout)?;
    tasks.shutdown().await;

    if let Some(reason) = ended {
        println!("Session ended: {reason}. Please log in again.");
    }
    Ok(())
}

impl CourseCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            Self::List => {
                let courses = ctx.client.public().public_courses().await?;
                if courses.is_empty() {
                    println!("No courses available");
                }
                for course in courses {
                    println!(
                        "{:>4}  {}  ({} spots left)\n      {}",
                        course.id, course.name, course.available_spots, course.description
                    );
                }
                Ok(())
            }
            Self::Mine => {
                let courses = ctx
                    .client
                    .with_auth(|c| async move { c.my_courses().await })
                    .await?;
                if courses.is_empty() {
                    println!("You have not joined any courses yet");
                }
                for course in courses {
                    println!("{:>4}  {}\n      {}", course.id, course.name, course.description);
                }
                Ok(())
            }
            Self::Join { course_id } => {
                let response = ctx
                    .client
                    .with_auth(|c| async move { c.join_course(course_id).await })
                    .await?;
                println!("{}", response.message);
                Ok(())
            }
            Self::Classes { course_id } => {
                let classes = ctx
                    .client
                    .with_auth(|c| async move { c.course_classes(course_id).await })
                    .await?;
                if classes.is_empty() {
                    println!("No classes scheduled for this course");
                }
                for class in classes {
                    println!(
                        "{:>4}  {}  {}  with {}",
                        class.id, class.date, class.location, class.trainer
                    );
                }
                Ok(())
            }
        }
    }
}

impl ClassCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            Self::Mine => {
                let classes = ctx
                    .client
                    .with_auth(|c| async move { c.my_classes().await })
                    .await?;
                print_enrolled(&classes);
                Ok(())
            }
            Self::Enrolled => {
                let classes = ctx
                    .client
                    .with_auth(|c| async move { c.enrolled_classes().await })
                    .await?;
                print_enrolled(&classes);
                Ok(())
            }
            Self::Join { class_id } => {
                let response = ctx
                    .client
                    .with_auth(|c| async move { c.join_class(class_id).await })
                    .await?;
                println!("{}", response.message);
                Ok(())
            }
            Self::Leave { class_id } => {
                let response = ctx
                    .client
                    .with_auth(|c| async move { c.leave_class(class_id).await })
                    .await?;
                println!("{}", response.message);
                Ok(())
            }
            Self::Members { class_id } => {
                let members = ctx
                    .client
                    .with_auth(|c| async move { c.class_members(class_id).await })
                    .await?;
                if members.is_empty() {
                    println!("No participants yet");
                }
                for member in members {
                    let last_name = member.last_name.unwrap_or_default();
                    match member.email {
                        Some(email) => {
                            println!("{:>4}  {} {} <{email}>", member.id, member.first_name, last_name);
                        }
                        None => println!("{:>4}  {} {}", member.id, member.first_name, last_name),
                    }
                }
                Ok(())
            }
        }
    }
}

impl AdminCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            Self::CourseCreate {
                name,
                description,
                spots,
            } => {
                let course = NewCourse {
                    name,
                    description,
                    available_spots: spots,
                };
                let created = ctx
                    .client
                    .with_auth(|c| async move { c.create_course(&course).await })
                    .await?;
                println!("{} (id {})", created.message, created.course_id);
            }
            Self::CourseUpdate {
                course_id,
                name,
                description,
                spots,
            } => {
                let update = CourseUpdate {
                    name,
                    description,
                    available_spots: spots,
                };
                if update.is_empty() {
                    bail!("Nothing to update");
                }
                let response = ctx
                    .client
                    .with_auth(|c| async move { c.update_course(course_id, &update).await })
                    .await?;
                println!("{}", response.message);
            }
            Self::CourseDelete { course_id } => {
                let response = ctx
                    .client
                    .with_auth(|c| async move { c.delete_course(course_id).await })
                    .await?;
                println!("{}", response.message);
            }
            Self::ClassAdd {
                course_id,
                date,
                location,
                trainer,
            } => {
                let class = NewClass::new(date, location, trainer);
                let created = ctx
                    .client
                    .with_auth(|c| async move { c.add_class(course_id, &class).await })
                    .await?;
                println!("{} (id {})", created.message, created.class_id);
            }
            Self::ClassUpdate {
                course_id,
                class_id,
                date,
                location,
                trainer,
            } => {
                let mut update = ClassUpdate {
                    location,
                    trainer,
                    ..ClassUpdate::default()
                };
                if let Some(date) = date {
                    update = update.with_date(date);
                }
                if update.is_empty() {
                    bail!("Nothing to update");
                }
                let response = ctx
                    .client
                    .with_auth(|c| async move { c.update_class(course_id, class_id, &update).await })
                    .await?;
                println!("{}", response.message);
            }
            Self::ClassDelete {
                course_id,
                class_id,
            } => {
                let response = ctx
                    .client
                    .with_auth(|c| async move { c.delete_class(course_id, class_id).await })
                    .await?;
                println!("{}", response.message);
            }
        }
        Ok(())
    }
}

impl AccountCommands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            Self::Delete { yes } => {
                if !yes {
                    bail!("Refusing to delete the account without --yes");
                }
                let message = ctx.client.delete_account().await?;
                println!("{message}");
                Ok(())
            }
        }
    }
}

fn print_role(role: Option<sportclub_http::Role>) {
    if let Some(role) = role {
        println!("Role: {role}");
    }
}

fn print_enrolled(classes: &[EnrolledClass]) {
    if classes.is_empty() {
        println!("You are not enrolled in any classes");
        return;
    }
    for class in classes {
        let when = match (&class.course_date, &class.day_of_week, &class.time) {
            (Some(date), _, _) => date.clone(),
            (None, Some(day), Some(time)) => format!("{day} {time}"),
            (None, Some(day), None) => day.clone(),
            _ => String::new(),
        };
        let name = class.course_name.as_deref().unwrap_or("-");
        let mut line = format!("{:>4}  {name}  {when}", class.id);
        if let Some(location) = &class.location {
            line.push_str(&format!("  @ {location}"));
        }
        if let Some(trainer) = &class.trainer {
            line.push_str(&format!("  with {trainer}"));
        }
        if let (Some(free), Some(total)) = (class.available_spots, class.total_max_spots) {
            line.push_str(&format!("  [{free}/{total}]"));
        }
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sportclub_http::PublicClubClient;
    use sportclub_session::{MemoryStore, SessionConfig, SessionManager, SessionTokens};
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_profile(server: &MockServer, token: &str, role: &str) {
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "first_name": "Ana",
                "email": "ana@example.com",
                "role": role
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn context(server: &MockServer) -> Context {
        let manager =
            SessionManager::with_system_clock(Arc::new(MemoryStore::new()), SessionConfig::default());
        let public = PublicClubClient::new(format!("{}/api", server.uri())).unwrap();
        Context::new(SessionClient::new(public, manager))
    }

    #[test]
    fn class_date_parsing() {
        let parsed = parse_class_date("2025-03-01 18:30").unwrap();
        assert_eq!(parsed.format(CLASS_DATE_FORMAT).to_string(), "2025-03-01 18:30");
        assert!(parse_class_date("2025-03-01").is_err());
    }

    #[test]
    fn session_commands_skip_navigation() {
        assert_eq!(Commands::Logout.route(), None);
        assert_eq!(
            Commands::Session {
                command: SessionCommands::Status
            }
            .route(),
            None
        );
        assert_eq!(
            Commands::Courses {
                command: CourseCommands::List
            }
            .route(),
            Some("courses")
        );
    }

    #[tokio::test]
    async fn command_refreshes_expired_session_before_calling_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .and(header("authorization", "Bearer r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "a2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_profile(&server, "a2", "user").await;
        Mock::given(method("GET"))
            .and(path("/api/courses/my-courses"))
            .and(header("authorization", "Bearer a2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server);
        let manager = ctx.client.manager();
        manager
            .establish(SessionTokens::new("a1").with_refresh("r1"))
            .unwrap();
        manager
            .store()
            .set_expiry(Some(manager.now() - chrono::Duration::seconds(1)))
            .unwrap();

        Commands::Courses {
            command: CourseCommands::Mine,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert!(manager.status().unwrap().is_active());
    }

    #[tokio::test]
    async fn admin_commands_require_admin_role() {
        let server = MockServer::start().await;
        mount_profile(&server, "a1", "user").await;
        let ctx = context(&server);
        ctx.client
            .manager()
            .establish(
                SessionTokens::new("a1")
                    .with_refresh("r1")
                    .with_role(sportclub_http::Role::User),
            )
            .unwrap();

        let err = Commands::Admin {
            command: AdminCommands::CourseDelete { course_id: 1 },
        }
        .execute(&ctx)
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Admin access required");
    }

    #[tokio::test]
    async fn backend_role_overrides_stored_role() {
        let server = MockServer::start().await;
        mount_profile(&server, "a1", "user").await;
        let ctx = context(&server);
        ctx.client
            .manager()
            .establish(
                SessionTokens::new("a1")
                    .with_refresh("r1")
                    .with_role(sportclub_http::Role::Admin),
            )
            .unwrap();

        let err = Commands::Admin {
            command: AdminCommands::CourseDelete { course_id: 1 },
        }
        .execute(&ctx)
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Admin access required");
        assert_eq!(
            ctx.client.manager().role().unwrap(),
            Some(sportclub_http::Role::User)
        );
    }

    #[tokio::test]
    async fn rejected_verification_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": "Token revoked"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/courses/my-courses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;
        let ctx = context(&server);
        ctx.client
            .manager()
            .establish(SessionTokens::new("a1").with_refresh("r1"))
            .unwrap();

        let err = Commands::Courses {
            command: CourseCommands::Mine,
        }
        .execute(&ctx)
        .await
        .unwrap_err();
        assert!(err.downcast_ref::<SessionError>().unwrap().requires_login());
        assert_eq!(ctx.client.manager().status().unwrap(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn anonymous_user_is_told_to_log_in() {
        let server = MockServer::start().await;
        let ctx = context(&server);

        let err = Commands::Classes {
            command: ClassCommands::Enrolled,
        }
        .execute(&ctx)
        .await
        .unwrap_err();
        let session_err = err.downcast_ref::<SessionError>().unwrap();
        assert!(session_err.requires_login());
    }
}
