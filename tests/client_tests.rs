// tests/client_tests.rs

use std::{
    error::Error,
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use platform_docs::{
    client::{
        ClientApp,
        diagnostics::{ErrorReporter, ErrorSink},
        navigation::{GuardRoutes, NavigationGuard, NavigationOutcome, Redirect},
        progress::{ProgressCounter, TracingProgress},
        route_table::{RouteMeta, RouteTable},
        session::{
            AuthStore, FileSessionStorage, MemorySessionStorage, PersistedSession, SessionContext,
            SessionStorage, SessionUser,
        },
    },
    error::AppError,
};
use serde_json::json;

fn token_expiring_in(seconds: i64) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
    encode(
        &Header::default(),
        &json!({ "sub": "alice", "exp": now + seconds }),
        &EncodingKey::from_secret(b"server-side-secret"),
    )
    .unwrap()
}

fn session_for(role: &str, token: String) -> PersistedSession {
    PersistedSession {
        token,
        user: SessionUser {
            id: Some(1),
            username: "alice".to_string(),
            role: role.to_string(),
        },
    }
}

fn route_table() -> RouteTable {
    RouteTable::new()
        .route("/", RouteMeta::public())
        .route("/login", RouteMeta::public())
        .route("/403", RouteMeta::public())
        .route("/courses", RouteMeta::public())
        .route("/courses/:courseId/lessons/:lessonId", RouteMeta::authenticated())
        .route("/profile", RouteMeta::authenticated())
        .route("/admin", RouteMeta::roles(&["admin"]))
        .route("/teach", RouteMeta::roles(&["teacher", "admin"]))
}

fn guard() -> NavigationGuard {
    NavigationGuard::new(GuardRoutes::default(), Arc::new(TracingProgress))
}

async fn signed_in(role: &str) -> SessionContext {
    let session = SessionContext::new(MemorySessionStorage::new());
    session
        .sign_in(session_for(role, token_expiring_in(3600)))
        .await
        .unwrap();
    session
}

/// Storage whose every operation fails.
struct BrokenStorage;

#[async_trait]
impl SessionStorage for BrokenStorage {
    async fn load(&self) -> Result<Option<PersistedSession>, AppError> {
        Err(AppError::InternalServerError("storage unavailable".to_string()))
    }

    async fn save(&self, _session: &PersistedSession) -> Result<(), AppError> {
        Err(AppError::InternalServerError("storage unavailable".to_string()))
    }

    async fn clear(&self) -> Result<(), AppError> {
        Err(AppError::InternalServerError("storage unavailable".to_string()))
    }
}

/// In-memory storage that is slow to load and counts loads.
struct SlowStorage {
    inner: MemorySessionStorage,
    loads: Arc<AtomicUsize>,
}

#[async_trait]
impl SessionStorage for SlowStorage {
    async fn load(&self) -> Result<Option<PersistedSession>, AppError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.inner.load().await
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), AppError> {
        self.inner.save(session).await
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.inner.clear().await
    }
}

#[tokio::test]
async fn public_destination_is_always_allowed() {
    let routes = route_table();
    let guard = guard();
    let destination = routes.resolve("/courses");

    let anonymous = SessionContext::new(BrokenStorage);
    assert_eq!(
        guard.navigate(&anonymous, &destination).await,
        NavigationOutcome::Allowed
    );

    let student = signed_in("student").await;
    assert_eq!(
        guard.navigate(&student, &destination).await,
        NavigationOutcome::Allowed
    );
}

#[tokio::test]
async fn unauthenticated_user_is_sent_to_login_with_return_path() {
    let routes = route_table();
    let session = SessionContext::new(MemorySessionStorage::new());

    let destination = routes.resolve("/courses/5/lessons/12?tab=notes");
    let outcome = guard().navigate(&session, &destination).await;

    let redirect = outcome.redirect().expect("expected a redirect");
    assert_eq!(redirect.path, "/login");
    assert_eq!(redirect.param("redirect"), Some("/courses/5/lessons/12?tab=notes"));
    assert_eq!(
        redirect.location(),
        "/login?redirect=%2Fcourses%2F5%2Flessons%2F12%3Ftab%3Dnotes"
    );
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn role_outside_allowlist_is_forbidden() {
    let routes = route_table();
    let session = signed_in("student").await;

    let outcome = guard().navigate(&session, &routes.resolve("/admin")).await;
    assert_eq!(outcome, NavigationOutcome::Redirected(Redirect::to("/403")));

    let teacher = signed_in("teacher").await;
    assert!(guard().navigate(&teacher, &routes.resolve("/teach")).await.is_allowed());
}

#[tokio::test]
async fn authenticated_user_visiting_login_goes_home() {
    let routes = route_table();
    let session = signed_in("student").await;

    let outcome = guard()
        .navigate(&session, &routes.resolve("/login?redirect=%2Fprofile"))
        .await;
    assert_eq!(outcome, NavigationOutcome::Redirected(Redirect::to("/")));
}

#[tokio::test]
async fn persisted_session_is_restored_on_demand() {
    let routes = route_table();
    let storage = MemorySessionStorage::with_session(session_for("student", token_expiring_in(600)));
    let session = SessionContext::new(storage);
    assert!(!session.is_authenticated());

    let outcome = guard().navigate(&session, &routes.resolve("/profile")).await;

    assert!(outcome.is_allowed());
    assert!(session.is_authenticated());
    assert_eq!(session.role().as_deref(), Some("student"));
    assert!(session.token().await.is_some());
}

#[tokio::test]
async fn expired_session_is_discarded() {
    let routes = route_table();
    let storage = MemorySessionStorage::with_session(session_for("student", token_expiring_in(-600)));
    let session = SessionContext::new(storage);

    let outcome = guard().navigate(&session, &routes.resolve("/profile")).await;

    assert_eq!(outcome.redirect().map(|r| r.path.as_str()), Some("/login"));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn restore_failure_counts_as_unauthenticated() {
    let routes = route_table();
    let session = SessionContext::new(BrokenStorage);

    let outcome = guard().navigate(&session, &routes.resolve("/profile")).await;

    assert_eq!(outcome.redirect().map(|r| r.path.as_str()), Some("/login"));
}

#[tokio::test]
async fn progress_completes_on_every_outcome() {
    let routes = route_table();
    let progress = Arc::new(ProgressCounter::new());
    let guard = NavigationGuard::new(GuardRoutes::default(), progress.clone());
    let session = SessionContext::new(MemorySessionStorage::new());

    guard.navigate(&session, &routes.resolve("/courses")).await;
    guard.navigate(&session, &routes.resolve("/profile")).await;
    guard.navigate(&session, &routes.resolve("/admin")).await;

    assert_eq!(progress.started(), 3);
    assert_eq!(progress.finished(), 3);
    assert_eq!(progress.in_flight(), 0);
}

#[tokio::test]
async fn concurrent_navigations_are_serialized() {
    let routes = route_table();
    let loads = Arc::new(AtomicUsize::new(0));
    let storage = SlowStorage {
        inner: MemorySessionStorage::with_session(session_for("student", token_expiring_in(600))),
        loads: loads.clone(),
    };
    let session = SessionContext::new(storage);
    let guard = guard();

    let profile = routes.resolve("/profile");
    let lesson = routes.resolve("/courses/1/lessons/1");
    let (first, second) = tokio::join!(
        guard.navigate(&session, &profile),
        guard.navigate(&session, &lesson)
    );

    assert!(first.is_allowed());
    assert!(second.is_allowed());
    // The second attempt waited for the first restore instead of starting its own.
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn route_table_extracts_params() {
    let routes = route_table();

    let destination = routes.resolve("/courses/5/lessons/12?tab=notes#top");
    assert_eq!(destination.path, "/courses/5/lessons/12");
    assert_eq!(destination.route.as_deref(), Some("/courses/:courseId/lessons/:lessonId"));
    assert_eq!(destination.params.get("courseId").map(String::as_str), Some("5"));
    assert_eq!(destination.params.get("lessonId").map(String::as_str), Some("12"));
    assert!(destination.meta.requires_auth);

    let unknown = routes.resolve("/nowhere/at/all");
    assert!(unknown.route.is_none());
    assert!(!unknown.meta.requires_auth);

    let catch_all = RouteTable::new()
        .route("/docs/*", RouteMeta::public())
        .resolve("/docs/java/basics");
    assert_eq!(catch_all.params.get("pathMatch").map(String::as_str), Some("java/basics"));
}

#[tokio::test]
async fn client_app_follows_redirects() {
    let session = SessionContext::new(MemorySessionStorage::new());
    let app = ClientApp::start(session, route_table(), Arc::new(TracingProgress));

    let navigation = app.navigate("/profile").await.unwrap();
    assert_eq!(navigation.location, "/login?redirect=%2Fprofile");
    assert!(!navigation.outcome.is_allowed());

    app.session()
        .sign_in(session_for("student", token_expiring_in(600)))
        .await
        .unwrap();

    let navigation = app.navigate("/login").await.unwrap();
    assert_eq!(navigation.location, "/");

    let navigation = app.navigate("/admin").await.unwrap();
    assert_eq!(navigation.location, "/403");
    assert_eq!(app.location().await.as_deref(), Some("/403"));

    let navigation = app.navigate("/profile").await.unwrap();
    assert_eq!(navigation.outcome, NavigationOutcome::Allowed);

    app.session().sign_out().await.unwrap();
    assert!(!app.session().is_authenticated());

    app.shutdown().await;
}

#[tokio::test]
async fn session_file_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let session = SessionContext::new(FileSessionStorage::new(&path));
    let mut changes = session.subscribe();
    session
        .sign_in(session_for("teacher", token_expiring_in(600)))
        .await
        .unwrap();
    assert!(changes.has_changed().unwrap());
    assert!(path.exists());

    let restarted = SessionContext::new(FileSessionStorage::new(&path));
    restarted.initialize_auth().await.unwrap();
    assert_eq!(restarted.user().map(|u| u.role), Some("teacher".to_string()));

    restarted.sign_out().await.unwrap();
    assert!(!path.exists());

    // Nothing persisted: restoring is a no-op.
    let empty = SessionContext::new(FileSessionStorage::new(&path));
    empty.initialize_auth().await.unwrap();
    assert!(!empty.is_authenticated());
}

#[derive(Debug)]
struct RenderFailure;

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("component failed to render")
    }
}

impl Error for RenderFailure {}

#[derive(Default)]
struct RecordingReporter {
    seen: Mutex<Vec<String>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &(dyn Error + 'static), info: &str) {
        self.seen.lock().unwrap().push(format!("{error} @ {info}"));
    }
}

struct PanickingReporter;

impl ErrorReporter for PanickingReporter {
    fn report(&self, _error: &(dyn Error + 'static), _info: &str) {
        panic!("reporter is down");
    }
}

#[test]
fn error_sink_logs_and_reports() {
    let reporter = Arc::new(RecordingReporter::default());
    let sink = ErrorSink::with_reporter(reporter.clone());

    sink.capture(&RenderFailure, "LessonView");

    assert_eq!(sink.captured(), 1);
    assert_eq!(
        *reporter.seen.lock().unwrap(),
        vec!["component failed to render @ LessonView".to_string()]
    );
}

#[test]
fn error_sink_survives_a_failing_reporter() {
    let sink = ErrorSink::with_reporter(Arc::new(PanickingReporter));

    sink.capture(&RenderFailure, "ExerciseView");
    sink.capture(&RenderFailure, "ExerciseView");

    assert_eq!(sink.captured(), 2);
    assert_eq!(ErrorSink::new().captured(), 0);
}
