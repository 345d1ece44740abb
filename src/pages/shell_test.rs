use super::*;

use crate::net::types::Role;
use crate::pages::boundary::FALLBACK_TITLE;
use crate::routes::guard::Guard;
use crate::routes::table::Route;
use crate::state::session::SessionError;
use crate::test_support::{assertion, profile};

const MENU: &str = r#"{
    "main": [
        { "title": "Dashboard", "url": "/dashboard" },
        {
            "title": "Admin",
            "url": "/admin",
            "roles": ["admin"],
            "items": [{ "title": "Users", "url": "/admin/users" }]
        },
        { "title": "Reports", "url": "/reports", "badge": "new" }
    ],
    "projects": [{ "name": "Billing", "url": "/projects/billing", "permissions": ["billing:read"] }]
}"#;

fn shell() -> Shell {
    Shell::new(RouteTable::standard("/auth/login", "/dashboard"), NavigationMenu::from_json(MENU).unwrap())
}

fn signed_in(role: Role, perms: &[&str]) -> Session {
    Session::authenticated(Some(assertion("alice")), profile(role, perms), "tok".to_owned())
}

#[tokio::test]
async fn anonymous_dashboard_visit_lands_on_login() {
    let screen = shell().open("/dashboard", &Session::anonymous(None)).await;
    assert_eq!(screen.location, "/auth/login");
    assert_eq!(screen.redirects, vec!["/auth/login".to_owned()]);
    assert_eq!(screen.return_to.as_deref(), Some("/dashboard"));
    assert!(screen.body.starts_with("Sign in"));
    assert!(screen.body.contains("--return-to /dashboard"));
}

#[tokio::test]
async fn direct_login_visit_has_no_return_location() {
    let screen = shell().open("/auth/login", &Session::anonymous(None)).await;
    assert!(screen.redirects.is_empty());
    assert_eq!(screen.return_to, None);
    assert!(!screen.body.contains("--return-to"));
}

#[tokio::test]
async fn signed_in_login_visit_lands_on_dashboard() {
    let screen = shell().open("/auth/login", &signed_in(Role::User, &[])).await;
    assert_eq!(screen.location, "/dashboard");
    assert!(screen.body.starts_with("== dashboard =="));
    assert!(screen.body.contains("Signed in as Alice <alice@example.com> [user]"));
    assert!(screen.body.contains("* Dashboard (/dashboard)"));
    assert!(screen.body.contains("Reports (/reports) [new]"));
    assert!(!screen.body.contains("Admin"));
    assert!(!screen.body.contains("Billing"));
}

#[tokio::test]
async fn admin_sees_restricted_entries() {
    let screen = shell().open("/dashboard", &signed_in(Role::Admin, &["billing:read"])).await;
    assert!(screen.body.contains("Admin (/admin)"));
    assert!(screen.body.contains("    - Users (/admin/users)"));
    assert!(screen.body.contains("# Billing (/projects/billing)"));
}

#[tokio::test]
async fn resolving_session_shows_loading() {
    let screen = shell().open("/dashboard", &Session::resolving()).await;
    assert_eq!(screen.location, "/dashboard");
    assert!(screen.redirects.is_empty());
    assert!(screen.body.contains(LOADING_TEXT));
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let screen = shell().open("/nowhere", &Session::anonymous(None)).await;
    assert_eq!(screen.body, "!! 404 Page not found: /nowhere\n");
}

#[tokio::test]
async fn redirect_loop_is_cut_off() {
    let routes = RouteTable::new()
        .with_route(Route::new("/a", Layout::Full, View::Login).guarded(Guard::protected().with_fallback("/b")))
        .with_route(Route::new("/b", Layout::Full, View::Login).guarded(Guard::protected().with_fallback("/a")));
    let screen = Shell::new(routes, NavigationMenu::default()).open("/a", &Session::anonymous(None)).await;
    assert_eq!(screen.redirects.len(), MAX_REDIRECTS);
    assert!(screen.body.contains("Too many redirects while opening /a"));
}

#[tokio::test]
async fn failed_render_shows_fallback_until_reset() {
    let routes = RouteTable::standard("/auth/login", "/dashboard")
        .with_route(Route::new("/preview", Layout::Sidebar, View::Dashboard));
    let shell = Shell::new(routes, NavigationMenu::default());

    let screen = shell.open("/preview", &Session::anonymous(None)).await;
    assert!(screen.body.starts_with("!! Oops! Something went wrong"));
    assert!(shell.boundary().is_failed());

    // A healthy view still shows the fallback while the boundary is latched.
    let screen = shell.open("/auth/login", &Session::anonymous(None)).await;
    assert!(screen.body.contains(FALLBACK_TITLE));

    shell.boundary().reset();
    let screen = shell.open("/auth/login", &Session::anonymous(None)).await;
    assert!(screen.body.starts_with("Sign in"));
}

#[test]
fn setup_screen_lists_missing_keys() {
    let text = render_setup_required(&["IDENTITY_API_KEY", "IDENTITY_PROJECT_ID"]);
    assert!(text.contains("IDENTITY_API_KEY=your_api_key_here\n"));
    assert!(text.contains("IDENTITY_PROJECT_ID=your_project_id_here\n"));
}

#[test]
fn whoami_describes_session() {
    assert_eq!(render_whoami(&Session::anonymous(None)), "Not signed in\n");
    assert_eq!(
        render_whoami(&Session::anonymous(Some(SessionError::new("Failed to fetch user data")))),
        "Not signed in (Failed to fetch user data)\n"
    );

    let text = render_whoami(&signed_in(Role::Manager, &["reports:read", "billing:read"]));
    assert!(text.starts_with("Alice <alice@example.com>\n"));
    assert!(text.contains("role:        manager"));
    assert!(text.contains("permissions: billing:read, reports:read"));
    assert!(text.contains("verified:    true"));
}

#[test]
fn empty_menu_says_so() {
    assert_eq!(render_menu(&NavigationMenu::default(), "/"), "(no navigation entries)\n");
}

#[test]
fn prefs_are_listed() {
    assert_eq!(render_prefs(Locale::En, ThemeMode::Dark), "locale: en\ntheme:  dark\n");
}
