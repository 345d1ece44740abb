use super::*;

use crate::net::types::Role;
use crate::test_support::{assertion, profile};

fn table() -> RouteTable {
    RouteTable::standard("/auth/login", "/dashboard")
}

fn signed_in(role: Role) -> Session {
    Session::authenticated(Some(assertion("ann")), profile(role, &[]), "tok".to_owned())
}

#[test]
fn normalize_strips_query_fragment_and_trailing_slash() {
    assert_eq!(normalize("/auth/login/?next=/x#top"), "/auth/login");
    assert_eq!(normalize("/"), "/");
    assert_eq!(normalize(""), "/");
    assert_eq!(normalize("/?a=1"), "/");
}

#[test]
fn root_and_login_render_login_for_anonymous() {
    let anon = Session::anonymous(None);
    for path in ["/", "/auth/login", "/auth/login/"] {
        assert_eq!(
            table().resolve(path, &anon),
            Resolution::Render { layout: Layout::Full, view: View::Login },
            "{path}"
        );
    }
}

#[test]
fn login_redirects_authenticated_to_home() {
    assert_eq!(
        table().resolve("/auth/login", &signed_in(Role::User)),
        Resolution::Redirect { to: "/dashboard".to_owned(), from: None, replace: true }
    );
}

#[test]
fn home_requires_session() {
    assert_eq!(
        table().resolve("/dashboard", &Session::anonymous(None)),
        Resolution::Redirect { to: "/auth/login".to_owned(), from: Some("/dashboard".to_owned()), replace: true }
    );
    assert_eq!(
        table().resolve("/dashboard", &signed_in(Role::User)),
        Resolution::Render { layout: Layout::Sidebar, view: View::Dashboard }
    );
}

#[test]
fn guarded_routes_wait_for_resolution() {
    assert_eq!(table().resolve("/dashboard", &Session::resolving()), Resolution::Loading { layout: Layout::Sidebar });
    assert_eq!(table().resolve("/", &Session::resolving()), Resolution::Loading { layout: Layout::Full });
}

#[test]
fn unknown_path_is_not_found_in_error_layout() {
    assert_eq!(
        table().resolve("/nope", &signed_in(Role::Admin)),
        Resolution::Render { layout: Layout::Error, view: View::NotFound }
    );
}

#[test]
fn unauthorized_page_is_unguarded() {
    assert_eq!(
        table().resolve("/unauthorized", &Session::resolving()),
        Resolution::Render { layout: Layout::Error, view: View::Unauthorized }
    );
}

#[test]
fn added_route_shadows_existing_path() {
    let table = table().with_route(
        Route::new("/dashboard", Layout::Sidebar, View::Dashboard).guarded(Guard::role_gated(&["admin"])),
    );
    assert_eq!(table.routes().iter().filter(|r| r.path == "/dashboard").count(), 1);
    assert_eq!(
        table.resolve("/dashboard", &signed_in(Role::User)),
        Resolution::Redirect { to: UNAUTHORIZED_PATH.to_owned(), from: None, replace: true }
    );
}
