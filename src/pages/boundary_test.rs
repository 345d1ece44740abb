use super::*;

#[tokio::test]
async fn healthy_render_passes_value_through() {
    let boundary = ErrorBoundary::new();
    let value = boundary.run(async { Ok::<_, String>(42) }).await;
    assert_eq!(value, Some(42));
    assert_eq!(boundary.state(), BoundaryState::Healthy);
}

#[tokio::test]
async fn error_result_is_captured_and_latched() {
    let boundary = ErrorBoundary::new();
    assert_eq!(boundary.run(async { Err::<(), _>("menu file missing".to_owned()) }).await, None);
    assert_eq!(
        boundary.state(),
        BoundaryState::Failed(CapturedError { message: "menu file missing".to_owned(), panicked: false })
    );

    // Stays failed until reset, even for a render that would succeed.
    assert_eq!(boundary.run(async { Ok::<_, String>(1) }).await, None);
}

#[tokio::test]
async fn panic_is_captured() {
    let boundary = ErrorBoundary::new();
    let out = boundary
        .run(async {
            if true {
                panic!("view exploded");
            }
            Ok::<(), String>(())
        })
        .await;
    assert_eq!(out, None);
    match boundary.state() {
        BoundaryState::Failed(err) => {
            assert!(err.panicked);
            assert_eq!(err.message, "view exploded");
        }
        BoundaryState::Healthy => panic!("panic was not captured"),
    }
}

#[tokio::test]
async fn reset_allows_retry() {
    let boundary = ErrorBoundary::new();
    let _ = boundary.run(async { Err::<(), _>("boom".to_owned()) }).await;
    boundary.reset();
    assert!(!boundary.is_failed());
    assert_eq!(boundary.run(async { Ok::<_, String>("ok") }).await, Some("ok"));
}

#[test]
fn fallback_hides_details_unless_asked() {
    let err = CapturedError { message: "secret internals".to_owned(), panicked: false };
    assert!(!fallback_text(&err, false).contains("secret internals"));
    assert!(fallback_text(&err, true).contains("Details: secret internals"));
    assert!(fallback_text(&err, false).starts_with(FALLBACK_TITLE));
}
