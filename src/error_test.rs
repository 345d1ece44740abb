use super::*;

// =============================================================================
// friendly_message
// =============================================================================

#[test]
fn wrong_password_code_uses_table_entry_not_raw_message() {
    let err = AuthError::with_code("INVALID_PASSWORD", "auth/wrong-password");
    assert_eq!(friendly_message(&err), "Incorrect password");
}

#[test]
fn every_table_code_maps_to_its_entry() {
    for (code, message) in PROVIDER_MESSAGES {
        let err = AuthError::with_code("raw provider text", *code);
        assert_eq!(friendly_message(&err), *message, "code {code}");
    }
}

#[test]
fn embedded_code_in_message_is_extracted() {
    let err = AuthError::new("Provider: Error (auth/too-many-requests).");
    assert_eq!(friendly_message(&err), "Too many attempts. Please try again in a few minutes");
}

#[test]
fn unknown_code_falls_back_to_substring_rules() {
    let err = AuthError::with_code("The password is invalid", "auth/something-new");
    assert_eq!(friendly_message(&err), "Incorrect password");

    let err = AuthError::new("Badly formatted EMAIL");
    assert_eq!(friendly_message(&err), "There is an issue with the email address");

    let err = AuthError::new("connection reset by peer");
    assert_eq!(friendly_message(&err), "Network connection error. Please try again");
}

#[test]
fn unmatched_message_is_returned_verbatim() {
    let err = AuthError::new("Backend is in maintenance");
    assert_eq!(friendly_message(&err), "Backend is in maintenance");
}

#[test]
fn empty_message_gets_generic_text() {
    let err = AuthError { message: String::new(), code: None };
    assert_eq!(friendly_message(&err), "An unknown error occurred. Please try again");
}

// =============================================================================
// AuthError normalisation
// =============================================================================

#[test]
fn identity_rejection_keeps_code_and_message() {
    let err = AuthError::from(IdentityError::Rejected {
        code: "auth/user-not-found".to_owned(),
        message: "EMAIL_NOT_FOUND".to_owned(),
    });
    assert_eq!(err.code.as_deref(), Some("auth/user-not-found"));
    assert_eq!(err.message, "EMAIL_NOT_FOUND");
}

#[test]
fn identity_transport_maps_to_network_code() {
    let err = AuthError::from(IdentityError::Transport("dns failure".to_owned()));
    assert_eq!(err.code.as_deref(), Some(NETWORK_FAILURE_CODE));
    assert_eq!(
        friendly_message(&err),
        "Network connection error. Please check your internet connection"
    );
}

#[test]
fn profile_status_error_uses_backend_message_and_code() {
    let err = AuthError::from(ProfileFetchError(ApiError::Status {
        status: 403,
        message: Some("Account suspended".to_owned()),
        code: Some("ACCOUNT_SUSPENDED".to_owned()),
    }));
    assert_eq!(err.message, "Account suspended");
    assert_eq!(err.code.as_deref(), Some("ACCOUNT_SUSPENDED"));
}

#[test]
fn profile_status_error_without_message_is_unknown() {
    let err = AuthError::from(ProfileFetchError(ApiError::Status { status: 500, message: None, code: None }));
    assert_eq!(err.message, UNKNOWN_ERROR_MESSAGE);
}

#[test]
fn profile_unauthorized_is_flagged() {
    let err = ProfileFetchError(ApiError::Unauthorized);
    assert!(err.is_unauthorized());
    assert_eq!(AuthError::from(err).message, "Unauthorized");
}

#[test]
fn string_errors_become_messages() {
    assert_eq!(AuthError::from("boom").message, "boom");
    assert_eq!(AuthError::from(String::new()), AuthError::unknown());
}

#[test]
fn superseded_error_carries_code() {
    assert_eq!(AuthError::superseded().code.as_deref(), Some(SUPERSEDED_CODE));
}

#[test]
fn auth_error_displays_its_message_and_boxes() {
    let err = AuthError::with_code("Incorrect password", "auth/wrong-password");
    assert_eq!(err.to_string(), "Incorrect password");
    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
    assert_eq!(boxed.to_string(), "Incorrect password");
}
