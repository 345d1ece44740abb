use super::*;

fn me_json() -> serde_json::Value {
    serde_json::json!({
        "id": "u-1",
        "firebaseUid": "fb-1",
        "email": "a@b.com",
        "name": "Alice",
        "role": "manager",
        "status": "active",
        "permissions": ["reports:read", "users:write"],
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-02-01T00:00:00Z",
        "lastLoginAt": "2024-03-01T00:00:00Z"
    })
}

#[test]
fn user_response_decodes_backend_shape() {
    let user: UserResponse = serde_json::from_value(me_json()).unwrap();
    assert_eq!(user.identity_uid, "fb-1");
    assert_eq!(user.role, Role::Manager);
    assert_eq!(user.status, AccountStatus::Active);
    assert_eq!(user.last_login_at.as_deref(), Some("2024-03-01T00:00:00Z"));
    assert_eq!(user.phone, None);
}

#[test]
fn user_response_optional_fields_may_be_absent() {
    let user: UserResponse = serde_json::from_value(serde_json::json!({
        "id": "u-2",
        "firebaseUid": "fb-2",
        "email": "c@d.com",
        "role": "user",
        "status": "suspended",
        "createdAt": "x",
        "updatedAt": "y"
    }))
    .unwrap();
    assert_eq!(user.name, None);
    assert_eq!(user.permissions, None);
    assert_eq!(user.status, AccountStatus::Suspended);
}

#[test]
fn user_response_rejects_unknown_role() {
    let mut raw = me_json();
    raw["role"] = serde_json::json!("owner");
    assert!(serde_json::from_value::<UserResponse>(raw).is_err());
}

#[test]
fn profile_from_user_collects_permissions() {
    let profile = Profile::from(serde_json::from_value::<UserResponse>(me_json()).unwrap());
    assert_eq!(profile.name, "Alice");
    assert!(profile.permissions.contains("reports:read"));
    assert!(profile.permissions.contains("users:write"));
    assert_eq!(profile.permissions.len(), 2);
}

#[test]
fn profile_name_falls_back_to_email() {
    let mut raw = me_json();
    raw["name"] = serde_json::Value::Null;
    raw["permissions"] = serde_json::Value::Null;
    let profile = Profile::from(serde_json::from_value::<UserResponse>(raw).unwrap());
    assert_eq!(profile.name, "a@b.com");
    assert!(profile.permissions.is_empty());
}

#[test]
fn role_parses_and_displays() {
    assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
    assert!("root".parse::<Role>().is_err());
    assert_eq!(Role::Manager.to_string(), "manager");
}
