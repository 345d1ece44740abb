//! Wire and domain types shared by the identity client, backend client, and
//! session state.
//!
//! DESIGN
//! ======
//! `UserResponse` mirrors the backend's `/auth/me` JSON exactly; `Profile` is
//! the trimmed application view the session keeps. Conversion fills the
//! display name from the email and treats absent permissions as none.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Application role assigned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "user" => Ok(Self::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account standing as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

/// What the identity provider says about the signed-in subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    pub subject_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
}

/// `GET /auth/me` response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    #[serde(rename = "firebaseUid")]
    pub identity_uid: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

/// Application-level user record kept on the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: String,
    pub identity_uid: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub permissions: BTreeSet<String>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
}

impl From<UserResponse> for Profile {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            identity_uid: user.identity_uid,
            name: user.name.filter(|n| !n.is_empty()).unwrap_or_else(|| user.email.clone()),
            email: user.email,
            role: user.role,
            status: user.status,
            permissions: user.permissions.unwrap_or_default().into_iter().collect(),
            avatar: user.avatar,
            phone: user.phone,
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
