//! Per-request configuration and the attachable login credential.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// When a request should be made with the login cookie attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginPolicy {
    /// Every request is authenticated; a cookie must be present.
    Enforce,
    /// Authenticate whenever a cookie is available.
    WhenHasCookie,
    /// Never volunteer the cookie. Pages past the gatekeeper still force
    /// login, making this indistinguishable from `WhenRequired`; the name
    /// is kept as the server-side convention spells it.
    AlwaysNo,
    /// Authenticate only for pages past the gatekeeper page.
    #[default]
    WhenRequired,
}

impl LoginPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LoginPolicy::Enforce => "enforce",
            LoginPolicy::WhenHasCookie => "when_has_cookie",
            LoginPolicy::AlwaysNo => "always_no",
            LoginPolicy::WhenRequired => "when_required",
        }
    }
}

impl FromStr for LoginPolicy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enforce" => Ok(LoginPolicy::Enforce),
            "when_has_cookie" => Ok(LoginPolicy::WhenHasCookie),
            "always_no" => Ok(LoginPolicy::AlwaysNo),
            "when_required" => Ok(LoginPolicy::WhenRequired),
            _ => Err(ClientError::InvalidLoginPolicy(s.to_string())),
        }
    }
}

/// A login credential ("cookie" in AnoBBS parlance).
///
/// Acquisition and persistence are the host application's concern; the
/// client only needs the `userhash` value to attach to requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCookie {
    pub userhash: String,
}

impl UserCookie {
    #[must_use]
    pub fn new(userhash: impl Into<String>) -> Self {
        Self {
            userhash: userhash.into(),
        }
    }
}

/// Immutable configuration consulted by every workflow.
///
/// The gatekeeper pages are the last page numbers the server serves
/// without authentication; boards and threads have separate knobs because
/// the server treats them differently past that point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub login_policy: LoginPolicy,
    pub thread_gatekeeper_page: u64,
    pub board_gatekeeper_page: u64,
    pub max_attempts: u32,
    pub user_cookie: Option<UserCookie>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            login_policy: LoginPolicy::default(),
            thread_gatekeeper_page: 100,
            board_gatekeeper_page: 100,
            max_attempts: 3,
            user_cookie: None,
        }
    }
}

impl RequestOptions {
    /// Whether a usable credential is attached.
    #[must_use]
    pub fn has_cookie(&self) -> bool {
        self.user_cookie.is_some()
    }

    /// Reject option combinations that cannot describe a performable
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidOptions`] if `max_attempts` is zero.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.max_attempts == 0 {
            return Err(ClientError::InvalidOptions(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
