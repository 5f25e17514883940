//! Login decisions made before any network traffic.
//!
//! Pages past the "gatekeeper" page are only served to authenticated
//! requests; without a cookie the server silently repeats the last allowed
//! page instead of erroring. These checks pre-empt that: they either force
//! authentication or fail fast, so a looping response is never mistaken
//! for real content.

use crate::error::ClientError;
use crate::options::{LoginPolicy, RequestOptions};

/// Whether a request for `page` must be authenticated.
#[must_use]
pub fn requires_login(
    page: u64,
    gatekeeper_page: u64,
    policy: LoginPolicy,
    has_cookie: bool,
) -> bool {
    match policy {
        LoginPolicy::Enforce => true,
        LoginPolicy::WhenHasCookie => has_cookie || page > gatekeeper_page,
        LoginPolicy::AlwaysNo | LoginPolicy::WhenRequired => page > gatekeeper_page,
    }
}

/// Decide whether a thread page fetch must be authenticated.
///
/// Thread pages have no hard ceiling: any page is reachable with a
/// cookie.
///
/// # Errors
///
/// Returns [`ClientError::LoginRequired`] if the decision is "must log
/// in" and no cookie is attached.
pub fn check_thread_access(page: u64, options: &RequestOptions) -> Result<bool, ClientError> {
    let with_login = requires_login(
        page,
        options.thread_gatekeeper_page,
        options.login_policy,
        options.has_cookie(),
    );
    if with_login && !options.has_cookie() {
        return Err(ClientError::LoginRequired);
    }
    Ok(with_login)
}

/// Decide whether a board page fetch must be authenticated.
///
/// Unlike threads, board pages past the gatekeeper loop back to stale
/// content server-side even for authenticated requests, so they are
/// refused outright instead of escalating to login.
///
/// # Errors
///
/// Returns [`ClientError::Gated`] past the gatekeeper page regardless of
/// credential, or [`ClientError::LoginRequired`] if login is needed and
/// no cookie is attached.
pub fn check_board_access(page: u64, options: &RequestOptions) -> Result<bool, ClientError> {
    if page > options.board_gatekeeper_page {
        return Err(ClientError::Gated {
            context: "board",
            page,
            gatekeeper_page: options.board_gatekeeper_page,
        });
    }
    let with_login = requires_login(
        page,
        options.board_gatekeeper_page,
        options.login_policy,
        options.has_cookie(),
    );
    if with_login && !options.has_cookie() {
        return Err(ClientError::LoginRequired);
    }
    Ok(with_login)
}
