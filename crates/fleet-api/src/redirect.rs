//! Hook invoked when the session cannot be recovered

use tracing::warn;

/// Sends the user back to the login entry point.
///
/// Called after the stored tokens have been wiped because a refresh failed.
/// A dashboard front end navigates to its login page; the CLI prints a hint.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Redirect that only records the forced logout in the logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self) {
        warn!("session ended, login required");
    }
}
