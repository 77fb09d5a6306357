//! Error type for building credential-rewrite statements.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::osfamily::OsFamily;

/// Failures raised while building a script.  All of these are fatal: no
/// partial script text is returned alongside them.
///
/// Problems that can only be observed on the target machine (no matching
/// login, permission denied, ...) are not represented here; see
/// [`crate::config::CommitPolicy`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0} is not supported")]
    UnsupportedPlatform(OsFamily),
    #[error("failed to hash password: {0}")]
    HashingFailure(String),
    #[error("rendering statement")]
    Render(#[from] std::fmt::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::invalid("login must not be empty").to_string(),
            "invalid argument: login must not be empty"
        );
        assert_eq!(
            Error::UnsupportedPlatform(OsFamily::Windows).to_string(),
            "windows is not supported"
        );
    }
}
