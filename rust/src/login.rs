//! Replacing a user's password hash in the shadow database.
//!
//! Nothing here touches the filesystem; we only generate shell text which
//! later runs on the target.  The generated text works in two steps:
//!
//! - *stage*: `awk` writes a copy of the shadow file, with the password field
//!   of the matching record replaced, to `<shadow>.<login>`.  If no record
//!   matches, the copy is removed again;
//! - *commit*: that copy is renamed over the original, so readers see either
//!   the old or the new file and never a truncated one.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use camino::Utf8PathBuf;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{CommitPolicy, RewriteConfig};
use crate::crypt::{self, PasswordHasher};
use crate::error::{Error, Result};
use crate::osfamily::OsFamily;
use crate::statements::{Exec, Statement, StatementList};

/// Replaces the password hash for `login` in the shadow file.
///
/// Identity is the login alone: two requests for the same login compare
/// (and hash) equal whatever their passwords, so a script built from a set
/// of these changes each account at most once.  Use
/// [`ReplaceShadowPasswordEntry::same_credentials`] to compare passwords too.
pub struct ReplaceShadowPasswordEntry {
    login: String,
    password: SecretString,
}

fn shell_quote(s: &str) -> Result<Cow<'_, str>> {
    shlex::try_quote(s).map_err(|e| Error::invalid(format!("cannot quote {s:?}: {e}")))
}

fn validate_login(login: &str) -> Result<()> {
    if login.is_empty() {
        return Err(Error::invalid("login must not be empty"));
    }
    // Colons would split the record and slashes would escape the temporary
    // path.
    if let Some(c) = login
        .chars()
        .find(|&c| matches!(c, ':' | '/') || c.is_whitespace() || c.is_control())
    {
        return Err(Error::invalid(format!(
            "login {login:?} contains invalid character {c:?}"
        )));
    }
    Ok(())
}

impl ReplaceShadowPasswordEntry {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let login = login.into();
        validate_login(&login)?;
        Ok(Self {
            login,
            password: SecretString::new(password.into()),
        })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Full comparison, including the password.
    pub fn same_credentials(&self, other: &Self) -> bool {
        self.login == other.login
            && self.password.expose_secret() == other.password.expose_secret()
    }

    /// Path of the staged copy for this login.
    pub fn staging_path(&self, config: &RewriteConfig) -> Utf8PathBuf {
        format!("{}.{}", config.shadow_path, self.login).into()
    }

    /// Build the stage and commit commands, in that order.
    ///
    /// Fails before hashing anything if `family` is not supported.
    pub fn operations(
        &self,
        family: OsFamily,
        config: &RewriteConfig,
        hasher: &dyn PasswordHasher,
    ) -> Result<StatementList> {
        match family {
            OsFamily::Unix => {}
            OsFamily::Windows => return Err(Error::UnsupportedPlatform(family)),
        }
        config.validate()?;
        tracing::debug!(login = %self.login, shadow = %config.shadow_path, "building shadow rewrite");

        let hash = hasher.derive(self.password.expose_secret(), None)?;
        // Custom hashers get the same guarantee as ours.
        crypt::check_shadow_safe(&hash)?;

        let shadow = shell_quote(config.shadow_path.as_str())?;
        let staging = self.staging_path(config);
        let staging = shell_quote(staging.as_str())?;
        let user = shell_quote(&self.login)?;
        let password = shell_quote(&hash)?;

        // Values go through the environment: awk's -v would expand backslash
        // escapes in them.  Concatenating "" forces a string comparison; awk
        // would otherwise compare numeric-looking logins as numbers.  The copy
        // gives the staged file the original's owner and mode, which the
        // redirection (truncating, not recreating) then keeps.  A failed
        // rewrite, or one that matched no record, removes the copy so there is
        // nothing to commit.
        let stage = format!(
            "cp -p {shadow} {staging} && \
             SHADOW_LOGIN={user} SHADOW_HASH={password} \
             awk 'BEGIN {{ FS = OFS = \":\" }} END {{ exit !found }} \
             ($1 \"\") == ENVIRON[\"SHADOW_LOGIN\"] {{ $2 = ENVIRON[\"SHADOW_HASH\"]; found = 1 }} 1' \
             {shadow} >{staging} || rm -f {staging}"
        );
        let commit = match config.commit {
            CommitPolicy::BestEffort => format!("test -f {staging} && mv {staging} {shadow}"),
            CommitPolicy::Strict => format!("mv -f {staging} {shadow}"),
        };

        let mut ops = StatementList::new();
        ops.push(Exec::new(stage)).push(Exec::new(commit));
        Ok(ops)
    }

    /// Render with an explicit configuration and hasher.
    pub fn render_with(
        &self,
        family: OsFamily,
        config: &RewriteConfig,
        hasher: &dyn PasswordHasher,
    ) -> Result<String> {
        self.operations(family, config, hasher)?.render(family)
    }
}

impl Statement for ReplaceShadowPasswordEntry {
    fn function_dependencies(&self, _family: OsFamily) -> Vec<String> {
        Vec::new()
    }

    fn render(&self, family: OsFamily) -> Result<String> {
        let config = RewriteConfig::default();
        let hasher = config.hasher()?;
        self.render_with(family, &config, &hasher)
    }
}

impl Clone for ReplaceShadowPasswordEntry {
    fn clone(&self) -> Self {
        Self {
            login: self.login.clone(),
            password: SecretString::new(self.password.expose_secret().clone()),
        }
    }
}

impl std::fmt::Debug for ReplaceShadowPasswordEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaceShadowPasswordEntry")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for ReplaceShadowPasswordEntry {
    fn eq(&self, other: &Self) -> bool {
        self.login == other.login
    }
}

impl Eq for ReplaceShadowPasswordEntry {}

impl Hash for ReplaceShadowPasswordEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.login.hash(state);
    }
}

/// Render the commands replacing `login`'s password for `family`, using the
/// default shadow path and hashing scheme.
pub fn build(login: &str, password: &str, family: OsFamily) -> Result<String> {
    ReplaceShadowPasswordEntry::new(login, password)?.render(family)
}
