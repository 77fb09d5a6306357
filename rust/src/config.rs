//! Configuration for rendering shadow rewrites: where the shadow file lives,
//! how strictly the commit step behaves, and hashing parameters.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::io;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use fn_error_context::context;
use serde::{Deserialize, Serialize};

use crate::crypt::Sha512Crypt;

/// Location of the shadow password database on a booted system.
pub const DEFAULT_SHADOW_PATH: &str = "/etc/shadow";

/// What the commit step does when the staged copy is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitPolicy {
    /// Skip the rename silently; the outer script carries on.
    #[default]
    BestEffort,
    /// Always attempt the rename, so a missing staged copy (failed stage or
    /// no matching login) makes the command exit non-zero.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RewriteConfig {
    #[serde(default = "default_shadow_path")]
    pub shadow_path: Utf8PathBuf,
    #[serde(default)]
    pub commit: CommitPolicy,
    /// SHA-crypt rounds; unset means the scheme default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u32>,
}

fn default_shadow_path() -> Utf8PathBuf {
    DEFAULT_SHADOW_PATH.into()
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            shadow_path: default_shadow_path(),
            commit: CommitPolicy::default(),
            rounds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputFormat {
    Yaml,
    Json,
}

impl InputFormat {
    fn detect(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("json") => InputFormat::Json,
            _ => InputFormat::Yaml,
        }
    }
}

fn parse_stream(fmt: InputFormat, input: impl io::Read) -> Result<RewriteConfig> {
    let config: RewriteConfig = match fmt {
        InputFormat::Yaml => serde_yaml::from_reader(input)?,
        InputFormat::Json => serde_json::from_reader(input)?,
    };
    config.validate()?;
    Ok(config)
}

impl RewriteConfig {
    /// Load a configuration file; `.json` files are parsed as JSON,
    /// anything else as YAML.
    #[context("Loading config {}", path)]
    pub fn from_path(path: &Utf8Path) -> Result<Self> {
        let f = std::fs::File::open(path).map(io::BufReader::new)?;
        parse_stream(InputFormat::detect(path), f)
    }

    /// Check the values are usable for rendering.
    pub fn validate(&self) -> crate::Result<()> {
        let path = self.shadow_path.as_str();
        if !self.shadow_path.is_absolute() {
            return Err(crate::Error::invalid(format!(
                "shadow path must be absolute: {path}"
            )));
        }
        if path.contains(|c: char| c.is_control()) {
            return Err(crate::Error::invalid(format!(
                "shadow path contains control characters: {path:?}"
            )));
        }
        self.hasher()?;
        Ok(())
    }

    /// The default hasher, configured with our rounds.
    pub fn hasher(&self) -> crate::Result<Sha512Crypt> {
        match self.rounds {
            Some(rounds) => Sha512Crypt::with_rounds(rounds),
            None => Ok(Sha512Crypt::new()),
        }
    }
}
