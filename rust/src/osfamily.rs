//! The closed set of platforms we render shell text for.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target operating system family.
///
/// Every `match` on this type in the crate is exhaustive; adding a variant
/// means each statement has to decide explicitly how (or whether) it renders
/// for it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    /// POSIX shells (`/bin/sh` and compatibles).
    Unix,
    /// `cmd.exe` style batch scripts.
    Windows,
}

impl OsFamily {
    pub const ALL: &'static [OsFamily] = &[OsFamily::Unix, OsFamily::Windows];

    pub fn as_str(self) -> &'static str {
        match self {
            OsFamily::Unix => "unix",
            OsFamily::Windows => "windows",
        }
    }

    /// Terminator appended to each rendered command line.
    pub fn line_terminator(self) -> &'static str {
        match self {
            OsFamily::Unix => "\n",
            OsFamily::Windows => "\r\n",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsFamily {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OsFamily::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::Error::invalid(format!("unknown OS family: {s:?}")))
    }
}
