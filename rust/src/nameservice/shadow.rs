//! Helpers for [shadowed password file](https://man7.org/linux/man-pages/man5/shadow.5.html).
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{anyhow, bail, Context, Result};
use camino::Utf8Path;
use fn_error_context::context;
use std::io::{BufRead, BufReader};

/// Number of colon-separated fields in a well-formed shadow record.
pub const SHADOW_FIELDS: usize = 9;

/// Entry from shadow file.
///
/// Only the first two fields are interpreted; the aging fields are kept
/// verbatim so a record can be compared byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowEntry {
    /// user login name
    pub login: String,
    /// encrypted password
    pub password: String,
    /// everything after the password field, unparsed
    pub aging: Vec<String>,
}

impl ShadowEntry {
    /// Parse a single shadow entry.
    pub fn parse_line(s: impl AsRef<str>) -> Option<Self> {
        let mut parts = s.as_ref().split(':');
        let login = parts.next().filter(|l| !l.is_empty())?.to_string();
        let password = parts.next()?.to_string();
        let aging = parts.map(str::to_string).collect();
        Some(Self {
            login,
            password,
            aging,
        })
    }

    pub fn field_count(&self) -> usize {
        2 + self.aging.len()
    }

    /// Serialize back to a shadow line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let mut fields = vec![self.login.as_str(), self.password.as_str()];
        fields.extend(self.aging.iter().map(String::as_str));
        fields.join(":")
    }
}

pub fn parse_shadow_content(content: impl BufRead) -> Result<Vec<ShadowEntry>> {
    let mut entries = vec![];
    for (line_num, line) in content.lines().enumerate() {
        let input =
            line.with_context(|| format!("failed to read shadow entry at line {}", line_num))?;

        // Skip empty and comment lines
        if input.is_empty() || input.starts_with('#') {
            continue;
        }

        let entry = ShadowEntry::parse_line(&input)
            .ok_or_else(|| anyhow!("failed to parse shadow entry at line {}", line_num))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Check that `path` holds exactly one record for `login`, with a
/// well-formed field count and a password field accepted by `check`.
#[context("Verifying shadow entry for {} in {}", login, path)]
pub fn verify_entry(
    path: &Utf8Path,
    login: &str,
    check: impl Fn(&str) -> bool,
) -> Result<ShadowEntry> {
    let f = std::fs::File::open(path).map(BufReader::new)?;
    let mut matches = parse_shadow_content(f)?
        .into_iter()
        .filter(|e| e.login == login)
        .collect::<Vec<_>>();
    let entry = match matches.len() {
        0 => bail!("no record for {login}"),
        1 => matches.remove(0),
        n => bail!("found {n} records for {login}"),
    };
    if entry.field_count() != SHADOW_FIELDS {
        bail!(
            "record has {} fields, expected {SHADOW_FIELDS}",
            entry.field_count()
        );
    }
    if !check(&entry.password) {
        bail!("password field was not updated");
    }
    Ok(entry)
}
