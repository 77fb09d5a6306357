//! The `scriptbuilder` command line.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::io::{BufRead, Write};

use anyhow::{anyhow, Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;

use crate::cmdutils;
use crate::config::{CommitPolicy, RewriteConfig};
use crate::crypt::{self, PasswordHasher};
use crate::login::ReplaceShadowPasswordEntry;
use crate::nameservice::shadow;
use crate::osfamily::OsFamily;

#[derive(Debug, Parser)]
#[clap(name = "scriptbuilder", version)]
#[clap(rename_all = "kebab-case")]
/// Generate statements for machine bootstrap scripts
struct Opt {
    #[clap(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, clap::Subcommand)]
#[clap(rename_all = "kebab-case")]
enum Cmd {
    /// Print commands replacing a user's password in the shadow file
    ShadowEntry(ShadowEntryOpts),
    /// Print a crypt(3) hash suitable for the shadow file
    ShadowHash(ShadowHashOpts),
}

#[derive(Debug, clap::Args)]
struct PasswordOpts {
    /// Password in clear text; prefer --password-stdin, as this is visible in
    /// the process list
    #[clap(long, required_unless_present = "password_stdin")]
    password: Option<String>,

    /// Read the password from the first line of standard input
    #[clap(long, conflicts_with = "password")]
    password_stdin: bool,
}

impl PasswordOpts {
    fn resolve(&self, mut stdin: impl BufRead) -> Result<String> {
        if let Some(password) = self.password.as_ref() {
            return Ok(password.clone());
        }
        let mut line = String::new();
        let n = stdin
            .read_line(&mut line)
            .context("Reading password from stdin")?;
        if n == 0 {
            return Err(anyhow!("No password provided on stdin"));
        }
        // An empty line is an empty password.
        let password = line.strip_suffix('\n').unwrap_or(&line);
        let password = password.strip_suffix('\r').unwrap_or(password);
        Ok(password.to_string())
    }
}

#[derive(Debug, clap::Args)]
struct ShadowEntryOpts {
    /// Account whose password is replaced
    #[clap(long)]
    login: String,

    #[clap(flatten)]
    password: PasswordOpts,

    /// Target operating system family
    #[clap(long, value_enum, default_value_t = OsFamily::Unix)]
    os_family: OsFamily,

    /// YAML or JSON configuration file
    #[clap(long)]
    config: Option<Utf8PathBuf>,

    /// Shadow file to rewrite, overriding the configuration
    #[clap(long)]
    shadow_path: Option<Utf8PathBuf>,

    /// Fail the commit step if the staged copy is missing
    #[clap(long)]
    strict: bool,

    /// Run the commands locally instead of printing them, then verify the
    /// result
    #[clap(long)]
    apply: bool,
}

impl ShadowEntryOpts {
    fn config(&self) -> Result<RewriteConfig> {
        let mut config = match self.config.as_deref() {
            Some(path) => RewriteConfig::from_path(path)?,
            None => RewriteConfig::default(),
        };
        if let Some(path) = self.shadow_path.as_ref() {
            config.shadow_path = path.clone();
        }
        if self.strict {
            config.commit = CommitPolicy::Strict;
        }
        config.validate()?;
        Ok(config)
    }

    fn run(self, stdin: impl BufRead, mut stdout: impl Write) -> Result<()> {
        let config = self.config()?;
        let password = self.password.resolve(stdin)?;
        let entry = ReplaceShadowPasswordEntry::new(self.login.as_str(), password.as_str())?;
        let hasher = config.hasher()?;
        let script = entry.render_with(self.os_family, &config, &hasher)?;
        if !self.apply {
            stdout.write_all(script.as_bytes())?;
            return Ok(());
        }

        tracing::debug!(login = %self.login, shadow = %config.shadow_path, "applying");
        cmdutils::run_script(&script)?;
        shadow::verify_entry(&config.shadow_path, &self.login, |h| {
            crypt::verify(&password, h)
        })?;
        writeln!(stdout, "Updated password for {}", self.login)?;
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
struct ShadowHashOpts {
    #[clap(flatten)]
    password: PasswordOpts,

    /// Fixed salt, for reproducible output
    #[clap(long)]
    salt: Option<String>,

    /// Number of SHA-crypt rounds
    #[clap(long)]
    rounds: Option<u32>,
}

impl ShadowHashOpts {
    fn run(self, stdin: impl BufRead, mut stdout: impl Write) -> Result<()> {
        let password = self.password.resolve(stdin)?;
        let hasher = match self.rounds {
            Some(rounds) => crypt::Sha512Crypt::with_rounds(rounds)?,
            None => crypt::Sha512Crypt::new(),
        };
        let hash = hasher.derive(&password, self.salt.as_deref())?;
        writeln!(stdout, "{hash}")?;
        Ok(())
    }
}

impl Cmd {
    fn run(self, stdin: impl BufRead, stdout: impl Write) -> Result<()> {
        match self {
            Cmd::ShadowEntry(opts) => opts.run(stdin, stdout),
            Cmd::ShadowHash(opts) => opts.run(stdin, stdout),
        }
    }
}

/// Main entrypoint; `args` includes argv0.
pub fn entrypoint(args: &[&str]) -> Result<()> {
    let opt = Opt::parse_from(args.iter());
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    opt.cmd.run(stdin.lock(), stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str], stdin: &str) -> Result<String> {
        let opt = Opt::try_parse_from(args.iter())?;
        let mut out = Vec::new();
        opt.cmd.run(stdin.as_bytes(), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_parse() {
        let opt = Opt::try_parse_from([
            "scriptbuilder",
            "shadow-entry",
            "--login",
            "alice",
            "--password-stdin",
            "--os-family",
            "windows",
            "--strict",
        ])
        .unwrap();
        match opt.cmd {
            Cmd::ShadowEntry(o) => {
                assert_eq!(o.login, "alice");
                assert!(o.password.password_stdin);
                assert_eq!(o.os_family, OsFamily::Windows);
                assert!(o.strict);
                assert!(!o.apply);
            }
            o => panic!("unexpected {o:?}"),
        }
        // A password source is required, and only one.
        assert!(Opt::try_parse_from(["scriptbuilder", "shadow-entry", "--login", "a"]).is_err());
        assert!(Opt::try_parse_from([
            "scriptbuilder",
            "shadow-hash",
            "--password",
            "x",
            "--password-stdin"
        ])
        .is_err());
    }

    #[test]
    fn test_shadow_entry() -> Result<()> {
        let out = run(
            &[
                "scriptbuilder",
                "shadow-entry",
                "--login",
                "alice",
                "--password-stdin",
                "--shadow-path",
                "/sysroot/etc/shadow",
                "--strict",
            ],
            "hunter2\n",
        )?;
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("cp -p /sysroot/etc/shadow /sysroot/etc/shadow.alice"));
        assert_eq!(lines[1], "mv -f /sysroot/etc/shadow.alice /sysroot/etc/shadow");
        assert!(!out.contains("hunter2"));
        Ok(())
    }

    #[test]
    fn test_shadow_entry_windows() {
        let e = run(
            &[
                "scriptbuilder",
                "shadow-entry",
                "--login",
                "alice",
                "--password",
                "x",
                "--os-family",
                "windows",
            ],
            "",
        )
        .unwrap_err();
        assert!(matches!(
            e.downcast_ref::<crate::Error>(),
            Some(crate::Error::UnsupportedPlatform(OsFamily::Windows))
        ));
    }

    #[test]
    fn test_shadow_hash() -> Result<()> {
        let out = run(
            &[
                "scriptbuilder",
                "shadow-hash",
                "--password-stdin",
                "--salt",
                "saltstring",
            ],
            "Hello world!\r\n",
        )?;
        assert_eq!(
            out,
            "$6$saltstring$svn8UoSVapNtMuq1ukKS4tPQd8iKwSMHWjl/O817G3uBnIFNjnQJuesI68u4OTLiBFdcbYEdFCoEOfaS35inz1\n"
        );
        assert!(run(&["scriptbuilder", "shadow-hash", "--password-stdin"], "").is_err());
        let out = run(&["scriptbuilder", "shadow-hash", "--password-stdin"], "\n")?;
        assert!(crypt::verify("", out.trim_end()));
        Ok(())
    }
}
