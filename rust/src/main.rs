//! The main CLI logic.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::Result;
use std::io::Write;
use termcolor::WriteColor;

/// The real main function returns a `Result<>`.
fn inner_main() -> Result<()> {
    // We need to write to stderr, because our commands write scripts
    // to stdout.
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    tracing::trace!("starting");
    // Gather our arguments.
    let args: Result<Vec<String>> = std::env::args_os()
        .map(|s| -> Result<String> {
            s.into_string()
                .map_err(|s| anyhow::anyhow!("Argument is invalid UTF-8: {}", s.to_string_lossy()))
        })
        .collect();
    let args = args?;
    let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    scriptbuilder::cli::entrypoint(&args)
}

/// Print `error: ` (red on a tty) followed by the full error chain.
fn print_error(e: anyhow::Error) {
    let stderr = termcolor::BufferWriter::stderr(termcolor::ColorChoice::Auto);
    let mut buf = stderr.buffer();
    let mut red = termcolor::ColorSpec::new();
    red.set_fg(Some(termcolor::Color::Red));
    let _ = buf.set_color(&red);
    let _ = write!(buf, "error: ");
    let _ = buf.reset();
    let _ = writeln!(buf, "{e:#}");
    let _ = stderr.print(&buf);
}

fn main() {
    // NOTE!  Don't add new code here.  Only add new code into `inner_main()`.
    match inner_main() {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            print_error(e);
            std::process::exit(1)
        }
    }
}
