//! # Command-Line Client
//!
//! Purpose: Issue commands against a server from a shell, either once from
//! the arguments or line by line from stdin.
//!
//! Usage: `respool-cli [URI] [COMMAND ...]`. The first argument is taken as
//! the URI only when it carries a scheme (`redis://...`). Command words are
//! sent as separate arguments, so a quoted word may contain spaces.

use std::env;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use respool_client::Client;
use tracing::{debug, info};

const DEFAULT_URI: &str = "redis://127.0.0.1:6379";

struct CliArgs {
    uri: String,
    command: Vec<String>,
}

impl CliArgs {
    fn from_args() -> Self {
        Self::parse(env::args().skip(1).collect())
    }

    fn parse(mut args: Vec<String>) -> Self {
        let uri = match args.first() {
            Some(first) if first.contains("://") => args.remove(0),
            _ => DEFAULT_URI.to_string(),
        };
        CliArgs { uri, command: args }
    }

    fn command_args(&self) -> Vec<&[u8]> {
        self.command.iter().map(|word| word.as_bytes()).collect()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let args = CliArgs::from_args();
    let client = Client::connect(&args.uri)
        .with_context(|| format!("failed to connect to {}", args.uri))?;

    if !args.command.is_empty() {
        // Shell quoting already split the words; keep them as sent.
        let reply = client.query_args(&args.command_args())?;
        println!("{reply}");
        return Ok(());
    }

    info!(uri = %args.uri, "reading commands from stdin");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        match client.issue(command) {
            Ok(reply) => writeln!(out, "{reply}")?,
            Err(err) => writeln!(out, "(error) {err}")?,
        }
        out.flush()?;
    }

    let stats = client.stats();
    debug!(
        acquires = stats.acquires,
        waited = stats.waited_acquires,
        grown = stats.grown,
        discarded = stats.discarded,
        "session finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| word.to_string()).collect()
    }

    #[test]
    fn uri_defaults_when_absent() {
        let parsed = CliArgs::parse(args(&["set", "hello", "world"]));
        assert_eq!(parsed.uri, DEFAULT_URI);
        assert_eq!(parsed.command, args(&["set", "hello", "world"]));
    }

    #[test]
    fn leading_uri_is_split_from_command() {
        let parsed = CliArgs::parse(args(&["redis://:pw@cache:6380/2", "ping"]));
        assert_eq!(parsed.uri, "redis://:pw@cache:6380/2");
        assert_eq!(parsed.command, args(&["ping"]));
    }

    #[test]
    fn quoted_words_stay_single_arguments() {
        let parsed = CliArgs::parse(args(&["set", "greeting", "hello world"]));
        assert_eq!(
            parsed.command_args(),
            vec![&b"set"[..], &b"greeting"[..], &b"hello world"[..]]
        );
    }

    #[test]
    fn no_arguments_means_interactive() {
        let parsed = CliArgs::parse(Vec::new());
        assert_eq!(parsed.uri, DEFAULT_URI);
        assert!(parsed.command.is_empty());
    }
}
