//! Configuration and CLI argument handling

use std::path::PathBuf;
use clap::{Parser, Subcommand};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "stream-timer")]
#[command(about = "A stream-schedule timer with signed, shareable countdown display links")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// File holding the saved section list
    #[arg(long, default_value = "stream-sections.json")]
    pub sections_file: PathBuf,

    /// Base URL put in front of share links (defaults to http://localhost:<port>)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Secret used to sign and verify share tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the editor HTTP server (default)
    Serve,
    /// Play a shared schedule in the terminal
    Display {
        /// Token from a share link
        #[arg(long)]
        token: String,
    },
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for share links
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    /// Signing secret, if one is configured
    pub fn secret(&self) -> Option<String> {
        self.jwt_secret.clone().filter(|s| !s.is_empty())
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("stream-timer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&["--jwt-secret", ""]);
        assert_eq!(config.address(), "0.0.0.0:20554");
        assert_eq!(config.public_url(), "http://localhost:20554");
        assert_eq!(config.sections_file, PathBuf::from("stream-sections.json"));
        assert_eq!(config.secret(), None);
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.command, None);
    }

    #[test]
    fn display_subcommand_takes_token() {
        let config = parse(&["-v", "--jwt-secret", "k", "display", "--token", "a.b.c"]);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.secret().as_deref(), Some("k"));
        assert_eq!(
            config.command,
            Some(Command::Display { token: "a.b.c".to_string() })
        );
    }

    #[test]
    fn public_url_override() {
        let config = parse(&["--public-url", "https://timer.example", "serve"]);
        assert_eq!(config.public_url(), "https://timer.example");
        assert_eq!(config.command, Some(Command::Serve));
    }
}
