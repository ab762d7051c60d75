//! Server configuration and command line arguments.

use std::time::Duration;

use clap::Parser;

use crate::domain::quiz::MAX_TIME_LIMIT_SECS;

/// Real-time room server for quiz and buzzer sessions
#[derive(Debug, Clone, Parser)]
#[command(name = "hiroba-server", version, about)]
pub struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Close open quiz questions on the server once their time limit has passed
    #[arg(long)]
    pub enforce_question_deadline: bool,

    /// Extra seconds allowed after a time limit before the question is closed
    #[arg(long, default_value_t = 2)]
    pub deadline_grace_secs: u64,

    /// Time limit for questions created without one
    #[arg(
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(1..=MAX_TIME_LIMIT_SECS as i64)
    )]
    pub default_time_limit_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `Some(grace)` when open questions are closed by the server
    pub question_deadline_grace: Option<Duration>,
    pub default_time_limit_secs: u32,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            question_deadline_grace: None,
            default_time_limit_secs: 30,
        }
    }
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            question_deadline_grace: args
                .enforce_question_deadline
                .then(|| Duration::from_secs(args.deadline_grace_secs)),
            default_time_limit_secs: args.default_time_limit_secs,
        }
    }
}
