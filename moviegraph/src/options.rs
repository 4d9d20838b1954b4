use std::str::FromStr;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    about = "GraphQL gateway to a movie graph with real-time notifications.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct MainOptions {
    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        default_value = "info,hyper=warn,warp=warn,neo4rs=warn",
        env = "RUST_LOG",
        value_name = "level"
    )]
    pub log: String,

    /// Format of the log output
    ///
    /// Formats: text, compact, json
    #[structopt(long, global = true, env, default_value = "text", value_name = "format")]
    pub log_format: LogFormat,

    /// Enable status reporting server which can be used for readiness checks
    #[structopt(long, global = true, env, value_name = "port")]
    pub status_server: Option<u16>,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Serve the GraphQL API over HTTP and WebSocket
    Gateway(modules::gateway::Options),
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Text,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn parse_gateway_command() {
        let options = MainOptions::from_iter_safe(&[
            "moviegraph",
            "--log-format",
            "json",
            "gateway",
            "--broker",
            "memory",
            "--neo4j-password",
            "secret",
        ])
        .unwrap();

        assert!(matches!(options.log_format, LogFormat::Json));

        let Command::Gateway(gateway) = options.command;
        assert_eq!(gateway.port, 4001);
        assert_eq!(gateway.path, "graphql");
        assert!(!gateway.fire_and_forget);
        assert_eq!(gateway.keep_alive.as_secs(), 15);
    }

    #[test]
    fn reject_unknown_log_formats() {
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
