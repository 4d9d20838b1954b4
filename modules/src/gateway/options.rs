use crate::options::{BrokerKind, Neo4jOptions, RedisOptions};
use library::helpers::parse_seconds;
use std::time::Duration;
use structopt::StructOpt;

/// Options for the gateway module
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Hostname used when announcing the endpoints
    #[structopt(long, env, default_value = "localhost")]
    pub host: String,

    /// Port on which the HTTP and WebSocket endpoints listen
    #[structopt(short, long, env, default_value = "4001")]
    pub port: u16,

    /// Path below which the GraphQL endpoint is mounted
    #[structopt(long, env = "GRAPHQL_PATH", default_value = "graphql")]
    pub path: String,

    /// Transport used for notifications, either 'redis' or 'memory'
    #[structopt(long, env, default_value = "redis")]
    pub broker: BrokerKind,

    /// Reply with success even if the notification could not be published
    #[structopt(long)]
    pub fire_and_forget: bool,

    /// Interval in seconds between keep-alive messages on subscription connections
    #[structopt(long, env, parse(try_from_str = parse_seconds), default_value = "15")]
    pub keep_alive: Duration,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub neo4j: Neo4jOptions,
}
