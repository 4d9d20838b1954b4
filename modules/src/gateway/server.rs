use super::schema::{schema, AcknowledgementPolicy, GqlContext, Schema};
use crate::options::BrokerKind;
use async_trait::async_trait;
use domain::catalog::Catalog;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use harness::{DummyResourceHandleProvider, MonitoredRedisFactory};
use jatsl::{Job, JobManager};
use juniper::http::playground::playground_source;
use juniper_graphql_ws::ConnectionConfig;
use juniper_warp::subscriptions::serve_graphql_ws;
use library::communication::implementation::memory::MemoryBroker;
use library::communication::implementation::redis::RedisBroker;
use library::communication::pubsub::SharedBroker;
use library::EmptyResult;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use warp::ws::{WebSocket, Ws};
use warp::{Filter, Rejection, Reply};

/// Future resolving once open subscription connections should be closed
pub type ShutdownSignal = Shared<BoxFuture<'static, ()>>;

/// Settings of the HTTP and WebSocket endpoints
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hostname used in the startup announcements
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Single path segment the GraphQL endpoint is mounted at
    pub path: String,
    /// Interval between keep-alive messages on subscription connections
    pub keep_alive: Duration,
    /// Reaction of `notify` to publish failures
    pub acknowledgement: AcknowledgementPolicy,
}

/// Job serving the GraphQL endpoints
pub struct ServerJob {
    config: ServerConfig,
    broker: BrokerKind,
    redis_url: String,
    catalog: Arc<dyn Catalog>,
}

impl ServerJob {
    /// Creates a new instance from raw parts
    pub fn new(
        config: ServerConfig,
        broker: BrokerKind,
        redis_url: String,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            config,
            broker,
            redis_url,
            catalog,
        }
    }

    /// Broker connection failures surface as publish or subscription errors and never
    /// terminate the job
    fn build_broker(&self) -> SharedBroker {
        match self.broker {
            BrokerKind::Redis => {
                let factory = MonitoredRedisFactory::new(
                    self.redis_url.clone(),
                    DummyResourceHandleProvider::new(),
                );
                Arc::new(RedisBroker::new(factory))
            }
            BrokerKind::Memory => Arc::new(MemoryBroker::new()),
        }
    }
}

#[async_trait]
impl Job for ServerJob {
    const NAME: &'static str = module_path!();
    const SUPPORTS_GRACEFUL_TERMINATION: bool = true;

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        let broker = self.build_broker();
        let context = GqlContext::new(broker, self.catalog.clone(), self.config.acknowledgement);
        let shutdown = manager.termination_signal().boxed().shared();
        let routes = routes(&self.config, context, shutdown);

        let source_addr: SocketAddr = ([0, 0, 0, 0], self.config.port).into();
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(source_addr, manager.termination_signal())?;

        let ServerConfig { host, path, .. } = &self.config;
        info!(
            ?addr,
            "GraphQL server ready at http://{}:{}/{}",
            host,
            addr.port(),
            path
        );
        info!("Subscriptions ready at ws://{}:{}/{}", host, addr.port(), path);

        manager.ready().await;
        server.await;

        Ok(())
    }
}

/// Assembles all HTTP and WebSocket routes
pub fn routes(
    config: &ServerConfig,
    context: GqlContext,
    shutdown: ShutdownSignal,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    // Subscriptions
    let root_node = Arc::new(schema());
    let keep_alive = config.keep_alive;
    let ws_context = context.clone();
    let subscription_route = warp::ws()
        .map(move |ws: Ws| {
            let root_node = root_node.clone();
            let context = ws_context.for_connection();
            let shutdown = shutdown.clone();

            let reply = ws.on_upgrade(move |websocket| {
                serve_connection(websocket, root_node, context, keep_alive, shutdown)
            });

            warp::reply::with_header(reply, "Sec-WebSocket-Protocol", "graphql-ws")
        })
        .with(warp::trace::named("subscriptions"));

    // Queries and mutations
    let state = warp::any().map(move || context.clone());
    let graphql_filter = juniper_warp::make_graphql_filter(schema(), state.boxed());
    let graphql_route = warp::post()
        .and(graphql_filter)
        .with(warp::trace::named("gql"));

    let endpoint = format!("/{}", config.path);
    let playground_route = warp::get()
        .map(move || warp::reply::html(playground_source(&endpoint, Some(&endpoint))))
        .with(warp::trace::named("playground"));

    let api_routes = warp::path(config.path.clone()).and(warp::path::end()).and(
        subscription_route
            .or(playground_route)
            .or(graphql_route),
    );

    let ping_route = warp::path("ping")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "pong!")
        .with(warp::trace::named("ping"));

    api_routes
        .or(ping_route)
        .with(cors)
        .with(warp::trace::request())
}

async fn serve_connection(
    websocket: WebSocket,
    root_node: Arc<Schema>,
    context: GqlContext,
    keep_alive: Duration,
    shutdown: ShutdownSignal,
) {
    let span = info_span!("connection", id = %context.connection_id);
    let config = ConnectionConfig::new(context).with_keep_alive_interval(keep_alive);

    async move {
        debug!("Subscription connection opened");

        tokio::select! {
            result = serve_graphql_ws(websocket, root_node, config) => {
                if let Err(error) = result {
                    warn!(?error, "Subscription connection failed");
                }
            }
            _ = shutdown => debug!("Closing subscription connection due to shutdown"),
        }

        debug!("Subscription connection closed");
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod does {
    use super::*;
    use domain::catalog::{Actor, Movie, StaticCatalog};
    use domain::notification::{NotificationEvent, NEW_MOVIE_MESSAGE};
    use futures::future;
    use library::communication::implementation::mock::MockBroker;
    use library::communication::pubsub::{RawPublisher, TopicDescriptor};
    use serde_json::{json, Value};
    use tokio::time::{sleep, timeout};
    use warp::test::WsClient;

    const SUBSCRIBE: &str = r#"{"id":"1","type":"start","payload":{"query":"subscription { notification { message } }"}}"#;

    fn config(acknowledgement: AcknowledgementPolicy) -> ServerConfig {
        ServerConfig {
            host: "localhost".into(),
            port: 4001,
            path: "graphql".into(),
            keep_alive: Duration::from_secs(15),
            acknowledgement,
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_movie(Movie {
                id: "m1".into(),
                title: "The Matrix".into(),
                released: Some(1999),
            })
            .with_movie(Movie {
                id: "m2".into(),
                title: "Speed".into(),
                released: None,
            })
            .with_actor(Actor {
                id: "a1".into(),
                name: "Keanu Reeves".into(),
            })
            .with_actor(Actor {
                id: "a2".into(),
                name: "Carrie-Anne Moss".into(),
            })
            .with_cast("m1", "a1")
            .with_cast("m1", "a2")
            .with_cast("m2", "a1")
    }

    fn context_with(broker: SharedBroker, acknowledgement: AcknowledgementPolicy) -> GqlContext {
        GqlContext::new(broker, Arc::new(catalog()), acknowledgement)
    }

    fn context() -> GqlContext {
        context_with(Arc::new(MemoryBroker::new()), AcknowledgementPolicy::Propagate)
    }

    fn no_shutdown() -> ShutdownSignal {
        future::pending().boxed().shared()
    }

    async fn graphql(context: &GqlContext, query: &str) -> Value {
        let filter = routes(
            &config(context.acknowledgement),
            context.clone(),
            no_shutdown(),
        );

        let response = warp::test::request()
            .method("POST")
            .path("/graphql")
            .header("content-type", "application/json")
            .json(&json!({ "query": query }))
            .reply(&filter)
            .await;

        serde_json::from_slice(response.body()).unwrap()
    }

    async fn subscriber_count(context: &GqlContext) -> usize {
        context.channel.subscriber_count().await.unwrap()
    }

    async fn wait_for_subscribers(context: &GqlContext, expected: usize) {
        timeout(Duration::from_secs(5), async {
            while subscriber_count(context).await != expected {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("subscriber count never reached {}", expected));
    }

    async fn connect(context: &GqlContext, shutdown: ShutdownSignal) -> WsClient {
        let filter = routes(&config(context.acknowledgement), context.clone(), shutdown);
        let mut client = warp::test::ws()
            .path("/graphql")
            .header("sec-websocket-protocol", "graphql-ws")
            .handshake(filter)
            .await
            .unwrap();

        client
            .send_text(r#"{"type":"connection_init","payload":{}}"#)
            .await;
        assert_eq!(next_message(&mut client).await["type"], "connection_ack");

        client
    }

    async fn subscribe(context: &GqlContext) -> WsClient {
        let mut client = connect(context, no_shutdown()).await;
        client.send_text(SUBSCRIBE).await;
        client
    }

    /// Next protocol message, skipping keep-alives
    async fn next_message(client: &mut WsClient) -> Value {
        loop {
            let message = timeout(Duration::from_secs(5), client.recv())
                .await
                .expect("no message received in time")
                .unwrap();

            let value: Value = serde_json::from_str(message.to_str().unwrap()).unwrap();
            if value["type"] != "ka" {
                return value;
            }
        }
    }

    #[tokio::test]
    async fn answer_ping() {
        let filter = routes(&config(AcknowledgementPolicy::Propagate), context(), no_shutdown());
        let response = warp::test::request().path("/ping").reply(&filter).await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "pong!");
    }

    #[tokio::test]
    async fn serve_playground() {
        let filter = routes(&config(AcknowledgementPolicy::Propagate), context(), no_shutdown());
        let response = warp::test::request().path("/graphql").reply(&filter).await;

        assert_eq!(response.status(), 200);
        assert!(String::from_utf8_lossy(response.body()).contains("GraphQL Playground"));
    }

    #[tokio::test]
    async fn acknowledge_notify() {
        let context = context();

        let response = graphql(&context, "mutation { notify }").await;
        assert_eq!(response, json!({ "data": { "notify": "Notification sent!" } }));
    }

    #[tokio::test]
    async fn publish_once_per_notify() {
        let broker = MockBroker::default();
        for _ in 0..2 {
            broker.expect(&NotificationEvent {
                message: NEW_MOVIE_MESSAGE.into(),
            });
        }
        let context = context_with(Arc::new(broker), AcknowledgementPolicy::Propagate);

        for _ in 0..2 {
            let response = graphql(&context, "mutation { notify }").await;
            assert_eq!(response["data"]["notify"], "Notification sent!");
        }
    }

    #[tokio::test]
    async fn report_failed_publishes() {
        let broker = MockBroker::ignoring_publishes();
        broker.fail_next_publishes(1);
        let context = context_with(Arc::new(broker), AcknowledgementPolicy::Propagate);

        let response = graphql(&context, "mutation { notify }").await;
        assert_eq!(response["data"], Value::Null);
        assert!(response["errors"].as_array().map_or(false, |e| !e.is_empty()));

        let response = graphql(&context, "mutation { notify }").await;
        assert_eq!(response["data"]["notify"], "Notification sent!");
    }

    #[tokio::test]
    async fn keep_serving_while_redis_is_unreachable() {
        let job = ServerJob::new(
            config(AcknowledgementPolicy::Propagate),
            BrokerKind::Redis,
            "redis://127.0.0.1:1/".into(),
            Arc::new(catalog()),
        );
        let context = context_with(job.build_broker(), AcknowledgementPolicy::Propagate);

        for _ in 0..2 {
            let response = graphql(&context, "mutation { notify }").await;
            assert_eq!(response["data"], Value::Null);
            assert!(response["errors"].as_array().map_or(false, |e| !e.is_empty()));
        }

        let filter = routes(&config(AcknowledgementPolicy::Propagate), context, no_shutdown());
        let response = warp::test::request().path("/ping").reply(&filter).await;
        assert_eq!(response.body(), "pong!");
    }

    #[tokio::test]
    async fn swallow_failed_publishes_when_firing_and_forgetting() {
        let broker = MockBroker::ignoring_publishes();
        broker.fail_next_publishes(1);
        let context = context_with(Arc::new(broker), AcknowledgementPolicy::FireAndForget);

        let response = graphql(&context, "mutation { notify }").await;
        assert_eq!(response, json!({ "data": { "notify": "Notification sent!" } }));
    }

    #[tokio::test]
    async fn query_the_catalog() {
        let context = context();

        let response = graphql(
            &context,
            r#"{ movies(titleContains: "matrix") { id title released actors { name movies { title } } } }"#,
        )
        .await;

        assert_eq!(
            response,
            json!({ "data": { "movies": [{
                "id": "m1",
                "title": "The Matrix",
                "released": 1999,
                "actors": [
                    { "name": "Carrie-Anne Moss", "movies": [{ "title": "The Matrix" }] },
                    { "name": "Keanu Reeves", "movies": [{ "title": "Speed" }, { "title": "The Matrix" }] },
                ],
            }] } })
        );
    }

    #[tokio::test]
    async fn look_up_single_records() {
        let context = context();

        let response = graphql(
            &context,
            r#"{ movie(id: "m2") { title released } actor(id: "a2") { name } missing: movie(id: "m9") { title } }"#,
        )
        .await;

        assert_eq!(
            response,
            json!({ "data": {
                "movie": { "title": "Speed", "released": null },
                "actor": { "name": "Carrie-Anne Moss" },
                "missing": null,
            } })
        );
    }

    #[tokio::test]
    async fn limit_listings() {
        let context = context();

        let response = graphql(&context, "{ actors(limit: 1) { name } }").await;
        assert_eq!(
            response,
            json!({ "data": { "actors": [{ "name": "Carrie-Anne Moss" }] } })
        );
    }

    #[tokio::test]
    async fn fan_out_notifications_to_every_connection() {
        let context = context();

        let mut first = subscribe(&context).await;
        let mut second = subscribe(&context).await;
        wait_for_subscribers(&context, 2).await;

        let response = graphql(&context, "{ notificationSubscribers }").await;
        assert_eq!(response["data"]["notificationSubscribers"], 2);

        let response = graphql(&context, "mutation { notify }").await;
        assert_eq!(response["data"]["notify"], "Notification sent!");

        for client in [&mut first, &mut second] {
            let message = next_message(client).await;
            assert_eq!(message["type"], "data");
            assert_eq!(message["id"], "1");
            assert_eq!(
                message["payload"]["data"],
                json!({ "notification": { "message": "New movie launched!" } })
            );
        }

        drop(first);
        wait_for_subscribers(&context, 1).await;

        drop(second);
        wait_for_subscribers(&context, 0).await;
    }

    #[tokio::test]
    async fn not_replay_earlier_notifications() {
        let context = context();
        graphql(&context, "mutation { notify }").await;

        let mut client = subscribe(&context).await;
        wait_for_subscribers(&context, 1).await;

        context.channel.emit("later").await.unwrap();

        let message = next_message(&mut client).await;
        assert_eq!(message["payload"]["data"]["notification"]["message"], "later");
    }

    #[tokio::test]
    async fn release_registration_on_stop() {
        let context = context();

        let mut client = subscribe(&context).await;
        wait_for_subscribers(&context, 1).await;

        client.send_text(r#"{"id":"1","type":"stop"}"#).await;
        wait_for_subscribers(&context, 0).await;
    }

    #[tokio::test]
    async fn complete_subscriptions_after_an_error() {
        let broker = Arc::new(MemoryBroker::new());
        let context = context_with(broker.clone(), AcknowledgementPolicy::Propagate);

        let mut broken = subscribe(&context).await;
        wait_for_subscribers(&context, 1).await;

        broker
            .publish_raw(&TopicDescriptor::from_static("NOTIFICATION"), b"garbage")
            .await
            .unwrap();

        let failure = next_message(&mut broken).await;
        assert_eq!(failure["id"], "1");
        assert_ne!(failure["payload"]["errors"], Value::Null);

        let completion = next_message(&mut broken).await;
        assert_eq!(completion, json!({ "type": "complete", "id": "1" }));
        wait_for_subscribers(&context, 0).await;

        let mut healthy = subscribe(&context).await;
        wait_for_subscribers(&context, 1).await;
        graphql(&context, "mutation { notify }").await;

        let message = next_message(&mut healthy).await;
        assert_eq!(
            message["payload"]["data"]["notification"]["message"],
            "New movie launched!"
        );
    }

    #[tokio::test]
    async fn keep_other_connections_alive_when_one_drops() {
        let context = context();

        let mut healthy = subscribe(&context).await;
        let mut dropped = subscribe(&context).await;
        wait_for_subscribers(&context, 2).await;

        context.channel.emit("first").await.unwrap();
        for client in [&mut healthy, &mut dropped] {
            let message = next_message(client).await;
            assert_eq!(message["payload"]["data"]["notification"]["message"], "first");
        }

        drop(dropped);
        wait_for_subscribers(&context, 1).await;

        let response = graphql(&context, "mutation { notify }").await;
        assert_eq!(response["data"]["notify"], "Notification sent!");

        let message = next_message(&mut healthy).await;
        assert_eq!(
            message["payload"]["data"]["notification"]["message"],
            "New movie launched!"
        );
    }

    #[tokio::test]
    async fn close_connections_on_shutdown() {
        let context = context();
        let (trigger, signal) = futures::channel::oneshot::channel::<()>();
        let shutdown = signal.map(|_| ()).boxed().shared();

        let mut client = connect(&context, shutdown).await;
        client.send_text(SUBSCRIBE).await;
        wait_for_subscribers(&context, 1).await;

        trigger.send(()).unwrap();
        wait_for_subscribers(&context, 0).await;
    }
}
