use super::handle::HandleRegistration;
use futures::FutureExt;
use library::communication::implementation::redis::is_disconnect;
use redis::aio::ConnectionLike;
use redis::{Cmd, Pipeline, RedisError, RedisFuture, Value};
use tokio::task::yield_now;
use tracing::{debug, error, trace};

/// Redis connection that monitors for connection errors
///
/// Whenever a command fails because the server is gone, the owning job is notified through its resource handle.
/// For shared connections the shared instance is invalidated and every sibling handle is notified as well.
pub struct RedisResource<C: ConnectionLike> {
    con: C,
    handle: HandleRegistration,
}

impl<C: ConnectionLike> RedisResource<C> {
    pub(super) fn new(con: C, handle: HandleRegistration) -> Self {
        Self { con, handle }
    }

    async fn notify(&mut self, error: &RedisError) {
        error!(?error, "Redis connection encountered error");

        self.handle.resource_died().await;

        if let Some(shared) = self.handle.shared_connection() {
            trace!("Invalidating shared connection");
            *shared.connection.lock().await = None;

            let siblings: Vec<_> = shared.handles().iter().cloned().collect();
            debug!(count = siblings.len(), "Notifying sibling task handles");
            for mut handle in siblings {
                handle.resource_died().await;
            }
        }

        yield_now().await;
    }
}

impl<C: ConnectionLike + Send> ConnectionLike for RedisResource<C> {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        (async move {
            let result = self.con.req_packed_command(cmd).await;

            if let Err(ref e) = result {
                if is_disconnect(e) {
                    self.notify(e).await;
                }
            }

            result
        })
        .boxed()
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        (async move {
            let result = self.con.req_packed_commands(cmd, offset, count).await;

            if let Err(ref e) = result {
                if is_disconnect(e) {
                    self.notify(e).await;
                }
            }

            result
        })
        .boxed()
    }

    fn get_db(&self) -> i64 {
        self.con.get_db()
    }
}
