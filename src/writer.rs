use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::Event;
use futures_util::stream::Stream;
use logbroker_protocol::DataRecord;
use tokio::sync::{broadcast, mpsc};

use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, MessageEnvelope};

/// Guarantees `unregister` runs exactly once when the writer's stream is
/// dropped, whether that happens because the consumer exhausted it, the
/// client disconnected, or hyper dropped the body after a write error. Axum
/// gives no separate signal for "client disconnected" versus "write failed"
/// on an SSE body; both manifest identically as the stream future being
/// dropped, so both are handled here by the same guard.
struct UnregisterGuard {
    registry: Arc<ConnectionRegistry>,
    connection_id: ConnectionId,
}

impl Drop for UnregisterGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.connection_id);
    }
}

/// Builds the per-connection writer stream (§4.3): a select over the send
/// queue, the heartbeat timer, and shutdown notification, plus implicit
/// stream cancellation (dropping the stream is itself a cancellation
/// signal, handled by `UnregisterGuard`).
pub fn connection_stream(
    registry: Arc<ConnectionRegistry>,
    connection_id: ConnectionId,
    handle: ConnectionHandle,
    mut receiver: mpsc::Receiver<Arc<MessageEnvelope>>,
    heartbeat_interval: Duration,
    handshake: Event,
    mut shutdown: broadcast::Receiver<()>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let _guard = UnregisterGuard { registry, connection_id };
        yield Ok(handshake);

        let mut ticker = tokio::time::interval(heartbeat_interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                envelope = receiver.recv() => {
                    match envelope {
                        Some(envelope) => {
                            let record = DataRecord {
                                channel: envelope.channel.clone(),
                                data: envelope.payload.clone(),
                                timestamp: envelope.published_at.timestamp_millis(),
                                id: envelope.id.clone(),
                            };
                            if let Ok(json) = serde_json::to_string(&record) {
                                yield Ok(Event::default().id(envelope.id.clone()).data(json));
                                handle.record_sent();
                            }
                            ticker.reset();
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    yield Ok(Event::default().comment("ping"));
                }
                // On server shutdown, transition straight to closed without
                // draining the queue (§4.7, §5).
                _ = shutdown.recv() => {
                    break;
                }
            }
        }
    }
}
