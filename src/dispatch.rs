//! Delivery of composed notifications to the configured destination

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::destination::{DestinationHandle, DestinationStore};
use crate::notification::Notification;

/// Error reported by a notification sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// Delivery failure. Both variants fail the whole request; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Destination unavailable: {0}")]
    DestinationUnavailable(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Anything that can show a notification in a channel
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Name of the sink, used in logs.
    fn name(&self) -> &'static str;

    /// Checks that the destination exists and is reachable.
    async fn resolve(&self, destination: &DestinationHandle) -> Result<(), SinkError>;

    /// Posts the notification to the destination.
    async fn deliver(
        &self,
        destination: &DestinationHandle,
        notification: &Notification,
    ) -> Result<(), SinkError>;
}

/// Receipt for a successful delivery
#[derive(Debug, Clone)]
pub struct Delivered {
    pub delivery_id: Uuid,
    pub destination: DestinationHandle,
}

pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    destinations: DestinationStore,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, destinations: DestinationStore) -> Self {
        Self { sink, destinations }
    }

    pub fn destinations(&self) -> &DestinationStore {
        &self.destinations
    }

    pub fn sink(&self) -> &Arc<dyn NotificationSink> {
        &self.sink
    }

    /// Current destination, looked up at call time so a runtime override
    /// takes effect without a restart.
    pub async fn destination(&self) -> Option<DestinationHandle> {
        self.destinations.resolve().await
    }

    /// Resolves the destination through the sink, then sends once.
    pub async fn dispatch(
        &self,
        destination: &DestinationHandle,
        notification: &Notification,
    ) -> Result<Delivered, DispatchError> {
        let delivery_id = Uuid::now_v7();

        if let Err(e) = self.sink.resolve(destination).await {
            error!(
                %delivery_id,
                sink = self.sink.name(),
                channel = %destination.channel_id,
                "Failed to resolve destination: {}", e
            );
            return Err(DispatchError::DestinationUnavailable(e.to_string()));
        }

        if let Err(e) = self.sink.deliver(destination, notification).await {
            error!(
                %delivery_id,
                sink = self.sink.name(),
                channel = %destination.channel_id,
                "Failed to send notification: {}", e
            );
            return Err(DispatchError::SendFailed(e.to_string()));
        }

        info!(
            %delivery_id,
            sink = self.sink.name(),
            channel = %destination.channel_id,
            "Delivered notification '{}'", notification.title
        );
        Ok(Delivered {
            delivery_id,
            destination: destination.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::compose;
    use crate::webhook::NormalizedDeployEvent;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSink {
        fail_resolve: bool,
        fail_deliver: bool,
        delivered: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationSink for FakeSink {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn resolve(&self, _destination: &DestinationHandle) -> Result<(), SinkError> {
            if self.fail_resolve {
                Err(SinkError::Status {
                    status: 404,
                    body: "Unknown Channel".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn deliver(
            &self,
            destination: &DestinationHandle,
            notification: &Notification,
        ) -> Result<(), SinkError> {
            if self.fail_deliver {
                return Err(SinkError::Other("connection reset".to_string()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push((destination.channel_id.clone(), notification.title.clone()));
            Ok(())
        }
    }

    fn notification() -> Notification {
        compose(&NormalizedDeployEvent::unknown(), "", None)
    }

    async fn dispatch_with(sink: Arc<FakeSink>) -> Result<Delivered, DispatchError> {
        let dispatcher = Dispatcher::new(
            sink,
            DestinationStore::new(Some("42".to_string())),
        );
        let destination = dispatcher.destination().await.unwrap();
        dispatcher.dispatch(&destination, &notification()).await
    }

    #[tokio::test]
    async fn delivers_once_to_resolved_destination() {
        let sink = Arc::new(FakeSink::default());
        let delivered = dispatch_with(sink.clone()).await.unwrap();
        assert_eq!(delivered.destination.channel_id, "42");
        assert_eq!(
            *sink.delivered.lock().unwrap(),
            vec![("42".to_string(), "⚡ unknown — STARTED".to_string())]
        );
    }

    #[tokio::test]
    async fn resolution_failure_is_destination_unavailable() {
        let sink = Arc::new(FakeSink {
            fail_resolve: true,
            ..Default::default()
        });
        let err = dispatch_with(sink.clone()).await.unwrap_err();
        assert!(matches!(err, DispatchError::DestinationUnavailable(_)));
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_reported_without_retry() {
        let sink = Arc::new(FakeSink {
            fail_deliver: true,
            ..Default::default()
        });
        let err = dispatch_with(sink).await.unwrap_err();
        assert!(matches!(err, DispatchError::SendFailed(msg) if msg == "connection reset"));
    }
}
