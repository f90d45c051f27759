//! Continuous receive loop for broadcast and direct-message notifications.
//!
//! The loop starts once after connection and runs for the lifetime of the
//! session, independently of the interactive command flow. Each inbound
//! frame is decoded and its topic classified against the subscription
//! registry at arrival time; matched messages are handed to the delivery
//! channel, unmatched topics are dropped silently. A malformed frame skips
//! one message and the loop continues. The loop ends only on cooperative
//! shutdown or when the transport fails.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use courier_protocol::{LogicalClock, Notification, NotificationBody, Subscribe, encode_message};

use crate::command::read_frame;
use crate::error::{ClientError, ClientResult};
use crate::registry::SubscriptionRegistry;

/// A notification that matched the subscription set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A broadcast on a subscribed channel.
    Channel {
        channel: String,
        user: String,
        text: String,
        timestamp: i64,
    },

    /// A direct message addressed to this session's identity.
    Direct {
        from: String,
        text: String,
        timestamp: i64,
    },
}

/// Handle to the notification connection.
///
/// The read half lives in the spawned receive loop; the write half is kept
/// here for `join` control frames.
pub struct NotificationChannel {
    writer: Mutex<OwnedWriteHalf>,
    shutdown: watch::Sender<bool>,
}

impl NotificationChannel {
    /// Connects to the notification broker and starts the receive loop.
    ///
    /// Returns the channel handle and the loop's join handle. The loop
    /// resolves `Ok(())` on shutdown or clean peer close and `Err` on an
    /// unrecoverable transport error; the caller must await it before
    /// terminating so in-flight deliveries are not dropped.
    pub async fn connect(
        addr: &str,
        registry: SubscriptionRegistry,
        clock: Arc<LogicalClock>,
        deliveries: mpsc::Sender<Delivery>,
    ) -> ClientResult<(Arc<Self>, JoinHandle<ClientResult<()>>)> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            ClientError::Connection(format!("failed to connect to broker {}: {}", addr, e))
        })?;
        debug!(addr, "notification channel connected");

        let (reader, writer) = stream.into_split();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(receive_loop(reader, registry, clock, deliveries, shutdown_rx));

        let channel = Arc::new(Self {
            writer: Mutex::new(writer),
            shutdown: shutdown_tx,
        });
        Ok((channel, task))
    }

    /// Joins a topic on the broker.
    pub async fn join(&self, topic: &str) -> ClientResult<()> {
        let frame = encode_message(&Subscribe::topic(topic))?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        debug!(topic, "joined notification topic");
        Ok(())
    }

    /// Signals the receive loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn receive_loop(
    mut reader: OwnedReadHalf,
    registry: SubscriptionRegistry,
    clock: Arc<LogicalClock>,
    deliveries: mpsc::Sender<Delivery>,
    mut shutdown: watch::Receiver<bool>,
) -> ClientResult<()> {
    loop {
        let frame = tokio::select! {
            result = read_frame(&mut reader) => result,
            _ = shutdown.changed() => {
                info!("notification channel shut down");
                return Ok(());
            }
        };

        let payload = match frame {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!("notification stream closed by peer");
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "notification transport failed");
                return Err(e);
            }
        };

        // One bad message must not stop the loop.
        let notification: Notification = match serde_json::from_slice(&payload) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(error = %e, "skipping malformed notification");
                continue;
            }
        };

        clock.observe(notification.body.clock());

        if let Some(delivery) = classify(&registry, notification) {
            // Receiver gone means the session is tearing down.
            if deliveries.send(delivery).await.is_err() {
                return Ok(());
            }
        }
    }
}

/// Classifies a notification against the subscription set at arrival time.
///
/// The identity topic routes direct messages only, channel topics route
/// broadcasts only; a body whose shape does not match its topic is dropped.
fn classify(registry: &SubscriptionRegistry, notification: Notification) -> Option<Delivery> {
    let Notification { topic, body } = notification;

    if registry.is_identity(&topic) {
        return match body {
            NotificationBody::Direct {
                from,
                message,
                timestamp,
                ..
            } => Some(Delivery::Direct {
                from,
                text: message,
                timestamp,
            }),
            NotificationBody::Channel { .. } => {
                debug!(topic, "dropping broadcast addressed to the identity topic");
                None
            }
        };
    }

    if !registry.contains(&topic) {
        debug!(topic, "dropping notification for unsubscribed topic");
        return None;
    }

    match body {
        NotificationBody::Channel {
            user,
            message,
            timestamp,
            ..
        } => Some(Delivery::Channel {
            channel: topic,
            user,
            text: message,
            timestamp,
        }),
        NotificationBody::Direct { .. } => {
            debug!(topic, "dropping direct message on a channel topic");
            None
        }
    }
}
