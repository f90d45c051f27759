//! Session coordinator.
//!
//! Owns the session's identity state machine and orchestrates the command
//! channel, mutating the subscription registry as a side effect of
//! successful login and subscribe. The session starts Anonymous, where only
//! `login` is permitted; a successful login is terminal for the session
//! (there is no logout).

use std::sync::Arc;

use tracing::info;

use courier_protocol::{LogicalClock, Reply, Request, epoch_now};

use crate::command::CommandChannel;
use crate::error::{ClientError, ClientResult};
use crate::notify::NotificationChannel;
use crate::registry::SubscriptionRegistry;

/// Coordinates the two channels and the shared session state.
pub struct Session {
    commands: CommandChannel,
    notifications: Arc<NotificationChannel>,
    registry: SubscriptionRegistry,
    clock: Arc<LogicalClock>,
}

impl Session {
    /// Creates a session over already-connected channels.
    pub fn new(
        commands: CommandChannel,
        notifications: Arc<NotificationChannel>,
        registry: SubscriptionRegistry,
        clock: Arc<LogicalClock>,
    ) -> Self {
        Self {
            commands,
            notifications,
            registry,
            clock,
        }
    }

    /// Returns the logged-in username, if any.
    pub fn identity(&self) -> Option<String> {
        self.registry.identity()
    }

    /// Returns true once login has succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.registry.identity().is_some()
    }

    /// Returns the subscribed topics for display.
    pub fn subscribed(&self) -> Vec<String> {
        self.registry.subscribed()
    }

    /// Registers a username and joins its private notification topic.
    ///
    /// On rejection the session stays Anonymous and the server's
    /// description is surfaced.
    pub async fn login(&self, username: &str) -> ClientResult<()> {
        let username = required(username, "username")?;
        if let Some(user) = self.registry.identity() {
            return Err(ClientError::AlreadyLoggedIn(user));
        }

        let request = Request::login(username, epoch_now(), self.clock.tick());
        match self.commands.call(&request).await? {
            Reply::Login(ack) if ack.is_success() => {
                // Record the identity before the join frame goes out: the
                // broker may forward a message for the topic as soon as it
                // processes the join, and the receive loop must already be
                // able to route it.
                self.registry.set_identity(username);
                self.notifications.join(username).await?;
                info!(user = username, "logged in");
                Ok(())
            }
            Reply::Login(ack) => Err(ClientError::Rejected(
                ack.description
                    .unwrap_or_else(|| "login refused".to_string()),
            )),
            other => Err(unexpected_reply("login", &other)),
        }
    }

    /// Lists all registered usernames.
    pub async fn list_users(&self) -> ClientResult<Vec<String>> {
        self.require_login()?;
        let request = Request::users(epoch_now(), self.clock.tick());
        match self.commands.call(&request).await? {
            Reply::Users(list) => Ok(list.users),
            other => Err(unexpected_reply("users", &other)),
        }
    }

    /// Creates a channel on the remote service.
    ///
    /// Channel existence is remote-owned; the creator is not subscribed.
    pub async fn create_channel(&self, name: &str) -> ClientResult<()> {
        let name = required(name, "channel name")?;
        self.require_login()?;

        let request = Request::channel(name, epoch_now(), self.clock.tick());
        match self.commands.call(&request).await? {
            Reply::Channel(ack) if ack.is_success() => {
                info!(channel = name, "channel created");
                Ok(())
            }
            Reply::Channel(ack) => Err(ClientError::Rejected(
                ack.description
                    .unwrap_or_else(|| "channel creation refused".to_string()),
            )),
            other => Err(unexpected_reply("channel", &other)),
        }
    }

    /// Lists all existing channels.
    pub async fn list_channels(&self) -> ClientResult<Vec<String>> {
        self.require_login()?;
        let request = Request::channels(epoch_now(), self.clock.tick());
        match self.commands.call(&request).await? {
            Reply::Channels(list) => Ok(list.channels),
            other => Err(unexpected_reply("channels", &other)),
        }
    }

    /// Subscribes to a channel's broadcasts.
    ///
    /// Verifies the channel exists server-side, then joins the topic and
    /// records the subscription. The channel could vanish between the check
    /// and the join; the protocol accepts that window.
    pub async fn subscribe(&self, channel: &str) -> ClientResult<()> {
        let channel = required(channel, "channel name")?;

        let channels = self.list_channels().await?;
        if !channels.iter().any(|existing| existing == channel) {
            return Err(ClientError::Rejected(format!(
                "channel \"{}\" does not exist",
                channel
            )));
        }

        self.notifications.join(channel).await?;
        self.registry.add(channel);
        info!(channel, "subscribed");
        Ok(())
    }

    /// Publishes a message on a channel.
    pub async fn publish(&self, channel: &str, text: &str) -> ClientResult<()> {
        let channel = required(channel, "channel name")?;
        let text = required(text, "message")?;
        let user = self.require_login()?;

        let request = Request::publish(user, channel, text, epoch_now(), self.clock.tick());
        match self.commands.call(&request).await? {
            Reply::Publish(outcome) if outcome.is_ok() => Ok(()),
            Reply::Publish(outcome) => Err(ClientError::Rejected(
                outcome
                    .message
                    .unwrap_or_else(|| "publish refused".to_string()),
            )),
            other => Err(unexpected_reply("publish", &other)),
        }
    }

    /// Sends a direct message to another user.
    pub async fn send_direct(&self, dst: &str, text: &str) -> ClientResult<()> {
        let dst = required(dst, "recipient")?;
        let text = required(text, "message")?;
        let src = self.require_login()?;

        let request = Request::message(src, dst, text, epoch_now(), self.clock.tick());
        match self.commands.call(&request).await? {
            Reply::Message(outcome) if outcome.is_ok() => Ok(()),
            Reply::Message(outcome) => Err(ClientError::Rejected(
                outcome
                    .message
                    .unwrap_or_else(|| "message refused".to_string()),
            )),
            other => Err(unexpected_reply("message", &other)),
        }
    }

    fn require_login(&self) -> ClientResult<String> {
        self.registry.identity().ok_or(ClientError::NotLoggedIn)
    }
}

/// Rejects empty input before any network call is made.
fn required<'a>(value: &'a str, field: &'static str) -> ClientResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientError::EmptyInput(field));
    }
    Ok(trimmed)
}

fn unexpected_reply(expected: &str, reply: &Reply) -> ClientError {
    ClientError::Protocol(format!(
        "unexpected reply to {}: {}",
        expected,
        reply.service()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::read_frame;
    use crate::notify::Delivery;
    use courier_protocol::{
        Ack, ChannelList, Notification, Outcome, Subscribe, UserList, encode_message,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::{Duration, timeout};

    /// In-memory command service covering the six services, plus a broker
    /// that republishes every publish/message to its single client.
    struct Fixture {
        session: Session,
        deliveries: mpsc::Receiver<Delivery>,
        requests_seen: Arc<AtomicUsize>,
    }

    async fn fixture() -> Fixture {
        fixture_with_users(&[]).await
    }

    async fn fixture_with_users(taken: &[&str]) -> Fixture {
        let taken: Vec<String> = taken.iter().map(|s| s.to_string()).collect();
        let requests_seen = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&requests_seen);

        // Broker: records joins, republishes frames the server side hands it.
        let broker_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let broker_addr = broker_listener.local_addr().unwrap().to_string();
        let (publish_tx, mut publish_rx) = mpsc::channel::<Notification>(16);
        tokio::spawn(async move {
            let (stream, _) = broker_listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            tokio::spawn(async move {
                // Joins are read and discarded; routing is client-side.
                while let Ok(Some(payload)) = read_frame(&mut reader).await {
                    let _: Subscribe = serde_json::from_slice(&payload).unwrap();
                }
            });
            while let Some(notification) = publish_rx.recv().await {
                let frame = encode_message(&notification).unwrap();
                if writer.write_all(&frame).await.is_err() {
                    break;
                }
            }
        });

        // Command service with an in-memory user/channel registry.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut users = taken;
            let mut channels: Vec<String> = Vec::new();
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut clock = 100u64;

            while let Ok(Some(payload)) = read_frame(&mut stream).await {
                seen.fetch_add(1, Ordering::SeqCst);
                clock += 1;
                let request: Request = serde_json::from_slice(&payload).unwrap();
                let now = epoch_now();
                let reply = match request {
                    Request::Login { user, .. } => {
                        if users.contains(&user) {
                            Reply::Login(Ack::rejected("user already logged in", now, clock))
                        } else {
                            users.push(user);
                            Reply::Login(Ack::success(now, clock))
                        }
                    }
                    Request::Users { .. } => Reply::Users(UserList {
                        users: users.clone(),
                        timestamp: now,
                        clock,
                    }),
                    Request::Channel { channel, .. } => {
                        if channels.contains(&channel) {
                            Reply::Channel(Ack::rejected("channel already exists", now, clock))
                        } else {
                            channels.push(channel);
                            Reply::Channel(Ack::success(now, clock))
                        }
                    }
                    Request::Channels { .. } => Reply::Channels(ChannelList {
                        channels: channels.clone(),
                        timestamp: now,
                        clock,
                    }),
                    Request::Publish {
                        user,
                        channel,
                        message,
                        ..
                    } => {
                        if channels.contains(&channel) {
                            publish_tx
                                .send(Notification::broadcast(channel, user, message, now, clock))
                                .await
                                .unwrap();
                            Reply::Publish(Outcome::ok(now, clock))
                        } else {
                            Reply::Publish(Outcome::rejected("channel does not exist", now, clock))
                        }
                    }
                    Request::Message { src, dst, message, .. } => {
                        if users.contains(&dst) {
                            publish_tx
                                .send(Notification::direct(dst, src, message, now, clock))
                                .await
                                .unwrap();
                            Reply::Message(Outcome::ok(now, clock))
                        } else {
                            Reply::Message(Outcome::rejected("unknown recipient", now, clock))
                        }
                    }
                };
                let frame = encode_message(&reply).unwrap();
                stream.write_all(&frame).await.unwrap();
            }
        });

        let clock = Arc::new(LogicalClock::new());
        let registry = SubscriptionRegistry::new();
        let (deliveries_tx, deliveries_rx) = mpsc::channel(16);

        let commands = CommandChannel::connect(&server_addr, Arc::clone(&clock))
            .await
            .unwrap();
        let (notifications, _task) = NotificationChannel::connect(
            &broker_addr,
            registry.clone(),
            Arc::clone(&clock),
            deliveries_tx,
        )
        .await
        .unwrap();

        Fixture {
            session: Session::new(commands, notifications, registry, clock),
            deliveries: deliveries_rx,
            requests_seen,
        }
    }

    #[tokio::test]
    async fn anonymous_session_permits_only_login() {
        let fx = fixture().await;
        assert!(!fx.session.is_authenticated());

        assert!(matches!(
            fx.session.list_users().await,
            Err(ClientError::NotLoggedIn)
        ));
        assert!(matches!(
            fx.session.create_channel("news").await,
            Err(ClientError::NotLoggedIn)
        ));
        assert!(matches!(
            fx.session.publish("news", "hi").await,
            Err(ClientError::NotLoggedIn)
        ));
        assert!(matches!(
            fx.session.send_direct("alice", "hi").await,
            Err(ClientError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn login_sets_identity_and_joins_self_topic() {
        let fx = fixture().await;
        fx.session.login("bob").await.unwrap();

        assert!(fx.session.is_authenticated());
        assert_eq!(fx.session.identity().as_deref(), Some("bob"));
        assert_eq!(fx.session.subscribed(), vec!["bob"]);
    }

    #[tokio::test]
    async fn message_forwarded_as_soon_as_join_lands_is_delivered() {
        // Broker that answers every join by immediately forwarding a direct
        // message for that topic. The identity must already be routable when
        // the join frame reaches the broker, or this first message is lost.
        let broker_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let broker_addr = broker_listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = broker_listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            while let Ok(Some(payload)) = read_frame(&mut reader).await {
                let join: Subscribe = serde_json::from_slice(&payload).unwrap();
                let notification =
                    Notification::direct(&join.topic, "alice", "welcome", epoch_now(), 1);
                let frame = encode_message(&notification).unwrap();
                if writer.write_all(&frame).await.is_err() {
                    break;
                }
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            while let Ok(Some(_)) = read_frame(&mut stream).await {
                let frame = encode_message(&Reply::Login(Ack::success(epoch_now(), 1))).unwrap();
                stream.write_all(&frame).await.unwrap();
            }
        });

        let clock = Arc::new(LogicalClock::new());
        let registry = SubscriptionRegistry::new();
        let (deliveries_tx, mut deliveries) = mpsc::channel(16);
        let commands = CommandChannel::connect(&server_addr, Arc::clone(&clock))
            .await
            .unwrap();
        let (notifications, _task) = NotificationChannel::connect(
            &broker_addr,
            registry.clone(),
            Arc::clone(&clock),
            deliveries_tx,
        )
        .await
        .unwrap();
        let session = Session::new(commands, notifications, registry, clock);

        session.login("bob").await.unwrap();

        let delivery = timeout(Duration::from_secs(1), deliveries.recv())
            .await
            .expect("message forwarded at join time was dropped")
            .unwrap();
        assert!(matches!(
            delivery,
            Delivery::Direct { ref from, ref text, .. }
                if from == "alice" && text == "welcome"
        ));
    }

    #[tokio::test]
    async fn rejected_login_stays_anonymous() {
        let fx = fixture_with_users(&["bob"]).await;
        let result = fx.session.login("bob").await;

        match result {
            Err(ClientError::Rejected(msg)) => assert_eq!(msg, "user already logged in"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!fx.session.is_authenticated());
        assert!(fx.session.subscribed().is_empty());
    }

    #[tokio::test]
    async fn second_login_is_refused_locally() {
        let fx = fixture().await;
        fx.session.login("bob").await.unwrap();
        assert!(matches!(
            fx.session.login("carol").await,
            Err(ClientError::AlreadyLoggedIn(_))
        ));
        assert_eq!(fx.session.identity().as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_call() {
        let fx = fixture().await;

        assert!(matches!(
            fx.session.login("   ").await,
            Err(ClientError::EmptyInput("username"))
        ));
        fx.session.login("bob").await.unwrap();
        let baseline = fx.requests_seen.load(Ordering::SeqCst);

        assert!(matches!(
            fx.session.create_channel("").await,
            Err(ClientError::EmptyInput("channel name"))
        ));
        assert!(matches!(
            fx.session.publish("news", " ").await,
            Err(ClientError::EmptyInput("message"))
        ));
        assert!(matches!(
            fx.session.send_direct("", "hi").await,
            Err(ClientError::EmptyInput("recipient"))
        ));
        assert_eq!(fx.requests_seen.load(Ordering::SeqCst), baseline);
    }

    #[tokio::test]
    async fn subscribe_unknown_channel_leaves_registry_unchanged() {
        let fx = fixture().await;
        fx.session.login("bob").await.unwrap();

        let result = fx.session.subscribe("ghost").await;
        assert!(matches!(result, Err(ClientError::Rejected(_))));
        assert_eq!(fx.session.subscribed(), vec!["bob"]);
    }

    #[tokio::test]
    async fn duplicate_channel_creation_is_rejected() {
        let fx = fixture().await;
        fx.session.login("bob").await.unwrap();
        fx.session.create_channel("news").await.unwrap();

        match fx.session.create_channel("news").await {
            Err(ClientError::Rejected(msg)) => assert_eq!(msg, "channel already exists"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn subscribe_grows_set_by_distinct_verified_channels() {
        let fx = fixture().await;
        fx.session.login("bob").await.unwrap();
        for name in ["a", "b", "c"] {
            fx.session.create_channel(name).await.unwrap();
            fx.session.subscribe(name).await.unwrap();
        }

        assert_eq!(fx.session.subscribed(), vec!["bob", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn full_session_scenario() {
        let mut fx = fixture().await;

        fx.session.login("bob").await.unwrap();
        assert!(fx.session.list_users().await.unwrap().contains(&"bob".to_string()));

        fx.session.create_channel("news").await.unwrap();
        assert_eq!(fx.session.list_channels().await.unwrap(), vec!["news"]);

        fx.session.subscribe("news").await.unwrap();
        assert_eq!(fx.session.subscribed(), vec!["bob", "news"]);

        fx.session.publish("news", "hi").await.unwrap();
        let delivery = fx.deliveries.recv().await.unwrap();
        assert!(matches!(
            delivery,
            Delivery::Channel { ref channel, ref user, ref text, .. }
                if channel == "news" && user == "bob" && text == "hi"
        ));
    }

    #[tokio::test]
    async fn direct_message_to_self_topic_is_delivered_after_login() {
        let mut fx = fixture_with_users(&["alice"]).await;

        fx.session.login("bob").await.unwrap();
        fx.session.send_direct("alice", "hi alice").await.unwrap();

        // The fixture republishes to its one client, so bob's own session
        // sees a dst="alice" notification: not his identity topic, dropped.
        fx.session.send_direct("bob", "note to self").await.unwrap();
        let delivery = fx.deliveries.recv().await.unwrap();
        assert!(matches!(
            delivery,
            Delivery::Direct { ref from, ref text, .. }
                if from == "bob" && text == "note to self"
        ));
    }

    #[tokio::test]
    async fn direct_message_to_unknown_user_is_rejected() {
        let fx = fixture().await;
        fx.session.login("bob").await.unwrap();

        match fx.session.send_direct("ghost", "hi").await {
            Err(ClientError::Rejected(msg)) => assert_eq!(msg, "unknown recipient"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_to_unknown_channel_is_rejected() {
        let fx = fixture().await;
        fx.session.login("bob").await.unwrap();

        assert!(matches!(
            fx.session.publish("nowhere", "hi").await,
            Err(ClientError::Rejected(_))
        ));
    }
}
