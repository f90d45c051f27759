//! Request, reply and notification types for the courier protocol.

use serde::{Deserialize, Serialize};

use crate::{STATUS_ERROR, STATUS_OK, STATUS_SUCCESS};

/// Command requests sent to the remote command service.
///
/// Serializes as `{ "service": <name>, "data": { ...fields } }`. The command
/// service answers each request with exactly one [`Reply`] on the same
/// connection, in order; there is no correlation id on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", content = "data", rename_all = "lowercase")]
pub enum Request {
    /// Register a username for this session.
    Login {
        user: String,
        timestamp: i64,
        clock: u64,
    },

    /// List all registered usernames.
    Users { timestamp: i64, clock: u64 },

    /// Create a new broadcast channel.
    Channel {
        channel: String,
        timestamp: i64,
        clock: u64,
    },

    /// List all existing channels.
    Channels { timestamp: i64, clock: u64 },

    /// Publish a message on a channel.
    Publish {
        user: String,
        channel: String,
        message: String,
        timestamp: i64,
        clock: u64,
    },

    /// Send a direct message to another user.
    Message {
        src: String,
        dst: String,
        message: String,
        timestamp: i64,
        clock: u64,
    },
}

impl Request {
    /// Creates a login request.
    pub fn login(user: impl Into<String>, timestamp: i64, clock: u64) -> Self {
        Self::Login {
            user: user.into(),
            timestamp,
            clock,
        }
    }

    /// Creates a user listing request.
    pub fn users(timestamp: i64, clock: u64) -> Self {
        Self::Users { timestamp, clock }
    }

    /// Creates a channel creation request.
    pub fn channel(channel: impl Into<String>, timestamp: i64, clock: u64) -> Self {
        Self::Channel {
            channel: channel.into(),
            timestamp,
            clock,
        }
    }

    /// Creates a channel listing request.
    pub fn channels(timestamp: i64, clock: u64) -> Self {
        Self::Channels { timestamp, clock }
    }

    /// Creates a publish request.
    pub fn publish(
        user: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
        clock: u64,
    ) -> Self {
        Self::Publish {
            user: user.into(),
            channel: channel.into(),
            message: message.into(),
            timestamp,
            clock,
        }
    }

    /// Creates a direct message request.
    pub fn message(
        src: impl Into<String>,
        dst: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
        clock: u64,
    ) -> Self {
        Self::Message {
            src: src.into(),
            dst: dst.into(),
            message: message.into(),
            timestamp,
            clock,
        }
    }

    /// Returns the wire service name of this request.
    pub fn service(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Users { .. } => "users",
            Self::Channel { .. } => "channel",
            Self::Channels { .. } => "channels",
            Self::Publish { .. } => "publish",
            Self::Message { .. } => "message",
        }
    }

    /// Returns the Lamport clock value carried by this request.
    pub fn clock(&self) -> u64 {
        match self {
            Self::Login { clock, .. }
            | Self::Users { clock, .. }
            | Self::Channel { clock, .. }
            | Self::Channels { clock, .. }
            | Self::Publish { clock, .. }
            | Self::Message { clock, .. } => *clock,
        }
    }
}

/// Command replies, keyed on the echoed service name.
///
/// The status vocabulary is service-specific: login and channel creation
/// answer with an [`Ack`] (`"sucesso"` on acceptance), publish and direct
/// message with an [`Outcome`] (`"OK"` on acceptance). Listings have no
/// failure form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", content = "data", rename_all = "lowercase")]
pub enum Reply {
    /// Reply to a login request.
    Login(Ack),
    /// Reply to a user listing request.
    Users(UserList),
    /// Reply to a channel creation request.
    Channel(Ack),
    /// Reply to a channel listing request.
    Channels(ChannelList),
    /// Reply to a publish request.
    Publish(Outcome),
    /// Reply to a direct message request.
    Message(Outcome),
}

impl Reply {
    /// Returns the wire service name of this reply.
    pub fn service(&self) -> &'static str {
        match self {
            Self::Login(_) => "login",
            Self::Users(_) => "users",
            Self::Channel(_) => "channel",
            Self::Channels(_) => "channels",
            Self::Publish(_) => "publish",
            Self::Message(_) => "message",
        }
    }

    /// Returns the Lamport clock value carried by this reply.
    pub fn clock(&self) -> u64 {
        match self {
            Self::Login(ack) | Self::Channel(ack) => ack.clock,
            Self::Users(list) => list.clock,
            Self::Channels(list) => list.clock,
            Self::Publish(outcome) | Self::Message(outcome) => outcome.clock,
        }
    }
}

/// Acknowledgement body for login and channel creation replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// `"sucesso"` on acceptance; anything else is a rejection.
    pub status: String,

    /// Human-readable rejection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub timestamp: i64,

    #[serde(default)]
    pub clock: u64,
}

impl Ack {
    /// Creates an accepted acknowledgement.
    pub fn success(timestamp: i64, clock: u64) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            description: None,
            timestamp,
            clock,
        }
    }

    /// Creates a rejection with a reason.
    pub fn rejected(description: impl Into<String>, timestamp: i64, clock: u64) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            description: Some(description.into()),
            timestamp,
            clock,
        }
    }

    /// Returns true if the request was accepted.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Outcome body for publish and direct message replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// `"OK"` on acceptance; anything else is a rejection.
    pub status: String,

    /// Human-readable rejection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub timestamp: i64,

    #[serde(default)]
    pub clock: u64,
}

impl Outcome {
    /// Creates an accepted outcome.
    pub fn ok(timestamp: i64, clock: u64) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: None,
            timestamp,
            clock,
        }
    }

    /// Creates a rejection with a reason.
    pub fn rejected(message: impl Into<String>, timestamp: i64, clock: u64) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: Some(message.into()),
            timestamp,
            clock,
        }
    }

    /// Returns true if the request was accepted.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Body of a user listing reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<String>,
    pub timestamp: i64,
    #[serde(default)]
    pub clock: u64,
}

/// Body of a channel listing reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelList {
    pub channels: Vec<String>,
    pub timestamp: i64,
    #[serde(default)]
    pub clock: u64,
}

/// A message delivered on the notification stream.
///
/// The topic is the routing key: a channel name for broadcasts, the
/// recipient's username for direct messages. Routing happens client-side
/// against the locally tracked subscription set; a notification whose topic
/// the session never joined is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub topic: String,

    #[serde(flatten)]
    pub body: NotificationBody,
}

impl Notification {
    /// Creates a channel broadcast notification.
    pub fn broadcast(
        channel: impl Into<String>,
        user: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
        clock: u64,
    ) -> Self {
        Self {
            topic: channel.into(),
            body: NotificationBody::Channel {
                user: user.into(),
                message: message.into(),
                timestamp,
                clock,
            },
        }
    }

    /// Creates a direct message notification.
    pub fn direct(
        dst: impl Into<String>,
        from: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
        clock: u64,
    ) -> Self {
        Self {
            topic: dst.into(),
            body: NotificationBody::Direct {
                from: from.into(),
                message: message.into(),
                timestamp,
                clock,
            },
        }
    }
}

/// Notification body, discriminated by field name on the wire.
///
/// Channel broadcasts carry the sender under `user`, direct messages under
/// `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationBody {
    /// A broadcast published on a channel.
    Channel {
        user: String,
        message: String,
        timestamp: i64,
        #[serde(default)]
        clock: u64,
    },

    /// A direct message addressed to this session's user.
    Direct {
        from: String,
        message: String,
        timestamp: i64,
        #[serde(default)]
        clock: u64,
    },
}

impl NotificationBody {
    /// Returns the Lamport clock value carried by this notification.
    pub fn clock(&self) -> u64 {
        match self {
            Self::Channel { clock, .. } | Self::Direct { clock, .. } => *clock,
        }
    }
}

/// Control frame sent on the notification connection to join a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscribe {
    #[serde(rename = "subscribe")]
    pub topic: String,
}

impl Subscribe {
    /// Creates a join frame for the given topic.
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}
