//! Wire framing and message types for courier.
//!
//! This crate defines the protocol spoken by the courier client against the
//! remote command service and the notification broker.
//!
//! # Protocol Overview
//!
//! Messages are sent as length-prefixed JSON:
//! - 4 bytes: message length (u32, big-endian)
//! - N bytes: JSON payload
//!
//! # Message Shapes
//!
//! A command request is `{ "service": <name>, "data": { ...fields } }` and
//! the reply echoes the same service name. A notification carries a `topic`
//! (a channel name or a username) alongside the message body. Every `data`
//! object carries an epoch-second `timestamp` and a Lamport `clock` value.
//!
//! # Example
//!
//! ```rust
//! use courier_protocol::{Request, encode_message, decode_message};
//!
//! let request = Request::users(1700000000, 1);
//! let bytes = encode_message(&request).unwrap();
//! let decoded: Request = decode_message(&bytes).unwrap();
//! assert_eq!(decoded, request);
//! ```

mod clock;
mod error;
mod framing;
mod types;

pub use clock::LogicalClock;
pub use error::{ProtocolError, ProtocolResult};
pub use framing::{decode_message, encode_message};
pub use types::{
    Ack, ChannelList, Notification, NotificationBody, Outcome, Reply, Request, Subscribe,
    UserList,
};

/// Maximum message size (1 MB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Status value the command service uses for accepted login/channel requests.
pub const STATUS_SUCCESS: &str = "sucesso";

/// Status value the command service uses for accepted publish/message requests.
pub const STATUS_OK: &str = "OK";

/// Status value the command service uses for rejected requests.
pub const STATUS_ERROR: &str = "erro";

/// Returns the current time as epoch seconds.
pub fn epoch_now() -> i64 {
    chrono::Utc::now().timestamp()
}
