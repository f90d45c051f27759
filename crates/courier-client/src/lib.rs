//! CLI, command/notification channels, interactive session
//!
//! This crate provides the `courier` command-line messaging client.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod menu;
pub mod notify;
pub mod registry;
pub mod session;

pub use cli::Cli;
pub use command::CommandChannel;
pub use error::{ClientError, ClientResult};
pub use notify::{Delivery, NotificationChannel};
pub use registry::SubscriptionRegistry;
pub use session::Session;
