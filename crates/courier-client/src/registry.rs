//! Locally tracked subscription topics.
//!
//! The registry holds the identity topic (implicitly joined at login) and
//! the set of channels the session has explicitly joined. The interactive
//! side mutates it through `subscribe`/`login` while the notification loop
//! queries it on every inbound message, so every operation takes the lock
//! for its whole duration; a lookup never observes the identity and the
//! channel set out of sync. The set only grows within a session.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct Topics {
    identity: Option<String>,
    channels: BTreeSet<String>,
}

/// Shared handle to the session's subscription set.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<RwLock<Topics>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the logged-in identity and joins its private topic.
    ///
    /// Single write under the lock: there is no window where the session is
    /// authenticated but not yet subscribed to its own topic.
    pub fn set_identity(&self, user: &str) {
        let mut topics = self.inner.write().expect("registry lock poisoned");
        topics.identity = Some(user.to_string());
    }

    /// Returns the logged-in identity, if any.
    pub fn identity(&self) -> Option<String> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .identity
            .clone()
    }

    /// Adds an explicitly joined channel.
    pub fn add(&self, channel: &str) {
        let mut topics = self.inner.write().expect("registry lock poisoned");
        topics.channels.insert(channel.to_string());
    }

    /// Returns true if a notification with this topic should be delivered.
    pub fn contains(&self, topic: &str) -> bool {
        let topics = self.inner.read().expect("registry lock poisoned");
        topics.identity.as_deref() == Some(topic) || topics.channels.contains(topic)
    }

    /// Returns true if the topic is this session's identity topic.
    pub fn is_identity(&self, topic: &str) -> bool {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .identity
            .as_deref()
            == Some(topic)
    }

    /// Returns the subscribed topics for display, identity first.
    ///
    /// The order carries no routing meaning.
    pub fn subscribed(&self) -> Vec<String> {
        let topics = self.inner.read().expect("registry lock poisoned");
        let mut out = Vec::with_capacity(topics.channels.len() + 1);
        if let Some(ref identity) = topics.identity {
            out.push(identity.clone());
        }
        out.extend(topics.channels.iter().cloned());
        out
    }
}
