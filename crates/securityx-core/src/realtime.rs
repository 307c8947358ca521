//! Realtime profile change feed.
//!
//! Writers publish every profile change; readers register a subscription
//! and keep it until they call [`ProfileSubscription::unsubscribe`] or drop
//! it. A subscriber that falls more than the channel capacity behind skips
//! the missed changes and keeps going.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::Profile;

const CHANNEL_CAPACITY: usize = 64;

/// What happened to a profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
}

/// One change event. `new` is the row after the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileChange {
    pub kind: ChangeKind,
    pub new: Profile,
}

/// Fan-out of profile changes. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProfileFeed {
    tx: broadcast::Sender<ProfileChange>,
}

impl Default for ProfileFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileFeed {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Deliver a change to all current subscribers. Returns how many
    /// received it; zero subscribers is fine.
    pub fn publish(&self, change: ProfileChange) -> usize {
        let id = change.new.id;
        let delivered = self.tx.send(change).unwrap_or(0);
        tracing::debug!(user_id = %id, delivered, "profile change published");
        delivered
    }

    /// Subscribe to changes of every profile.
    #[must_use]
    pub fn subscribe(&self) -> ProfileSubscription {
        ProfileSubscription {
            rx: self.tx.subscribe(),
            user_id: None,
        }
    }

    /// Subscribe to changes of a single user's profile.
    #[must_use]
    pub fn subscribe_user(&self, user_id: Uuid) -> ProfileSubscription {
        ProfileSubscription {
            rx: self.tx.subscribe(),
            user_id: Some(user_id),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A registered observer of profile changes.
#[derive(Debug)]
pub struct ProfileSubscription {
    rx: broadcast::Receiver<ProfileChange>,
    user_id: Option<Uuid>,
}

impl ProfileSubscription {
    /// Wait for the next matching change. `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<ProfileChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if self.user_id.is_none_or(|id| id == change.new.id) => {
                    return Some(change);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "profile subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving changes.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(id: Uuid, name: &str) -> ProfileChange {
        ProfileChange {
            kind: ChangeKind::Update,
            new: Profile {
                id,
                email: "x@y.zz".to_owned(),
                full_name: Some(name.to_owned()),
                avatar_url: None,
            },
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_change() {
        let feed = ProfileFeed::new();
        let mut sub = feed.subscribe();
        let id = Uuid::new_v4();
        assert_eq!(feed.publish(change(id, "Ada")), 1);
        assert_eq!(sub.recv().await, Some(change(id, "Ada")));
    }

    #[tokio::test]
    async fn user_subscription_filters_other_users() {
        let feed = ProfileFeed::new();
        let mine = Uuid::new_v4();
        let mut sub = feed.subscribe_user(mine);

        feed.publish(change(Uuid::new_v4(), "Someone"));
        feed.publish(change(mine, "Me"));
        assert_eq!(sub.recv().await.map(|c| c.new.id), Some(mine));
    }

    #[tokio::test]
    async fn unsubscribe_releases_the_registration() {
        let feed = ProfileFeed::new();
        let sub = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.publish(change(Uuid::new_v4(), "Nobody")), 0);
    }

    #[tokio::test]
    async fn closed_feed_ends_subscription() {
        let feed = ProfileFeed::new();
        let mut sub = feed.subscribe();
        drop(feed);
        assert_eq!(sub.recv().await, None);
    }
}
