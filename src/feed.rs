use chrono::{DateTime, Utc};
use serde::Serialize;

/// Subscribing to this key receives events for every scope
pub const ALL_SCOPES: &str = "*";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChangeKind {
    Saved { records: usize },
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub scope_key: String,
    pub kind: ChangeKind,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(scope_key: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            scope_key: scope_key.into(),
            kind,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&ChangeEvent)>;

struct Subscription {
    id: SubscriptionId,
    scope_key: String,
    callback: Callback,
}

/// In-process change notifications keyed by scope.
///
/// Callbacks run synchronously inside `publish`, in subscription order.
#[derive(Default)]
pub struct ChangeFeed {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change<F>(&mut self, scope_key: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            scope_key: scope_key.into(),
            callback: Box::new(callback),
        });
        id
    }

    /// Returns true if the subscription existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver an event to matching subscribers. Returns how many were called.
    pub fn publish(&mut self, event: &ChangeEvent) -> usize {
        let mut delivered = 0;
        for sub in self
            .subscriptions
            .iter_mut()
            .filter(|s| s.scope_key == ALL_SCOPES || s.scope_key == event.scope_key)
        {
            (sub.callback)(event);
            delivered += 1;
        }
        tracing::debug!(scope = %event.scope_key, delivered, "change published");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscribers", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<ChangeEvent>>>, impl FnMut(&ChangeEvent)) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |e: &ChangeEvent| sink.borrow_mut().push(e.clone()))
    }

    #[test]
    fn test_delivers_to_matching_scope() {
        let mut feed = ChangeFeed::new();
        let (seen, callback) = recorder();
        feed.on_change("thesis/alice", callback);

        let delivered = feed.publish(&ChangeEvent::new("thesis/alice", ChangeKind::Finalized));
        assert_eq!(delivered, 1);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].kind, ChangeKind::Finalized);
    }

    #[test]
    fn test_ignores_other_scopes() {
        let mut feed = ChangeFeed::new();
        let (seen, callback) = recorder();
        feed.on_change("thesis/alice", callback);

        let delivered = feed.publish(&ChangeEvent::new("thesis/bob", ChangeKind::Finalized));
        assert_eq!(delivered, 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_wildcard_receives_everything() {
        let mut feed = ChangeFeed::new();
        let (seen, callback) = recorder();
        feed.on_change(ALL_SCOPES, callback);

        feed.publish(&ChangeEvent::new("a", ChangeKind::Saved { records: 2 }));
        feed.publish(&ChangeEvent::new("b", ChangeKind::Finalized));
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut feed = ChangeFeed::new();
        let (seen, callback) = recorder();
        let id = feed.on_change("a", callback);

        assert!(feed.unsubscribe(id));
        assert!(!feed.unsubscribe(id));
        assert_eq!(feed.subscriber_count(), 0);

        feed.publish(&ChangeEvent::new("a", ChangeKind::Finalized));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut feed = ChangeFeed::new();
        let a = feed.on_change("a", |_| {});
        let b = feed.on_change("a", |_| {});
        assert_ne!(a, b);
        assert!(feed.unsubscribe(a));
        assert_eq!(feed.subscriber_count(), 1);
    }
}
