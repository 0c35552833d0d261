//! Events emitted by panels, and an owned observer registry.
//!
//! There is no global event bus. The component that owns an [`Observers`]
//! hands out [`Subscription`]s and takes them back with `unsubscribe` when
//! the subscriber's lifetime ends.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::traits::{Filter, RecordKey};

/// User interaction relayed upward by a panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    NodeSelect {
        key: RecordKey,
    },
    ExpandToggle {
        key: RecordKey,
        will_expand: bool,
    },
    ColumnVisibilityChange {
        column_key: String,
        visible: bool,
    },
    ColumnResize {
        column_key: String,
        width: f32,
    },
    /// The user asked to restore the default column layout.
    ColumnReset,
    SearchSubmit {
        filter: Filter,
    },
    /// Keys moved between the two lists of a transfer panel.
    TransferMove {
        keys: Vec<RecordKey>,
        to_target: bool,
    },
    /// Page navigation in a paged table.
    PageChange {
        index: usize,
    },
}

/// Handle returned by [`Observers::subscribe`].
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "keep the subscription to unsubscribe later"]
pub struct Subscription(u64);

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// Explicitly owned list of callbacks notified with values of `T`.
///
/// Callbacks run without the registry lock held, so a callback may
/// subscribe or unsubscribe on the registry that is notifying it.
/// Subscribers added during a notification first hear the next one.
pub struct Observers<T> {
    inner: Mutex<ObserverList<T>>,
}

struct ObserverList<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
    /// Ids whose callbacks are checked out by a running `notify`.
    notifying: Vec<u64>,
    /// Checked-out ids unsubscribed before being handed back.
    removed: Vec<u64>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ObserverList {
                next_id: 0,
                callbacks: Vec::new(),
                notifying: Vec::new(),
                removed: Vec::new(),
            }),
        }
    }

    pub fn subscribe(&self, callback: impl FnMut(&T) + Send + 'static) -> Subscription {
        let mut list = self.lock();
        let id = list.next_id;
        list.next_id += 1;
        list.callbacks.push((id, Box::new(callback)));
        Subscription(id)
    }

    /// Removes a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut list = self.lock();
        let before = list.callbacks.len();
        list.callbacks.retain(|(id, _)| *id != subscription.0);
        if list.callbacks.len() != before {
            return true;
        }
        let checked_out = list.notifying.contains(&subscription.0);
        if checked_out && !list.removed.contains(&subscription.0) {
            list.removed.push(subscription.0);
            return true;
        }
        false
    }

    /// Calls every subscriber in subscription order.
    pub fn notify(&self, value: &T) {
        let mut running = {
            let mut list = self.lock();
            let running = std::mem::take(&mut list.callbacks);
            list.notifying.extend(running.iter().map(|(id, _)| *id));
            running
        };

        for (id, callback) in running.iter_mut() {
            if self.lock().removed.contains(id) {
                continue;
            }
            callback(value);
        }

        let mut list = self.lock();
        let ids: Vec<u64> = running.iter().map(|(id, _)| *id).collect();
        list.notifying.retain(|id| !ids.contains(id));
        let removed = std::mem::take(&mut list.removed);
        running.retain(|(id, _)| !removed.contains(id));
        list.removed = removed.into_iter().filter(|id| !ids.contains(id)).collect();

        // Restore subscription order; anything added meanwhile has a larger id.
        let added = std::mem::take(&mut list.callbacks);
        running.extend(added);
        running.sort_by_key(|(id, _)| *id);
        list.callbacks = running;
    }

    pub fn len(&self) -> usize {
        let list = self.lock();
        list.callbacks.len() + list.notifying.len() - list.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, ObserverList<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_notify_in_order_and_unsubscribe() {
        let observers = Observers::<PanelEvent>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let seen = Arc::clone(&seen);
            observers.subscribe(move |e| seen.lock().unwrap().push(("first", e.clone())))
        };
        let _second = {
            let seen = Arc::clone(&seen);
            observers.subscribe(move |e| seen.lock().unwrap().push(("second", e.clone())))
        };

        let event = PanelEvent::NodeSelect { key: "g1".into() };
        observers.notify(&event);
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(seen.lock().unwrap()[0].0, "first");

        assert!(observers.unsubscribe(first));
        observers.notify(&PanelEvent::ColumnReset);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], ("second", PanelEvent::ColumnReset));
        assert_eq!(observers.len(), 1);
    }

    #[test]
    fn test_callback_can_unsubscribe_itself() {
        let observers = Arc::new(Observers::<u32>::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let sub = {
            let registry = Arc::clone(&observers);
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            observers.subscribe(move |_| {
                *calls.lock().unwrap() += 1;
                if let Some(own) = slot.lock().unwrap().take() {
                    assert!(registry.unsubscribe(own));
                }
            })
        };
        *slot.lock().unwrap() = Some(sub);
        let _other = observers.subscribe(|_| {});

        observers.notify(&1);
        assert_eq!(observers.len(), 1);
        observers.notify(&2);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_callback_can_subscribe_during_notify() {
        let observers = Arc::new(Observers::<u32>::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _adder = {
            let registry = Arc::clone(&observers);
            let seen = Arc::clone(&seen);
            observers.subscribe(move |value| {
                if *value == 1 {
                    let seen = Arc::clone(&seen);
                    let _late = registry.subscribe(move |v| seen.lock().unwrap().push(*v));
                }
            })
        };

        observers.notify(&1);
        assert!(seen.lock().unwrap().is_empty());
        observers.notify(&2);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
        assert_eq!(observers.len(), 2);
    }

    #[test]
    fn test_unsubscribe_twice() {
        let observers = Observers::<u32>::new();
        let sub = observers.subscribe(|_| {});
        assert!(observers.unsubscribe(sub));
        assert!(!observers.unsubscribe(Subscription(0)));
        assert!(observers.is_empty());
    }
}
