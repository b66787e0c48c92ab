pub mod stdin;

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bitflags::bitflags;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DesktopId(pub String);

impl fmt::Display for DesktopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Native handle of the window a pin operation applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PinOperations: u8 {
        const PIN = 1 << 0;
        const UNPIN = 1 << 1;
        const WINDOW = 1 << 2;
        const APPLICATION = 1 << 3;
    }
}

impl PinOperations {
    pub fn describe(self) -> String {
        let action = if self.contains(Self::PIN) { "Pinned" } else { "Unpinned" };
        let target = if self.contains(Self::WINDOW) { "window" } else { "application" };

        format!("{action} this {target}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesktopEvent {
    Switched {
        previous: Option<DesktopId>,
        new: DesktopId,
    },
    PinChanged {
        target: WindowHandle,
        operation: PinOperations,
    },
}

pub type EventSink = UnboundedSender<DesktopEvent>;

/// Source of virtual desktop state and events.
///
/// Events may be delivered from any thread; subscribers receive them through
/// the channel they registered.
#[async_trait]
pub trait DesktopProvider {
    /// Currently enumerated desktops, in display order.
    fn desktops(&self) -> Vec<DesktopId>;

    fn subscribe_switched(&self, sink: EventSink) -> Subscription;

    fn subscribe_pinned(&self, sink: EventSink) -> Subscription;

    async fn run(&self, _shutdown: Arc<tokio::sync::Notify>) {}
}

pub type DynDesktopProvider = dyn DesktopProvider + Send + Sync;

/// Registration token; the subscription ends when it is dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Subscriber list for one kind of event.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    sinks: Mutex<Vec<(u64, EventSink)>>,
}

impl Listeners {
    pub fn add(self: &Arc<Self>, sink: EventSink) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sinks.lock().push((id, sink));

        let listeners = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.sinks.lock().retain(|(x, _)| *x != id);
            }
        })
    }

    pub fn emit(&self, event: &DesktopEvent) {
        self.sinks
            .lock()
            .retain(|(_, sink)| sink.send(event.clone()).is_ok());
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn pin_operations_describe_action_and_target() {
        assert_eq!(
            (PinOperations::PIN | PinOperations::WINDOW).describe(),
            "Pinned this window"
        );
        assert_eq!(
            (PinOperations::UNPIN | PinOperations::APPLICATION).describe(),
            "Unpinned this application"
        );
        assert_eq!(
            (PinOperations::PIN | PinOperations::APPLICATION).describe(),
            "Pinned this application"
        );
        assert_eq!(
            (PinOperations::UNPIN | PinOperations::WINDOW).describe(),
            "Unpinned this window"
        );
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let listeners = Arc::new(Listeners::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = listeners.add(tx);

        let event = DesktopEvent::PinChanged {
            target: WindowHandle(7),
            operation: PinOperations::PIN | PinOperations::WINDOW,
        };
        listeners.emit(&event);
        assert_eq!(rx.try_recv().unwrap(), event);

        drop(subscription);
        assert!(listeners.is_empty());

        listeners.emit(&event);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_sinks_are_pruned_on_emit() {
        let listeners = Arc::new(Listeners::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let _subscription = listeners.add(tx);
        drop(rx);

        listeners.emit(&DesktopEvent::Switched {
            previous: None,
            new: DesktopId("1".to_owned()),
        });
        assert!(listeners.is_empty());
    }
}
