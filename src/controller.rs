use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::config::DynSettingsProvider;
use crate::desktop::{DesktopEvent, DesktopId, DynDesktopProvider, Subscription};
use crate::names::{LabelResolver, NameTable};
use crate::popup::{NotificationPayload, PopupRenderer, PopupSlot};
use crate::watcher::NameWatcher;

pub const SWITCH_HEADER: &str = "Virtual Desktop Switched";

/// Turns desktop events into popups.
///
/// Providers hand events over through a channel, so everything touching the
/// popup slot happens on the task running [`NotificationController::run`].
/// Construct one per process.
pub struct NotificationController {
    title: String,
    provider: Arc<DynDesktopProvider>,
    settings: Arc<DynSettingsProvider>,
    labels: LabelResolver,
    slot: PopupSlot,
    events: UnboundedReceiver<DesktopEvent>,
    subscriptions: Vec<Subscription>,
    watcher: Option<NameWatcher>,
}

impl NotificationController {
    pub fn new(
        title: &str,
        names: Arc<NameTable>,
        provider: Arc<DynDesktopProvider>,
        settings: Arc<DynSettingsProvider>,
        renderer: Box<dyn PopupRenderer>,
    ) -> anyhow::Result<Self> {
        // Without a watchable directory the names just never reload.
        let watcher = NameWatcher::new(Arc::clone(&names))
            .inspect_err(|e| log::warn!("{e:#}; desktop names will not be reloaded"))
            .ok();

        if let Err(e) = names.load() {
            log::warn!("{e:#}");
        }

        let (sink, events) = mpsc::unbounded_channel();
        let subscriptions = vec![
            provider.subscribe_switched(sink.clone()),
            provider.subscribe_pinned(sink),
        ];

        Ok(Self {
            title: title.to_owned(),
            provider,
            settings,
            labels: LabelResolver::new(names),
            slot: PopupSlot::new(renderer),
            events,
            subscriptions,
            watcher,
        })
    }

    pub async fn run(mut self, shutdown: Arc<tokio::sync::Notify>) {
        loop {
            tokio::select! {
                () = shutdown.notified() => break,
                Some(event) = self.events.recv() => self.handle_event(event),
                Some(id) = self.slot.next_expiry() => self.slot.expire(id),
            }
        }

        self.dispose();
    }

    fn handle_event(&mut self, event: DesktopEvent) {
        let settings = self.settings.settings();

        let (payload, anchor) = match event {
            DesktopEvent::Switched { new, .. } => {
                if !settings.notify_on_switch {
                    return;
                }

                let index = self.desktop_index(&new);
                let label = self.labels.resolve(index);
                log::info!("Switched to desktop {index} ({label})");

                let payload = NotificationPayload {
                    title: self.title.clone(),
                    header: SWITCH_HEADER.to_owned(),
                    body: label,
                };
                (payload, None)
            }
            DesktopEvent::PinChanged { target, operation } => {
                let body = operation.describe();
                log::info!("{body} ({:#x})", target.0);

                let payload = NotificationPayload {
                    title: self.title.clone(),
                    header: self.title.clone(),
                    body,
                };
                (payload, Some(target))
            }
        };

        if let Err(e) = self.slot.show(&payload, anchor, settings.duration()) {
            log::error!("{e:#}");
        }
    }

    /// 1-based position of `desktop` among the enumerated desktops, or 0 when
    /// it is not enumerated.
    fn desktop_index(&self, desktop: &DesktopId) -> i64 {
        self.provider
            .desktops()
            .iter()
            .position(|x| x == desktop)
            .and_then(|i| i64::try_from(i + 1).ok())
            .unwrap_or(0)
    }

    fn dispose(&mut self) {
        if self.watcher.take().is_some() {
            log::debug!("Stopped watching desktop names");
        }

        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }

        self.slot.clear();
    }
}

impl Drop for NotificationController {
    fn drop(&mut self) {
        self.dispose();
    }
}
