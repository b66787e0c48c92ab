pub mod desktop;

use core::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::desktop::WindowHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub header: String,
    pub body: String,
}

pub type PopupId = u64;

/// Whatever puts notification popups on screen.
pub trait PopupRenderer {
    fn show(
        &mut self,
        id: PopupId,
        payload: &NotificationPayload,
        anchor: Option<WindowHandle>,
    ) -> anyhow::Result<()>;

    fn close(&mut self, id: PopupId);
}

struct ActivePopup {
    id: PopupId,
    cancel: CancellationToken,
    timer: JoinHandle<()>,
}

/// Holds at most one visible popup together with its auto-dismiss timer.
///
/// Expired timers report back through [`PopupSlot::next_expiry`]; the owner
/// feeds the id to [`PopupSlot::expire`] on its own task, which ignores ids
/// that have since been replaced.
pub struct PopupSlot {
    renderer: Box<dyn PopupRenderer>,
    current: Option<ActivePopup>,
    next_id: PopupId,
    expired_tx: UnboundedSender<PopupId>,
    expired_rx: UnboundedReceiver<PopupId>,
}

impl PopupSlot {
    pub fn new(renderer: Box<dyn PopupRenderer>) -> Self {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();

        Self {
            renderer,
            current: None,
            next_id: 1,
            expired_tx,
            expired_rx,
        }
    }

    pub fn show(
        &mut self,
        payload: &NotificationPayload,
        anchor: Option<WindowHandle>,
        duration: Duration,
    ) -> anyhow::Result<()> {
        self.clear();

        let id = self.next_id;
        self.next_id += 1;

        self.renderer.show(id, payload, anchor)?;

        let cancel = CancellationToken::new();
        let timer = tokio::spawn({
            let cancel = cancel.clone();
            let expired_tx = self.expired_tx.clone();
            async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = time::sleep(duration) => {
                        let _ = expired_tx.send(id);
                    }
                }
            }
        });

        self.current = Some(ActivePopup { id, cancel, timer });

        Ok(())
    }

    /// Waits for the next auto-dismiss timer to fire.
    pub async fn next_expiry(&mut self) -> Option<PopupId> {
        self.expired_rx.recv().await
    }

    pub fn expire(&mut self, id: PopupId) {
        match self.current.take() {
            Some(popup) if popup.id == id => {
                log::debug!("Popup {id} expired");
                self.renderer.close(popup.id);
            }
            other => {
                log::debug!("Ignoring stale expiry of popup {id}");
                self.current = other;
            }
        }
    }

    /// Cancels the pending timer and closes the popup, if any.
    pub fn clear(&mut self) {
        if let Some(popup) = self.current.take() {
            popup.cancel.cancel();
            popup.timer.abort();
            self.renderer.close(popup.id);
        }
    }

    pub fn is_showing(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for PopupSlot {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use anyhow::bail;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Show(PopupId, NotificationPayload, Option<WindowHandle>),
        Close(PopupId),
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingRenderer {
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub fail: Arc<Mutex<bool>>,
    }

    impl RecordingRenderer {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        pub fn closes(&self) -> Vec<PopupId> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Close(id) => Some(id),
                    Call::Show(..) => None,
                })
                .collect()
        }
    }

    impl PopupRenderer for RecordingRenderer {
        fn show(
            &mut self,
            id: PopupId,
            payload: &NotificationPayload,
            anchor: Option<WindowHandle>,
        ) -> anyhow::Result<()> {
            if *self.fail.lock() {
                bail!("renderer unavailable");
            }
            self.calls
                .lock()
                .push(Call::Show(id, payload.clone(), anchor));
            Ok(())
        }

        fn close(&mut self, id: PopupId) {
            self.calls.lock().push(Call::Close(id));
        }
    }

    fn payload(body: &str) -> NotificationPayload {
        NotificationPayload {
            title: "title".to_owned(),
            header: "header".to_owned(),
            body: body.to_owned(),
        }
    }

    const DURATION: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn popup_closes_after_duration() {
        let renderer = RecordingRenderer::default();
        let mut slot = PopupSlot::new(Box::new(renderer.clone()));

        slot.show(&payload("one"), None, DURATION).unwrap();
        assert!(slot.is_showing());

        let id = slot.next_expiry().await.unwrap();
        slot.expire(id);

        assert!(!slot.is_showing());
        assert_eq!(
            renderer.calls(),
            vec![Call::Show(1, payload("one"), None), Call::Close(1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn newer_show_replaces_pending_popup() {
        let renderer = RecordingRenderer::default();
        let mut slot = PopupSlot::new(Box::new(renderer.clone()));

        slot.show(&payload("one"), None, DURATION).unwrap();
        time::advance(Duration::from_millis(600)).await;
        slot.show(&payload("two"), Some(WindowHandle(3)), DURATION)
            .unwrap();

        assert_eq!(
            renderer.calls(),
            vec![
                Call::Show(1, payload("one"), None),
                Call::Close(1),
                Call::Show(2, payload("two"), Some(WindowHandle(3))),
            ]
        );

        // Only the second timer is left, and it fires on its own schedule.
        let id = slot.next_expiry().await.unwrap();
        assert_eq!(id, 2);
        slot.expire(id);
        assert_eq!(renderer.closes(), vec![1, 2]);

        let late = time::timeout(Duration::from_secs(10), slot.next_expiry()).await;
        assert!(late.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_expiry_does_not_close_current_popup() {
        let renderer = RecordingRenderer::default();
        let mut slot = PopupSlot::new(Box::new(renderer.clone()));

        slot.show(&payload("one"), None, DURATION).unwrap();
        slot.show(&payload("two"), None, DURATION).unwrap();

        // An expiry for the first popup that raced past its cancellation.
        slot.expire(1);

        assert!(slot.is_showing());
        assert_eq!(renderer.closes(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_pending_timer() {
        let renderer = RecordingRenderer::default();
        let mut slot = PopupSlot::new(Box::new(renderer.clone()));

        slot.show(&payload("one"), None, DURATION).unwrap();
        slot.clear();
        assert_eq!(renderer.closes(), vec![1]);

        let late = time::timeout(Duration::from_secs(10), slot.next_expiry()).await;
        assert!(late.is_err());
        assert_eq!(renderer.closes(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_slot_closes_popup() {
        let renderer = RecordingRenderer::default();
        let slot = {
            let mut slot = PopupSlot::new(Box::new(renderer.clone()));
            slot.show(&payload("one"), None, DURATION).unwrap();
            slot
        };

        drop(slot);
        time::advance(Duration::from_secs(10)).await;

        assert_eq!(renderer.closes(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_render_leaves_slot_empty() {
        let renderer = RecordingRenderer::default();
        let mut slot = PopupSlot::new(Box::new(renderer.clone()));

        slot.show(&payload("one"), None, DURATION).unwrap();
        *renderer.fail.lock() = true;

        assert!(slot.show(&payload("two"), None, DURATION).is_err());
        assert!(!slot.is_showing());
        assert_eq!(renderer.closes(), vec![1]);
    }
}
