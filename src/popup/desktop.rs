#[cfg(all(unix, not(target_os = "macos")))]
use std::collections::HashMap;

use anyhow::Context as _;
use notify_rust::{Notification, Timeout};

use crate::desktop::WindowHandle;
use crate::popup::{NotificationPayload, PopupId, PopupRenderer};

/// Shows popups as desktop notifications through the platform's notification
/// server. Dismissal is driven by [`crate::popup::PopupSlot`], so the server
/// is asked to keep them until closed.
#[derive(Default)]
pub struct DesktopRenderer {
    #[cfg(all(unix, not(target_os = "macos")))]
    handles: HashMap<PopupId, notify_rust::NotificationHandle>,
}

impl DesktopRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PopupRenderer for DesktopRenderer {
    fn show(
        &mut self,
        id: PopupId,
        payload: &NotificationPayload,
        anchor: Option<WindowHandle>,
    ) -> anyhow::Result<()> {
        if let Some(anchor) = anchor {
            log::debug!("Popup {id} belongs to window {:#x}", anchor.0);
        }

        let mut notification = Notification::new();
        notification
            .appname(&payload.title)
            .summary(&payload.header)
            .body(&payload.body)
            .timeout(Timeout::Never);

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            notification.hint(notify_rust::Hint::Transient(true));

            let handle = notification
                .show()
                .context("Failed to show desktop notification")?;
            self.handles.insert(id, handle);
        }

        #[cfg(not(all(unix, not(target_os = "macos"))))]
        notification
            .show()
            .map(|_| ())
            .context("Failed to show desktop notification")?;

        Ok(())
    }

    fn close(&mut self, id: PopupId) {
        #[cfg(all(unix, not(target_os = "macos")))]
        if let Some(handle) = self.handles.remove(&id) {
            handle.close();
        }

        #[cfg(not(all(unix, not(target_os = "macos"))))]
        log::debug!("Popup {id} is dismissed by the notification server");
    }
}
