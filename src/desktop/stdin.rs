use std::io::{self, BufRead as _};
use std::sync::Arc;
use std::thread;

use anyhow::{Context as _, anyhow, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::SharedSettings;
use crate::desktop::{
    DesktopEvent, DesktopId, DesktopProvider, EventSink, Listeners, PinOperations, Subscription,
    WindowHandle,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Desktops(Vec<DesktopId>),
    Switch(DesktopId),
    Pin(WindowHandle, PinOperations),
    NotifyOnSwitch(bool),
    Duration(u64),
}

/// Parses one line of the stdin protocol. Blank lines and `#` comments yield
/// `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let command = match (verb, args.as_slice()) {
        ("desktops", ids) => {
            Command::Desktops(ids.iter().map(|x| DesktopId((*x).to_owned())).collect())
        }
        ("switch", [id]) => Command::Switch(DesktopId((*id).to_owned())),
        (action @ ("pin" | "unpin"), [target, handle]) => {
            let mut operation = if action == "pin" {
                PinOperations::PIN
            } else {
                PinOperations::UNPIN
            };
            operation |= match *target {
                "window" => PinOperations::WINDOW,
                "app" | "application" => PinOperations::APPLICATION,
                other => bail!("Unknown pin target '{other}'"),
            };
            Command::Pin(parse_handle(handle)?, operation)
        }
        ("set", ["notify", value]) => Command::NotifyOnSwitch(match *value {
            "on" | "true" => true,
            "off" | "false" => false,
            other => bail!("Expected on or off, got '{other}'"),
        }),
        ("set", ["duration", value]) => Command::Duration(
            value
                .parse()
                .with_context(|| format!("Invalid duration '{value}'"))?,
        ),
        _ => bail!("Unrecognized command '{line}'"),
    };

    Ok(Some(command))
}

fn parse_handle(text: &str) -> anyhow::Result<WindowHandle> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };

    parsed
        .map(WindowHandle)
        .map_err(|e| anyhow!("Invalid window handle '{text}': {e}"))
}

/// Desktop provider driven by commands on standard input, for wiring the
/// daemon to a window manager hook or a script.
pub struct StdinDesktopProvider {
    desktops: Mutex<Vec<DesktopId>>,
    current: Mutex<Option<DesktopId>>,
    switched: Arc<Listeners>,
    pinned: Arc<Listeners>,
    settings: SharedSettings,
}

impl StdinDesktopProvider {
    pub fn new(count: usize, settings: SharedSettings) -> Self {
        let desktops: Vec<DesktopId> = (1..=count).map(|i| DesktopId(i.to_string())).collect();

        Self {
            current: Mutex::new(desktops.first().cloned()),
            desktops: Mutex::new(desktops),
            switched: Arc::new(Listeners::default()),
            pinned: Arc::new(Listeners::default()),
            settings,
        }
    }

    pub fn apply(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Desktops(ids) => {
                log::info!("Desktops: {}", ids.len());
                *self.desktops.lock() = ids;
            }
            Command::Switch(new) => {
                let previous = self.current.lock().replace(new.clone());
                if self.switched.is_empty() {
                    log::debug!("No subscribers for switch to desktop {new}");
                }
                self.switched.emit(&DesktopEvent::Switched { previous, new });
            }
            Command::Pin(target, operation) => {
                if self.pinned.is_empty() {
                    log::debug!("No subscribers for pin change of window {:#x}", target.0);
                }
                self.pinned
                    .emit(&DesktopEvent::PinChanged { target, operation });
            }
            Command::NotifyOnSwitch(enabled) => self.settings.set_notify_on_switch(enabled),
            Command::Duration(ms) => self.settings.set_duration_ms(ms)?,
        }

        Ok(())
    }
}

#[async_trait]
impl DesktopProvider for StdinDesktopProvider {
    fn desktops(&self) -> Vec<DesktopId> {
        self.desktops.lock().clone()
    }

    fn subscribe_switched(&self, sink: EventSink) -> Subscription {
        self.switched.add(sink)
    }

    fn subscribe_pinned(&self, sink: EventSink) -> Subscription {
        self.pinned.add(sink)
    }

    async fn run(&self, shutdown: Arc<tokio::sync::Notify>) {
        // A blocked read on a plain thread does not hold up runtime shutdown.
        let (tx, mut lines) = mpsc::unbounded_channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                () = shutdown.notified() => break,
                line = lines.recv() => match line {
                    Some(Ok(line)) => {
                        let result = parse_line(&line)
                            .and_then(|command| command.map_or(Ok(()), |x| self.apply(x)));
                        if let Err(e) = result {
                            log::warn!("{e:#}");
                        }
                    }
                    Some(Err(e)) => {
                        log::error!("Failed to read standard input: {e}");
                        break;
                    }
                    None => {
                        log::info!("Standard input closed, no more desktop events");
                        break;
                    }
                }
            }
        }
    }
}
