#![warn(clippy::pedantic)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::str_to_string)]
#![warn(clippy::unused_trait_names)]

use core::error::Error;
use std::io::Write as _;
use std::sync::Arc;

use clap::Parser as _;
use desktop_notify_rs::config::{self, DynSettingsProvider, Settings, SharedSettings};
use desktop_notify_rs::controller::NotificationController;
use desktop_notify_rs::desktop::DynDesktopProvider;
use desktop_notify_rs::desktop::stdin::StdinDesktopProvider;
use desktop_notify_rs::names::NameTable;
use desktop_notify_rs::popup::desktop::DesktopRenderer;
use futures::future;
use futures::stream::StreamExt as _;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File with one desktop name per line
    #[arg(long, value_name = "FILE", default_value = "DesktopNames.txt")]
    names_file: String,

    /// How long a notification stays on screen, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 2500)]
    duration: u64,

    /// Don't notify when switching desktops
    #[arg(long)]
    no_switch_notify: bool,

    /// Notification title
    #[arg(long, default_value = env!("CARGO_PKG_NAME"))]
    title: String,

    /// Number of desktops known before any `desktops` command arrives
    #[arg(long, value_name = "N", default_value_t = 4)]
    desktops: usize,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            if record.level() == log::Level::Info {
                writeln!(buf, "{}", record.args())
            } else {
                writeln!(buf, "[{}] {}", record.level(), record.args())
            }
        })
        .init();

    if let Err(e) = run(Args::parse()).await {
        log::error!("{e}");
    };
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let settings = SharedSettings::new(Settings::new(!args.no_switch_notify, args.duration)?);
    let names = Arc::new(NameTable::new(config::expand_path(&args.names_file)));

    let provider: Arc<DynDesktopProvider> =
        Arc::new(StdinDesktopProvider::new(args.desktops, settings.clone()));
    let settings: Arc<DynSettingsProvider> = Arc::new(settings);

    let controller = NotificationController::new(
        &args.title,
        names,
        Arc::clone(&provider),
        settings,
        Box::new(DesktopRenderer::new()),
    )
    .map_err(|e| format!("Startup error: {e:#}"))?;

    log::info!("Listening for desktop events on standard input");

    let shutdown = Arc::new(tokio::sync::Notify::new());

    tokio::select! {
        _ = future::join(
            controller.run(shutdown.clone()),
            provider.run(shutdown.clone()),
        ) => {}
        result = signal_handler(shutdown) => result?
    }

    Ok(())
}

async fn signal_handler(shutdown: Arc<tokio::sync::Notify>) -> Result<(), Box<dyn Error>> {
    let mut signals = signal_hook_tokio::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])?;

    signals.next().await;
    log::info!("Shutting down...");
    shutdown.notify_waiters();

    while let Some(signal) = signals.next().await {
        if signal == signal_hook::consts::SIGINT {
            Err("Didn't have time to gracefully disconnect and cleanup")?;
        }
    }

    Ok(())
}
