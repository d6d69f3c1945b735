//! NFC Tag Capture - polls a contactless reader and logs tag UIDs
//!
//! The poll loop runs on its own thread and owns the reader. The main task
//! consumes identifiers until Ctrl+C, then closes the reader.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{select, Receiver};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nfc_tag_capture::config::{Config, GpioBackendKind, NfcBackendKind};
use nfc_tag_capture::gpio::{GpioBackend, SimulatedGpio};
use nfc_tag_capture::nfc::{parse_sim_targets, NfcDriver, SimulatedDriver};
use nfc_tag_capture::{Shutdown, TagReader, TagUid};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   NFC Tag Capture");
    info!("===========================================");

    let config = Config::from_env();

    info!("Configuration:");
    info!(
        "  Connection: {}",
        if config.connection.is_empty() { "<autodetect>" } else { config.connection.as_str() }
    );
    info!("  Reader backend: {}", config.nfc_backend);
    info!("  Reset pin: {} on {} ({})", config.reset_pin, config.gpio_chip, config.gpio_backend);
    info!("  Poll timeout: {} ms", config.poll_timeout_ms);
    info!("  Poll interval: {} ms", config.poll_interval_ms);
    info!("  Channel capacity: {}", config.channel_capacity);

    let driver = nfc_driver(&config)?;

    let reader = Arc::new(TagReader::with_settings(
        config.connection.clone(),
        config.reset_pin,
        driver,
        gpio_backend(config.gpio_backend),
        config.reader_settings(),
    ));

    if config.reset_on_start {
        reader.reset();
    }

    let shutdown = Shutdown::new();

    // Ctrl+C cancels both the poll loop and the consumer
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down..."),
            Err(e) => error!("Cannot listen for Ctrl+C: {}", e),
        }
        signal.cancel();
    });

    let listener = {
        let reader = reader.clone();
        let shutdown = shutdown.clone();
        thread::Builder::new()
            .name("nfc-poll".to_string())
            .spawn(move || {
                let result = reader.listen(&shutdown);
                if result.is_err() {
                    // Nothing more will arrive; release the consumer
                    shutdown.cancel();
                }
                result
            })
            .context("Failed to spawn poll thread")?
    };

    info!("===========================================");
    info!("  Waiting for tags...");
    info!("  Press Ctrl+C to stop.");
    info!("===========================================");

    let tags = reader.identifiers();
    let consumer_shutdown = shutdown.clone();
    let waiting_interval = config.waiting_log_interval();
    let tags_read = tokio::task::spawn_blocking(move || {
        consume_tags(tags, &consumer_shutdown, waiting_interval)
    })
    .await
    .context("Tag consumer failed")?;

    let listen_result = listener
        .join()
        .map_err(|_| anyhow!("Poll thread panicked"))?;

    reader.cleanup().context("Error cleaning up the reader")?;
    listen_result.context("Reader stopped with an error")?;

    info!(
        "Shutdown complete. Tags read: {}, Polls: {}, Resets: {}",
        tags_read,
        reader.stats().get_polls(),
        reader.stats().get_resets()
    );
    Ok(())
}

fn nfc_driver(config: &Config) -> Result<Box<dyn NfcDriver>> {
    match config.nfc_backend {
        #[cfg(feature = "nfc1")]
        NfcBackendKind::Libnfc => Ok(Box::new(nfc_tag_capture::nfc::LibnfcDriver)),
        #[cfg(not(feature = "nfc1"))]
        NfcBackendKind::Libnfc => {
            warn!("Built without libnfc support, reader is simulated");
            simulated_driver(config)
        }
        NfcBackendKind::Sim => simulated_driver(config),
    }
}

fn simulated_driver(config: &Config) -> Result<Box<dyn NfcDriver>> {
    let targets = match &config.sim_tags {
        Some(script) => parse_sim_targets(script)
            .map_err(|e| anyhow!(e))
            .context("Invalid NFC_SIM_TAGS")?,
        None => Vec::new(),
    };
    info!("  Simulated reader: {} scripted tag(s)", targets.len());
    Ok(Box::new(SimulatedDriver::with_targets(targets)))
}

fn gpio_backend(kind: GpioBackendKind) -> Box<dyn GpioBackend> {
    match kind {
        #[cfg(feature = "rppal")]
        GpioBackendKind::Rppal => Box::new(nfc_tag_capture::gpio::rppal::RppalGpio),
        #[cfg(not(feature = "rppal"))]
        GpioBackendKind::Rppal => {
            warn!("Built without rppal support, reset line is simulated");
            Box::new(SimulatedGpio::new())
        }
        GpioBackendKind::Sim => Box::new(SimulatedGpio::new()),
    }
}

/// Log identifiers until shutdown; returns how many were read
fn consume_tags(tags: Receiver<TagUid>, shutdown: &Shutdown, waiting_interval: Duration) -> u64 {
    let mut count = 0u64;

    loop {
        select! {
            recv(tags) -> msg => match msg {
                Ok(uid) => {
                    count += 1;
                    info!("Read tag: {}", uid);
                }
                Err(_) => {
                    warn!("Tag channel closed");
                    break;
                }
            },
            recv(shutdown.done()) -> _ => break,
            default(waiting_interval) => {
                debug!("{}: Waiting for a tag", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"));
            }
        }
    }

    count
}
