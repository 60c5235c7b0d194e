use std::io::{stderr, stdout};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use acqmon::acq::{self, AcqResults};
use acqmon::framing::{Frame, MSG_ACQ_RESULT, MSG_PRINT};
use acqmon::link::{Dispatcher, Handler};
use acqmon::monitor::Monitor;
use acqmon::transport::{self, TransportConfig};
use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::bounded;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Live monitor for SBP satellite acquisition results.
///
/// Reads the receiver's telemetry stream, tracks acquisition results and
/// periodically reports per-satellite SNR statistics until interrupted.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Serial device to read from.
    #[arg(short, long, default_value = "/dev/ttyUSB0", value_name = "device")]
    port: String,

    /// Serial baud rate.
    #[arg(short, long, default_value_t = 1_000_000)]
    baud: u32,

    /// Locate the receiver by USB vendor/product id instead of a device path.
    #[arg(short, long)]
    ftdi: bool,

    /// USB vendor id used with --ftdi.
    #[arg(long, default_value_t = 0x0403)]
    vid: u16,

    /// USB product id used with --ftdi.
    #[arg(long, default_value_t = 0x6001)]
    pid: u16,

    /// Replay a captured session from this file instead of a live device.
    #[arg(short, long, value_name = "path")]
    input: Option<PathBuf>,

    /// Number of acquisition records to keep in memory, 0 = no limit.
    #[arg(short = 'n', long, default_value_t = 0)]
    records: usize,

    /// Number of recent records shown in each report.
    #[arg(long, default_value_t = 32)]
    tail: usize,

    /// SNR threshold for the qualifying-satellite mean.
    #[arg(long, default_value_t = 25.0)]
    threshold: f32,

    /// Report interval in milliseconds.
    #[arg(long, default_value_t = 100, value_name = "millis")]
    interval_ms: u64,
}

impl Cli {
    fn transport_config(&self) -> TransportConfig {
        if let Some(path) = &self.input {
            TransportConfig::Replay { path: path.clone() }
        } else if self.ftdi {
            TransportConfig::UsbBridge {
                vid: self.vid,
                pid: self.pid,
                baud: self.baud,
            }
        } else {
            TransportConfig::Serial {
                path: self.port.clone(),
                baud: self.baud,
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("ACQMON_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let reader = transport::open(&cli.transport_config()).context("opening transport")?;

    let running = Arc::new(AtomicBool::new(true));
    let (quit_tx, quit_rx) = bounded(1);
    {
        let running = running.clone();
        let quit_tx = quit_tx.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
            let _ = quit_tx.try_send(());
        })
        .context("setting interrupt handler")?;
    }

    let results = AcqResults::shared(cli.records);

    let mut dispatcher = Dispatcher::new();
    dispatcher.subscribe(MSG_PRINT, |frame: &Frame| {
        info!("{}", String::from_utf8_lossy(&frame.payload).trim_end());
        Ok(())
    });
    dispatcher.subscribe(MSG_ACQ_RESULT, acq::subscriber(results.clone()));

    let handler = Handler::new(reader, dispatcher, running.clone());
    let decoder = thread::Builder::new()
        .name("sbp_decoder".into())
        .spawn(move || {
            let zult = handler.run();
            if zult.is_err() {
                // Transport-fatal; stop the monitor so the error surfaces
                let _ = quit_tx.try_send(());
            }
            zult
        })
        .context("spawning decode thread")?;

    let monitor = Monitor::builder()
        .results(results)
        .interval(Duration::from_millis(cli.interval_ms))
        .tail(cli.tail)
        .threshold(cli.threshold)
        .build();
    let zult = monitor.run(&mut stdout(), &quit_rx);

    running.store(false, Ordering::SeqCst);
    match decoder.join() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(err).context("decode loop failed"),
        Err(_) => warn!("decode thread panicked"),
    }

    zult.context("monitor failed")
}
