//! Scanloop CLI
//!
//! Command-line demonstration of the decode loop: a mock frame source
//! publishes synthetic frames into the slot while a decode session
//! runs against a scripted decoder, with Ctrl-C wired to cooperative
//! cancellation.

use clap::Parser;
use scanloop::{
    capture::{spawn_publisher, FileConfig, FrameGeometry, FrameSlot, MockFrameSource},
    decode::{BarcodeFormat, DecodeResult, MockDecoder},
    preprocess::RotationFactory,
    session::DecodeSession,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "scanloop",
    version,
    about = "Live barcode decode loop demonstration (mock camera input)"
)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Frame width override.
    #[arg(long)]
    width: Option<u32>,

    /// Frame height override.
    #[arg(long)]
    height: Option<u32>,

    /// Attempt count after which the scripted decoder reports a hit
    /// (0 = never).
    #[arg(long)]
    decode_after: Option<u64>,

    /// Metrics server port override (0 disables; requires the
    /// "metrics" feature).
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(width) = args.width {
        config.capture.width = width;
    }
    if let Some(height) = args.height {
        config.capture.height = height;
    }
    if let Some(decode_after) = args.decode_after {
        config.output.decode_after = decode_after;
    }
    if let Some(port) = args.metrics_port {
        config.output.metrics_port = port;
    }
    if let Err(e) = config.capture.validate() {
        eprintln!("Invalid capture configuration: {}", e);
        std::process::exit(1);
    }

    info!("Scanloop v{}", scanloop::VERSION);
    info!("This is a demonstration using mock camera input");

    // Frame source: a thread standing in for the camera preview
    // callback, overwriting the slot at the configured frame rate.
    let slot = Arc::new(FrameSlot::new());
    let stop_source = Arc::new(AtomicBool::new(false));
    let producer = spawn_publisher(
        MockFrameSource::new(config.capture.clone()),
        Arc::clone(&slot),
        Arc::clone(&stop_source),
    );

    let decoder = Arc::new(MockDecoder::succeeding_after(
        config.output.decode_after,
        DecodeResult::new("https://example.com/scanloop", BarcodeFormat::QrCode),
    ));
    let mut session = DecodeSession::with_config(
        Arc::clone(&slot),
        decoder as Arc<dyn scanloop::Decoder>,
        Arc::new(RotationFactory),
        config.session.clone(),
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst)) {
            warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    }

    #[cfg(feature = "metrics")]
    let metrics = start_metrics(config.output.metrics_port);

    let geometry = FrameGeometry::new(
        config.capture.width,
        config.capture.height,
        config.capture.orientation,
    );
    let (tx, rx) = mpsc::channel();
    if let Err(e) = session.start(geometry, move |result| {
        let _ = tx.send(result);
    }) {
        eprintln!("Failed to start decode loop: {}", e);
        std::process::exit(1);
    }

    let deadline = (config.output.timeout_secs > 0)
        .then(|| Instant::now() + Duration::from_secs(config.output.timeout_secs));

    let outcome = loop {
        if interrupted.load(Ordering::SeqCst) {
            info!("Interrupted, cancelling decode loop");
            break None;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Timed out without a result");
            break None;
        }
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(result) => break Some(result),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                #[cfg(feature = "metrics")]
                if let Some((_, registry)) = &metrics {
                    registry.update(&scanloop::metrics::MetricsSnapshot::from_session(&session));
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break None,
        }
    };

    // Teardown order: join the decode loop first, then stop the frame
    // source, then destroy the preprocessor.
    session.cancel();
    stop_source.store(true, Ordering::Release);
    let _ = producer.join();

    match &outcome {
        Some(result) => {
            info!(format = %result.format(), "Barcode decoded");
            println!("{}\t{}", result.format(), result.text());
        }
        None => info!("No barcode found before shutdown"),
    }

    let stats = session.stats();
    info!(
        attempts = stats.attempts(),
        empty_polls = stats.empty_polls(),
        results = stats.results(),
        panics_caught = stats.panics_caught(),
        "Session statistics"
    );
    session.close();
}

#[cfg(feature = "metrics")]
type MetricsHandle = (
    tokio::runtime::Runtime,
    Arc<scanloop::metrics::MetricsRegistry>,
);

#[cfg(feature = "metrics")]
fn start_metrics(port: u16) -> Option<MetricsHandle> {
    use scanloop::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!(error = %e, "Failed to create metrics registry");
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let registry = server.registry();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!(error = %e, "Failed to start metrics runtime");
            return None;
        }
    };
    runtime.spawn(async move {
        if let Err(e) = server.run().await {
            warn!(error = %e, "Metrics server failed");
        }
    });
    Some((runtime, registry))
}
