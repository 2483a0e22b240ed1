//! Camera Scan CLI
//!
//! Runs a scanner against a synthetic camera feed and a scripted decoder,
//! logging scan results and lifecycle events.

use camera_scan::{
    capture::{MockCamera, PageVisibility, Visibility},
    config::FileConfig,
    decode::MockDecoder,
    events::{EventKind, ScanEvent},
    metrics::{MetricsRegistry, MetricsSnapshot},
    Scanner,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "camera-scan", version, about = "Scan loop demonstration with a synthetic camera")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Decode every Nth display frame.
    #[arg(long)]
    scan_period: Option<u32>,
    /// Refractory period in milliseconds.
    #[arg(long)]
    refractory_ms: Option<u64>,
    /// Keep scanning while the page is hidden.
    #[arg(long)]
    background_scan: bool,
    /// Attach still images to scan results.
    #[arg(long)]
    capture_image: bool,
    /// Payload the synthetic decoder reports.
    #[arg(long)]
    payload: Option<String>,
    /// Run time in seconds (0 runs until interrupted).
    #[arg(long)]
    duration_secs: Option<u64>,
    /// Simulate the page being hidden for two seconds after this delay.
    #[arg(long)]
    hide_after_secs: Option<u64>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(scan_period) = cli.scan_period {
        config.scanner.scan_period = scan_period;
    }
    if let Some(refractory_ms) = cli.refractory_ms {
        config.scanner.refractory_period_ms = refractory_ms;
    }
    config.scanner.background_scan |= cli.background_scan;
    config.scanner.capture_image |= cli.capture_image;
    if let Some(payload) = cli.payload.clone() {
        config.demo.payload = payload;
    }
    if let Some(duration_secs) = cli.duration_secs {
        config.demo.duration_secs = duration_secs;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    if let Err(e) = local.block_on(&runtime, run(config, cli.hide_after_secs)) {
        eprintln!("Scanner failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: FileConfig, hide_after_secs: Option<u64>) -> Result<(), camera_scan::ScanError> {
    info!("Camera Scan v{}", camera_scan::VERSION);
    info!("This is a demonstration using a synthetic camera feed");

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || signal.notify_one()) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let visibility = PageVisibility::default();
    let decoder = MockDecoder::always(config.demo.payload.clone());
    let scanner = Scanner::new(config.scanner.clone(), None, decoder, &visibility)?;

    scanner.on(EventKind::Scan, |event| {
        if let ScanEvent::Scan(result) = event {
            info!(
                text = %result.text,
                image_bytes = result.image.as_ref().map_or(0, |i| i.bytes.len()),
                at = %result.scanned_at,
                "Scan"
            );
        }
    });
    scanner.on(EventKind::Active, |_| info!("Camera engaged"));
    scanner.on(EventKind::Inactive, |_| info!("Camera released"));

    let camera = MockCamera::new("synthetic");
    spawn_feed(camera.clone(), &config);

    let registry = match MetricsRegistry::new() {
        Ok(registry) => Some(registry),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };
    #[cfg(feature = "metrics")]
    let registry = serve_metrics(registry, &scanner, config.metrics.port);

    scanner.start(Some(camera)).await?;

    if let Some(delay) = hide_after_secs {
        let page = visibility.clone();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(Duration::from_secs(delay)).await;
            info!("Page hidden");
            page.set(Visibility::Hidden);
            tokio::time::sleep(Duration::from_secs(2)).await;
            info!("Page visible");
            page.set(Visibility::Visible);
        });
    }

    let duration = config.demo.duration_secs;
    tokio::select! {
        _ = shutdown.notified() => info!("Interrupted"),
        _ = tokio::time::sleep(Duration::from_secs(duration)), if duration > 0 => {}
    }

    scanner.stop().await;

    let snapshot = MetricsSnapshot::from_scanner(&scanner);
    info!(
        "Processed {} frames: {} decode attempts, {} results, {} reported, {} suppressed",
        snapshot.ticks, snapshot.decode_attempts, snapshot.decoded, snapshot.accepted, snapshot.suppressed
    );
    if let Some(registry) = registry {
        registry.update(&snapshot);
        if let Ok(text) = registry.encode() {
            tracing::debug!("Final metrics:\n{}", text);
        }
    }

    info!("Done. Activations: {}", scanner.activations());
    Ok(())
}

/// Publishes frames from the synthetic camera while it is streaming.
fn spawn_feed(camera: MockCamera, config: &FileConfig) {
    let (width, height) = (config.demo.width, config.demo.height);
    let period = Duration::from_secs(1) / config.demo.fps.max(1);

    tokio::task::spawn_local(async move {
        let mut ticker = tokio::time::interval(period);
        let mut shade = 0u8;
        loop {
            ticker.tick().await;
            if camera.is_streaming() {
                shade = shade.wrapping_add(1);
                camera.push_test_pattern(width, height, [shade, shade, shade, 255]);
            }
        }
    });
    tracing::debug!(width, height, "Synthetic feed running");
}

/// Starts the HTTP exporter and a task pushing snapshots to it.
#[cfg(feature = "metrics")]
fn serve_metrics<D>(
    registry: Option<MetricsRegistry>,
    scanner: &Scanner<MockCamera, D>,
    port: u16,
) -> Option<MetricsRegistry>
where
    D: camera_scan::DecodePrimitive + 'static,
{
    use camera_scan::metrics::{MetricsServer, MetricsServerConfig};

    let registry = registry?;
    if port == 0 {
        return Some(registry);
    }

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();
    tokio::task::spawn_local(async move {
        if let Err(e) = server.run().await {
            warn!("Metrics server stopped: {}", e);
        }
    });

    let scanner = scanner.clone();
    tokio::task::spawn_local(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let snapshot = MetricsSnapshot::from_scanner(&scanner);
            state.write().await.update(&snapshot);
        }
    });
    None
}
