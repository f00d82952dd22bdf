//! webtexture - drives a capture bridge on the headless engine
//!
//! Polls frames at roughly 60 Hz the way an embedding render loop would,
//! plays a short scripted interaction, logs every bridge event and writes
//! the last captured frame as a PNG.

mod args;

use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use webtexture_config::BridgeConfig;
use webtexture_webview::{BridgeEvent, Frame, WebSurfaceBridge};

use args::Args;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// One scripted interaction, run once `at` has elapsed
struct Step {
    at: Duration,
    name: &'static str,
    run: fn(&WebSurfaceBridge),
}

fn script() -> Vec<Step> {
    vec![
        Step {
            at: Duration::from_millis(700),
            name: "tap",
            run: |bridge| {
                bridge.tap(bridge.width() as f32 / 2.0, bridge.height() as f32 / 2.0);
            },
        },
        Step {
            at: Duration::from_millis(900),
            name: "scroll",
            run: |bridge| bridge.scroll_by_amount(bridge.height() as i32 / 2),
        },
        Step {
            at: Duration::from_millis(1000),
            name: "scroll query",
            run: WebSurfaceBridge::get_scroll_info,
        },
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("webtexture v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            BridgeConfig::default()
        }
    };

    let bridge = WebSurfaceBridge::new(config, webtexture_frontend_headless::factory());
    if !bridge.initialize(args.width, args.height, &args.url) {
        return Err(format!("cannot initialize a {}x{} surface", args.width, args.height).into());
    }

    let last = run(&bridge, Duration::from_secs_f64(args.seconds.max(0.0)));
    bridge.destroy();

    let Some(frame) = last else {
        warn!("No frame captured in {:.1}s", args.seconds);
        return Ok(());
    };
    let image = frame
        .to_image()
        .ok_or("captured frame does not match its dimensions")?;
    image.save(&args.output)?;
    info!(
        "Wrote {}x{} frame to {}",
        frame.width,
        frame.height,
        args.output.display()
    );
    Ok(())
}

/// Poll for `duration`, returning the most recent frame
fn run(bridge: &WebSurfaceBridge, duration: Duration) -> Option<Frame> {
    let start = Instant::now();
    let mut steps = script().into_iter().peekable();
    let mut last = None;
    let mut frames = 0u32;

    while start.elapsed() < duration {
        while let Some(step) = steps.next_if(|s| start.elapsed() >= s.at) {
            info!("Running {}", step.name);
            (step.run)(bridge);
        }

        if let Some(frame) = bridge.capture_frame() {
            frames += 1;
            last = Some(frame);
        }

        for event in bridge.drain_events() {
            log_event(&event);
        }

        std::thread::sleep(FRAME_INTERVAL);
    }

    info!("Captured {} frames in {:.1}s", frames, start.elapsed().as_secs_f64());
    last
}

fn log_event(event: &BridgeEvent) {
    match event {
        // One per captured frame
        BridgeEvent::TextureUpdated => tracing::trace!("texture_updated"),
        BridgeEvent::ScrollInfoReceived(metrics) => {
            info!("scroll_info_received {}", metrics.to_json());
        }
        other => info!("{} {:?}", other.signal_name(), other.signal_args()),
    }
}
