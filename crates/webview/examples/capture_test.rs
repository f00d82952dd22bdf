//! Test example for bridge capture functionality
//!
//! Run with: cargo run -p webtexture-webview --example capture_test

use std::time::{Duration, Instant};

use webtexture_webview::{BridgeConfig, WebSurfaceBridge};

fn main() {
    let bridge = WebSurfaceBridge::new(
        BridgeConfig::default(),
        webtexture_frontend_headless::factory(),
    );

    println!("Initializing 800x600 surface...");
    if !bridge.initialize(800, 600, "https://example.com/") {
        eprintln!("Failed to initialize bridge");
        return;
    }

    let start = Instant::now();
    let mut polls = 0u32;
    while start.elapsed() < Duration::from_secs(2) {
        polls += 1;
        if let Some(frame) = bridge.capture_frame() {
            println!(
                "Captured {}x{} frame after {} polls ({:?})",
                frame.width,
                frame.height,
                polls,
                start.elapsed()
            );

            let Some(image) = frame.to_image() else {
                eprintln!("Frame size does not match its pixel buffer");
                return;
            };
            let path = std::env::temp_dir().join("webtexture_capture_test.png");
            match image.save(&path) {
                Ok(()) => println!("Saved capture to {}", path.display()),
                Err(e) => eprintln!("Failed to save capture: {}", e),
            }
            break;
        }

        for event in bridge.drain_events() {
            println!("event: {} {:?}", event.signal_name(), event.signal_args());
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    bridge.destroy();
    println!("Done");
}
