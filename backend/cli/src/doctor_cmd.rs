//! CLI Doctor Command
//!
//! Checks the effective configuration and whether the camera backend can run.

use std::path::Path;

use anyhow::Result;
use cardscan_config::{validate, CameraBackendKind, CardScanConfig};
use cardscan_core::FacingMode;

/// Executes the full doctor diagnosis.
pub async fn run(config: &CardScanConfig, config_path: &Path) -> Result<()> {
    println!("\n🔍 Running cardscan doctor...\n");

    let is_ok = check_config(config, config_path) & check_camera(config);

    println!();
    if is_ok {
        println!("✅ All checks passed! cardscan is ready to scan.");
    } else {
        println!("❌ Some checks failed! Please fix the errors above.");
    }

    Ok(())
}

fn check_config(config: &CardScanConfig, config_path: &Path) -> bool {
    println!("Checking Configuration:");
    if config_path.exists() {
        println!("  🟢 Config file: {}", config_path.display());
    } else {
        println!("  🟡 No config file at {} (defaults and environment only)", config_path.display());
    }

    let report = validate(config);
    if config.inference.api_key.is_some() {
        println!("  🟢 API key is set");
    }
    if config.submission.webhook_url.is_some() {
        println!("  🟢 Webhook URL is set (mode: {:?})", config.submission.mode);
    }
    for warning in &report.warnings {
        println!("  🟡 {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("  🔴 {}: {} (REQUIRED)", error.path, error.message);
    }

    report.is_valid()
}

fn check_camera(config: &CardScanConfig) -> bool {
    println!("Checking Camera:");
    let camera = &config.camera;
    match camera.backend {
        CameraBackendKind::Synthetic => {
            println!("  🟡 Synthetic camera (test pattern, no real capture)");
            true
        }
        CameraBackendKind::File => match &camera.still_path {
            Some(path) if path.exists() => {
                println!("  🟢 Still image: {}", path.display());
                true
            }
            Some(path) => {
                println!("  🔴 Still image not found: {}", path.display());
                false
            }
            None => {
                println!("  🔴 camera.stillPath is not set (REQUIRED for the file backend)");
                false
            }
        },
        CameraBackendKind::V4l2 => {
            if !cfg!(feature = "v4l2") {
                println!("  🔴 This build has no V4L2 support (rebuild with --features v4l2)");
                return false;
            }
            let mut ok = true;
            for facing in [FacingMode::Rear, FacingMode::Front] {
                let device = camera.device_for(facing);
                if Path::new(device).exists() {
                    println!("  🟢 {facing} camera: {device}");
                } else {
                    println!("  🔴 {facing} camera not found: {device}");
                    ok = false;
                }
            }
            ok
        }
    }
}
