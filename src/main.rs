// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod advertisement;
mod app;
mod config;
mod device;
mod error;
mod location;
mod permissions;
mod reconciler;
mod scanner;
mod session;
mod ui;

use app::BeaconScout;
use config::Config;
use iced::Theme;
use permissions::Ungated;
use scanner::BtleplugDiscovery;
use session::{Capabilities, ScanController, SessionSettings, SessionUpdate};
use std::sync::Arc;

fn main() -> iced::Result {
    // On Windows, force wgpu to use Vulkan backend instead of DirectX 12
    // This prevents "INVALID_SUBRESOURCE_STATE" errors with D3D12 resource state transitions
    #[cfg(target_os = "windows")]
    std::env::set_var("WGPU_BACKEND", "vulkan");

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Using default configuration: {}", e);
        Config::default()
    });

    // Session thread -> UI thread
    let (update_sender, update_receiver) = crossbeam_channel::unbounded::<SessionUpdate>();

    // Desktop platforms have no runtime permission prompt
    let capabilities = Capabilities {
        discovery: Arc::new(BtleplugDiscovery::new()),
        locator: location::provider_from_config(&config.location.source),
        gate: Arc::new(Ungated),
    };

    let (controller, command_sender) =
        ScanController::new(update_sender, capabilities, SessionSettings::from(&config));

    let worker = std::thread::spawn(move || {
        controller.run();
    });

    let result = iced::application(
        "Beacon Scout: BLE Devices Scanned",
        BeaconScout::update,
        BeaconScout::view,
    )
    .subscription(BeaconScout::subscription)
    .theme(|_| Theme::Light)
    .window_size((480.0, 800.0))
    .run_with(move || BeaconScout::new(update_receiver, command_sender));

    // The UI dropped its command sender; wait for the radio to be released
    if worker.join().is_err() {
        log::error!("Scan controller thread panicked");
    }

    result
}
