//! # Scan Session Module
//!
//! Runs BLE discovery sessions on behalf of the UI.
//!
//! ## Key Components
//! - `ScanController`: command loop on its own thread with its own Tokio runtime
//! - `run_session`: one session's pipeline
//!
//! ## Pipeline
//! ```text
//! advertisements ─▶ filter ─▶ location lookup (bounded, concurrent)
//!                                   │ completion order
//!                                   ▼
//!                      reconcile queue ─▶ reconciler ─▶ UI snapshots
//! ```
//! Lookups finish in any order; the reconciler sees them in the order they
//! finished, so the latest completed sighting of a device wins.

use crate::advertisement::Advertisement;
use crate::config::Config;
use crate::device::DiscoveredDevice;
use crate::error::{ScanError, SessionError};
use crate::location::{locate, LocationProvider, LocationRequest};
use crate::permissions::{ensure_permissions, PermissionGate};
use crate::reconciler::{reconcile_loop, ResultSet};
use crate::scanner::DiscoverySource;
use chrono::Utc;
use crossbeam_channel::Sender;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const PERMISSION_ALERT_TITLE: &str = "Permissions required";
pub const PERMISSION_ALERT_MESSAGE: &str =
    "Bluetooth and Location permissions are needed to scan for devices.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Stop,
    /// Discard the current results. A running session restarts empty.
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Scanning,
    Stopped,
    PermissionsRequired,
    Failed(String),
}

/// Messages from the session thread to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Status(SessionStatus),
    Devices(Vec<DiscoveredDevice>),
    Alert { title: String, message: String },
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub location_request: LocationRequest,
    pub max_concurrent_lookups: usize,
    /// Reconcile sightings without coordinates when the lookup fails
    pub record_without_location: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            location_request: config.location.request(),
            max_concurrent_lookups: config.max_concurrent_lookups.max(1),
            record_without_location: config.record_without_location,
        }
    }
}

/// The capabilities a session is built from
#[derive(Clone)]
pub struct Capabilities {
    pub discovery: Arc<dyn DiscoverySource>,
    pub locator: Arc<dyn LocationProvider>,
    pub gate: Arc<dyn PermissionGate>,
}

struct ActiveSession {
    stop_flag: Arc<AtomicBool>,
    scan: JoinHandle<Result<JoinHandle<ResultSet>, ScanError>>,
}

/// Owns the lifecycle of scan sessions.
///
/// Starting while a session is already scanning is ignored. Stopping waits until
/// the radio has been released; lookups already issued are left to finish and
/// their results are dropped, and no new lookup is issued.
pub struct ScanController {
    command_receiver: mpsc::Receiver<SessionCommand>,
    update_sender: Sender<SessionUpdate>,
    capabilities: Capabilities,
    settings: SessionSettings,
}

impl ScanController {
    /// Returns the controller and a sender for issuing commands from the UI thread.
    pub fn new(
        update_sender: Sender<SessionUpdate>,
        capabilities: Capabilities,
        settings: SessionSettings,
    ) -> (Self, mpsc::Sender<SessionCommand>) {
        let (command_sender, command_receiver) = mpsc::channel();

        let controller = ScanController {
            command_receiver,
            update_sender,
            capabilities,
            settings,
        };

        (controller, command_sender)
    }

    /// Runs the command loop until the command channel closes.
    ///
    /// Call this from a dedicated thread; it blocks.
    pub fn run(self) {
        let rt = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                let error = SessionError::RuntimeCreation(e.to_string());
                log::error!("{}", error);
                self.publish(SessionUpdate::Status(SessionStatus::Failed(error.to_string())));
                return;
            }
        };

        let mut active: Option<ActiveSession> = None;

        while let Ok(command) = self.command_receiver.recv() {
            log::debug!("Scan controller: {:?}", command);
            match command {
                SessionCommand::Start => self.start(&rt, &mut active),
                SessionCommand::Stop => self.stop(&rt, &mut active),
                SessionCommand::Clear => {
                    let was_scanning = active.as_ref().map_or(false, |s| !s.scan.is_finished());
                    self.stop(&rt, &mut active);
                    self.publish(SessionUpdate::Devices(Vec::new()));
                    if was_scanning {
                        self.start(&rt, &mut active);
                    }
                }
            }
        }

        log::info!("Scan controller: command channel closed, shutting down");
        self.stop(&rt, &mut active);
    }

    fn start(&self, rt: &Runtime, active: &mut Option<ActiveSession>) {
        if let Some(session) = active {
            if !session.scan.is_finished() {
                log::warn!("Scan already running, ignoring start request");
                return;
            }
        }
        // A session whose stream ended on its own may still have lookups in flight
        self.stop(rt, active);

        if let Err(error) = ensure_permissions(self.capabilities.gate.as_ref()) {
            log::warn!("{}", error);
            self.publish(SessionUpdate::Status(SessionStatus::PermissionsRequired));
            self.publish(SessionUpdate::Alert {
                title: PERMISSION_ALERT_TITLE.to_string(),
                message: PERMISSION_ALERT_MESSAGE.to_string(),
            });
            return;
        }

        let stop_flag = Arc::new(AtomicBool::new(false));

        // Every session begins with an empty result set
        self.publish(SessionUpdate::Devices(Vec::new()));
        self.publish(SessionUpdate::Status(SessionStatus::Scanning));

        let scan = rt.spawn(run_session(
            self.capabilities.clone(),
            self.settings.clone(),
            stop_flag.clone(),
            self.update_sender.clone(),
        ));

        *active = Some(ActiveSession { stop_flag, scan });
    }

    fn stop(&self, rt: &Runtime, active: &mut Option<ActiveSession>) {
        if let Some(session) = active.take() {
            log::info!("Scan controller: stopping session");
            session.stop_flag.store(true, Ordering::Relaxed);
            if let Err(e) = rt.block_on(session.scan) {
                log::error!("Scan task ended abnormally: {}", e);
            }
        }
    }

    fn publish(&self, update: SessionUpdate) {
        if self.update_sender.send(update).is_err() {
            log::warn!("Scan controller: update channel closed");
        }
    }
}

/// Runs one scan session until the advertisement stream ends or `stop_flag` is set.
///
/// The discovery source is always stopped before this returns. The returned handle
/// resolves to the final result set once every outstanding lookup has finished.
pub async fn run_session(
    capabilities: Capabilities,
    settings: SessionSettings,
    stop_flag: Arc<AtomicBool>,
    updates: Sender<SessionUpdate>,
) -> Result<JoinHandle<ResultSet>, ScanError> {
    log::info!("Starting BLE scan...");

    let mut advertisements = match capabilities.discovery.start().await {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("Could not start BLE scan: {}", e);
            let _ = updates.send(SessionUpdate::Status(SessionStatus::Failed(e.to_string())));
            return Err(e);
        }
    };

    let (sighting_sender, sighting_receiver) = tokio::sync::mpsc::unbounded_channel();
    let reconciler = tokio::spawn(reconcile_loop(
        sighting_receiver,
        updates.clone(),
        stop_flag.clone(),
    ));
    let lookups = Arc::new(Semaphore::new(settings.max_concurrent_lookups.max(1)));

    tokio::select! {
        _ = async {
            while let Some(event) = advertisements.next().await {
                match event {
                    Ok(advertisement) => dispatch(
                        advertisement,
                        &capabilities.locator,
                        &settings,
                        &lookups,
                        &sighting_sender,
                        &stop_flag,
                    ),
                    Err(e) => log::error!("BLE scan error: {}", e),
                }
            }
        } => {
            log::info!("Advertisement stream ended");
        }
        _ = wait_for_stop(&stop_flag) => {
            log::info!("Stopping BLE scan...");
        }
    }

    if let Err(e) = capabilities.discovery.stop().await {
        log::error!("Failed to stop BLE scan: {}", e);
    }
    let _ = updates.send(SessionUpdate::Status(SessionStatus::Stopped));

    Ok(reconciler)
}

async fn wait_for_stop(stop_flag: &AtomicBool) {
    while !stop_flag.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Filters one advertisement and, if it qualifies, resolves its location in the
/// background and queues the result for reconciliation.
///
/// A sighting that arrives while every lookup permit is taken is skipped; the
/// device's next advertisement gets a fresh attempt.
fn dispatch(
    advertisement: Advertisement,
    locator: &Arc<dyn LocationProvider>,
    settings: &SessionSettings,
    lookups: &Arc<Semaphore>,
    sightings: &UnboundedSender<DiscoveredDevice>,
    stop_flag: &Arc<AtomicBool>,
) {
    if stop_flag.load(Ordering::Relaxed) {
        return;
    }
    if !advertisement.is_of_interest() {
        log::trace!("Ignoring advertisement from {}", advertisement.identity);
        return;
    }

    let seen_at = Utc::now();
    let permit = match lookups.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            log::debug!(
                "Lookup limit reached, skipping sighting of {}",
                advertisement.identity
            );
            return;
        }
    };

    let locator = locator.clone();
    let sightings = sightings.clone();
    let stop_flag = stop_flag.clone();
    let request = settings.location_request;
    let record_without_location = settings.record_without_location;

    tokio::spawn(async move {
        let _permit = permit;
        if stop_flag.load(Ordering::Relaxed) {
            return;
        }

        let location = match locate(locator.as_ref(), &request).await {
            Ok(location) => Some(location),
            Err(e) => {
                log::error!("Location error for {}: {}", advertisement.identity, e);
                if !record_without_location {
                    return;
                }
                None
            }
        };

        let device = DiscoveredDevice::from_sighting(&advertisement, location, seen_at);
        log::info!(
            "Found device of interest: {} [{}] rssi={} payload={} location={:?}",
            device.display_name,
            device.identity,
            device.rssi,
            device.manufacturer_payload.as_deref().unwrap_or("-"),
            device.location,
        );

        if sightings.send(device).is_err() {
            log::debug!("Reconciler gone, dropping sighting of {}", advertisement.identity);
        }
    });
}
