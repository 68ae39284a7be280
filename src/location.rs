//! # Location Module
//!
//! One-shot "where am I right now" lookups used to tag each sighting.
//!
//! ## Providers
//! - `GpsdProvider`: asks a gpsd daemon over its JSON socket protocol
//! - `FixedProvider`: always answers with configured coordinates
//!
//! Every lookup goes through `locate`, which enforces the request timeout so a
//! provider that never answers fails instead of hanging.

use crate::config::LocationSource;
use crate::device::Location;
use crate::error::LocationError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Options for a single position request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix that may be returned instead of a fresh one
    pub maximum_age: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(1),
        }
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self, request: &LocationRequest) -> Result<Location, LocationError>;
}

/// Resolves the current position, failing with `LocationError::Timeout` once
/// `request.timeout` has elapsed.
pub async fn locate(
    provider: &dyn LocationProvider,
    request: &LocationRequest,
) -> Result<Location, LocationError> {
    match tokio::time::timeout(request.timeout, provider.current_position(request)).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout(request.timeout)),
    }
}

/// Builds the provider selected in the configuration.
pub fn provider_from_config(source: &LocationSource) -> Arc<dyn LocationProvider> {
    match source {
        LocationSource::Gpsd { address } => {
            log::info!("Using gpsd at {} for location", address);
            Arc::new(GpsdProvider::new(address.clone()))
        }
        LocationSource::Fixed { latitude, longitude } => {
            log::info!("Using fixed location {:.6}, {:.6}", latitude, longitude);
            Arc::new(FixedProvider::new(Location::new(*latitude, *longitude)))
        }
    }
}

pub struct FixedProvider {
    location: Location,
}

impl FixedProvider {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

#[async_trait]
impl LocationProvider for FixedProvider {
    async fn current_position(&self, _request: &LocationRequest) -> Result<Location, LocationError> {
        Ok(self.location)
    }
}

const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\n";

/// gpsd fix modes
const MODE_2D: u8 = 2;
const MODE_3D: u8 = 3;

/// Subset of a gpsd report we care about. Only `TPV` reports carry a position.
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Fix {
    location: Location,
    mode: u8,
    received_at: Instant,
}

impl Fix {
    fn satisfies(&self, request: &LocationRequest) -> bool {
        let required = if request.high_accuracy { MODE_3D } else { MODE_2D };
        self.mode >= required
    }
}

/// Location from a gpsd daemon. High accuracy requests only accept 3D fixes.
pub struct GpsdProvider {
    address: String,
    last_fix: Mutex<Option<Fix>>,
}

impl GpsdProvider {
    pub fn new(address: String) -> Self {
        Self {
            address,
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, request: &LocationRequest) -> Option<Location> {
        let fix = (*self.last_fix.lock().ok()?)?;
        if fix.received_at.elapsed() <= request.maximum_age && fix.satisfies(request) {
            Some(fix.location)
        } else {
            None
        }
    }

    fn remember(&self, fix: Fix) {
        if let Ok(mut guard) = self.last_fix.lock() {
            *guard = Some(fix);
        }
    }
}

fn parse_report(line: &str) -> Result<Option<Fix>, LocationError> {
    let report: GpsdReport =
        serde_json::from_str(line).map_err(|e| LocationError::Protocol(e.to_string()))?;

    if report.class != "TPV" || report.mode < MODE_2D {
        return Ok(None);
    }

    match (report.lat, report.lon) {
        (Some(latitude), Some(longitude)) => Ok(Some(Fix {
            location: Location::new(latitude, longitude),
            mode: report.mode,
            received_at: Instant::now(),
        })),
        _ => Ok(None),
    }
}

#[async_trait]
impl LocationProvider for GpsdProvider {
    async fn current_position(&self, request: &LocationRequest) -> Result<Location, LocationError> {
        if let Some(location) = self.cached(request) {
            log::trace!("Reusing cached gpsd fix");
            return Ok(location);
        }

        let stream = TcpStream::connect(&self.address).await?;
        let (reader, mut writer) = stream.into_split();
        writer.write_all(WATCH_COMMAND.as_bytes()).await?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(fix) = parse_report(&line)? {
                if fix.satisfies(request) {
                    self.remember(fix);
                    return Ok(fix.location);
                }
                log::trace!("Skipping gpsd fix with mode {}", fix.mode);
            }
        }

        Err(LocationError::Unavailable(
            "gpsd closed the connection before reporting a fix".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    struct NeverAnswers;

    #[async_trait]
    impl LocationProvider for NeverAnswers {
        async fn current_position(&self, _request: &LocationRequest) -> Result<Location, LocationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(LocationError::Unavailable("unreachable".to_string()))
        }
    }

    /// Serves one gpsd connection with the given report lines, then goes away.
    async fn fake_gpsd(reports: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            let watch = lines.next_line().await.unwrap().unwrap();
            assert!(watch.starts_with("?WATCH="));

            for report in reports {
                writer.write_all(report.as_bytes()).await.unwrap();
                writer.write_all(b"\n").await.unwrap();
            }
        });

        address
    }

    const VERSION: &str = r#"{"class":"VERSION","release":"3.25","proto_major":3,"proto_minor":15}"#;
    const NO_FIX: &str = r#"{"class":"TPV","mode":1}"#;
    const FIX_2D: &str = r#"{"class":"TPV","mode":2,"lat":51.5074,"lon":-0.1278}"#;
    const FIX_3D: &str = r#"{"class":"TPV","mode":3,"lat":37.7749,"lon":-122.4194,"alt":16.0}"#;

    #[tokio::test]
    async fn test_fixed_provider() {
        let provider = FixedProvider::new(Location::new(37.7749, -122.4194));
        let location = locate(&provider, &LocationRequest::default()).await.unwrap();
        assert_eq!(location, Location::new(37.7749, -122.4194));
    }

    #[tokio::test]
    async fn test_lookup_times_out() {
        let request = LocationRequest {
            timeout: Duration::from_millis(50),
            ..LocationRequest::default()
        };
        match locate(&NeverAnswers, &request).await {
            Err(LocationError::Timeout(timeout)) => assert_eq!(timeout, Duration::from_millis(50)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gpsd_high_accuracy_waits_for_3d_fix() {
        let address = fake_gpsd(vec![VERSION, NO_FIX, FIX_2D, FIX_3D]).await;
        let provider = GpsdProvider::new(address);

        let location = locate(&provider, &LocationRequest::default()).await.unwrap();
        assert_eq!(location, Location::new(37.7749, -122.4194));
    }

    #[tokio::test]
    async fn test_gpsd_low_accuracy_accepts_2d_fix() {
        let address = fake_gpsd(vec![VERSION, FIX_2D, FIX_3D]).await;
        let provider = GpsdProvider::new(address);
        let request = LocationRequest {
            high_accuracy: false,
            ..LocationRequest::default()
        };

        let location = locate(&provider, &request).await.unwrap();
        assert_eq!(location, Location::new(51.5074, -0.1278));
    }

    #[tokio::test]
    async fn test_gpsd_reuses_recent_fix() {
        let address = fake_gpsd(vec![FIX_3D]).await;
        let provider = GpsdProvider::new(address);
        let request = LocationRequest {
            maximum_age: Duration::from_secs(60),
            ..LocationRequest::default()
        };

        let first = locate(&provider, &request).await.unwrap();
        // The fake daemon is gone by now, so this can only come from the cache
        let second = locate(&provider, &request).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_gpsd_without_fix_is_unavailable() {
        let address = fake_gpsd(vec![VERSION, NO_FIX]).await;
        let provider = GpsdProvider::new(address);

        match locate(&provider, &LocationRequest::default()).await {
            Err(LocationError::Unavailable(_)) => {}
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_report_is_a_protocol_error() {
        match parse_report("not json") {
            Err(LocationError::Protocol(_)) => {}
            other => panic!("expected protocol error, got {:?}", other),
        }
    }
}
