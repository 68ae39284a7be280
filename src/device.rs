use crate::advertisement::Advertisement;
use chrono::{DateTime, Utc};

/// Shown when a device does not advertise a name
pub const UNNAMED_DEVICE: &str = "Unnamed device";

/// Position of this machine when a sighting was processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A device of interest as it was last seen.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDevice {
    pub identity: String,
    pub display_name: String,
    pub rssi: i16,
    pub manufacturer_payload: Option<String>,
    pub location: Option<Location>,
    pub last_seen_at: DateTime<Utc>,
}

impl DiscoveredDevice {
    /// Builds a candidate from an advertisement and the position resolved for it.
    pub fn from_sighting(
        advertisement: &Advertisement,
        location: Option<Location>,
        seen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: advertisement.identity.clone(),
            display_name: advertisement
                .name
                .clone()
                .unwrap_or_else(|| UNNAMED_DEVICE.to_string()),
            rssi: advertisement.rssi,
            manufacturer_payload: advertisement.manufacturer_payload_hex(),
            location,
            last_seen_at: seen_at,
        }
    }

    pub fn signal_level(&self) -> SignalLevel {
        SignalLevel::from_rssi(self.rssi)
    }
}

/// Qualitative signal strength, 1 (weakest) to 6 (strongest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignalLevel(u8);

impl SignalLevel {
    pub const MAX: u8 = 6;

    /// Six fixed 20 dBm bands: above -20 is 6, above -40 is 5, down to -100 and below being 1.
    pub fn from_rssi(rssi: i16) -> Self {
        let level = match rssi {
            r if r > -20 => 6,
            r if r > -40 => 5,
            r if r > -60 => 4,
            r if r > -80 => 3,
            r if r > -100 => 2,
            _ => 1,
        };
        SignalLevel(level)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}
