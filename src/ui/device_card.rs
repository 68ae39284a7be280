//! Text content of one device card, derived from a `DiscoveredDevice`.
//! Kept apart from the widgets so the presentation rules can be tested directly.

use crate::device::{DiscoveredDevice, SignalLevel};

pub const EMPTY_STATE_MESSAGE: &str = "No Google devices found.";

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCard {
    pub title: String,
    pub identity: String,
    pub payload: Option<String>,
    pub location: Option<String>,
    pub last_seen: String,
    pub rssi: String,
    pub level: SignalLevel,
}

impl DeviceCard {
    pub fn from_device(device: &DiscoveredDevice) -> Self {
        Self {
            title: device.display_name.clone(),
            identity: format!("ID: {}", device.identity),
            payload: device
                .manufacturer_payload
                .as_ref()
                .map(|hex| format!("Payload: {}", hex)),
            location: device.location.map(|location| {
                format!("Location: {:.6}, {:.6}", location.latitude, location.longitude)
            }),
            last_seen: format!(
                "Last seen: {}",
                device.last_seen_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            rssi: format!("{} dBm", device.rssi),
            level: device.signal_level(),
        }
    }

    /// Filled state of each bar of the six-bar meter, weakest first
    pub fn bars(&self) -> [bool; SignalLevel::MAX as usize] {
        let mut bars = [false; SignalLevel::MAX as usize];
        for bar in bars.iter_mut().take(self.level.value() as usize) {
            *bar = true;
        }
        bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::Advertisement;
    use crate::device::Location;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_card_for_located_device() {
        let adv = Advertisement::new("AA:BB:CC:DD:EE:FF", Some("Google Nest".to_string()), -45)
            .with_manufacturer_data(0x00E0, vec![0xBE, 0xEF]);
        let seen = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let device = DiscoveredDevice::from_sighting(&adv, Some(Location::new(37.7749, -122.4194)), seen);

        let card = DeviceCard::from_device(&device);
        assert_eq!(card.title, "Google Nest");
        assert_eq!(card.identity, "ID: AA:BB:CC:DD:EE:FF");
        assert_eq!(card.payload.as_deref(), Some("Payload: E000BEEF"));
        assert_eq!(card.location.as_deref(), Some("Location: 37.774900, -122.419400"));
        assert_eq!(card.last_seen, "Last seen: 2024-05-01 12:30:00 UTC");
        assert_eq!(card.rssi, "-45 dBm");
        assert_eq!(card.bars(), [true, true, true, true, true, false]);
    }

    #[test]
    fn test_card_omits_missing_fields() {
        let adv = Advertisement::new("00:00:00:12:34:56", None, -101);
        let device = DiscoveredDevice::from_sighting(&adv, None, Utc::now());

        let card = DeviceCard::from_device(&device);
        assert_eq!(card.title, "Unnamed device");
        assert_eq!(card.payload, None);
        assert_eq!(card.location, None);
        assert_eq!(card.bars(), [true, false, false, false, false, false]);
    }
}
