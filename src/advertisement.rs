//! # Advertisement Module
//!
//! Normalized view of a single BLE advertisement as delivered by the discovery
//! provider, plus the fixed policy that decides which advertisements are of interest.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Substring of the advertised name that marks a device of interest (case-sensitive)
pub const NAME_MARKER: &str = "Google";

/// Address prefix that marks a device of interest
pub const IDENTITY_PREFIX: &str = "00:00:00";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub identity: String,
    pub name: Option<String>,
    pub rssi: i16,
    /// Manufacturer-specific data keyed by company identifier
    pub manufacturer_data: BTreeMap<u16, Vec<u8>>,
}

impl Advertisement {
    pub fn new(identity: impl Into<String>, name: Option<String>, rssi: i16) -> Self {
        Self {
            identity: identity.into(),
            name,
            rssi,
            manufacturer_data: BTreeMap::new(),
        }
    }

    pub fn with_manufacturer_data(mut self, company_id: u16, data: Vec<u8>) -> Self {
        self.manufacturer_data.insert(company_id, data);
        self
    }

    /// Hard-coded filter: the name mentions Google or the identity carries the
    /// `00:00:00` prefix. Either one is enough.
    pub fn is_of_interest(&self) -> bool {
        let name_matches = self
            .name
            .as_deref()
            .map_or(false, |name| name.contains(NAME_MARKER));

        name_matches || self.identity.starts_with(IDENTITY_PREFIX)
    }

    /// Manufacturer payload as uppercase hex, laid out the way it went over the air:
    /// little-endian company id followed by its data, entries in ascending company id order.
    pub fn manufacturer_payload_hex(&self) -> Option<String> {
        if self.manufacturer_data.is_empty() {
            return None;
        }

        let mut hex = String::new();
        for (company_id, data) in &self.manufacturer_data {
            for byte in company_id.to_le_bytes().iter().chain(data.iter()) {
                // Writing into a String cannot fail
                let _ = write!(hex, "{:02X}", byte);
            }
        }
        Some(hex)
    }
}
