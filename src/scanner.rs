use crate::advertisement::Advertisement;
use crate::error::ScanError;
use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use tokio::sync::Mutex;

/// Advertisements as they arrive. A failed event is an `Err` item, not the end of the stream.
pub type AdvertisementStream = Pin<Box<dyn Stream<Item = Result<Advertisement, ScanError>> + Send>>;

/// Source of BLE advertisements.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Starts an unfiltered scan and returns the advertisement stream.
    async fn start(&self) -> Result<AdvertisementStream, ScanError>;

    async fn stop(&self) -> Result<(), ScanError>;
}

/// Discovery through the host's first Bluetooth adapter
pub struct BtleplugDiscovery {
    adapter: Mutex<Option<Adapter>>,
}

impl BtleplugDiscovery {
    pub fn new() -> Self {
        Self {
            adapter: Mutex::new(None),
        }
    }

    async fn first_adapter() -> Result<Adapter, ScanError> {
        let manager = Manager::new()
            .await
            .map_err(|e| ScanError::ManagerInit(e.to_string()))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| ScanError::ManagerInit(e.to_string()))?;

        adapters.into_iter().next().ok_or(ScanError::NoAdapters)
    }
}

impl Default for BtleplugDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiscoverySource for BtleplugDiscovery {
    async fn start(&self) -> Result<AdvertisementStream, ScanError> {
        let mut slot = self.adapter.lock().await;
        let adapter = match slot.as_ref() {
            Some(adapter) => adapter.clone(),
            None => {
                let adapter = Self::first_adapter().await?;
                *slot = Some(adapter.clone());
                adapter
            }
        };

        // Subscribe before scanning so no early advertisement is missed
        let events = adapter
            .events()
            .await
            .map_err(|e| ScanError::ScanFailed(e.to_string()))?;

        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| ScanError::ScanFailed(e.to_string()))?;

        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move { advertisement_from_event(&adapter, event).await }
        });

        Ok(Box::pin(stream))
    }

    async fn stop(&self) -> Result<(), ScanError> {
        let slot = self.adapter.lock().await;
        if let Some(adapter) = slot.as_ref() {
            adapter
                .stop_scan()
                .await
                .map_err(|e| ScanError::ScanFailed(e.to_string()))?;
            log::info!("BLE scan stopped");
        }
        Ok(())
    }
}

async fn advertisement_from_event(
    adapter: &Adapter,
    event: CentralEvent,
) -> Option<Result<Advertisement, ScanError>> {
    let id = match event {
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
        CentralEvent::ManufacturerDataAdvertisement { id, .. } => id,
        _ => return None,
    };

    let peripheral = match adapter.peripheral(&id).await {
        Ok(peripheral) => peripheral,
        Err(e) => return Some(Err(event_failed(&id, e))),
    };

    match peripheral.properties().await {
        Ok(Some(properties)) => {
            advertisement_from_properties(peripheral_label(&id), properties).map(Ok)
        }
        Ok(None) => {
            log::debug!("No properties for {}", peripheral_label(&id));
            None
        }
        Err(e) => Some(Err(event_failed(&id, e))),
    }
}

fn event_failed(id: &PeripheralId, e: btleplug::Error) -> ScanError {
    ScanError::EventFailed {
        identity: peripheral_label(id),
        reason: e.to_string(),
    }
}

/// Printable form of a platform peripheral id, e.g. the CoreBluetooth UUID.
///
/// btleplug 0.9 only gives `PeripheralId` a `Debug` impl, so this unwraps the
/// `PeripheralId(..)` tuple it prints.
fn peripheral_label(id: &PeripheralId) -> String {
    unwrap_tuple_debug(&format!("{:?}", id)).to_string()
}

fn unwrap_tuple_debug(debug: &str) -> &str {
    debug
        .strip_prefix("PeripheralId(")
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(debug)
}

/// Advertisements without an RSSI reading are skipped. Platforms that hide the
/// hardware address report it as all zeros; `fallback_identity` stands in then.
fn advertisement_from_properties(
    fallback_identity: String,
    properties: PeripheralProperties,
) -> Option<Advertisement> {
    let rssi = match properties.rssi {
        Some(rssi) => rssi,
        None => {
            log::debug!("Skipping {} without RSSI", properties.address);
            return None;
        }
    };

    let identity = if properties.address == BDAddr::default() {
        fallback_identity
    } else {
        properties.address.to_string()
    };

    Some(Advertisement {
        identity,
        name: properties.local_name,
        rssi,
        manufacturer_data: properties.manufacturer_data.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_properties_become_advertisement() {
        let address = BDAddr::from([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let mut manufacturer_data = HashMap::new();
        manufacturer_data.insert(0x00E0u16, vec![0x01, 0x02]);
        let properties = PeripheralProperties {
            address,
            local_name: Some("Google Nest".to_string()),
            rssi: Some(-45),
            manufacturer_data,
            ..Default::default()
        };

        let adv = advertisement_from_properties("unused".to_string(), properties).unwrap();
        assert_eq!(adv.identity, "AA:BB:CC:DD:EE:FF");
        assert_eq!(adv.name.as_deref(), Some("Google Nest"));
        assert_eq!(adv.rssi, -45);
        assert_eq!(adv.manufacturer_payload_hex().as_deref(), Some("E0000102"));
    }

    #[test]
    fn test_properties_without_rssi_are_skipped() {
        let properties = PeripheralProperties {
            address: BDAddr::from([0x00, 0x00, 0x00, 0x12, 0x34, 0x56]),
            ..Default::default()
        };

        assert!(advertisement_from_properties("unused".to_string(), properties).is_none());
    }

    #[test]
    fn test_hidden_address_falls_back_to_peripheral_id() {
        let properties = PeripheralProperties {
            rssi: Some(-70),
            ..Default::default()
        };

        let adv = advertisement_from_properties("1234".to_string(), properties).unwrap();
        assert_eq!(adv.identity, "1234");
        assert_eq!(adv.name, None);
    }

    #[test]
    fn test_peripheral_label_drops_type_wrapper() {
        assert_eq!(
            unwrap_tuple_debug("PeripheralId(5B2E6A2F-1C3D-4E5F-8A9B-0C1D2E3F4A5B)"),
            "5B2E6A2F-1C3D-4E5F-8A9B-0C1D2E3F4A5B"
        );
        assert_eq!(unwrap_tuple_debug("hci0/dev_1234"), "hci0/dev_1234");
    }
}
