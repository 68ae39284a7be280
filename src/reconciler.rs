//! # Reconciler Module
//!
//! Owns the result set of a scan session. Sightings arrive on a queue in the order
//! their location lookups completed; a single task applies them one at a time, so
//! the last completed sighting of an identity is the one that sticks.

use crate::device::DiscoveredDevice;
use crate::session::SessionUpdate;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Devices seen during a session, unique by identity, in first-sighting order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResultSet {
    devices: Vec<DiscoveredDevice>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one sighting: an existing entry with the same identity is overwritten
    /// in place, otherwise the sighting is appended.
    pub fn reconcile(&mut self, candidate: DiscoveredDevice) {
        match self
            .devices
            .iter_mut()
            .find(|device| device.identity == candidate.identity)
        {
            Some(existing) => *existing = candidate,
            None => self.devices.push(candidate),
        }
    }

    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn snapshot(&self) -> Vec<DiscoveredDevice> {
        self.devices().to_vec()
    }
}

/// Single writer for a session's result set.
///
/// Runs until every sender of `sightings` is gone. Once `stopped` is set,
/// late sightings are dropped instead of reconciled. Returns the final set.
pub async fn reconcile_loop(
    mut sightings: UnboundedReceiver<DiscoveredDevice>,
    updates: Sender<SessionUpdate>,
    stopped: Arc<AtomicBool>,
) -> ResultSet {
    let mut results = ResultSet::new();

    while let Some(candidate) = sightings.recv().await {
        if stopped.load(Ordering::Relaxed) {
            log::debug!(
                "Dropping sighting of {} completed after session stop",
                candidate.identity
            );
            continue;
        }

        log::debug!("Reconciling {} ({} dBm)", candidate.identity, candidate.rssi);
        results.reconcile(candidate);
        log::debug!("{} devices in result set", results.len());

        if updates.send(SessionUpdate::Devices(results.snapshot())).is_err() {
            log::warn!("Reconciler: update channel closed");
        }
    }

    if results.is_empty() {
        log::info!("Session ended without devices of interest");
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::Advertisement;
    use crate::device::Location;
    use chrono::Utc;

    fn sighting(identity: &str, rssi: i16) -> DiscoveredDevice {
        let adv = Advertisement::new(identity, Some("Google Nest".to_string()), rssi);
        DiscoveredDevice::from_sighting(&adv, Some(Location::new(37.7749, -122.4194)), Utc::now())
    }

    #[test]
    fn test_distinct_identities_are_appended_in_order() {
        let mut results = ResultSet::new();
        results.reconcile(sighting("00:00:00:00:00:01", -50));
        results.reconcile(sighting("00:00:00:00:00:02", -60));
        results.reconcile(sighting("00:00:00:00:00:03", -70));

        let identities: Vec<&str> = results.devices().iter().map(|d| d.identity.as_str()).collect();
        assert_eq!(
            identities,
            vec!["00:00:00:00:00:01", "00:00:00:00:00:02", "00:00:00:00:00:03"]
        );
    }

    #[test]
    fn test_resighting_replaces_in_place() {
        let mut results = ResultSet::new();
        results.reconcile(sighting("00:00:00:00:00:01", -50));
        results.reconcile(sighting("00:00:00:00:00:02", -60));
        results.reconcile(sighting("00:00:00:00:00:01", -90));

        assert_eq!(results.len(), 2);
        assert_eq!(results.devices()[0].identity, "00:00:00:00:00:01");
        assert_eq!(results.devices()[0].rssi, -90);
    }

    #[test]
    fn test_replacement_is_a_full_overwrite() {
        let mut results = ResultSet::new();
        let first = sighting("00:00:00:00:00:01", -50);
        results.reconcile(first);

        let adv = Advertisement::new("00:00:00:00:00:01", None, -80);
        let second = DiscoveredDevice::from_sighting(&adv, None, Utc::now());
        results.reconcile(second.clone());

        assert_eq!(results.devices(), &[second]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let candidate = sighting("AA:BB:CC:DD:EE:FF", -45);

        let mut once = ResultSet::new();
        once.reconcile(candidate.clone());

        let mut twice = ResultSet::new();
        twice.reconcile(candidate.clone());
        twice.reconcile(candidate);

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_loop_publishes_snapshots() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let (update_tx, update_rx) = crossbeam_channel::unbounded();
        let stopped = Arc::new(AtomicBool::new(false));

        tx.send(sighting("00:00:00:00:00:01", -50)).unwrap();
        tx.send(sighting("00:00:00:00:00:01", -55)).unwrap();
        drop(tx);

        let results = reconcile_loop(rx, update_tx, stopped).await;
        assert_eq!(results.len(), 1);

        let snapshots: Vec<SessionUpdate> = update_rx.try_iter().collect();
        assert_eq!(snapshots.len(), 2);
        match snapshots.last() {
            Some(SessionUpdate::Devices(devices)) => assert_eq!(devices[0].rssi, -55),
            other => panic!("unexpected update {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_loop_drops_sightings_after_stop() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let (update_tx, update_rx) = crossbeam_channel::unbounded();
        let stopped = Arc::new(AtomicBool::new(true));

        tx.send(sighting("00:00:00:00:00:01", -50)).unwrap();
        drop(tx);

        let results = reconcile_loop(rx, update_tx, stopped).await;
        assert!(results.is_empty());
        assert_eq!(update_rx.try_iter().count(), 0);
    }
}
