//! # Permission Gate Module
//!
//! Some platforms require runtime-granted permissions before the radio can scan.
//! The scan controller asks a `PermissionGate` for the full set up front and refuses
//! to start if anything is denied. Platforms without such a gate use `Ungated`.

use crate::error::SessionError;
use std::collections::HashMap;
use std::fmt;

/// Permissions a scan session needs before it may start
pub const REQUIRED_PERMISSIONS: [Permission; 3] = [
    Permission::BluetoothScan,
    Permission::BluetoothConnect,
    Permission::FineLocation,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    BluetoothScan,
    BluetoothConnect,
    FineLocation,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::BluetoothScan => "bluetooth scan",
            Permission::BluetoothConnect => "bluetooth connect",
            Permission::FineLocation => "fine location",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Platform permission prompt.
///
/// Implementations report a status for every permission they were asked about.
/// A permission missing from the returned map counts as denied.
pub trait PermissionGate: Send + Sync {
    fn request(&self, permissions: &[Permission]) -> HashMap<Permission, PermissionStatus>;
}

/// Gate for platforms that do not require runtime permissions
#[derive(Debug, Default, Clone, Copy)]
pub struct Ungated;

impl PermissionGate for Ungated {
    fn request(&self, permissions: &[Permission]) -> HashMap<Permission, PermissionStatus> {
        permissions
            .iter()
            .map(|permission| (*permission, PermissionStatus::Granted))
            .collect()
    }
}

/// Requests every required permission and fails if any of them is not granted.
pub fn ensure_permissions(gate: &dyn PermissionGate) -> Result<(), SessionError> {
    let statuses = gate.request(&REQUIRED_PERMISSIONS);

    let denied: Vec<Permission> = REQUIRED_PERMISSIONS
        .iter()
        .copied()
        .filter(|permission| statuses.get(permission) != Some(&PermissionStatus::Granted))
        .collect();

    if denied.is_empty() {
        Ok(())
    } else {
        Err(SessionError::PermissionDenied(denied))
    }
}
