//! # UI Module
//!
//! Presentation pieces for the scanner screen.
//!
//! - `device_card`: text content of a device card, independent of widgets
//! - `styles`: shared styling utilities

pub mod device_card;
pub mod styles;
