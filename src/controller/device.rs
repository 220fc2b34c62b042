//! Device classifier
//!
//! Decides from vendor/product id whether a device is supported and which
//! report layout it speaks. The built-in table can be extended with
//! `"VID:PID:Description"` entries from the config file.

use super::report::DeviceKind;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MAX_CUSTOM_DEVICES: usize = 16;
const MAX_DESCRIPTION_LEN: usize = 63;

pub const ASUS_VENDOR_ID: u16 = 0x0B05;
pub const ALLY_X_PRODUCT_ID: u16 = 0x1B4C;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub description: String,
    pub kind: DeviceKind,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}:{:04X} {} ({})",
            self.vendor_id, self.product_id, self.description, self.kind
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceParseError {
    #[error("Expected VID:PID:Description, got {0:?}")]
    Format(String),
    #[error("Invalid hex id: {0:?}")]
    InvalidId(String),
    #[error("Vendor and product id must be non-zero")]
    ZeroId,
}

/// Parses a hex id with or without `0x` prefix.
fn parse_hex_id(value: &str) -> Result<u16, DeviceParseError> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|_| DeviceParseError::InvalidId(value.to_string()))
}

/// Parses a `VID:PID` pair (as used for selecting a device).
pub fn parse_vid_pid(value: &str) -> Result<(u16, u16), DeviceParseError> {
    let (vid, pid) = value
        .split_once(':')
        .ok_or_else(|| DeviceParseError::Format(value.to_string()))?;
    Ok((parse_hex_id(vid)?, parse_hex_id(pid)?))
}

impl FromStr for DeviceInfo {
    type Err = DeviceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(vid), Some(pid), Some(description)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DeviceParseError::Format(s.to_string()));
        };

        let vendor_id = parse_hex_id(vid)?;
        let product_id = parse_hex_id(pid)?;
        if vendor_id == 0 || product_id == 0 {
            return Err(DeviceParseError::ZeroId);
        }

        let description: String = description.trim().chars().take(MAX_DESCRIPTION_LEN).collect();
        Ok(DeviceInfo {
            vendor_id,
            product_id,
            description,
            kind: kind_for(vendor_id, product_id),
        })
    }
}

fn kind_for(vendor_id: u16, product_id: u16) -> DeviceKind {
    if vendor_id == ASUS_VENDOR_ID && product_id == ALLY_X_PRODUCT_ID {
        DeviceKind::AllyX
    } else {
        DeviceKind::Xbox360
    }
}

static BUILTIN_DEVICES: &[(u16, u16, &str)] = &[
    (0x045E, 0x028E, "Xbox 360 Wired Controller"),
    (0x045E, 0x028F, "Xbox 360 Wired Controller v2"),
    (0x045E, 0x0719, "Xbox 360 Wireless Receiver"),
    // Handhelds
    (0x0079, 0x18D4, "GPD Win 2 Controller"),
    (0x2563, 0x058D, "OneXPlayer Gamepad"),
    (0x17EF, 0x6182, "Lenovo Legion Go"),
    (0x1A86, 0xE310, "Legion Go S"),
    (0x0DB0, 0x1901, "MSI Claw"),
    (0x2993, 0x2001, "TECNO Pocket Go"),
    (0x1EE9, 0x1590, "ZOTAC Gaming Zone"),
    (ASUS_VENDOR_ID, ALLY_X_PRODUCT_ID, "ASUS ROG Ally X"),
    // 8BitDo
    (0x2DC8, 0x3106, "8BitDo Ultimate / Pro 2 Wired"),
    (0x2DC8, 0x3109, "8BitDo Ultimate Wireless"),
    (0x2DC8, 0x310A, "8BitDo Ultimate 2C Wireless"),
    (0x2DC8, 0x310B, "8BitDo Ultimate 2 Wireless"),
    (0x2DC8, 0x6001, "8BitDo SN30 Pro"),
    // Logitech
    (0x046D, 0xC21D, "Logitech F310"),
    (0x046D, 0xC21E, "Logitech F510"),
    (0x046D, 0xC21F, "Logitech F710"),
    (0x046D, 0xC242, "Logitech Chillstream"),
    // HyperX
    (0x03F0, 0x038D, "HyperX Clutch (wired)"),
    (0x03F0, 0x048D, "HyperX Clutch (wireless)"),
    // Others
    (0x1038, 0x1430, "SteelSeries Stratus Duo"),
    (0x1038, 0x1431, "SteelSeries Stratus Duo (alt)"),
    (0x2345, 0xE00B, "Machenike G5 Pro"),
    (0x3537, 0x1004, "GameSir T4 Kaleid"),
    (0x37D7, 0x2501, "Flydigi Apex 5"),
    (0x413D, 0x2104, "Black Shark Green Ghost"),
    (0x1949, 0x041A, "Amazon Game Controller"),
    // Razer
    (0x1689, 0xFD00, "Razer Onza Tournament"),
    (0x1689, 0xFD01, "Razer Onza Classic"),
    (0x1689, 0xFE00, "Razer Sabertooth"),
];

/// Supported-device list: built-in entries followed by custom ones.
#[derive(Debug, Clone)]
pub struct DeviceClassifier {
    devices: Vec<DeviceInfo>,
}

impl Default for DeviceClassifier {
    fn default() -> Self {
        Self::new::<&str>(&[])
    }
}

impl DeviceClassifier {
    /// Builds the list. Unparsable custom entries are skipped, at most
    /// [`MAX_CUSTOM_DEVICES`] are kept.
    pub fn new<S: AsRef<str>>(custom: &[S]) -> Self {
        let mut devices: Vec<DeviceInfo> = BUILTIN_DEVICES
            .iter()
            .map(|&(vendor_id, product_id, description)| DeviceInfo {
                vendor_id,
                product_id,
                description: description.to_string(),
                kind: kind_for(vendor_id, product_id),
            })
            .collect();

        let mut added = 0;
        for entry in custom {
            if added == MAX_CUSTOM_DEVICES {
                warn!(
                    "More than {} custom devices configured, ignoring the rest",
                    MAX_CUSTOM_DEVICES
                );
                break;
            }
            match entry.as_ref().parse::<DeviceInfo>() {
                Ok(device) => {
                    debug!("Custom device registered: {}", device);
                    devices.push(device);
                    added += 1;
                }
                Err(e) => warn!("Skipping custom device {:?}: {}", entry.as_ref(), e),
            }
        }

        info!(
            "Device list ready: {} built-in, {} custom",
            BUILTIN_DEVICES.len(),
            added
        );
        Self { devices }
    }

    pub fn classify(&self, vendor_id: u16, product_id: u16) -> Option<&DeviceInfo> {
        self.devices
            .iter()
            .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
    }

    pub fn is_supported(&self, vendor_id: u16, product_id: u16) -> bool {
        self.classify(vendor_id, product_id).is_some()
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }
}
