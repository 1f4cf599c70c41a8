//! Panel geometries.

use std::fmt;
use std::str::FromStr;

use epd_image::packed_len;
use serde::{Deserialize, Serialize};

use crate::PanelError;

/// Native resolution of a panel, in its scan orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplaySpec {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

impl DisplaySpec {
    /// Bytes in one packed 1bpp frame.
    pub fn array_size(&self) -> usize {
        packed_len(self.width, self.height)
    }
}

/// Supported controller firmwares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FirmwareType {
    /// 2.13" 128x250 panel.
    #[default]
    #[serde(rename = "EPD128x250")]
    Epd128x250,
    /// 3.7" 240x416 panel.
    #[serde(rename = "EPD240x416")]
    Epd240x416,
}

impl FirmwareType {
    pub const ALL: [FirmwareType; 2] = [FirmwareType::Epd128x250, FirmwareType::Epd240x416];

    pub fn spec(&self) -> DisplaySpec {
        match self {
            Self::Epd128x250 => DisplaySpec {
                name: "EPD128x250",
                width: 128,
                height: 250,
            },
            Self::Epd240x416 => DisplaySpec {
                name: "EPD240x416",
                width: 240,
                height: 416,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.spec().name
    }
}

impl FromStr for FirmwareType {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EPD128X250" | "128X250" => Ok(Self::Epd128x250),
            "EPD240X416" | "240X416" => Ok(Self::Epd240x416),
            _ => Err(PanelError::UnknownFirmware(s.to_string())),
        }
    }
}

impl fmt::Display for FirmwareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_sizes() {
        assert_eq!(FirmwareType::Epd128x250.spec().array_size(), 4000);
        assert_eq!(FirmwareType::Epd240x416.spec().array_size(), 12480);
    }

    #[test]
    fn test_parse_firmware() {
        assert_eq!("EPD128x250".parse::<FirmwareType>().unwrap(), FirmwareType::Epd128x250);
        assert_eq!(" 240x416 ".parse::<FirmwareType>().unwrap(), FirmwareType::Epd240x416);
        assert_eq!("epd240X416".parse::<FirmwareType>().unwrap(), FirmwareType::Epd240x416);
        assert!(matches!(
            "EPD999x1".parse::<FirmwareType>(),
            Err(PanelError::UnknownFirmware(_))
        ));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for fw in FirmwareType::ALL {
            assert_eq!(fw.to_string().parse::<FirmwareType>().unwrap(), fw);
        }
    }
}
