//! Millimeter / device unit conversion.
//!
//! Both directions truncate toward zero, so a round trip never drifts by
//! more than one millimeter at 150 dpi and above.

use serde::{Deserialize, Serialize};

use crate::error::PrintError;

pub const MM_PER_INCH: f64 = 25.4;
pub const POINTS_PER_INCH: f64 = 72.0;

/// Dots per inch along one axis. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Resolution(i32);

impl Resolution {
    pub fn new(dpi: i32) -> Result<Self, PrintError> {
        if dpi <= 0 {
            return Err(PrintError::InvalidConfiguration(format!(
                "resolution must be positive, got {} dpi",
                dpi
            )));
        }
        Ok(Self(dpi))
    }

    pub fn dpi(self) -> i32 {
        self.0
    }

    pub fn to_device_units(self, mm: f64) -> i64 {
        to_device_units(mm, self)
    }

    pub fn to_millimeters(self, units: i64) -> i64 {
        to_millimeters(units, self)
    }

    /// Exact (non truncating) conversion used when placing on a PDF page.
    pub fn units_to_mm(self, units: i64) -> f64 {
        MM_PER_INCH * units as f64 / f64::from(self.0)
    }
}

impl TryFrom<i32> for Resolution {
    type Error = PrintError;

    fn try_from(dpi: i32) -> Result<Self, Self::Error> {
        Self::new(dpi)
    }
}

impl From<Resolution> for i32 {
    fn from(res: Resolution) -> Self {
        res.0
    }
}

pub fn to_device_units(mm: f64, dpi: Resolution) -> i64 {
    (f64::from(dpi.0) * mm / MM_PER_INCH) as i64
}

pub fn to_millimeters(units: i64, dpi: Resolution) -> i64 {
    (MM_PER_INCH * units as f64 / f64::from(dpi.0)) as i64
}

pub fn mm_to_points(mm: f64) -> f64 {
    mm / MM_PER_INCH * POINTS_PER_INCH
}

pub fn points_to_mm(pt: f64) -> f64 {
    pt / POINTS_PER_INCH * MM_PER_INCH
}
