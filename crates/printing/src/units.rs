//! DPI-based unit conversion.
//! 以 DPI 為基準的單位換算。

use serde::{Deserialize, Serialize};

/// Points per inch; the canonical page-description unit.
pub const POINTS_PER_INCH: i32 = 72;

/// CSS pixels per inch, used when talking to the document renderer.
pub const PIXELS_PER_INCH: i32 = 96;

/// Rescales `value` from `old_unit` dots per inch to `new_unit` dots per inch.
/// 將 `value` 從 `old_unit` DPI 換算為 `new_unit` DPI。
///
/// The result is rounded to the nearest integer, halves away from zero, so a
/// negative value converts symmetrically to its positive counterpart.
/// Non-positive units are treated as 1 and results outside `i32` saturate.
pub fn convert_unit(value: i32, old_unit: i32, new_unit: i32) -> i32 {
    let value = i64::from(value);
    let old_unit = i64::from(old_unit.max(1));
    let new_unit = i64::from(new_unit.max(1));
    let half = old_unit / 2;
    let scaled = if value >= 0 {
        (value * new_unit + half) / old_unit
    } else {
        (value * new_unit - half) / old_unit
    };
    i32::try_from(scaled).unwrap_or(if scaled < 0 { i32::MIN } else { i32::MAX })
}

/// Selects which DPI represents "device units" for a print surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceUnits {
    /// Device geometry is expressed in printer dots at the reported DPI.
    #[default]
    Dpi,
    /// Device geometry is already points-based (72 DPI) regardless of the
    /// printer resolution.
    Points,
}

impl DeviceUnits {
    /// Returns the DPI used to interpret device geometry.
    pub fn resolve(self, printer_dpi: f64) -> i32 {
        match self {
            DeviceUnits::Dpi => printer_dpi as i32,
            DeviceUnits::Points => POINTS_PER_INCH,
        }
    }
}
