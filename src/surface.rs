//! The drawing contract the compositor renders through.
//!
//! Coordinates are device units, measured from the top-left corner of the
//! printable area (the physical page minus `offset_x`/`offset_y`).

use std::path::Path;

use crate::error::SurfaceError;

/// What the device reports about itself, all sizes in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub dpi_x: i32,
    pub dpi_y: i32,
    pub page_width: i64,
    pub page_height: i64,
    pub offset_x: i64,
    pub offset_y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePoint {
    pub x: i64,
    pub y: i64,
}

impl DevicePoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Inclusive box: `right` and `bottom` are the last covered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl BoundingBox {
    pub fn from_origin(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width - 1,
            bottom: y + height - 1,
        }
    }

    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

impl FontWeight {
    /// Numeric weight on the usual 100-900 scale.
    pub fn value(self) -> u16 {
        match self {
            FontWeight::Regular => 400,
            FontWeight::Bold => 700,
        }
    }
}

/// A block of text drawn top-aligned inside `bbox`, wrapped on word
/// boundaries, and centered horizontally when `centered` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun<'a> {
    pub content: &'a str,
    pub font: &'a str,
    pub size: i64,
    pub weight: FontWeight,
    pub centered: bool,
    pub bbox: BoundingBox,
}

pub trait RenderingSurface {
    fn capabilities(&self) -> Capabilities;

    fn start_page(&mut self) -> Result<(), SurfaceError>;

    fn end_page(&mut self) -> Result<(), SurfaceError>;

    fn draw_text(&mut self, run: &TextRun<'_>) -> Result<(), SurfaceError>;

    fn draw_image(&mut self, path: &Path, bbox: BoundingBox) -> Result<(), SurfaceError>;

    fn draw_line(&mut self, from: DevicePoint, to: DevicePoint) -> Result<(), SurfaceError>;

    /// Flush and release the device. Called exactly once per session.
    fn close(&mut self) -> Result<(), SurfaceError>;
}
