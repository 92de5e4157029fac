//! Calibration page: a 10 mm matrix and millimeter rulers along the top and
//! left edges of a 190x270 mm area. Measuring the printout against a real
//! ruler gives the values for [`Calibration`](crate::Calibration).

use log::info;

use crate::error::PrintError;
use crate::surface::{DevicePoint, RenderingSurface};
use crate::compositor::RenderSession;

const ORIGIN_MM: f64 = 10.0;
const AREA_WIDTH_MM: i64 = 190;
const AREA_HEIGHT_MM: i64 = 270;
const MATRIX_STEP_MM: f64 = 10.0;

/// Length of a 1 mm tick; 5 mm ticks are twice as long, 10 mm ticks four times.
const TICK_MM: f64 = 0.6;

#[derive(Debug, Clone, Copy)]
pub struct RulerOptions {
    pub matrix: bool,
    pub scale: bool,
}

impl Default for RulerOptions {
    fn default() -> Self {
        Self { matrix: true, scale: true }
    }
}

fn tick_multiplier(index: i64) -> i64 {
    if index % 10 == 0 {
        4
    } else if index % 5 == 0 {
        2
    } else {
        1
    }
}

/// Evenly spaced position `i` of `count` between `start` and `end`.
fn spaced(start: i64, end: i64, i: i64, count: i64) -> i64 {
    start + ((i * (end - start)) as f64 / count as f64).round() as i64
}

struct Area {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl<S: RenderingSurface> RenderSession<S> {
    /// Print a single calibration page and close the surface.
    pub fn render_ruler(mut self, options: &RulerOptions) -> Result<(), PrintError> {
        let outcome = self.draw_ruler_page(options);
        self.finish(outcome)
    }

    fn ruler_area(&self) -> Area {
        let left = self.dpi_x.to_device_units(ORIGIN_MM) - self.caps.offset_x;
        let top = self.dpi_y.to_device_units(ORIGIN_MM) - self.caps.offset_y;
        Area {
            left,
            top,
            right: left + self.dpi_x.to_device_units(AREA_WIDTH_MM as f64),
            bottom: top + self.dpi_y.to_device_units(AREA_HEIGHT_MM as f64),
        }
    }

    fn draw_ruler_page(&mut self, options: &RulerOptions) -> Result<(), PrintError> {
        self.begin_page()?;
        let area = self.ruler_area();
        if options.matrix {
            self.draw_matrix(&area)?;
        }
        if options.scale {
            self.draw_scales(&area)?;
        }
        self.end_page()?;
        info!("rendered calibration page (matrix: {}, scale: {})", options.matrix, options.scale);
        Ok(())
    }

    fn draw_matrix(&mut self, area: &Area) -> Result<(), PrintError> {
        let dx = self.dpi_x.to_device_units(MATRIX_STEP_MM);
        let dy = self.dpi_y.to_device_units(MATRIX_STEP_MM);
        let count_x = AREA_WIDTH_MM / MATRIX_STEP_MM as i64;
        let count_y = AREA_HEIGHT_MM / MATRIX_STEP_MM as i64;
        let right = area.left + count_x * dx;
        let bottom = area.top + count_y * dy;

        for i in 0..=count_x {
            let x = area.left + i * dx;
            self.surface.draw_line(DevicePoint::new(x, area.top), DevicePoint::new(x, bottom))?;
        }
        for i in 0..=count_y {
            let y = area.top + i * dy;
            self.surface.draw_line(DevicePoint::new(area.left, y), DevicePoint::new(right, y))?;
        }
        Ok(())
    }

    fn draw_scales(&mut self, area: &Area) -> Result<(), PrintError> {
        let tick_w = self.dpi_x.to_device_units(TICK_MM);
        let tick_h = self.dpi_y.to_device_units(TICK_MM);

        // Vertical ruler down the left edge
        self.surface
            .draw_line(DevicePoint::new(area.left, area.top), DevicePoint::new(area.left, area.bottom))?;
        for i in 0..=AREA_HEIGHT_MM {
            let y = spaced(area.top, area.bottom, i, AREA_HEIGHT_MM);
            let end = area.left + tick_multiplier(i) * tick_w;
            self.surface.draw_line(DevicePoint::new(area.left, y), DevicePoint::new(end, y))?;
        }

        // Horizontal ruler along the top edge
        self.surface
            .draw_line(DevicePoint::new(area.left, area.top), DevicePoint::new(area.right, area.top))?;
        for i in 0..=AREA_WIDTH_MM {
            let x = spaced(area.left, area.right, i, AREA_WIDTH_MM);
            let end = area.top + tick_multiplier(i) * tick_h;
            self.surface.draw_line(DevicePoint::new(x, area.top), DevicePoint::new(x, end))?;
        }
        Ok(())
    }
}
