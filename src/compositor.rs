//! Page composition: lays resolved receipt pairs out on a grid of cells and
//! drives a [`RenderingSurface`] page by page.

use std::path::Path;

use log::{debug, info, warn};

use crate::error::PrintError;
use crate::record::Record;
use crate::resolver::resolve;
use crate::surface::{BoundingBox, Capabilities, DevicePoint, FontWeight, RenderingSurface, TextRun};
use crate::template::{CellTemplate, ItemKind, TemplatePairing, Window};
use crate::units::Resolution;

/// Fees with a code at or below this are not printed (association-level
/// entries and placeholders).
pub const MIN_BILLABLE_FEE_CODE: i64 = 1;

// ============================================================================
// Configuration
// ============================================================================

/// Cells per page. Each fee takes two adjacent cells of a row, so the
/// column count must be even.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGrid {
    pub columns: u32,
    pub rows: u32,
}

impl Default for PageGrid {
    fn default() -> Self {
        Self { columns: 4, rows: 4 }
    }
}

impl PageGrid {
    /// Fees per page.
    pub fn capacity(&self) -> usize {
        (self.rows * (self.columns / 2)) as usize
    }

    fn validate(&self) -> Result<(), PrintError> {
        if self.rows == 0 || self.columns == 0 || self.columns % 2 != 0 {
            return Err(PrintError::InvalidConfiguration(format!(
                "grid must have rows and an even number of columns, got {}x{}",
                self.columns, self.rows
            )));
        }
        Ok(())
    }
}

/// Per-printer correction applied to page positions, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub offset_x_mm: f64,
    pub offset_y_mm: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset_x_mm: 0.0,
            offset_y_mm: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Calibration {
    /// Offsets must be finite and scales finite and positive.
    fn validate(&self) -> Result<(), PrintError> {
        if !self.offset_x_mm.is_finite() || !self.offset_y_mm.is_finite() {
            return Err(PrintError::InvalidConfiguration(format!(
                "calibration offsets must be finite, got {}x{} mm",
                self.offset_x_mm, self.offset_y_mm
            )));
        }
        for scale in [self.scale_x, self.scale_y] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(PrintError::InvalidConfiguration(format!(
                    "calibration scale must be positive, got {}",
                    scale
                )));
            }
        }
        Ok(())
    }

    fn x(&self, mm: f64) -> f64 {
        self.offset_x_mm + mm * self.scale_x
    }

    fn y(&self, mm: f64) -> f64 {
        self.offset_y_mm + mm * self.scale_y
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Draw cut lines between cells.
    pub guide_lines: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub pages: usize,
    pub drawn: usize,
    pub skipped: usize,
}

// ============================================================================
// Render Session
// ============================================================================

/// An open surface plus the page geometry derived from it.
pub struct RenderSession<S: RenderingSurface> {
    pub(crate) surface: S,
    pub(crate) caps: Capabilities,
    pub(crate) dpi_x: Resolution,
    pub(crate) dpi_y: Resolution,
    grid: PageGrid,
    cell_width: i64,
    cell_height: i64,
    calibration: Calibration,
    page_open: bool,
}

impl<S: RenderingSurface> RenderSession<S> {
    /// Read the surface's capabilities and derive the cell size. On invalid
    /// geometry the surface is closed before the error is returned.
    pub fn open(mut surface: S, grid: PageGrid, calibration: Calibration) -> Result<Self, PrintError> {
        let caps = surface.capabilities();
        match calibration.validate().and_then(|()| Self::geometry(&caps, grid)) {
            Ok((dpi_x, dpi_y)) => {
                let cell_width = caps.page_width / i64::from(grid.columns);
                let cell_height = caps.page_height / i64::from(grid.rows);
                info!(
                    "device: {}x{} dpi, page {}x{} mm, margin {}x{} mm, cell {}x{} mm",
                    dpi_x.dpi(),
                    dpi_y.dpi(),
                    dpi_x.to_millimeters(caps.page_width),
                    dpi_y.to_millimeters(caps.page_height),
                    dpi_x.to_millimeters(caps.offset_x),
                    dpi_y.to_millimeters(caps.offset_y),
                    dpi_x.to_millimeters(cell_width),
                    dpi_y.to_millimeters(cell_height),
                );
                Ok(Self {
                    surface,
                    caps,
                    dpi_x,
                    dpi_y,
                    grid,
                    cell_width,
                    cell_height,
                    calibration,
                    page_open: false,
                })
            }
            Err(e) => {
                if let Err(close_err) = surface.close() {
                    warn!("closing surface after configuration error: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn geometry(caps: &Capabilities, grid: PageGrid) -> Result<(Resolution, Resolution), PrintError> {
        grid.validate()?;
        let dpi_x = Resolution::new(caps.dpi_x)?;
        let dpi_y = Resolution::new(caps.dpi_y)?;
        if caps.page_width <= 0 || caps.page_height <= 0 {
            return Err(PrintError::InvalidConfiguration(format!(
                "device reported an empty page ({}x{} units)",
                caps.page_width, caps.page_height
            )));
        }
        Ok((dpi_x, dpi_y))
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Cell size in device units.
    pub fn cell_size(&self) -> (i64, i64) {
        (self.cell_width, self.cell_height)
    }

    /// Print every record as a primary/secondary receipt pair, filling pages
    /// of `grid.capacity()` records. The surface is closed afterwards whether
    /// or not rendering succeeded.
    pub fn render_batch(
        mut self,
        records: &[Record],
        pairing: &TemplatePairing<'_>,
        options: RenderOptions,
    ) -> Result<BatchSummary, PrintError> {
        let outcome = self.compose(records, pairing, options);
        self.finish(outcome)
    }

    /// Close the surface, keeping the first error seen.
    pub(crate) fn finish<T>(mut self, outcome: Result<T, PrintError>) -> Result<T, PrintError> {
        let closed = self.surface.close();
        match (outcome, closed) {
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("closing surface after failure: {}", close_err);
                }
                Err(e)
            }
            (Ok(_), Err(close_err)) => Err(close_err.into()),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    pub(crate) fn begin_page(&mut self) -> Result<(), PrintError> {
        self.surface.start_page()?;
        self.page_open = true;
        Ok(())
    }

    pub(crate) fn end_page(&mut self) -> Result<(), PrintError> {
        if self.page_open {
            self.surface.end_page()?;
            self.page_open = false;
        }
        Ok(())
    }

    fn compose(
        &mut self,
        records: &[Record],
        pairing: &TemplatePairing<'_>,
        options: RenderOptions,
    ) -> Result<BatchSummary, PrintError> {
        let mut summary = BatchSummary::default();
        let mut groups: Vec<&[Record]> = records.chunks(self.grid.capacity()).collect();
        if groups.is_empty() {
            // An empty run still produces a (blank) page
            groups.push(&[]);
        }

        for (index, group) in groups.into_iter().enumerate() {
            if index > 0 {
                self.end_page()?;
            }
            self.begin_page()?;
            summary.pages += 1;

            if options.guide_lines {
                self.draw_guide_lines()?;
            }

            for (slot, record) in group.iter().enumerate() {
                match record.fee_code() {
                    Some(code) if code > MIN_BILLABLE_FEE_CODE => {
                        self.draw_pair(slot, record, pairing)?;
                        summary.drawn += 1;
                    }
                    code => {
                        debug!("page {} slot {}: fee code {:?} not printed", summary.pages, slot, code);
                        summary.skipped += 1;
                    }
                }
            }
        }

        self.end_page()?;
        info!(
            "rendered {} page(s): {} receipt pair(s), {} skipped",
            summary.pages, summary.drawn, summary.skipped
        );
        Ok(summary)
    }

    /// Row `slot / pairs_per_row`. Even pairs put the primary template on
    /// the left; odd pairs mirror it so primaries sit on the outer edges.
    fn draw_pair(&mut self, slot: usize, record: &Record, pairing: &TemplatePairing<'_>) -> Result<(), PrintError> {
        let pairs_per_row = (self.grid.columns / 2) as usize;
        let row = slot / pairs_per_row;
        let pair = slot % pairs_per_row;

        let (left, right) = if pair % 2 == 0 {
            (pairing.primary, pairing.secondary)
        } else {
            (pairing.secondary, pairing.primary)
        };

        self.draw_cell(&resolve(left, record), 2 * pair, row)?;
        self.draw_cell(&resolve(right, record), 2 * pair + 1, row)
    }

    fn cell_origin_mm(&self, column: usize, row: usize) -> (f64, f64) {
        let x = self.dpi_x.to_millimeters(self.cell_width) * column as i64;
        let y = self.dpi_y.to_millimeters(self.cell_height) * row as i64;
        (x as f64, y as f64)
    }

    /// Page-space box of a cell-local window, relative to the printable area.
    fn place(&self, origin: (f64, f64), window: &Window) -> BoundingBox {
        let cal = &self.calibration;
        let x = self.dpi_x.to_device_units(cal.x(origin.0 + window.x_mm)) - self.caps.offset_x;
        let y = self.dpi_y.to_device_units(cal.y(origin.1 + window.y_mm)) - self.caps.offset_y;
        let width = self.dpi_x.to_device_units(window.width_mm * cal.scale_x);
        let height = self.dpi_y.to_device_units(window.height_mm * cal.scale_y);
        BoundingBox::from_origin(x, y, width, height)
    }

    fn draw_cell(&mut self, cell: &CellTemplate, column: usize, row: usize) -> Result<(), PrintError> {
        let origin = self.cell_origin_mm(column, row);
        for item in &cell.items {
            let bbox = self.place(origin, &item.window);
            match &item.kind {
                ItemKind::Text { text, font, bold, center, size_mm } => {
                    let run = TextRun {
                        content: text,
                        font,
                        size: self.dpi_y.to_device_units(*size_mm),
                        weight: if *bold { FontWeight::Bold } else { FontWeight::Regular },
                        centered: *center,
                        bbox,
                    };
                    self.surface.draw_text(&run)?;
                }
                ItemKind::Image { path } => {
                    self.surface.draw_image(Path::new(path), bbox)?;
                }
            }
        }
        Ok(())
    }

    fn draw_guide_lines(&mut self) -> Result<(), PrintError> {
        let Capabilities { page_width, page_height, offset_x, offset_y, .. } = self.caps;
        for i in 1..i64::from(self.grid.rows) {
            let y = self.cell_height * i - offset_y;
            self.surface
                .draw_line(DevicePoint::new(-offset_x, y), DevicePoint::new(page_width - offset_x, y))?;
        }
        for i in 1..i64::from(self.grid.columns) {
            let x = self.cell_width * i - offset_x;
            self.surface
                .draw_line(DevicePoint::new(x, -offset_y), DevicePoint::new(x, page_height - offset_y))?;
        }
        Ok(())
    }
}
