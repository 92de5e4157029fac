//! PDF rendering surface.
//!
//! Every physical page becomes one PDF page. Device units are mapped back to
//! millimeters at the configured resolution, and the top-left device origin
//! is flipped onto PDF's bottom-left one.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ::image::{Rgba, RgbImage};
use log::{debug, info};
use printpdf::*;

use crate::error::{PrintError, SurfaceError};
use crate::surface::{BoundingBox, Capabilities, DevicePoint, FontWeight, RenderingSurface, TextRun};
use crate::units::{mm_to_points, Resolution, MM_PER_INCH};

// ============================================================================
// Constants
// ============================================================================

/// A4 portrait
pub const A4_WIDTH_MM: f64 = 210.0;
pub const A4_HEIGHT_MM: f64 = 297.0;

pub const DEFAULT_DPI: i32 = 300;

const LAYER_NAME: &str = "Layer 1";

/// Average glyph advance as a fraction of the font size, for wrapping
const AVG_GLYPH_WIDTH: f64 = 0.5;

/// Baseline of the first line below the top of the box, as a fraction of
/// the font size
const ASCENT: f64 = 0.8;

const LINE_SPACING: f64 = 1.15;

const LINE_THICKNESS_PT: f32 = 0.3;

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct PdfSettings {
    pub title: String,
    pub dpi: i32,
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    /// Unprintable margin reported to the compositor, like a printer's
    /// physical offset.
    pub offset_x_mm: f64,
    pub offset_y_mm: f64,
    /// Directory searched for `<font>.ttf` / `<font> Bold.ttf`.
    pub font_dir: Option<PathBuf>,
    /// Base directory for relative image paths in templates.
    pub asset_dir: Option<PathBuf>,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            title: "Tirada".to_string(),
            dpi: DEFAULT_DPI,
            page_width_mm: A4_WIDTH_MM,
            page_height_mm: A4_HEIGHT_MM,
            offset_x_mm: 0.0,
            offset_y_mm: 0.0,
            font_dir: None,
            asset_dir: None,
        }
    }
}

/// Decoded image, already flattened onto white.
struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

// ============================================================================
// Surface
// ============================================================================

pub struct PdfSurface {
    path: PathBuf,
    settings: PdfSettings,
    dpi: Resolution,
    doc: Option<PdfDocumentReference>,
    first_page: Option<(PdfPageIndex, PdfLayerIndex)>,
    layer: Option<PdfLayerReference>,
    fonts: HashMap<(String, FontWeight), IndirectFontRef>,
    images: HashMap<PathBuf, RasterImage>,
    pages: usize,
}

impl PdfSurface {
    /// Create the document that will be written to `path` on close.
    pub fn open(path: impl AsRef<Path>, settings: PdfSettings) -> Result<Self, PrintError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(PrintError::InvalidConfiguration("output path is empty".into()));
        }
        if path.is_dir() {
            return Err(PrintError::InvalidConfiguration(format!(
                "output path is a directory: {}",
                path.display()
            )));
        }
        let dpi = Resolution::new(settings.dpi)?;
        if settings.page_width_mm <= 0.0 || settings.page_height_mm <= 0.0 {
            return Err(PrintError::InvalidConfiguration(format!(
                "page size must be positive, got {}x{} mm",
                settings.page_width_mm, settings.page_height_mm
            )));
        }

        let (doc, page, layer) = PdfDocument::new(
            &settings.title,
            Mm(settings.page_width_mm as f32),
            Mm(settings.page_height_mm as f32),
            LAYER_NAME,
        );

        Ok(Self {
            path: path.to_path_buf(),
            settings,
            dpi,
            doc: Some(doc),
            first_page: Some((page, layer)),
            layer: None,
            fonts: HashMap::new(),
            images: HashMap::new(),
            pages: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    fn mm(&self, units: i64) -> f64 {
        self.dpi.units_to_mm(units)
    }

    /// Device x in units to PDF x in millimeters.
    fn page_x(&self, x: i64) -> f64 {
        self.mm(x) + self.settings.offset_x_mm
    }

    /// Device y in units (downwards) to PDF y in millimeters (upwards).
    fn page_y(&self, y: i64) -> f64 {
        self.settings.page_height_mm - (self.mm(y) + self.settings.offset_y_mm)
    }

    fn current_layer(&self) -> Result<&PdfLayerReference, SurfaceError> {
        if self.doc.is_none() {
            return Err(SurfaceError::Closed);
        }
        self.layer.as_ref().ok_or(SurfaceError::NoPage)
    }

    fn find_font_file(&self, name: &str, weight: FontWeight) -> Option<PathBuf> {
        let dir = self.settings.font_dir.as_ref()?;
        let mut candidates = Vec::new();
        if weight == FontWeight::Bold {
            candidates.push(dir.join(format!("{} Bold.ttf", name)));
        }
        candidates.push(dir.join(format!("{}.ttf", name)));
        candidates.into_iter().find(|p| p.is_file())
    }

    fn font(&mut self, name: &str, weight: FontWeight) -> Result<IndirectFontRef, SurfaceError> {
        let key = (name.to_string(), weight);
        if let Some(font) = self.fonts.get(&key) {
            return Ok(font.clone());
        }

        let doc = self.doc.as_ref().ok_or(SurfaceError::Closed)?;
        let font = match self.find_font_file(name, weight) {
            Some(file_path) => {
                debug!("embedding font {}", file_path.display());
                let file = File::open(&file_path)?;
                doc.add_external_font(file)
                    .map_err(|e| SurfaceError::Pdf(format!("{}: {}", file_path.display(), e)))?
            }
            None => {
                debug!("font {:?} not found, using Helvetica", name);
                let builtin = match weight {
                    FontWeight::Bold => BuiltinFont::HelveticaBold,
                    FontWeight::Regular => BuiltinFont::Helvetica,
                };
                doc.add_builtin_font(builtin)
                    .map_err(|e| SurfaceError::Pdf(e.to_string()))?
            }
        };

        self.fonts.insert(key, font.clone());
        Ok(font)
    }

    fn resolve_asset(&self, path: &Path) -> PathBuf {
        match &self.settings.asset_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn load_image(&mut self, path: &Path) -> Result<&RasterImage, SurfaceError> {
        let full_path = self.resolve_asset(path);
        if !self.images.contains_key(&full_path) {
            let decoded = ::image::open(&full_path)
                .map_err(|e| SurfaceError::Resource(format!("{}: {}", full_path.display(), e)))?;
            let raster = flatten_on_white(&decoded.to_rgba8());
            self.images.insert(full_path.clone(), raster);
        }
        self.images
            .get(&full_path)
            .ok_or_else(|| SurfaceError::Resource(full_path.display().to_string()))
    }
}

/// Composite RGBA against a white background
fn flatten_on_white(rgba_image: &::image::RgbaImage) -> RasterImage {
    let (width, height) = rgba_image.dimensions();
    let mut rgb_image = RgbImage::new(width, height);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let bg = 255.0;
        let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, ::image::Rgb([out_r, out_g, out_b]));
    }
    RasterImage {
        width,
        height,
        pixels: rgb_image.into_raw(),
    }
}

// ============================================================================
// Text Layout
// ============================================================================

pub fn estimate_width_mm(text: &str, size_mm: f64) -> f64 {
    text.chars().count() as f64 * size_mm * AVG_GLYPH_WIDTH
}

/// Greedy word wrap. Words are never split; one longer than the box gets a
/// line of its own.
pub fn wrap_text(text: &str, max_width_mm: f64, size_mm: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", line, word);
            if estimate_width_mm(&candidate, size_mm) <= max_width_mm {
                line = candidate;
            } else {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

// ============================================================================
// RenderingSurface
// ============================================================================

impl RenderingSurface for PdfSurface {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            dpi_x: self.dpi.dpi(),
            dpi_y: self.dpi.dpi(),
            page_width: self.dpi.to_device_units(self.settings.page_width_mm),
            page_height: self.dpi.to_device_units(self.settings.page_height_mm),
            offset_x: self.dpi.to_device_units(self.settings.offset_x_mm),
            offset_y: self.dpi.to_device_units(self.settings.offset_y_mm),
        }
    }

    fn start_page(&mut self) -> Result<(), SurfaceError> {
        let doc = self.doc.as_ref().ok_or(SurfaceError::Closed)?;
        let (page, layer) = match self.first_page.take() {
            Some(first) => first,
            None => doc.add_page(
                Mm(self.settings.page_width_mm as f32),
                Mm(self.settings.page_height_mm as f32),
                LAYER_NAME,
            ),
        };
        let layer = doc.get_page(page).get_layer(layer);
        layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        layer.set_outline_thickness(LINE_THICKNESS_PT);
        self.layer = Some(layer);
        self.pages += 1;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), SurfaceError> {
        self.current_layer()?;
        self.layer = None;
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> Result<(), SurfaceError> {
        self.current_layer()?;
        let font = self.font(run.font, run.weight)?;

        let size_mm = self.mm(run.size);
        let box_left = self.page_x(run.bbox.left);
        let box_top = self.page_y(run.bbox.top);
        let box_width = self.mm(run.bbox.width());
        let box_height = self.mm(run.bbox.height());
        let font_pt = mm_to_points(size_mm) as f32;

        let layer = self.current_layer()?;
        let mut baseline = size_mm * ASCENT;
        for (index, line) in wrap_text(run.content, box_width, size_mm).iter().enumerate() {
            // Clip at the bottom of the box, but always show the first line
            if index > 0 && baseline > box_height {
                break;
            }
            let x = if run.centered {
                box_left + ((box_width - estimate_width_mm(line, size_mm)) / 2.0).max(0.0)
            } else {
                box_left
            };
            layer.use_text(line.as_str(), font_pt, Mm(x as f32), Mm((box_top - baseline) as f32), &font);
            baseline += size_mm * LINE_SPACING;
        }
        Ok(())
    }

    fn draw_image(&mut self, path: &Path, bbox: BoundingBox) -> Result<(), SurfaceError> {
        self.current_layer()?;
        let x = self.page_x(bbox.left);
        let width_mm = self.mm(bbox.width());
        let height_mm = self.mm(bbox.height());
        let y = self.page_y(bbox.top) - height_mm;

        let raster = self.load_image(path)?;
        let image = Image::from(ImageXObject {
            width: Px(raster.width as usize),
            height: Px(raster.height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: raster.pixels.clone(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        // DPI fixes the width; the box may have another aspect ratio, so the
        // height is stretched to fill it
        let dpi = raster.width as f64 / (width_mm / MM_PER_INCH);
        let natural_height_mm = raster.height as f64 / dpi * MM_PER_INCH;
        let scale_y = height_mm / natural_height_mm;

        let layer = self.current_layer()?.clone();
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(x as f32)),
                translate_y: Some(Mm(y as f32)),
                dpi: Some(dpi as f32),
                scale_y: Some(scale_y as f32),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn draw_line(&mut self, from: DevicePoint, to: DevicePoint) -> Result<(), SurfaceError> {
        let points = vec![
            (Point::new(Mm(self.page_x(from.x) as f32), Mm(self.page_y(from.y) as f32)), false),
            (Point::new(Mm(self.page_x(to.x) as f32), Mm(self.page_y(to.y) as f32)), false),
        ];
        let layer = self.current_layer()?;
        layer.add_line(Line {
            points,
            is_closed: false,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), SurfaceError> {
        let Some(doc) = self.doc.take() else {
            return Ok(());
        };
        self.layer = None;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        doc.save(&mut writer)
            .map_err(|e| SurfaceError::Pdf(e.to_string()))?;

        info!("wrote {} page(s) to {}", self.pages, self.path.display());
        Ok(())
    }
}
