//! tirada-pdf: receipt sheets for membership fee collection
//!
//! Fee records pulled from the membership API (or a JSON export) are mapped
//! to flat records, substituted into two receipt templates and laid out on a
//! grid of cells, eight fees per A4 page. Drawing goes through the
//! [`RenderingSurface`] trait; [`PdfSurface`] is the shipped implementation.

pub mod error;
pub mod units;
pub mod template;
pub mod resolver;
pub mod record;
pub mod surface;
pub mod compositor;
pub mod ruler;
pub mod pdf;
pub mod source;

pub use compositor::{BatchSummary, Calibration, PageGrid, RenderOptions, RenderSession};
pub use error::{PrintError, SurfaceError};
pub use pdf::{PdfSettings, PdfSurface};
pub use record::{map_record, map_records, FieldValue, RawFeeRecord, Record};
pub use resolver::{referenced_fields, resolve, unknown_fields};
pub use ruler::RulerOptions;
pub use source::{ApiSource, JsonFileSource, RecordSource};
pub use surface::{BoundingBox, Capabilities, DevicePoint, FontWeight, RenderingSurface, TextRun};
pub use template::{CellTemplate, ItemKind, LayoutItem, TemplatePairing, TemplateStore, Window};
pub use units::Resolution;
