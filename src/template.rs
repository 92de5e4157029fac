//! Receipt cell templates.
//!
//! A template is an ordered list of text and image items, each placed in a
//! window measured in millimeters from the top-left corner of its cell. Text
//! may reference record fields as `#field_name`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PrintError;

// ============================================================================
// Constants
// ============================================================================

pub const MEMBER_COPY: &str = "member-copy";
pub const ADMINISTRATION_COPY: &str = "administration-copy";

const BODY_FONT: &str = "Calibri";
const BARCODE_FONT: &str = "Free 3 of 9 Extended";
const LOGO_PATH: &str = "logo.jpg";

/// Full width of a receipt cell, used by centered header lines
const CELL_WIDTH_MM: f64 = 52.0;
/// Left inset and width of the data lines
const BODY_X_MM: f64 = 5.0;
const BODY_WIDTH_MM: f64 = 42.0;

// ============================================================================
// Data Structures
// ============================================================================

/// Placement of an item, relative to the cell's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl Window {
    pub fn new(x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64) -> Self {
        Self { x_mm, y_mm, width_mm, height_mm }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemKind {
    Text {
        text: String,
        font: String,
        bold: bool,
        center: bool,
        size_mm: f64,
    },
    Image {
        path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutItem {
    #[serde(flatten)]
    pub kind: ItemKind,
    pub window: Window,
}

impl LayoutItem {
    pub fn text(text: &str, size_mm: f64, bold: bool, center: bool, window: Window) -> Self {
        Self::text_in_font(text, BODY_FONT, size_mm, bold, center, window)
    }

    pub fn text_in_font(
        text: &str,
        font: &str,
        size_mm: f64,
        bold: bool,
        center: bool,
        window: Window,
    ) -> Self {
        Self {
            kind: ItemKind::Text {
                text: text.to_string(),
                font: font.to_string(),
                bold,
                center,
                size_mm,
            },
            window,
        }
    }

    pub fn image(path: &str, window: Window) -> Self {
        Self {
            kind: ItemKind::Image { path: path.to_string() },
            window,
        }
    }

    /// The text content, if this is a text item.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Text { text, .. } => Some(text),
            ItemKind::Image { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTemplate {
    pub name: String,
    pub items: Vec<LayoutItem>,
}

/// The two templates printed side by side for every fee.
#[derive(Debug, Clone, Copy)]
pub struct TemplatePairing<'a> {
    pub primary: &'a CellTemplate,
    pub secondary: &'a CellTemplate,
}

/// Registry of the built-in templates, keyed by name.
pub struct TemplateStore {
    templates: BTreeMap<String, CellTemplate>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self { templates: BTreeMap::new() }
    }

    pub fn builtin() -> Self {
        let mut store = Self::new();
        store.register(member_copy());
        store.register(administration_copy());
        store
    }

    pub fn register(&mut self, template: CellTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn get(&self, name: &str) -> Option<&CellTemplate> {
        self.templates.get(name)
    }

    pub fn list(&self) -> Vec<&CellTemplate> {
        self.templates.values().collect()
    }

    pub fn pairing(&self, primary: &str, secondary: &str) -> Result<TemplatePairing<'_>, PrintError> {
        let lookup = |name: &str| {
            self.get(name)
                .ok_or_else(|| PrintError::InvalidConfiguration(format!("unknown template: {}", name)))
        };
        Ok(TemplatePairing {
            primary: lookup(primary)?,
            secondary: lookup(secondary)?,
        })
    }

    /// Member copy on the primary side, administration copy beside it.
    pub fn receipt_pairing(&self) -> Result<TemplatePairing<'_>, PrintError> {
        self.pairing(MEMBER_COPY, ADMINISTRATION_COPY)
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Built-in Templates
// ============================================================================

/// Association letterhead, centered across the cell, starting at `top`.
fn letterhead(top: f64) -> Vec<LayoutItem> {
    vec![
        LayoutItem::text("ASOCIACIÓN BERNARDINO RIVADAVIA", 2.5, true, true,
            Window::new(0.0, top, CELL_WIDTH_MM, 3.5)),
        LayoutItem::text("BIBLIOTECA POPULAR", 2.0, true, true,
            Window::new(0.0, top + 3.0, CELL_WIDTH_MM, 3.0)),
        LayoutItem::text("rivadaviabiblioteca.adm@gmail.com", 2.0, false, true,
            Window::new(0.0, top + 5.0, CELL_WIDTH_MM, 3.0)),
        LayoutItem::text("Av. Colón 31 - Bahía Blanca", 2.0, false, true,
            Window::new(0.0, top + 7.0, CELL_WIDTH_MM, 3.0)),
    ]
}

fn body_line(text: &str, size_mm: f64, bold: bool, y_mm: f64, height_mm: f64) -> LayoutItem {
    LayoutItem::text(text, size_mm, bold, false, Window::new(BODY_X_MM, y_mm, BODY_WIDTH_MM, height_mm))
}

/// Receipt handed to the member.
pub fn member_copy() -> CellTemplate {
    let mut items = vec![LayoutItem::image(LOGO_PATH, Window::new(16.0, 10.0, 20.0, 10.0))];
    items.extend(letterhead(20.0));
    items.extend([
        body_line("Cuota: #fee_month", 4.0, true, 29.0, 5.0),
        body_line("Código: #member_code", 3.5, false, 33.5, 5.0),
        body_line("Categoría: #member_type", 3.5, false, 38.0, 5.0),
        body_line("Nombre: #member_name", 3.5, false, 42.0, 8.5),
        body_line("Rec. Nro.: #fee_code", 3.5, false, 50.5, 5.0),
        body_line("Importe: $ #fee_value", 4.0, true, 55.0, 5.0),
        LayoutItem::text("C.U.I.T: 30-52895478-9", 2.5, false, true,
            Window::new(BODY_X_MM, 60.0, BODY_WIDTH_MM, 5.0)),
        LayoutItem::text("ING. BRUTOS: EXENTO - I.V.A.: EXENTO", 2.5, false, true,
            Window::new(BODY_X_MM, 62.5, BODY_WIDTH_MM, 5.0)),
    ]);
    CellTemplate { name: MEMBER_COPY.to_string(), items }
}

/// Stub kept by the collector, with the delivery address and a barcode.
pub fn administration_copy() -> CellTemplate {
    let mut items = letterhead(7.0);
    items.extend([
        LayoutItem::text("RECIBO P/ADMINISTRACIÓN", 3.5, false, true,
            Window::new(0.0, 17.0, CELL_WIDTH_MM, 5.0)),
        body_line("Cuota: #fee_month", 4.0, true, 20.5, 5.0),
        body_line("Código: #member_code - Zona: #zone", 3.5, false, 25.0, 5.0),
        body_line("Categoría: #member_type", 3.5, false, 29.5, 5.0),
        body_line("Nombre: #member_name", 3.5, false, 34.0, 8.5),
        body_line("Rec. Nro.: #fee_code", 3.5, false, 43.0, 5.0),
        body_line("Dir: #member_address", 4.0, true, 47.5, 10.0),
        body_line("Importe: $ #fee_value", 4.0, true, 56.5, 5.0),
        // Code 39 needs the start/stop asterisks around the payload
        LayoutItem::text_in_font("*#fee_code*", BARCODE_FONT, 10.0, false, true,
            Window::new(0.0, 63.0, CELL_WIDTH_MM, 10.0)),
    ]);
    CellTemplate { name: ADMINISTRATION_COPY.to_string(), items }
}
