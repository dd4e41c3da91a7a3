//! Font resource contract and the bundled ttf-parser-backed implementation
//!
//! The engine never owns font files. Everything it needs from a font is
//! expressed by the [`Font`] trait: raw table bytes, nominal glyph lookup,
//! advances, ink bounds, a stable id, and the set of variation axes. Style
//! analysis (OS/2) and axis discovery (fvar) read raw table bytes through
//! that trait so any resource implementation gets the same degraded-fidelity
//! treatment for malformed data.
//!
//! [`ParsedFont`] is the bundled implementation backed by `ttf-parser`, used
//! when the caller hands us font file bytes directly.
//!
//! # References
//!
//! - OpenType OS/2 table: <https://learn.microsoft.com/en-us/typography/opentype/spec/os2>
//! - OpenType fvar table: <https://learn.microsoft.com/en-us/typography/opentype/spec/fvar>

use crate::style::FontStyle;
use crate::style::Paint;
use std::fmt::Debug;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
pub use ttf_parser::Tag;

const OS2_WEIGHT_OFFSET: usize = 4;
const OS2_FSSELECTION_OFFSET: usize = 62;
const OS2_ITALIC_FLAG: u16 = 1;

const FVAR_HEADER_SIZE: usize = 16;
const FVAR_AXIS_RECORD_SIZE: usize = 20;

/// A font variation setting consisting of a 4-byte axis tag and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontVariation {
  pub tag: Tag,
  pub value: f32,
}

/// Axis-aligned ink bounds in pixels, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
  pub left: f32,
  pub top: f32,
  pub right: f32,
  pub bottom: f32,
}

impl Rect {
  /// Returns true if the rect encloses no area.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.left >= self.right || self.top >= self.bottom
  }

  /// Extends this rect to cover `other` shifted by `(dx, dy)`.
  pub fn join_offset(&mut self, other: &Rect, dx: f32, dy: f32) {
    if other.is_empty() {
      return;
    }
    if self.is_empty() {
      *self = Rect {
        left: other.left + dx,
        top: other.top + dy,
        right: other.right + dx,
        bottom: other.bottom + dy,
      };
    } else {
      self.left = self.left.min(other.left + dx);
      self.top = self.top.min(other.top + dy);
      self.right = self.right.max(other.right + dx);
      self.bottom = self.bottom.max(other.bottom + dy);
    }
  }
}

/// Externally-owned font resource.
///
/// Implementations are immutable and shared; the engine only ever reads.
/// Malformed or missing tables must be reported as `None`, never panicked
/// on, so layout can continue with degraded fidelity.
pub trait Font: Send + Sync + Debug {
  /// Raw bytes of table `tag`, or `None` if the font has no such table.
  fn table(&self, tag: Tag) -> Option<&[u8]>;

  /// Nominal glyph id for a code point, ignoring variation selectors.
  fn glyph_id(&self, codepoint: u32) -> Option<u16>;

  /// Horizontal advance of a glyph in pixels under `paint`.
  fn advance(&self, glyph: u16, paint: &Paint) -> f32;

  /// Ink bounds of a glyph in pixels under `paint`.
  fn bounds(&self, glyph: u16, paint: &Paint) -> Rect;

  /// Process-stable identifier, used as a cache key component.
  fn unique_id(&self) -> u64;

  /// Variation axes this font can adjust, with their current values.
  ///
  /// The default implementation decodes the fvar table through
  /// [`parse_fvar_axes`]; fonts with live variation state override this to
  /// report adjusted values.
  fn variation_axes(&self) -> Vec<FontVariation> {
    self
      .table(Tag::from_bytes(b"fvar"))
      .map(parse_fvar_axes)
      .unwrap_or_default()
      .into_iter()
      .map(|axis| FontVariation {
        tag: axis.tag,
        value: axis.default_value,
      })
      .collect()
  }

  /// Returns a copy of this font with the given axis values applied, or
  /// `None` if the font supports none of the requested axes.
  fn with_variation(&self, _variations: &[FontVariation]) -> Option<Arc<dyn Font>> {
    None
  }

  /// Whole-file bytes and face index, for shaping backends that parse the
  /// font themselves. Resources that cannot expose their bytes return
  /// `None` and need a matching backend.
  fn raw_data(&self) -> Option<(Arc<Vec<u8>>, u32)> {
    None
  }
}

/// One axis record decoded from fvar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FvarAxis {
  pub tag: Tag,
  pub min_value: f32,
  pub default_value: f32,
  pub max_value: f32,
}

#[inline]
fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
  Some(u16::from_be_bytes([
    *data.get(offset)?,
    *data.get(offset + 1)?,
  ]))
}

#[inline]
fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
  Some(u32::from_be_bytes([
    *data.get(offset)?,
    *data.get(offset + 1)?,
    *data.get(offset + 2)?,
    *data.get(offset + 3)?,
  ]))
}

#[inline]
fn read_fixed(data: &[u8], offset: usize) -> Option<f32> {
  read_u32(data, offset).map(|raw| raw as i32 as f32 / 65536.0)
}

/// Decodes fvar axis records.
///
/// Only version 1.0 with the standard 20-byte axis record size is accepted;
/// anything else is treated as "no axes" rather than an error.
pub fn parse_fvar_axes(data: &[u8]) -> Vec<FvarAxis> {
  let version_major = match read_u16(data, 0) {
    Some(v) => v,
    None => return Vec::new(),
  };
  let version_minor = read_u16(data, 2).unwrap_or(0xffff);
  if version_major != 1 || version_minor != 0 {
    log::debug!("ignoring fvar with unsupported version {version_major}.{version_minor}");
    return Vec::new();
  }
  let Some(axes_offset) = read_u16(data, 4).map(usize::from) else {
    return Vec::new();
  };
  let Some(axis_count) = read_u16(data, 8).map(usize::from) else {
    return Vec::new();
  };
  let Some(axis_size) = read_u16(data, 10).map(usize::from) else {
    return Vec::new();
  };
  if axis_size != FVAR_AXIS_RECORD_SIZE || axes_offset < FVAR_HEADER_SIZE {
    log::debug!("ignoring fvar with nonstandard layout (axisSize={axis_size})");
    return Vec::new();
  }

  let mut axes = Vec::with_capacity(axis_count);
  for i in 0..axis_count {
    let base = axes_offset + i * FVAR_AXIS_RECORD_SIZE;
    let (Some(tag), Some(min_value), Some(default_value), Some(max_value)) = (
      read_u32(data, base),
      read_fixed(data, base + 4),
      read_fixed(data, base + 8),
      read_fixed(data, base + 12),
    ) else {
      // Truncated axis array: keep what decoded cleanly.
      log::debug!("fvar axis array truncated after {i} of {axis_count} axes");
      break;
    };
    axes.push(FvarAxis {
      tag: Tag(tag),
      min_value,
      default_value,
      max_value,
    });
  }
  axes
}

/// Reads weight and slant from the OS/2 table.
///
/// Returns the default style (weight 4, upright) when the table is missing
/// or shorter than the fsSelection field.
pub fn analyze_style(font: &dyn Font) -> FontStyle {
  let Some(os2) = font.table(Tag::from_bytes(b"OS/2")) else {
    return FontStyle::default();
  };
  let (Some(weight_class), Some(fs_selection)) = (
    read_u16(os2, OS2_WEIGHT_OFFSET),
    read_u16(os2, OS2_FSSELECTION_OFFSET),
  ) else {
    log::debug!("OS/2 table too short ({} bytes), using default style", os2.len());
    return FontStyle::default();
  };
  let weight = (weight_class / 100).min(9) as u8;
  let italic = fs_selection & OS2_ITALIC_FLAG != 0;
  FontStyle::from_weight(weight, italic)
}

static NEXT_FONT_ID: AtomicU64 = AtomicU64::new(1);

fn next_font_id() -> u64 {
  NEXT_FONT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Font resource backed by in-memory font file bytes.
///
/// The parsed face borrows the byte buffer; the `Arc` pins the buffer for
/// the lifetime of the struct so the borrow can be widened to `'static`.
pub struct ParsedFont {
  data: Arc<Vec<u8>>,
  index: u32,
  face: ttf_parser::Face<'static>,
  variations: Vec<FontVariation>,
  id: u64,
}

impl Debug for ParsedFont {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ParsedFont")
      .field("index", &self.index)
      .field("id", &self.id)
      .field("variations", &self.variations)
      .finish()
  }
}

impl ParsedFont {
  /// Parses font file bytes into a resource.
  pub fn new(data: Arc<Vec<u8>>, index: u32) -> crate::Result<Arc<Self>> {
    Self::with_variations(data, index, Vec::new())
  }

  fn with_variations(
    data: Arc<Vec<u8>>,
    index: u32,
    variations: Vec<FontVariation>,
  ) -> crate::Result<Arc<Self>> {
    // SAFETY: the Arc keeps the font data alive for the lifetime of the face.
    let static_data: &'static [u8] = unsafe { std::mem::transmute::<&[u8], &'static [u8]>(&*data) };
    let mut face = ttf_parser::Face::parse(static_data, index).map_err(|e| {
      crate::error::FontError::Unparseable {
        message: e.to_string(),
      }
    })?;
    for variation in &variations {
      let _ = face.set_variation(variation.tag, variation.value);
    }
    Ok(Arc::new(Self {
      data,
      index,
      face,
      variations,
      id: next_font_id(),
    }))
  }

  #[inline]
  fn scale(&self, paint: &Paint) -> f32 {
    let upem = self.face.units_per_em() as f32;
    if upem <= 0.0 {
      0.0
    } else {
      paint.size / upem
    }
  }
}

impl Font for ParsedFont {
  fn table(&self, tag: Tag) -> Option<&[u8]> {
    self.face.raw_face().table(tag)
  }

  fn glyph_id(&self, codepoint: u32) -> Option<u16> {
    let ch = char::from_u32(codepoint)?;
    self.face.glyph_index(ch).map(|g| g.0)
  }

  fn advance(&self, glyph: u16, paint: &Paint) -> f32 {
    let advance = self
      .face
      .glyph_hor_advance(ttf_parser::GlyphId(glyph))
      .unwrap_or(0);
    advance as f32 * self.scale(paint) * paint.scale_x
  }

  fn bounds(&self, glyph: u16, paint: &Paint) -> Rect {
    let scale = self.scale(paint);
    match self.face.glyph_bounding_box(ttf_parser::GlyphId(glyph)) {
      Some(bbox) => Rect {
        left: bbox.x_min as f32 * scale,
        top: -(bbox.y_max as f32) * scale,
        right: bbox.x_max as f32 * scale,
        bottom: -(bbox.y_min as f32) * scale,
      },
      None => Rect::default(),
    }
  }

  fn unique_id(&self) -> u64 {
    self.id
  }

  fn variation_axes(&self) -> Vec<FontVariation> {
    let axes = self
      .table(Tag::from_bytes(b"fvar"))
      .map(parse_fvar_axes)
      .unwrap_or_default();
    axes
      .into_iter()
      .map(|axis| {
        let value = self
          .variations
          .iter()
          .find(|v| v.tag == axis.tag)
          .map(|v| v.value.clamp(axis.min_value, axis.max_value))
          .unwrap_or(axis.default_value);
        FontVariation {
          tag: axis.tag,
          value,
        }
      })
      .collect()
  }

  fn with_variation(&self, variations: &[FontVariation]) -> Option<Arc<dyn Font>> {
    let axes = self
      .table(Tag::from_bytes(b"fvar"))
      .map(parse_fvar_axes)
      .unwrap_or_default();
    let supported: Vec<FontVariation> = variations
      .iter()
      .filter(|v| axes.iter().any(|axis| axis.tag == v.tag))
      .copied()
      .collect();
    if supported.is_empty() {
      return None;
    }

    // Merge onto existing settings so chained derivations accumulate.
    let mut merged = self.variations.clone();
    for variation in supported {
      match merged.iter_mut().find(|v| v.tag == variation.tag) {
        Some(existing) => existing.value = variation.value,
        None => merged.push(variation),
      }
    }
    Self::with_variations(Arc::clone(&self.data), self.index, merged)
      .ok()
      .map(|font| font as Arc<dyn Font>)
  }

  fn raw_data(&self) -> Option<(Arc<Vec<u8>>, u32)> {
    Some((Arc::clone(&self.data), self.index))
  }
}
