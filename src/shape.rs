//! Shaping backend contract and the rustybuzz implementation
//!
//! Layout talks to shaping through the [`ShapeBackend`] trait: given a font
//! resource, a script, a direction, and a UTF-16 slice, the backend returns
//! positioned glyphs with cluster indices back into the slice. Tests plug
//! in counting fakes; production uses [`HarfBuzzBackend`], which parses
//! faces with rustybuzz and keeps them in a bounded cache keyed by the font
//! resource id.
//!
//! Parsed faces borrow the font bytes; the `Arc` pins the buffer so the
//! borrow can be widened to `'static` while the cache entry holds both.

use crate::error::ShapingError;
use crate::font::Font;
use crate::font::Rect;
use crate::style::Paint;
use crate::unicode;
use lru::LruCache;
use rustc_hash::FxHashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use unicode_script::Script;

/// Parsed faces kept in memory at once.
const FACE_CACHE_SIZE: usize = 128;

/// One positioned glyph from the backend. Advances and offsets are in
/// pixels; `cluster` is a UTF-16 index relative to the shaped slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
  pub glyph_id: u32,
  pub cluster: u32,
  pub x_advance: f32,
  pub y_advance: f32,
  pub x_offset: f32,
  pub y_offset: f32,
}

/// External shaping engine consumed by layout.
pub trait ShapeBackend: Send + Sync {
  /// Shapes one script- and font-homogeneous slice.
  fn shape(
    &self,
    font: &dyn Font,
    paint: &Paint,
    script: Script,
    rtl: bool,
    text: &[u16],
  ) -> crate::Result<Vec<ShapedGlyph>>;

  /// Ink extents straight from the backend, used instead of the generic
  /// bounds query for color-bitmap glyphs.
  fn glyph_extents(&self, _font: &dyn Font, _glyph: u32, _paint: &Paint) -> Option<Rect> {
    None
  }

  /// Drops any cached shaping objects.
  fn purge_caches(&self) {}
}

struct CachedFace {
  // Keeps the bytes the face borrows alive. Field order is irrelevant;
  // the Arc must simply outlive every use of `face`.
  _data: Arc<Vec<u8>>,
  face: rustybuzz::Face<'static>,
}

impl CachedFace {
  fn parse(data: Arc<Vec<u8>>, index: u32, variations: &[rustybuzz::Variation]) -> Option<Self> {
    // SAFETY: the Arc keeps the font data alive for the lifetime of the
    // cached face.
    let static_data: &'static [u8] = unsafe { std::mem::transmute::<&[u8], &'static [u8]>(&*data) };
    let mut face = rustybuzz::Face::from_slice(static_data, index)?;
    if !variations.is_empty() {
      face.set_variations(variations);
    }
    Some(Self { _data: data, face })
  }
}

/// Bounded cache of parsed faces keyed by font resource id, shared between
/// backends built from the same [`crate::context::TextContext`].
pub struct FaceCache {
  inner: Mutex<LruCache<u64, Arc<CachedFace>>>,
}

impl Default for FaceCache {
  fn default() -> Self {
    Self {
      inner: Mutex::new(LruCache::new(NonZeroUsize::new(FACE_CACHE_SIZE).unwrap())),
    }
  }
}

impl FaceCache {
  fn get_or_parse(&self, font: &dyn Font) -> Option<Arc<CachedFace>> {
    let key = font.unique_id();
    if let Ok(mut cache) = self.inner.lock() {
      if let Some(face) = cache.get(&key) {
        return Some(Arc::clone(face));
      }
    }
    let (data, index) = font.raw_data()?;
    let variations: Vec<rustybuzz::Variation> = font
      .variation_axes()
      .into_iter()
      .map(|v| rustybuzz::Variation {
        tag: v.tag,
        value: v.value,
      })
      .collect();
    let parsed = Arc::new(CachedFace::parse(data, index, &variations)?);
    if let Ok(mut cache) = self.inner.lock() {
      if let Some(face) = cache.get(&key) {
        return Some(Arc::clone(face));
      }
      cache.put(key, Arc::clone(&parsed));
    }
    Some(parsed)
  }

  pub(crate) fn clear(&self) {
    if let Ok(mut cache) = self.inner.lock() {
      cache.clear();
    }
  }
}

/// Shaping backend backed by rustybuzz.
pub struct HarfBuzzBackend {
  faces: Arc<FaceCache>,
}

impl HarfBuzzBackend {
  /// A backend with its own private face cache.
  pub fn new() -> Self {
    Self {
      faces: Arc::new(FaceCache::default()),
    }
  }

  /// A backend sharing the context's face cache, so
  /// [`crate::context::TextContext::purge_caches`] drops its faces too.
  pub fn with_context(ctx: &crate::context::TextContext) -> Self {
    Self {
      faces: ctx.face_cache(),
    }
  }

  fn script_tag(script: Script) -> Option<rustybuzz::Script> {
    let name = script.short_name();
    let bytes = name.as_bytes();
    if bytes.len() != 4 {
      return None;
    }
    rustybuzz::Script::from_iso15924_tag(rustybuzz::ttf_parser::Tag::from_bytes(&[
      bytes[0], bytes[1], bytes[2], bytes[3],
    ]))
  }
}

impl Default for HarfBuzzBackend {
  fn default() -> Self {
    Self::new()
  }
}

impl ShapeBackend for HarfBuzzBackend {
  fn shape(
    &self,
    font: &dyn Font,
    paint: &Paint,
    script: Script,
    rtl: bool,
    text: &[u16],
  ) -> crate::Result<Vec<ShapedGlyph>> {
    let cached = self.faces.get_or_parse(font).ok_or(ShapingError::NoFace {
      font_id: font.unique_id(),
    })?;
    let face = &cached.face;

    let mut buffer = rustybuzz::UnicodeBuffer::new();
    for (offset, cp) in unicode::CodePoints::new(text) {
      let ch = char::from_u32(cp).unwrap_or('\u{FFFD}');
      buffer.add(ch, offset as u32);
    }
    buffer.set_direction(if rtl {
      rustybuzz::Direction::RightToLeft
    } else {
      rustybuzz::Direction::LeftToRight
    });
    if let Some(script) = Self::script_tag(script) {
      buffer.set_script(script);
    }

    let glyphs = rustybuzz::shape(face, &[], buffer);
    let upem = face.units_per_em() as f32;
    let scale = if upem > 0.0 { paint.size / upem } else { 0.0 };
    let x_scale = scale * paint.scale_x;

    let mut out = Vec::with_capacity(glyphs.len());
    for (info, pos) in glyphs
      .glyph_infos()
      .iter()
      .zip(glyphs.glyph_positions().iter())
    {
      out.push(ShapedGlyph {
        glyph_id: info.glyph_id,
        cluster: info.cluster,
        x_advance: pos.x_advance as f32 * x_scale,
        y_advance: pos.y_advance as f32 * scale,
        x_offset: pos.x_offset as f32 * x_scale,
        y_offset: pos.y_offset as f32 * scale,
      });
    }
    Ok(out)
  }

  fn glyph_extents(&self, font: &dyn Font, glyph: u32, paint: &Paint) -> Option<Rect> {
    let cached = self.faces.get_or_parse(font)?;
    let face = &cached.face;
    let glyph_id = rustybuzz::ttf_parser::GlyphId(u16::try_from(glyph).ok()?);
    // Bitmap strikes report extents in pixels at their own ppem.
    if let Some(image) = face.glyph_raster_image(glyph_id, paint.size as u16) {
      let scale = if image.pixels_per_em > 0 {
        paint.size / f32::from(image.pixels_per_em)
      } else {
        1.0
      };
      return Some(Rect {
        left: f32::from(image.x) * scale,
        top: -f32::from(image.y) * scale,
        right: (f32::from(image.x) + f32::from(image.width)) * scale,
        bottom: (f32::from(image.height) - f32::from(image.y)) * scale,
      });
    }
    let bbox = face.glyph_bounding_box(glyph_id)?;
    let upem = face.units_per_em() as f32;
    let scale = if upem > 0.0 { paint.size / upem } else { 0.0 };
    Some(Rect {
      left: f32::from(bbox.x_min) * scale,
      top: -f32::from(bbox.y_max) * scale,
      right: f32::from(bbox.x_max) * scale,
      bottom: -f32::from(bbox.y_min) * scale,
    })
  }

  fn purge_caches(&self) {
    self.faces.clear();
  }
}

/// Deterministic test backend: one glyph per grapheme-ish cluster start,
/// fixed advance, counting every call.
pub struct RecordingBackend {
  pub advance: f32,
  calls: Mutex<FxHashMap<u64, usize>>,
}

impl RecordingBackend {
  pub fn new() -> Self {
    Self {
      advance: 10.0,
      calls: Mutex::new(FxHashMap::default()),
    }
  }

  /// Total shape() invocations across all fonts.
  pub fn total_calls(&self) -> usize {
    self
      .calls
      .lock()
      .map(|calls| calls.values().sum())
      .unwrap_or(0)
  }
}

impl Default for RecordingBackend {
  fn default() -> Self {
    Self::new()
  }
}

impl ShapeBackend for RecordingBackend {
  fn shape(
    &self,
    font: &dyn Font,
    paint: &Paint,
    _script: Script,
    rtl: bool,
    text: &[u16],
  ) -> crate::Result<Vec<ShapedGlyph>> {
    if let Ok(mut calls) = self.calls.lock() {
      *calls.entry(font.unique_id()).or_insert(0) += 1;
    }
    let mut out = Vec::new();
    for (offset, cp) in unicode::CodePoints::new(text) {
      let glyph_id = u32::from(font.glyph_id(cp).unwrap_or(0));
      out.push(ShapedGlyph {
        glyph_id,
        cluster: offset as u32,
        x_advance: self.advance * paint.size / 16.0,
        y_advance: 0.0,
        x_offset: 0.0,
        y_offset: 0.0,
      });
    }
    if rtl {
      out.reverse();
    }
    Ok(out)
  }
}
