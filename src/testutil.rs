//! Synthetic font resources for unit tests
//!
//! Builds raw cmap/OS2/fvar tables in memory so tests can exercise table
//! decoding and fallback without shipping font files.

use crate::font::Font;
use crate::font::FontVariation;
use crate::font::Rect;
use crate::font::Tag;
use crate::style::Paint;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn push_u16(out: &mut Vec<u8>, v: u16) {
  out.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
  out.extend_from_slice(&v.to_be_bytes());
}

fn push_u24(out: &mut Vec<u8>, v: u32) {
  out.extend_from_slice(&v.to_be_bytes()[1..]);
}

/// Builds a cmap with a (3, 10) format 12 subtable covering `ranges`
/// (inclusive) and, when `vs` is nonempty, a (0, 5) format 14 subtable.
/// Each `vs` entry is `(selector, default bases, non-default bases)`.
pub fn build_cmap(ranges: &[(u32, u32)], vs: &[(u32, Vec<u32>, Vec<u32>)]) -> Vec<u8> {
  let num_tables = if vs.is_empty() { 1 } else { 2 };
  let records_end = 4 + num_tables * 8;

  let mut vs_subtable = Vec::new();
  if !vs.is_empty() {
    push_u16(&mut vs_subtable, 14);
    push_u32(&mut vs_subtable, 0); // length, unchecked
    push_u32(&mut vs_subtable, vs.len() as u32);
    let records_size = 11 * vs.len();
    let mut payload = Vec::new();
    for (selector, defaults, non_defaults) in vs {
      push_u24(&mut vs_subtable, *selector);
      if defaults.is_empty() {
        push_u32(&mut vs_subtable, 0);
      } else {
        push_u32(&mut vs_subtable, (10 + records_size + payload.len()) as u32);
        push_u32(&mut payload, defaults.len() as u32);
        for &base in defaults {
          push_u24(&mut payload, base);
          payload.push(0);
        }
      }
      if non_defaults.is_empty() {
        push_u32(&mut vs_subtable, 0);
      } else {
        push_u32(&mut vs_subtable, (10 + records_size + payload.len()) as u32);
        push_u32(&mut payload, non_defaults.len() as u32);
        for &base in non_defaults {
          push_u24(&mut payload, base);
          push_u16(&mut payload, 1);
        }
      }
    }
    vs_subtable.extend_from_slice(&payload);
  }

  let mut out = Vec::new();
  push_u16(&mut out, 0);
  push_u16(&mut out, num_tables as u16);
  let format12_at = records_end + vs_subtable.len();
  if !vs.is_empty() {
    push_u16(&mut out, 0);
    push_u16(&mut out, 5);
    push_u32(&mut out, records_end as u32);
  }
  push_u16(&mut out, 3);
  push_u16(&mut out, 10);
  push_u32(&mut out, format12_at as u32);
  out.extend_from_slice(&vs_subtable);

  push_u16(&mut out, 12);
  push_u16(&mut out, 0);
  push_u32(&mut out, (16 + ranges.len() * 12) as u32);
  push_u32(&mut out, 0);
  push_u32(&mut out, ranges.len() as u32);
  for &(start, end) in ranges {
    push_u32(&mut out, start);
    push_u32(&mut out, end);
    push_u32(&mut out, 1);
  }
  out
}

/// Builds an OS/2 table with the given weight class and italic bit.
pub fn build_os2(weight_class: u16, italic: bool) -> Vec<u8> {
  let mut out = vec![0u8; 64];
  out[4..6].copy_from_slice(&weight_class.to_be_bytes());
  let fs_selection: u16 = if italic { 1 } else { 0 };
  out[62..64].copy_from_slice(&fs_selection.to_be_bytes());
  out
}

/// Builds an fvar table declaring `axes` as `(tag, min, default, max)`.
pub fn build_fvar(axes: &[(&[u8; 4], f32, f32, f32)]) -> Vec<u8> {
  let mut out = Vec::new();
  push_u16(&mut out, 1);
  push_u16(&mut out, 0);
  push_u16(&mut out, 16);
  push_u16(&mut out, 2);
  push_u16(&mut out, axes.len() as u16);
  push_u16(&mut out, 20);
  push_u16(&mut out, 0);
  push_u16(&mut out, 0);
  for (tag, min, default, max) in axes {
    out.extend_from_slice(*tag);
    for v in [min, default, max] {
      out.extend_from_slice(&((*v * 65536.0) as i32).to_be_bytes());
    }
    push_u16(&mut out, 0);
    push_u16(&mut out, 0);
  }
  out
}

static NEXT_TEST_FONT_ID: AtomicU64 = AtomicU64::new(0x1000_0000);

/// In-memory font resource for tests.
#[derive(Debug)]
pub struct TestFont {
  tables: HashMap<Tag, Vec<u8>>,
  coverage: Vec<(u32, u32)>,
  advance: f32,
  id: u64,
}

impl TestFont {
  /// A font covering the inclusive `ranges` with default style.
  pub fn new(ranges: &[(u32, u32)]) -> Arc<Self> {
    Self::build(ranges, &[], None, None)
  }

  pub fn build(
    ranges: &[(u32, u32)],
    vs: &[(u32, Vec<u32>, Vec<u32>)],
    os2: Option<Vec<u8>>,
    fvar: Option<Vec<u8>>,
  ) -> Arc<Self> {
    let mut tables = HashMap::new();
    tables.insert(Tag::from_bytes(b"cmap"), build_cmap(ranges, vs));
    if let Some(os2) = os2 {
      tables.insert(Tag::from_bytes(b"OS/2"), os2);
    }
    if let Some(fvar) = fvar {
      tables.insert(Tag::from_bytes(b"fvar"), fvar);
    }
    Arc::new(Self {
      tables,
      coverage: ranges.to_vec(),
      advance: 10.0,
      id: NEXT_TEST_FONT_ID.fetch_add(1, Ordering::Relaxed),
    })
  }
}

impl Font for TestFont {
  fn table(&self, tag: Tag) -> Option<&[u8]> {
    self.tables.get(&tag).map(|v| v.as_slice())
  }

  fn glyph_id(&self, codepoint: u32) -> Option<u16> {
    self
      .coverage
      .iter()
      .any(|&(start, end)| (start..=end).contains(&codepoint))
      .then(|| (codepoint % 0xFFFE + 1) as u16)
  }

  fn advance(&self, _glyph: u16, paint: &Paint) -> f32 {
    self.advance * paint.size / 16.0
  }

  fn bounds(&self, _glyph: u16, paint: &Paint) -> Rect {
    Rect {
      left: 0.0,
      top: -paint.size * 0.75,
      right: self.advance * paint.size / 16.0,
      bottom: paint.size * 0.25,
    }
  }

  fn unique_id(&self) -> u64 {
    self.id
  }

  fn with_variation(&self, variations: &[FontVariation]) -> Option<Arc<dyn Font>> {
    let axes = self.variation_axes();
    if !variations
      .iter()
      .any(|v| axes.iter().any(|a| a.tag == v.tag))
    {
      return None;
    }
    Some(Arc::new(Self {
      tables: self.tables.clone(),
      coverage: self.coverage.clone(),
      advance: self.advance,
      id: NEXT_TEST_FONT_ID.fetch_add(1, Ordering::Relaxed),
    }))
  }
}
