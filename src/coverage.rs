//! Code point coverage decoded from a font's character map
//!
//! A [`CoverageSet`] is an immutable sorted sequence of half-open code point
//! ranges decoded from a cmap table, plus the font's variation-sequence
//! records (cmap format 14) when present. Lookup is a binary search over the
//! flattened range boundaries, so membership and next-covered queries are
//! O(log n) with n the number of ranges, not the number of code points.
//!
//! Only cmap subtable formats 4 and 12 contribute coverage; every other
//! format, and any truncated or inconsistent table, degrades to whatever
//! prefix decoded cleanly. Malformed data is never an error here.
//!
//! # References
//!
//! - OpenType cmap table: <https://learn.microsoft.com/en-us/typography/opentype/spec/cmap>

/// Highest code point a coverage set can address.
pub const MAX_CODEPOINT: u32 = 0x10FFFF;

const CMAP_HEADER_SIZE: usize = 4;
const ENCODING_RECORD_SIZE: usize = 8;

#[inline]
fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
  Some(u16::from_be_bytes([
    *data.get(offset)?,
    *data.get(offset + 1)?,
  ]))
}

#[inline]
fn read_u24(data: &[u8], offset: usize) -> Option<u32> {
  Some(u32::from_be_bytes([
    0,
    *data.get(offset)?,
    *data.get(offset + 1)?,
    *data.get(offset + 2)?,
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

/// Accumulates sorted, coalesced half-open ranges.
#[derive(Default)]
struct RangeBuilder {
  // Flattened boundaries: even index = range start, odd index = range end.
  ranges: Vec<u32>,
}

impl RangeBuilder {
  fn add(&mut self, start: u32, end: u32) {
    if start >= end || start > MAX_CODEPOINT {
      return;
    }
    let end = end.min(MAX_CODEPOINT + 1);
    if let Some(last_end) = self.ranges.last_mut() {
      if start <= *last_end {
        if end > *last_end {
          *last_end = end;
        }
        return;
      }
    }
    self.ranges.push(start);
    self.ranges.push(end);
  }

  fn finish(mut self) -> Vec<u32> {
    // cmap segments are required to be sorted; tolerate ones that are not.
    if !self.ranges.windows(2).all(|w| w[0] <= w[1]) {
      let mut pairs: Vec<(u32, u32)> = self
        .ranges
        .chunks_exact(2)
        .map(|c| (c[0], c[1]))
        .collect();
      pairs.sort_unstable();
      let mut rebuilt = RangeBuilder::default();
      for (start, end) in pairs {
        rebuilt.add(start, end);
      }
      self.ranges = rebuilt.ranges;
    }
    self.ranges
  }
}

/// One variation-selector record from a cmap format 14 subtable.
#[derive(Debug, Clone, Default)]
struct VariationRecord {
  selector: u32,
  // Flattened half-open ranges of base characters whose default glyph
  // already serves the sequence.
  default_ranges: Vec<u32>,
  // Sorted base characters with a dedicated sequence glyph.
  non_default: Vec<u32>,
}

/// Immutable code point coverage for one font.
#[derive(Debug, Clone, Default)]
pub struct CoverageSet {
  // Flattened boundaries: even index = start, odd index = end (exclusive).
  ranges: Vec<u32>,
  vs_records: Vec<VariationRecord>,
  has_vs_table: bool,
}

#[inline]
fn flat_contains(ranges: &[u32], cp: u32) -> bool {
  ranges.partition_point(|&b| b <= cp) % 2 == 1
}

impl CoverageSet {
  /// Decodes coverage from raw cmap table bytes.
  pub fn from_cmap(cmap: &[u8]) -> Self {
    let Some(num_tables) = read_u16(cmap, 2).map(usize::from) else {
      return Self::default();
    };

    // Encoding pairs that can carry a format 4 or 12 subtable, best first.
    const CANDIDATE_PAIRS: [(u16, u16); 5] = [(3, 10), (0, 6), (0, 4), (3, 1), (0, 3)];

    let mut best: Option<(usize, usize)> = None; // (priority, offset)
    let mut vs_offset: Option<usize> = None;
    for i in 0..num_tables {
      let base = CMAP_HEADER_SIZE + i * ENCODING_RECORD_SIZE;
      let (Some(platform), Some(encoding), Some(offset)) = (
        read_u16(cmap, base),
        read_u16(cmap, base + 2),
        read_u32(cmap, base + 4).map(|v| v as usize),
      ) else {
        break;
      };
      if platform == 0 && encoding == 5 {
        vs_offset = Some(offset);
        continue;
      }
      if let Some(priority) = CANDIDATE_PAIRS
        .iter()
        .position(|&pair| pair == (platform, encoding))
      {
        if best.map_or(true, |(p, _)| priority < p) {
          best = Some((priority, offset));
        }
      }
    }

    let mut set = Self::default();
    if let Some((_, offset)) = best {
      let subtable = cmap.get(offset..).unwrap_or(&[]);
      match read_u16(subtable, 0) {
        Some(4) => set.ranges = decode_format4(subtable),
        Some(12) => set.ranges = decode_format12(subtable),
        Some(other) => {
          log::debug!("ignoring cmap subtable format {other}");
        }
        None => {}
      }
    }
    if let Some(offset) = vs_offset {
      let subtable = cmap.get(offset..).unwrap_or(&[]);
      if read_u16(subtable, 0) == Some(14) {
        set.vs_records = decode_format14(subtable);
        set.has_vs_table = true;
      }
    }
    set
  }

  /// True if the font maps this code point.
  #[inline]
  pub fn contains(&self, cp: u32) -> bool {
    flat_contains(&self.ranges, cp)
  }

  /// Smallest covered code point that is `>= cp`, if any.
  pub fn next_covered(&self, cp: u32) -> Option<u32> {
    let idx = self.ranges.partition_point(|&b| b <= cp);
    if idx % 2 == 1 {
      return Some(cp);
    }
    self.ranges.get(idx).copied()
  }

  /// True if the font carries a cmap format 14 subtable.
  #[inline]
  pub fn has_vs_table(&self) -> bool {
    self.has_vs_table
  }

  /// True if the font declares the exact variation sequence `(base, vs)`.
  ///
  /// A default-UVS entry counts only when the base character itself is
  /// covered, since the sequence renders with the base glyph.
  pub fn has_variation_sequence(&self, base: u32, vs: u32) -> bool {
    let Ok(idx) = self
      .vs_records
      .binary_search_by_key(&vs, |record| record.selector)
    else {
      return false;
    };
    let record = &self.vs_records[idx];
    if record.non_default.binary_search(&base).is_ok() {
      return true;
    }
    flat_contains(&record.default_ranges, base) && self.contains(base)
  }

  /// True if the set covers nothing.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.ranges.is_empty()
  }

  /// Iterates the covered ranges as `(start, end)` half-open pairs.
  pub fn iter_ranges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
    self.ranges.chunks_exact(2).map(|c| (c[0], c[1]))
  }
}

fn decode_format4(data: &[u8]) -> Vec<u32> {
  let Some(seg_count_x2) = read_u16(data, 6).map(usize::from) else {
    return Vec::new();
  };
  let seg_count = seg_count_x2 / 2;
  let end_codes = 14;
  let start_codes = end_codes + seg_count_x2 + 2;
  let id_deltas = start_codes + seg_count_x2;
  let id_range_offsets = id_deltas + seg_count_x2;

  let mut builder = RangeBuilder::default();
  for i in 0..seg_count {
    let (Some(end), Some(start), Some(delta), Some(range_offset)) = (
      read_u16(data, end_codes + 2 * i),
      read_u16(data, start_codes + 2 * i),
      read_u16(data, id_deltas + 2 * i),
      read_u16(data, id_range_offsets + 2 * i),
    ) else {
      log::debug!("cmap format 4 truncated after {i} of {seg_count} segments");
      break;
    };
    if start == 0xFFFF {
      // Final sentinel segment.
      continue;
    }
    let (start, end) = (u32::from(start), u32::from(end));
    if end < start {
      log::debug!("cmap format 4 segment {i} is inverted, stopping");
      break;
    }
    if range_offset == 0 {
      // Glyph is (cp + delta) mod 65536; the whole segment is covered
      // unless the delta maps some code point to glyph 0.
      if (end + u32::from(delta)) & 0xffff > end - start {
        builder.add(start, end + 1);
      } else {
        for cp in start..=end {
          if (cp + u32::from(delta)) & 0xffff != 0 {
            builder.add(cp, cp + 1);
          }
        }
      }
    } else {
      for cp in start..=end {
        let glyph_offset =
          id_range_offsets + 2 * i + usize::from(range_offset) + 2 * (cp - start) as usize;
        match read_u16(data, glyph_offset) {
          Some(glyph) if glyph != 0 => builder.add(cp, cp + 1),
          _ => {}
        }
      }
    }
  }
  builder.finish()
}

fn decode_format12(data: &[u8]) -> Vec<u32> {
  let Some(num_groups) = read_u32(data, 12).map(|v| v as usize) else {
    return Vec::new();
  };
  let mut builder = RangeBuilder::default();
  for i in 0..num_groups {
    let base = 16 + i * 12;
    let (Some(start), Some(end)) = (read_u32(data, base), read_u32(data, base + 4)) else {
      log::debug!("cmap format 12 truncated after {i} of {num_groups} groups");
      break;
    };
    if end < start {
      log::debug!("cmap format 12 group {i} is inverted, stopping");
      break;
    }
    builder.add(start, end.saturating_add(1));
  }
  builder.finish()
}

fn decode_format14(data: &[u8]) -> Vec<VariationRecord> {
  let Some(num_records) = read_u32(data, 6).map(|v| v as usize) else {
    return Vec::new();
  };
  let mut records = Vec::with_capacity(num_records.min(256));
  for i in 0..num_records {
    let base = 10 + i * 11;
    let (Some(selector), Some(default_offset), Some(non_default_offset)) = (
      read_u24(data, base),
      read_u32(data, base + 3).map(|v| v as usize),
      read_u32(data, base + 7).map(|v| v as usize),
    ) else {
      log::debug!("cmap format 14 truncated after {i} of {num_records} records");
      break;
    };

    let mut record = VariationRecord {
      selector,
      ..Default::default()
    };
    if default_offset != 0 {
      record.default_ranges = decode_default_uvs(data, default_offset);
    }
    if non_default_offset != 0 {
      record.non_default = decode_non_default_uvs(data, non_default_offset);
    }
    records.push(record);
  }
  records.sort_by_key(|r| r.selector);
  records
}

fn decode_default_uvs(data: &[u8], offset: usize) -> Vec<u32> {
  let Some(num_ranges) = read_u32(data, offset).map(|v| v as usize) else {
    return Vec::new();
  };
  let mut builder = RangeBuilder::default();
  for i in 0..num_ranges {
    let base = offset + 4 + i * 4;
    let (Some(start), Some(additional)) = (read_u24(data, base), data.get(base + 3)) else {
      break;
    };
    builder.add(start, start + u32::from(*additional) + 1);
  }
  builder.finish()
}

fn decode_non_default_uvs(data: &[u8], offset: usize) -> Vec<u32> {
  let Some(num_mappings) = read_u32(data, offset).map(|v| v as usize) else {
    return Vec::new();
  };
  let mut cps = Vec::with_capacity(num_mappings.min(4096));
  for i in 0..num_mappings {
    let base = offset + 4 + i * 5;
    let Some(cp) = read_u24(data, base) else {
      break;
    };
    // The glyph id at base + 3 is irrelevant for coverage.
    cps.push(cp);
  }
  cps.sort_unstable();
  cps.dedup();
  cps
}
