//! Font collections: fallback resolution and itemization
//!
//! A [`FontCollection`] owns an ordered list of families and resolves, for
//! every code point, which family should render it. Resolution is a scored
//! scan over the families that can possibly cover the code point, found
//! through a paged index: the code point space is split into 256-wide
//! pages and each page lists the families covering at least one character
//! in it, in insertion order. With hundreds of families the per-character
//! candidate set stays small, so the scan is O(1) amortized.
//!
//! Scoring layers three criteria so that coverage strictly dominates
//! language affinity, which strictly dominates the family variant flag.
//! The primary family short-circuits everything: if it covers the request
//! it always wins.

use crate::context::TextContext;
use crate::emoji;
use crate::family::FakedFont;
use crate::family::FontFamily;
use crate::font::FontVariation;
use crate::font::Tag;
use crate::language::EmojiStyle;
use crate::language::LanguageList;
use crate::style::FamilyVariant;
use crate::style::FontStyle;
use crate::unicode;
use rustc_hash::FxHashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

const LOG_CHARS_PER_PAGE: u32 = 8;
const CHARS_PER_PAGE: u32 = 1 << LOG_CHARS_PER_PAGE;

/// Family indices are stored as bytes in the page index; 0xFF is reserved.
pub const MAX_FAMILY_COUNT: usize = 254;

const UNSUPPORTED_SCORE: u64 = 0;
const FIRST_FONT_SCORE: u64 = u64::MAX;
// Language scores fit well below this shift: 5^12 < 2^28.
const COVERAGE_SHIFT: u32 = 42;

/// One itemization result: a half-open UTF-16 range rendered with one
/// resolved font.
#[derive(Debug, Clone)]
pub struct Run {
  pub start: usize,
  pub end: usize,
  pub family: Arc<FontFamily>,
  pub faked_font: FakedFont,
}

/// Out-of-collection fallback, queried when no indexed family covers a
/// code point at all.
pub trait FallbackProvider: Send + Sync {
  fn family_for_char(&self, ch: u32, languages: &LanguageList) -> Option<Arc<FontFamily>>;
}

static NEXT_COLLECTION_ID: AtomicU64 = AtomicU64::new(1);

/// An ordered, immutable set of font families with a paged coverage index.
pub struct FontCollection {
  id: u64,
  families: Vec<Arc<FontFamily>>,
  max_char: u32,
  // Per page, the half-open slice of `family_indices` listing its families.
  ranges: Vec<(u32, u32)>,
  family_indices: Vec<u8>,
  // Families carrying a variation-sequence table, in insertion order.
  vs_family_indices: Vec<u8>,
  supported_axes: Vec<Tag>,
  fallback: Option<Arc<dyn FallbackProvider>>,
  // Fallback results cached per (language list, code point).
  fallback_cache: Mutex<FxHashMap<(u32, u32), Option<Arc<FontFamily>>>>,
}

impl std::fmt::Debug for FontCollection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FontCollection")
      .field("id", &self.id)
      .field("families", &self.families.len())
      .field("max_char", &self.max_char)
      .finish()
  }
}

impl FontCollection {
  /// Builds a collection from families in priority order. Families with
  /// empty coverage are dropped; an entirely empty result is an error.
  pub fn new(families: Vec<Arc<FontFamily>>) -> crate::Result<Arc<Self>> {
    Self::with_fallback(families, None)
  }

  /// Like [`new`](Self::new) with an out-of-collection fallback provider.
  pub fn with_fallback(
    families: Vec<Arc<FontFamily>>,
    fallback: Option<Arc<dyn FallbackProvider>>,
  ) -> crate::Result<Arc<Self>> {
    let mut kept: Vec<Arc<FontFamily>> = Vec::with_capacity(families.len());
    let mut max_char = 0u32;
    for family in families {
      let coverage = family.coverage();
      if coverage.is_empty() {
        log::warn!("dropping font family with empty coverage");
        continue;
      }
      if let Some((_, end)) = coverage.iter_ranges().last() {
        max_char = max_char.max(end);
      }
      kept.push(family);
    }
    if kept.is_empty() {
      return Err(crate::error::FontError::EmptyCollection.into());
    }
    assert!(
      kept.len() <= MAX_FAMILY_COUNT,
      "font collection exceeds {MAX_FAMILY_COUNT} families"
    );

    let num_pages = max_char.div_ceil(CHARS_PER_PAGE);
    let mut ranges = Vec::with_capacity(num_pages as usize);
    let mut family_indices = Vec::new();
    let mut next_covered: Vec<Option<u32>> = kept
      .iter()
      .map(|family| family.coverage().next_covered(0))
      .collect();
    for page in 0..num_pages {
      let page_end = (page + 1) << LOG_CHARS_PER_PAGE;
      let start = family_indices.len() as u32;
      for (j, family) in kept.iter().enumerate() {
        if next_covered[j].is_some_and(|next| next < page_end) {
          family_indices.push(j as u8);
          next_covered[j] = family.coverage().next_covered(page_end);
        }
      }
      ranges.push((start, family_indices.len() as u32));
    }

    let vs_family_indices: Vec<u8> = kept
      .iter()
      .enumerate()
      .filter(|(_, family)| family.coverage().has_vs_table())
      .map(|(j, _)| j as u8)
      .collect();

    let mut supported_axes: Vec<Tag> = kept
      .iter()
      .flat_map(|family| family.supported_axes().iter().copied())
      .collect();
    supported_axes.sort_unstable();
    supported_axes.dedup();

    Ok(Arc::new(Self {
      id: NEXT_COLLECTION_ID.fetch_add(1, Ordering::Relaxed),
      families: kept,
      max_char,
      ranges,
      family_indices,
      vs_family_indices,
      supported_axes,
      fallback,
      fallback_cache: Mutex::new(FxHashMap::default()),
    }))
  }

  /// Process-unique id, used as a cache key component.
  #[inline]
  pub fn id(&self) -> u64 {
    self.id
  }

  #[inline]
  pub fn families(&self) -> &[Arc<FontFamily>] {
    &self.families
  }

  /// Union of variation axes supported anywhere in the collection.
  #[inline]
  pub fn supported_axes(&self) -> &[Tag] {
    &self.supported_axes
  }

  fn primary(&self) -> Arc<FontFamily> {
    Arc::clone(&self.families[0])
  }

  /// Coverage score: reject (0), base only (1), emoji-presentation match
  /// (2), exact sequence (3), or the first-family sentinel.
  fn calc_coverage_score(&self, ch: u32, vs: u32, index: usize) -> u64 {
    let family = &self.families[index];
    let has_vs_glyph = vs != 0 && family.has_glyph(ch, vs);
    if !has_vs_glyph && !family.coverage().contains(ch) {
      return UNSUPPORTED_SCORE;
    }
    if (vs == 0 || has_vs_glyph) && index == 0 {
      return FIRST_FONT_SCORE;
    }
    if vs == 0 {
      return 1;
    }
    if has_vs_glyph {
      return 3;
    }
    // No exact sequence, but a presentation selector can still prefer
    // families whose languages declare the matching emoji style.
    if vs == emoji::EMOJI_STYLE_VS || vs == emoji::TEXT_STYLE_VS {
      let wanted = if vs == emoji::EMOJI_STYLE_VS {
        EmojiStyle::Emoji
      } else {
        EmojiStyle::Text
      };
      if family
        .languages()
        .languages()
        .iter()
        .any(|lang| lang.emoji_style() == wanted)
      {
        return 2;
      }
    }
    1
  }

  /// Base-5 positional combination of per-language match scores, so
  /// earlier-requested languages dominate ties.
  fn calc_language_score(requested: &LanguageList, family: &FontFamily) -> u64 {
    let mut total = 0u64;
    for lang in requested.languages() {
      total = total * 5 + u64::from(family.languages().best_score_for(lang));
    }
    total
  }

  fn calc_variant_score(variant: FamilyVariant, family: &FontFamily) -> u64 {
    u64::from(family.variant() == FamilyVariant::Default || family.variant() == variant)
  }

  fn calc_family_score(
    &self,
    ch: u32,
    vs: u32,
    variant: FamilyVariant,
    requested: &LanguageList,
    index: usize,
  ) -> u64 {
    let coverage = self.calc_coverage_score(ch, vs, index);
    if coverage == UNSUPPORTED_SCORE || coverage == FIRST_FONT_SCORE {
      return coverage;
    }
    let language = Self::calc_language_score(requested, &self.families[index]);
    let variant = Self::calc_variant_score(variant, &self.families[index]);
    (coverage << COVERAGE_SHIFT) | (language << 1) | variant
  }

  /// Candidate family indices for `ch`: its page's slice, widened to the
  /// union with variation-capable families when a selector is present.
  fn candidates_for(&self, ch: u32, vs: u32) -> Vec<usize> {
    let page = (ch >> LOG_CHARS_PER_PAGE) as usize;
    let slice = match self.ranges.get(page) {
      Some(&(start, end)) => &self.family_indices[start as usize..end as usize],
      None => &[],
    };
    if vs == 0 {
      return slice.iter().map(|&i| i as usize).collect();
    }
    let mut union: Vec<usize> = slice
      .iter()
      .chain(self.vs_family_indices.iter())
      .map(|&i| i as usize)
      .collect();
    union.sort_unstable();
    union.dedup();
    union
  }

  /// Resolves the best family for a code point, optionally qualified by a
  /// variation selector. Never fails: unsupported characters resolve to
  /// the fallback provider's answer or the primary family.
  pub fn family_for_char(
    &self,
    ctx: &TextContext,
    ch: u32,
    vs: u32,
    lang_list_id: u32,
    variant: FamilyVariant,
  ) -> Arc<FontFamily> {
    let requested = ctx.language_list_by_id(lang_list_id);
    self.family_for_char_inner(ch, vs, &requested, variant, lang_list_id)
  }

  fn family_for_char_inner(
    &self,
    ch: u32,
    vs: u32,
    requested: &LanguageList,
    variant: FamilyVariant,
    lang_list_id: u32,
  ) -> Arc<FontFamily> {
    // Decomposition retry is a bounded loop: at most one hop from a
    // precomposed character to its base.
    let mut ch = ch;
    for attempt in 0..2 {
      if ch < self.max_char {
        let mut best_score = UNSUPPORTED_SCORE;
        let mut best: Option<usize> = None;
        for index in self.candidates_for(ch, vs) {
          let score = self.calc_family_score(ch, vs, variant, requested, index);
          if score == FIRST_FONT_SCORE {
            return self.primary();
          }
          if score > best_score {
            best_score = score;
            best = Some(index);
          }
        }
        if let Some(index) = best {
          return Arc::clone(&self.families[index]);
        }
      }
      if attempt == 0 {
        match unicode::decompose_base(ch) {
          Some(base) => ch = base,
          None => break,
        }
      }
    }
    self.fallback_or_primary(ch, requested, lang_list_id)
  }

  fn fallback_or_primary(
    &self,
    ch: u32,
    requested: &LanguageList,
    lang_list_id: u32,
  ) -> Arc<FontFamily> {
    let Some(provider) = &self.fallback else {
      return self.primary();
    };
    let key = (lang_list_id, ch);
    if let Ok(cache) = self.fallback_cache.lock() {
      if let Some(cached) = cache.get(&key) {
        return cached.clone().unwrap_or_else(|| self.primary());
      }
    }
    let resolved = provider.family_for_char(ch, requested);
    if let Ok(mut cache) = self.fallback_cache.lock() {
      cache.insert(key, resolved.clone());
    }
    resolved.unwrap_or_else(|| self.primary())
  }

  /// True if any variation-capable family declares the exact sequence, or
  /// the selector requests text presentation and a non-color-emoji family
  /// covers the bare base character.
  pub fn has_variation_selector(&self, base: u32, vs: u32) -> bool {
    if !emoji::is_variation_selector(vs) {
      return false;
    }
    if base >= self.max_char {
      return false;
    }
    for &index in &self.vs_family_indices {
      if self.families[index as usize].has_glyph(base, vs) {
        return true;
      }
    }
    // Fonts without sequence data still provide an acceptable text-style
    // glyph for the base character.
    if vs == emoji::TEXT_STYLE_VS {
      for family in &self.families {
        if !family.is_color_emoji_family() && family.coverage().contains(base) {
          return true;
        }
      }
    }
    false
  }

  // Characters that prefer to stay with the current font when it covers
  // them, rather than triggering a font switch mid-run.
  fn is_sticky(ch: u32) -> bool {
    matches!(
      ch,
      0x0021 // !
        | 0x002C // ,
        | 0x002D // -
        | 0x002E // .
        | 0x003A // :
        | 0x003B // ;
        | 0x003F // ?
        | 0x00A0 // NBSP
        | 0x2026 // HORIZONTAL ELLIPSIS
        | 0x202F // NNBSP
        | 0x2640 // FEMALE SIGN
        | 0x2642 // MALE SIGN
        | 0x2695 // STAFF OF AESCULAPIUS
    )
  }

  /// Splits UTF-16 text into maximal same-font runs.
  ///
  /// The result partitions `[0, text.len())` exactly: contiguous,
  /// non-overlapping, every run nonempty. Lone surrogates are treated as
  /// unpaired code points.
  pub fn itemize(&self, ctx: &TextContext, text: &[u16], style: FontStyle) -> Vec<Run> {
    let requested = ctx.language_list_by_id(style.lang_list_id());
    let wanted = FontStyle::new(0, FamilyVariant::Default, style.weight(), style.italic());
    let mut runs: Vec<Run> = Vec::new();
    let mut last_family: Option<Arc<FontFamily>> = None;
    let mut prev_cp = 0u32;
    let mut prev_len = 0usize;

    let mut pos = 0usize;
    while pos < text.len() {
      let (cp, len) = unicode::code_point_at(text, pos);
      let next_cp = if pos + len < text.len() {
        unicode::code_point_at(text, pos + len).0
      } else {
        0
      };

      let mut continue_run = false;
      if let Some(family) = &last_family {
        if Self::is_sticky(cp) {
          continue_run = family.coverage().contains(cp);
        } else if emoji::is_variation_selector(cp) {
          continue_run = true;
        } else if cp == emoji::CHAR_KEYCAP {
          // Keycaps re-resolve so the whole sequence lands on the font
          // that covers it; the base moves retroactively below.
        } else if emoji::is_emoji_modifier(cp) {
          continue_run = emoji::is_emoji_base(prev_cp) && family.coverage().contains(prev_cp);
        } else if unicode::is_combining_mark(cp) {
          continue_run = true;
        }
      }

      if !continue_run {
        let vs = if emoji::is_variation_selector(next_cp) {
          next_cp
        } else {
          0
        };
        let family = self.family_for_char_inner(cp, vs, &requested, style.variant(), style.lang_list_id());
        let changed = match &last_family {
          Some(last) => !Arc::ptr_eq(last, &family),
          None => true,
        };
        if changed {
          let mut start = pos;
          // Keycaps and modifiers belong with their base: when the new
          // font covers the preceding base character, pull it into this
          // run so the whole sequence shapes together.
          if pos != 0
            && (cp == emoji::CHAR_KEYCAP || emoji::is_emoji_modifier(cp))
            && family.coverage().contains(prev_cp)
          {
            if let Some(last_run) = runs.last_mut() {
              last_run.end -= prev_len;
              let empty = last_run.start == last_run.end;
              if empty {
                runs.pop();
              }
            }
            start -= prev_len;
          }
          let faked_font = family.closest_match(wanted);
          runs.push(Run {
            start,
            end: start,
            family: Arc::clone(&family),
            faked_font,
          });
          last_family = Some(family);
        }
      }

      prev_cp = cp;
      prev_len = len;
      pos += len;
      if let Some(run) = runs.last_mut() {
        run.end = pos;
      }
    }
    runs
  }

  /// Derives a collection with the given axis values applied, or `None`
  /// when no family supports any requested axis. The derived collection
  /// gets a fresh id.
  pub fn create_collection_with_variation(
    &self,
    variations: &[FontVariation],
  ) -> Option<Arc<FontCollection>> {
    if variations.is_empty() || self.supported_axes.is_empty() {
      return None;
    }
    if !variations
      .iter()
      .any(|v| self.supported_axes.binary_search(&v.tag).is_ok())
    {
      return None;
    }
    let families: Vec<Arc<FontFamily>> = self
      .families
      .iter()
      .map(|family| {
        family
          .create_family_with_variation(variations)
          .unwrap_or_else(|| Arc::clone(family))
      })
      .collect();
    FontCollection::with_fallback(families, self.fallback.clone()).ok()
  }
}
