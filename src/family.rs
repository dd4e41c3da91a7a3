//! Font families: variant selection, coverage, and axis support
//!
//! A [`FontFamily`] is an ordered group of [`FontVariant`]s (regular, bold,
//! italic and so on) that share one coverage set, one declared language
//! list, and one family variant flag. Variant selection picks the closest
//! style by weight distance plus an italic penalty and records the fakery
//! needed to bridge the rest.

use crate::context::TextContext;
use crate::coverage::CoverageSet;
use crate::font::Font;
use crate::font::FontVariation;
use crate::font::Tag;
use crate::language::EmojiStyle;
use crate::language::LanguageList;
use crate::style::FamilyVariant;
use crate::style::Fakery;
use crate::style::FontStyle;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;

/// One font resource plus the style it renders natively.
#[derive(Debug, Clone)]
pub struct FontVariant {
  font: Arc<dyn Font>,
  style: FontStyle,
}

impl FontVariant {
  /// Wraps a font, reading weight and slant from its OS/2 table.
  pub fn new(font: Arc<dyn Font>) -> Self {
    let style = crate::font::analyze_style(&*font);
    Self { font, style }
  }

  /// Wraps a font with a caller-supplied style, bypassing OS/2 analysis.
  pub fn with_style(font: Arc<dyn Font>, style: FontStyle) -> Self {
    Self { font, style }
  }

  #[inline]
  pub fn font(&self) -> &Arc<dyn Font> {
    &self.font
  }

  #[inline]
  pub fn style(&self) -> FontStyle {
    self.style
  }
}

/// A resolved variant plus the synthetic adjustments to apply.
#[derive(Debug, Clone)]
pub struct FakedFont {
  pub font: Arc<dyn Font>,
  pub fakery: Fakery,
}

/// Distance between a requested and an available style. Lower is better;
/// italic mismatch costs two weight steps.
fn compute_match(wanted: &FontStyle, actual: &FontStyle) -> u32 {
  let mut score = u32::from(wanted.weight().abs_diff(actual.weight()));
  if wanted.italic() != actual.italic() {
    score += 2;
  }
  score
}

/// An ordered group of font variants sharing coverage and language data.
pub struct FontFamily {
  variants: Vec<FontVariant>,
  lang_list_id: u32,
  languages: Arc<LanguageList>,
  variant: FamilyVariant,
  supported_axes: Vec<Tag>,
  is_color_emoji: bool,
  coverage: OnceLock<CoverageSet>,
  closest_cache: Mutex<FxHashMap<(u8, bool), usize>>,
}

impl std::fmt::Debug for FontFamily {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FontFamily")
      .field("variants", &self.variants.len())
      .field("lang_list_id", &self.lang_list_id)
      .field("variant", &self.variant)
      .finish()
  }
}

impl FontFamily {
  /// Creates a family from its variants. `lang_tags` is a comma-separated
  /// tag list interned through `ctx`; pass the empty string for none.
  pub fn new(
    ctx: &TextContext,
    variants: Vec<FontVariant>,
    lang_tags: &str,
    variant: FamilyVariant,
  ) -> crate::Result<Arc<Self>> {
    if variants.is_empty() {
      return Err(crate::error::FontError::EmptyFamily.into());
    }
    let lang_list_id = ctx.get_language_list_id(lang_tags);
    let languages = ctx.language_list_by_id(lang_list_id);
    Ok(Arc::new(Self::build(
      variants,
      lang_list_id,
      languages,
      variant,
    )))
  }

  fn build(
    variants: Vec<FontVariant>,
    lang_list_id: u32,
    languages: Arc<LanguageList>,
    variant: FamilyVariant,
  ) -> Self {
    let mut supported_axes: Vec<Tag> = variants
      .iter()
      .flat_map(|v| v.font.variation_axes())
      .map(|axis| axis.tag)
      .collect();
    supported_axes.sort_unstable();
    supported_axes.dedup();
    let is_color_emoji = languages
      .languages()
      .first()
      .is_some_and(|lang| lang.emoji_style() == EmojiStyle::Emoji);
    Self {
      variants,
      lang_list_id,
      languages,
      variant,
      supported_axes,
      is_color_emoji,
      coverage: OnceLock::new(),
      closest_cache: Mutex::new(FxHashMap::default()),
    }
  }

  /// The variant whose style is closest to `wanted`, with fakery for the
  /// difference. Lookups are memoized per (weight, italic).
  pub fn closest_match(&self, wanted: FontStyle) -> FakedFont {
    let key = (wanted.weight(), wanted.italic());
    let idx = {
      let cached = self
        .closest_cache
        .lock()
        .ok()
        .and_then(|cache| cache.get(&key).copied());
      match cached {
        Some(idx) => idx,
        None => {
          let mut best = 0usize;
          let mut best_match = u32::MAX;
          for (i, candidate) in self.variants.iter().enumerate() {
            let m = compute_match(&wanted, &candidate.style);
            if m < best_match {
              best_match = m;
              best = i;
            }
          }
          if let Ok(mut cache) = self.closest_cache.lock() {
            cache.insert(key, best);
          }
          best
        }
      }
    };
    let chosen = &self.variants[idx];
    FakedFont {
      font: Arc::clone(&chosen.font),
      fakery: Fakery::compute(&wanted, &chosen.style),
    }
  }

  /// Coverage decoded from the default-style variant's cmap, computed on
  /// first use and kept for the family's lifetime.
  pub fn coverage(&self) -> &CoverageSet {
    self.coverage.get_or_init(|| {
      let faked = self.closest_match(FontStyle::default());
      match faked.font.table(Tag::from_bytes(b"cmap")) {
        Some(bytes) => CoverageSet::from_cmap(bytes),
        None => {
          log::warn!("font {} has no cmap table, family covers nothing", faked.font.unique_id());
          CoverageSet::default()
        }
      }
    })
  }

  /// True if the family maps `codepoint`, or the `(codepoint, vs)`
  /// sequence when `vs` is nonzero.
  pub fn has_glyph(&self, codepoint: u32, vs: u32) -> bool {
    if vs == 0 {
      return self.coverage().contains(codepoint);
    }
    self.coverage().has_variation_sequence(codepoint, vs)
  }

  #[inline]
  pub fn variants(&self) -> &[FontVariant] {
    &self.variants
  }

  #[inline]
  pub fn lang_list_id(&self) -> u32 {
    self.lang_list_id
  }

  #[inline]
  pub fn languages(&self) -> &Arc<LanguageList> {
    &self.languages
  }

  #[inline]
  pub fn variant(&self) -> FamilyVariant {
    self.variant
  }

  /// Union of variation axes over all variants, sorted.
  #[inline]
  pub fn supported_axes(&self) -> &[Tag] {
    &self.supported_axes
  }

  /// True if the family's first language tag declares color emoji
  /// presentation.
  #[inline]
  pub fn is_color_emoji_family(&self) -> bool {
    self.is_color_emoji
  }

  /// Derives a family with the given axis values applied to every variant
  /// that supports one of them, or `None` when no axis is relevant.
  pub fn create_family_with_variation(
    self: &Arc<Self>,
    variations: &[FontVariation],
  ) -> Option<Arc<FontFamily>> {
    if self.supported_axes.is_empty() {
      return None;
    }
    if !variations
      .iter()
      .any(|v| self.supported_axes.binary_search(&v.tag).is_ok())
    {
      return None;
    }
    let variants = self
      .variants
      .iter()
      .map(|variant| {
        match variant.font.with_variation(variations) {
          Some(font) => FontVariant {
            font,
            style: variant.style,
          },
          // A variant with none of the axes keeps its original resource.
          None => variant.clone(),
        }
      })
      .collect();
    Some(Arc::new(Self::build(
      variants,
      self.lang_list_id,
      Arc::clone(&self.languages),
      self.variant,
    )))
  }
}
