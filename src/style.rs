//! Style descriptors shared across itemization and layout
//!
//! A [`FontStyle`] describes what the caller asked for: a weight on the
//! 0-9 scale (4 = regular, 7 = bold), an italic flag, the id of the
//! requested language list, and a family variant. Font variants carry their
//! own `FontStyle` with the language and variant fields left at defaults.
//!
//! [`Paint`] carries the scalar shaping parameters that affect glyph
//! positions and therefore participate in the layout cache key.

/// Family variant requested by the caller or declared by a family.
///
/// Some families ship compact variants with tighter vertical metrics for
/// space-constrained UI; elegant variants are the unconstrained default
/// shapes. A family that declares no variant matches any request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FamilyVariant {
  /// No variant declared or requested
  #[default]
  Default = 0,
  /// Compact variant, fits tighter line heights
  Compact = 1,
  /// Elegant variant, unconstrained metrics
  Elegant = 2,
}

/// Weight and slant description of a font variant or a style request.
///
/// Weight uses a 0-9 numeric scale where 4 is regular and 7 is bold,
/// mirroring OS/2 usWeightClass divided by 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontStyle {
  lang_list_id: u32,
  variant: FamilyVariant,
  weight: u8,
  italic: bool,
}

/// Language list id meaning "no languages requested".
pub const EMPTY_LANG_LIST_ID: u32 = 0;

impl FontStyle {
  /// Creates a style with an explicit language list and variant.
  pub fn new(lang_list_id: u32, variant: FamilyVariant, weight: u8, italic: bool) -> Self {
    Self {
      lang_list_id,
      variant,
      weight: weight.min(9),
      italic,
    }
  }

  /// Creates a plain weight/italic style with no language or variant.
  pub fn from_weight(weight: u8, italic: bool) -> Self {
    Self::new(EMPTY_LANG_LIST_ID, FamilyVariant::Default, weight, italic)
  }

  /// Weight on the 0-9 scale.
  #[inline]
  pub fn weight(&self) -> u8 {
    self.weight
  }

  /// True if the style is italic.
  #[inline]
  pub fn italic(&self) -> bool {
    self.italic
  }

  /// Id of the requested language list (see [`crate::context::TextContext`]).
  #[inline]
  pub fn lang_list_id(&self) -> u32 {
    self.lang_list_id
  }

  /// Requested family variant.
  #[inline]
  pub fn variant(&self) -> FamilyVariant {
    self.variant
  }
}

impl Default for FontStyle {
  fn default() -> Self {
    Self::from_weight(4, false)
  }
}

/// Synthetic adjustments applied when no variant matches the request.
///
/// Fake bold is applied by stroking, fake italic by skewing; both decisions
/// are made here, the actual transformation belongs to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fakery {
  fake_bold: bool,
  fake_italic: bool,
}

impl Fakery {
  /// Computes the fakery needed to render `wanted` with a variant of style
  /// `actual`.
  ///
  /// Fake bold kicks in when the request is at least weight 6 and exceeds
  /// the variant by two or more steps, matching common renderer thresholds.
  pub fn compute(wanted: &FontStyle, actual: &FontStyle) -> Self {
    let fake_bold = wanted.weight() >= 6 && wanted.weight().saturating_sub(actual.weight()) >= 2;
    let fake_italic = wanted.italic() && !actual.italic();
    Self {
      fake_bold,
      fake_italic,
    }
  }

  /// True if synthetic bold should be applied.
  #[inline]
  pub fn fake_bold(&self) -> bool {
    self.fake_bold
  }

  /// True if synthetic italic should be applied.
  #[inline]
  pub fn fake_italic(&self) -> bool {
    self.fake_italic
  }
}

/// Edit applied to the start of the first word of a layout request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum StartHyphenEdit {
  /// No edit
  #[default]
  NoEdit = 0,
  /// Insert a hyphen glyph before the word (line-start continuation)
  InsertHyphen = 1,
}

/// Edit applied to the end of the last word of a layout request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum EndHyphenEdit {
  /// No edit
  #[default]
  NoEdit = 0,
  /// Insert a hyphen glyph after the word (line-end hyphenation)
  InsertHyphen = 1,
  /// Replace the trailing code point with a hyphen glyph
  ReplaceWithHyphen = 2,
}

/// Combined hyphen edit for one layout request.
///
/// The start edit applies only to the first word and the end edit only to
/// the last word of the request, regardless of how layout splits the text
/// internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HyphenEdit {
  /// Edit at the start of the first word
  pub start: StartHyphenEdit,
  /// Edit at the end of the last word
  pub end: EndHyphenEdit,
}

impl HyphenEdit {
  /// No edit at either end.
  pub const NONE: HyphenEdit = HyphenEdit {
    start: StartHyphenEdit::NoEdit,
    end: EndHyphenEdit::NoEdit,
  };

  /// True if neither end has an edit.
  #[inline]
  pub fn is_none(&self) -> bool {
    *self == Self::NONE
  }

  /// Packs the edit into a single byte for cache keys.
  #[inline]
  pub(crate) fn packed(&self) -> u8 {
    (self.start as u8) << 2 | self.end as u8
  }
}

/// Scalar shaping parameters.
///
/// Everything here changes glyph selection or positioning, so all fields
/// participate in the layout cache key. Flags are backend-defined render
/// hints passed through to advance and bounds queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
  /// Text size in pixels
  pub size: f32,
  /// Horizontal scale applied on top of size
  pub scale_x: f32,
  /// Horizontal skew (synthetic oblique)
  pub skew_x: f32,
  /// Additional advance added around each cluster
  pub letter_spacing: f32,
  /// Backend-defined paint flags (hinting, subpixel, embolden)
  pub flags: u32,
  /// Hyphen edit for this layout request
  pub hyphen: HyphenEdit,
}

impl Default for Paint {
  fn default() -> Self {
    Self {
      size: 16.0,
      scale_x: 1.0,
      skew_x: 0.0,
      letter_spacing: 0.0,
      flags: 0,
      hyphen: HyphenEdit::NONE,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fakery_bold_threshold() {
    let regular = FontStyle::from_weight(4, false);
    let bold_request = FontStyle::from_weight(7, false);
    let fakery = Fakery::compute(&bold_request, &regular);
    assert!(fakery.fake_bold());
    assert!(!fakery.fake_italic());

    // A medium request one step above the variant stays un-faked.
    let medium_request = FontStyle::from_weight(5, false);
    assert!(!Fakery::compute(&medium_request, &regular).fake_bold());

    // Weight 6 exactly two steps above 4 fakes.
    let semibold_request = FontStyle::from_weight(6, false);
    assert!(Fakery::compute(&semibold_request, &regular).fake_bold());
  }

  #[test]
  fn fakery_italic() {
    let upright = FontStyle::from_weight(4, false);
    let italic_request = FontStyle::from_weight(4, true);
    assert!(Fakery::compute(&italic_request, &upright).fake_italic());

    let italic_variant = FontStyle::from_weight(4, true);
    assert!(!Fakery::compute(&italic_request, &italic_variant).fake_italic());
  }

  #[test]
  fn hyphen_edit_packing_is_injective() {
    let mut seen = std::collections::HashSet::new();
    for start in [StartHyphenEdit::NoEdit, StartHyphenEdit::InsertHyphen] {
      for end in [
        EndHyphenEdit::NoEdit,
        EndHyphenEdit::InsertHyphen,
        EndHyphenEdit::ReplaceWithHyphen,
      ] {
        assert!(seen.insert(HyphenEdit { start, end }.packed()));
      }
    }
  }

  #[test]
  fn weight_is_clamped() {
    assert_eq!(FontStyle::from_weight(42, false).weight(), 9);
  }
}
