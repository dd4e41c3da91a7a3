//! Tailored grapheme cluster boundaries
//!
//! Implements a tailored version of the extended grapheme clusters from
//! Unicode Standard Annex #29, section 3.1.1. The tailorings:
//!
//! - Several format controls (soft hyphen, ZWSP, directional marks, BOM)
//!   are treated as Extend rather than Control so they stay attached to the
//!   preceding cluster.
//! - Thai SARA AM and Lao AM are treated as ordinary letters; most
//!   implementations allow a break before them.
//! - A virama followed by a letter holds the cluster together so Indic
//!   conjuncts stay whole.
//! - Emoji ZWJ sequences and emoji modifier sequences hold together.
//!
//! The font-aware part: when the caller supplies per-code-unit advances
//! from shaping, a nonzero advance at the candidate offset proves the
//! shaper did not ligate across it, and the boundary is a break regardless
//! of the rules below it. Without advances we are conservative and assume
//! zero advance. This single early check is the canonical ordering; the
//! virama and emoji tailorings only ever see the zero-advance path.
//!
//! # References
//!
//! - UAX #29: <https://www.unicode.org/reports/tr29/>

use crate::emoji;
use crate::unicode;
use crate::unicode::GraphemeClass;

/// Sentinel returned by [`get_text_run_cursor`] in `At` mode when the
/// offset is not a boundary.
pub const INVALID_OFFSET: usize = usize::MAX;

/// How [`get_text_run_cursor`] should move an offset onto a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOpt {
  /// Next boundary strictly after the offset
  After,
  /// The offset itself if it is a boundary, else the next one after
  AtOrAfter,
  /// Previous boundary strictly before the offset
  Before,
  /// The offset itself if it is a boundary, else the previous one before
  AtOrBefore,
  /// The offset itself, or [`INVALID_OFFSET`] if it is not a boundary
  At,
}

/// Grapheme_Cluster_Break class after tailoring.
fn tailored_class(cp: u32) -> GraphemeClass {
  // Format controls kept inside the cluster rather than breaking it.
  if cp == 0x00AD
    || cp == 0x200B
    || cp == 0x200E
    || cp == 0x200F
    || (0x202A..=0x202E).contains(&cp)
    || (0x2066..=0x2069).contains(&cp)
    || cp == 0xFEFF
    || emoji::is_variation_selector(cp)
  {
    return GraphemeClass::Extend;
  }
  // THAI CHARACTER SARA AM and LAO VOWEL SIGN AM: a break before them is
  // expected by most renderers.
  if cp == 0x0E33 || cp == 0x0EB3 {
    return GraphemeClass::Other;
  }
  unicode::grapheme_class(cp)
}

/// Decides whether `offset` is a grapheme cluster boundary within
/// `text[start..start + count]`.
///
/// `advances`, when present, holds one entry per code unit of the range
/// (from shaping) and makes the emoji/virama tailorings ligature-aware.
pub fn is_grapheme_break(
  advances: Option<&[f32]>,
  text: &[u16],
  start: usize,
  count: usize,
  offset: usize,
) -> bool {
  // Rule GB1, sot ÷; Rule GB2, ÷ eot
  if offset <= start || offset >= start + count {
    return true;
  }
  if unicode::is_low_surrogate(text[offset]) {
    // Never split a surrogate pair; a lone trailing surrogate is a break.
    return !unicode::is_high_surrogate(text[offset - 1]);
  }

  let (c1, c1_len) = unicode::code_point_before(text, offset);
  let (c2, _) = unicode::code_point_at(text, offset);
  let offset_back = offset - c1_len;
  let p1 = tailored_class(c1);
  let p2 = tailored_class(c2);

  // Rule GB3, CR x LF
  if p1 == GraphemeClass::Cr && p2 == GraphemeClass::Lf {
    return false;
  }
  // Rule GB4, (Control | CR | LF) ÷
  if matches!(
    p1,
    GraphemeClass::Control | GraphemeClass::Cr | GraphemeClass::Lf
  ) {
    return true;
  }
  // Rule GB5, ÷ (Control | CR | LF)
  if matches!(
    p2,
    GraphemeClass::Control | GraphemeClass::Cr | GraphemeClass::Lf
  ) {
    return true;
  }
  // Rule GB6, L x ( L | V | LV | LVT )
  if p1 == GraphemeClass::HangulL
    && matches!(
      p2,
      GraphemeClass::HangulL
        | GraphemeClass::HangulV
        | GraphemeClass::HangulLv
        | GraphemeClass::HangulLvt
    )
  {
    return false;
  }
  // Rule GB7, ( LV | V ) x ( V | T )
  if matches!(p1, GraphemeClass::HangulLv | GraphemeClass::HangulV)
    && matches!(p2, GraphemeClass::HangulV | GraphemeClass::HangulT)
  {
    return false;
  }
  // Rule GB8, ( LVT | T ) x T
  if matches!(p1, GraphemeClass::HangulLvt | GraphemeClass::HangulT)
    && p2 == GraphemeClass::HangulT
  {
    return false;
  }

  // Everything below is font-dependent. A nonzero advance at the offset
  // proves the shaper treated the position as a cluster start, so it is a
  // break no matter what the remaining rules would say. Without advance
  // data we assume zero and stay conservative.
  let c2_has_advance = advances.is_some_and(|adv| adv[offset - start] != 0.0);
  if c2_has_advance {
    return true;
  }

  // Rule GB9, x (Extend | ZWJ); Rule GB9a, x SpacingMark; Rule GB9b, Prepend x
  if matches!(
    p2,
    GraphemeClass::Extend | GraphemeClass::Zwj | GraphemeClass::SpacingMark
  ) || p1 == GraphemeClass::Prepend
  {
    return false;
  }

  // Indic conjuncts: a virama that is not a pure killer glues the
  // following letter to the cluster.
  if unicode::is_virama(c1) && !unicode::is_pure_killer(c1) && unicode::is_letter(c2) {
    return false;
  }

  // Emoji ZWJ sequences form one cluster when emoji flank the joiner,
  // skipping one variation selector on the left.
  if emoji::is_zwj(c1) && emoji::is_emoji(c2) && offset_back > start {
    let (mut c0, c0_len) = unicode::code_point_before(text, offset_back);
    let back = offset_back - c0_len;
    if c0 == emoji::EMOJI_STYLE_VS && back > start {
      let (prev, _) = unicode::code_point_before(text, back);
      c0 = prev;
    }
    if emoji::is_emoji(c0) {
      return false;
    }
  }

  // Rule GB12 and GB13, Regional_Indicator x Regional_Indicator: flags
  // pair up two at a time, so only every second boundary is real.
  if p1 == GraphemeClass::RegionalIndicator && p2 == GraphemeClass::RegionalIndicator {
    let mut count_before = 1usize; // c1
    let mut pos = offset_back;
    while pos > start {
      let (cp, len) = unicode::code_point_before(text, pos);
      if !emoji::is_regional_indicator(cp) {
        break;
      }
      count_before += 1;
      pos -= len;
    }
    return count_before % 2 == 0;
  }

  // Emoji modifier sequences: the skin tone stays with its base, skipping
  // one variation selector between them.
  if emoji::is_emoji_modifier(c2) {
    let mut base = c1;
    if base == emoji::EMOJI_STYLE_VS && offset_back > start {
      let (prev, _) = unicode::code_point_before(text, offset_back);
      base = prev;
    }
    if emoji::is_emoji_base(base) {
      return false;
    }
  }

  // Rule GB999, Any ÷ Any
  true
}

/// Moves `offset` onto a grapheme boundary according to `opt`.
///
/// In `At` mode a non-boundary offset yields [`INVALID_OFFSET`] instead of
/// moving.
pub fn get_text_run_cursor(
  advances: Option<&[f32]>,
  text: &[u16],
  start: usize,
  count: usize,
  mut offset: usize,
  opt: MoveOpt,
) -> usize {
  match opt {
    MoveOpt::After | MoveOpt::AtOrAfter => {
      if opt == MoveOpt::After && offset < start + count {
        offset += 1;
      }
      while !is_grapheme_break(advances, text, start, count, offset) {
        offset += 1;
      }
      offset
    }
    MoveOpt::Before | MoveOpt::AtOrBefore => {
      if opt == MoveOpt::Before && offset > start {
        offset -= 1;
      }
      while !is_grapheme_break(advances, text, start, count, offset) {
        offset -= 1;
      }
      offset
    }
    MoveOpt::At => {
      if is_grapheme_break(advances, text, start, count, offset) {
        offset
      } else {
        INVALID_OFFSET
      }
    }
  }
}
