//! Emoji detection based on Unicode Technical Standard #51
//!
//! Itemization, grapheme breaking, and word breaking all need to recognize
//! emoji sequences: ZWJ joins, skin tone modifiers, flags, and presentation
//! selectors. The property data here is curated from `emoji-data.txt`, kept
//! in-crate because segmentation applies tailorings that stock property
//! crates do not expose.
//!
//! # References
//!
//! - Unicode Technical Standard #51: <https://www.unicode.org/reports/tr51/>
//! - Unicode Emoji Data: <https://unicode.org/Public/emoji/latest/>

/// ZERO WIDTH JOINER
pub const CHAR_ZWJ: u32 = 0x200D;
/// COMBINING ENCLOSING KEYCAP
pub const CHAR_KEYCAP: u32 = 0x20E3;
/// VARIATION SELECTOR-15, text presentation
pub const TEXT_STYLE_VS: u32 = 0xFE0E;
/// VARIATION SELECTOR-16, emoji presentation
pub const EMOJI_STYLE_VS: u32 = 0xFE0F;

// Inclusive ranges with the Emoji property (plus components the renderer
// keeps on the emoji path). Curated from emoji-data.txt.
const EMOJI_RANGES: &[(u32, u32)] = &[
  (0x00A9, 0x00A9),
  (0x00AE, 0x00AE),
  (0x203C, 0x203C),
  (0x2049, 0x2049),
  (0x20E3, 0x20E3),
  (0x2122, 0x2122),
  (0x2139, 0x2139),
  (0x2194, 0x2199),
  (0x21A9, 0x21AA),
  (0x231A, 0x231B),
  (0x2328, 0x2328),
  (0x23CF, 0x23CF),
  (0x23E9, 0x23F3),
  (0x23F8, 0x23FA),
  (0x24C2, 0x24C2),
  (0x25AA, 0x25AB),
  (0x25B6, 0x25B6),
  (0x25C0, 0x25C0),
  (0x25FB, 0x25FE),
  (0x2600, 0x27BF),
  (0x2934, 0x2935),
  (0x2B05, 0x2B07),
  (0x2B1B, 0x2B1C),
  (0x2B50, 0x2B50),
  (0x2B55, 0x2B55),
  (0x3030, 0x3030),
  (0x303D, 0x303D),
  (0x3297, 0x3297),
  (0x3299, 0x3299),
  (0xFE0F, 0xFE0F),
  (0x1F000, 0x1F0FF),
  (0x1F10D, 0x1F10F),
  (0x1F12F, 0x1F12F),
  (0x1F16C, 0x1F171),
  (0x1F17E, 0x1F17F),
  (0x1F18E, 0x1F18E),
  (0x1F191, 0x1F19A),
  (0x1F1E6, 0x1F1FF),
  (0x1F201, 0x1F20F),
  (0x1F21A, 0x1F21A),
  (0x1F22F, 0x1F22F),
  (0x1F232, 0x1F23F),
  (0x1F249, 0x1F53D),
  (0x1F546, 0x1F64F),
  (0x1F680, 0x1F6FF),
  (0x1F774, 0x1F77F),
  (0x1F7D5, 0x1F7FF),
  (0x1F80C, 0x1F80F),
  (0x1F848, 0x1F84F),
  (0x1F85A, 0x1F85F),
  (0x1F888, 0x1F88F),
  (0x1F8AE, 0x1F8FF),
  (0x1F90C, 0x1F93A),
  (0x1F93C, 0x1F945),
  (0x1F947, 0x1FAFF),
  (0x1FC00, 0x1FFFD),
  (0xE0020, 0xE007F),
];

// Emoji_Modifier_Base, curated from emoji-data.txt.
const MODIFIER_BASE_RANGES: &[(u32, u32)] = &[
  (0x261D, 0x261D),
  (0x26F9, 0x26F9),
  (0x270A, 0x270D),
  (0x1F385, 0x1F385),
  (0x1F3C2, 0x1F3C4),
  (0x1F3C7, 0x1F3C7),
  (0x1F3CA, 0x1F3CC),
  (0x1F442, 0x1F443),
  (0x1F446, 0x1F450),
  (0x1F466, 0x1F478),
  (0x1F47C, 0x1F47C),
  (0x1F481, 0x1F483),
  (0x1F485, 0x1F487),
  (0x1F48F, 0x1F48F),
  (0x1F491, 0x1F491),
  (0x1F4AA, 0x1F4AA),
  (0x1F574, 0x1F575),
  (0x1F57A, 0x1F57A),
  (0x1F590, 0x1F590),
  (0x1F595, 0x1F596),
  (0x1F645, 0x1F647),
  (0x1F64B, 0x1F64F),
  (0x1F6A3, 0x1F6A3),
  (0x1F6B4, 0x1F6B6),
  (0x1F6C0, 0x1F6C0),
  (0x1F6CC, 0x1F6CC),
  (0x1F90C, 0x1F90C),
  (0x1F90F, 0x1F90F),
  (0x1F918, 0x1F91F),
  (0x1F926, 0x1F926),
  (0x1F930, 0x1F939),
  (0x1F93C, 0x1F93E),
  (0x1F977, 0x1F977),
  (0x1F9B5, 0x1F9B6),
  (0x1F9B8, 0x1F9B9),
  (0x1F9BB, 0x1F9BB),
  (0x1F9CD, 0x1F9DD),
  (0x1FAC3, 0x1FAC5),
  (0x1FAF0, 0x1FAF8),
];

#[inline]
fn in_ranges(ranges: &[(u32, u32)], cp: u32) -> bool {
  ranges
    .binary_search_by(|&(start, end)| {
      if cp < start {
        std::cmp::Ordering::Greater
      } else if cp > end {
        std::cmp::Ordering::Less
      } else {
        std::cmp::Ordering::Equal
      }
    })
    .is_ok()
}

/// Check if a code point should be treated as emoji for fallback and
/// segmentation.
///
/// Keycap bases (digits, `#`, `*`) and VS15 are included so whole keycap
/// and presentation sequences stay on the emoji path.
pub fn is_emoji(cp: u32) -> bool {
  if cp < 0x80 {
    return is_keycap_base(cp);
  }
  if cp == TEXT_STYLE_VS {
    return true;
  }
  in_ranges(EMOJI_RANGES, cp)
}

/// Check if a code point is a skin tone modifier (Fitzpatrick scale).
#[inline]
pub fn is_emoji_modifier(cp: u32) -> bool {
  (0x1F3FB..=0x1F3FF).contains(&cp)
}

/// Check if a code point can receive a skin tone modifier.
pub fn is_emoji_base(cp: u32) -> bool {
  in_ranges(MODIFIER_BASE_RANGES, cp)
}

/// Check if a code point is a regional indicator (flag pair half).
#[inline]
pub fn is_regional_indicator(cp: u32) -> bool {
  (0x1F1E6..=0x1F1FF).contains(&cp)
}

/// Check if a code point is a Zero Width Joiner.
#[inline]
pub fn is_zwj(cp: u32) -> bool {
  cp == CHAR_ZWJ
}

/// Check if a code point is any variation selector, including the
/// supplementary VS17..VS256 block.
#[inline]
pub fn is_variation_selector(cp: u32) -> bool {
  (0xFE00..=0xFE0F).contains(&cp) || (0xE0100..=0xE01EF).contains(&cp)
}

/// Check if a code point is a keycap base (digits, `#`, `*`).
#[inline]
pub fn is_keycap_base(cp: u32) -> bool {
  matches!(cp, 0x23 | 0x2A | 0x30..=0x39)
}
