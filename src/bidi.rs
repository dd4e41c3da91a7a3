//! Bidirectional level-run enumeration (UAX #9)
//!
//! Wraps the `unicode-bidi` crate to split UTF-16 text into level runs for
//! layout. Runs come back in visual order, left to right, each carrying its
//! logical UTF-16 range and resolved direction; layout shapes them in
//! visual order and re-emits results logically.
//!
//! The caller picks how the paragraph direction is determined: forced,
//! explicit, or detected from the first strong character with an explicit
//! fallback.
//!
//! # References
//!
//! - UAX #9 Unicode Bidirectional Algorithm: <https://www.unicode.org/reports/tr9/>

use crate::unicode;
use crate::unicode::Utf8Conversion;
use unicode_bidi::BidiClass;
use unicode_bidi::BidiInfo;
use unicode_bidi::Level;

/// Paragraph direction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bidi {
  /// Paragraph is LTR; embedded RTL segments still reorder
  #[default]
  Ltr,
  /// Paragraph is RTL; embedded LTR segments still reorder
  Rtl,
  /// Detect from the first strong character, defaulting to LTR
  DefaultLtr,
  /// Detect from the first strong character, defaulting to RTL
  DefaultRtl,
  /// Treat the whole text as a single LTR run, no reordering
  ForceLtr,
  /// Treat the whole text as a single RTL run, no reordering
  ForceRtl,
}

/// One level run: a logical UTF-16 range with a resolved direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidiRun {
  pub start: usize,
  pub end: usize,
  pub rtl: bool,
}

/// First-strong-character detection for the `Default*` request modes.
fn detect_para_level(text: &[u16], fallback_rtl: bool) -> Level {
  for (_, cp) in unicode::CodePoints::new(text) {
    let Some(ch) = char::from_u32(cp) else {
      continue;
    };
    match unicode_bidi::bidi_class(ch) {
      BidiClass::L => return Level::ltr(),
      BidiClass::R | BidiClass::AL => return Level::rtl(),
      _ => {}
    }
  }
  if fallback_rtl {
    Level::rtl()
  } else {
    Level::ltr()
  }
}

/// Splits text into level runs in visual order.
///
/// Force modes skip the algorithm entirely and yield one run. The result
/// always covers `[0, text.len())` exactly.
pub fn bidi_level_runs(text: &[u16], bidi: Bidi) -> Vec<BidiRun> {
  if text.is_empty() {
    return Vec::new();
  }
  let forced_rtl = match bidi {
    Bidi::ForceLtr => Some(false),
    Bidi::ForceRtl => Some(true),
    _ => None,
  };
  if let Some(rtl) = forced_rtl {
    return vec![BidiRun {
      start: 0,
      end: text.len(),
      rtl,
    }];
  }

  let para_level = match bidi {
    Bidi::Ltr => Level::ltr(),
    Bidi::Rtl => Level::rtl(),
    Bidi::DefaultLtr => detect_para_level(text, false),
    Bidi::DefaultRtl => detect_para_level(text, true),
    Bidi::ForceLtr | Bidi::ForceRtl => unreachable!(),
  };

  let conv = Utf8Conversion::new(text);
  let info = BidiInfo::new(&conv.string, Some(para_level));
  let mut runs = Vec::new();
  for para in &info.paragraphs {
    let (levels, level_runs) = info.visual_runs(para, para.range.clone());
    for byte_range in level_runs {
      let rtl = levels[byte_range.start].is_rtl();
      let start = conv.byte_to_utf16(byte_range.start, text.len());
      let end = if byte_range.end >= conv.string.len() {
        text.len()
      } else {
        conv.byte_to_utf16(byte_range.end, text.len())
      };
      if start < end {
        runs.push(BidiRun { start, end, rtl });
      }
    }
  }
  runs
}
