//! textflow: font fallback, text itemization, and shaping
//!
//! This crate decides which font, among a prioritized collection of font
//! families, renders each code point of a text run, splits the run into
//! maximal same-font segments, and shapes each segment into positioned
//! glyphs. It sits under a UI toolkit's text stack: callers hand it UTF-16
//! text, a style, and a [`FontCollection`]; it hands back glyph ids,
//! advances, and bounds.
//!
//! # Pipeline
//!
//! ```text
//! Text → Bidi level runs → Word split → Itemize (font fallback)
//!      → Script runs → Shaping backend → Layout (cached per word)
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use textflow::{
//!     Bidi, FontCollection, FontFamily, FontStyle, FontVariant, HarfBuzzBackend, Layout, Paint,
//!     ParsedFont, TextContext,
//! };
//!
//! let ctx = TextContext::new();
//! let font = ParsedFont::new(font_bytes, 0)?;
//! let family = FontFamily::new(&ctx, vec![FontVariant::new(font)], "", Default::default())?;
//! let collection = FontCollection::new(vec![family])?;
//! let backend = HarfBuzzBackend::with_context(&ctx);
//!
//! let text: Vec<u16> = "Hello, world".encode_utf16().collect();
//! let layout = Layout::do_layout(
//!     &ctx, &collection, &backend, &text,
//!     FontStyle::default(), &Paint::default(), Bidi::DefaultLtr,
//! );
//! println!("width: {}px", layout.advance());
//! ```
//!
//! All shared mutable state (interned language lists, the layout cache,
//! parsed faces) lives in [`TextContext`]; everything else is immutable
//! after construction and freely shareable across threads.

pub mod bidi;
pub mod cache;
pub mod collection;
pub mod context;
pub mod coverage;
pub mod emoji;
pub mod error;
pub mod family;
pub mod font;
pub mod grapheme;
pub mod language;
pub mod layout;
pub mod shape;
pub mod style;
pub mod unicode;
pub mod word_break;

#[cfg(test)]
pub(crate) mod testutil;

pub use bidi::{Bidi, BidiRun};
pub use collection::{FallbackProvider, FontCollection, Run};
pub use context::TextContext;
pub use coverage::CoverageSet;
pub use error::{Error, Result};
pub use family::{FakedFont, FontFamily, FontVariant};
pub use font::{Font, FontVariation, ParsedFont, Rect, Tag};
pub use grapheme::{get_text_run_cursor, is_grapheme_break, MoveOpt};
pub use layout::{Layout, LayoutGlyph};
pub use shape::{HarfBuzzBackend, RecordingBackend, ShapeBackend, ShapedGlyph};
pub use style::{
  EndHyphenEdit, FamilyVariant, Fakery, FontStyle, HyphenEdit, Paint, StartHyphenEdit,
};
pub use word_break::WordBreaker;
