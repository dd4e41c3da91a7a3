//! Error types for textflow
//!
//! Malformed font data is never fatal in this crate: truncated or invalid
//! cmap, OS/2, and fvar tables are absorbed at the lowest layer and degrade
//! to "no coverage", "default style", or "no axes". The error types here
//! cover the remaining conditions: construction-time caller errors and
//! backend failures that a caller may want to observe.
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use thiserror::Error;

/// Result type alias for textflow operations
///
/// This is a convenience type that uses our Error type as the error variant.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for textflow
///
/// Each variant wraps a more specific error type for that subsystem.
#[derive(Error, Debug)]
pub enum Error {
  /// Font resource or collection construction error
  #[error("Font error: {0}")]
  Font(#[from] FontError),

  /// Shaping backend error
  #[error("Shaping error: {0}")]
  Shaping(#[from] ShapingError),
}

/// Errors related to font resources, families, and collections.
#[derive(Error, Debug)]
pub enum FontError {
  /// The font data could not be parsed at all (bundled `ParsedFont` only).
  #[error("Unparseable font data: {message}")]
  Unparseable {
    /// Human-readable description of the parse failure
    message: String,
  },

  /// A family was constructed with no variants.
  #[error("Font family has no variants")]
  EmptyFamily,

  /// A collection was constructed with no families.
  #[error("Font collection has no families")]
  EmptyCollection,
}

/// Errors surfaced by a shaping backend.
#[derive(Error, Debug)]
pub enum ShapingError {
  /// The backend could not obtain a usable face for the font resource.
  #[error("No shapeable face for font {font_id}")]
  NoFace {
    /// Unique id of the font that failed to yield a face
    font_id: u64,
  },
}
