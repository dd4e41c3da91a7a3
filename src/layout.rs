//! Layout: bidi splitting, per-word shaping, and the layout cache
//!
//! `do_layout` turns a UTF-16 slice plus a style, paint, and collection
//! into positioned glyphs, per-code-unit advances, and ink bounds. The
//! slice is split into bidi level runs, each level run into words, and
//! each word is shaped independently so the result can be memoized: the
//! cache key is the word's exact text plus everything that can change its
//! shape (collection id, style, paint scalars, hyphen edit, direction).
//!
//! Hyphen edits apply to the first and last word of the whole request
//! only, never to interior words, so cached interior words are reusable
//! across hyphenation states.
//!
//! Letter spacing is distributed half-before/half-after each cluster and
//! disabled entirely for connected scripts, where inter-cluster gaps would
//! break joining.

use crate::bidi;
use crate::bidi::Bidi;
use crate::collection::FontCollection;
use crate::context::TextContext;
use crate::font::Font;
use crate::font::Rect;
use crate::font::Tag;
use crate::shape::ShapeBackend;
use crate::style::EndHyphenEdit;
use crate::style::Fakery;
use crate::style::FontStyle;
use crate::style::HyphenEdit;
use crate::style::Paint;
use crate::style::StartHyphenEdit;
use crate::unicode;
use crate::word_break;
use std::sync::Arc;
use unicode_script::Script;

/// One glyph in a finished layout. Positions are relative to the layout
/// origin, y growing downward.
#[derive(Debug, Clone)]
pub struct LayoutGlyph {
  pub font: Arc<dyn Font>,
  pub fakery: Fakery,
  pub glyph_id: u32,
  pub x: f32,
  pub y: f32,
  /// UTF-16 index into the laid-out slice this glyph belongs to.
  pub cluster: usize,
}

/// Cache key for one shaped word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutCacheKey {
  collection_id: u64,
  weight: u8,
  italic: bool,
  lang_list_id: u32,
  variant: crate::style::FamilyVariant,
  size_bits: u32,
  scale_x_bits: u32,
  skew_x_bits: u32,
  letter_spacing_bits: u32,
  paint_flags: u32,
  hyphen: u8,
  rtl: bool,
  // Defensive copy: the entry must outlive the caller's buffer.
  text: Vec<u16>,
}

impl LayoutCacheKey {
  fn new(
    collection: &FontCollection,
    style: FontStyle,
    paint: &Paint,
    hyphen: HyphenEdit,
    rtl: bool,
    text: &[u16],
  ) -> Self {
    Self {
      collection_id: collection.id(),
      weight: style.weight(),
      italic: style.italic(),
      lang_list_id: style.lang_list_id(),
      variant: style.variant(),
      size_bits: paint.size.to_bits(),
      scale_x_bits: paint.scale_x.to_bits(),
      skew_x_bits: paint.skew_x.to_bits(),
      letter_spacing_bits: paint.letter_spacing.to_bits(),
      paint_flags: paint.flags,
      hyphen: hyphen.packed(),
      rtl,
      text: text.to_vec(),
    }
  }
}

#[derive(Debug, Clone)]
struct PieceGlyph {
  font: Arc<dyn Font>,
  fakery: Fakery,
  glyph_id: u32,
  x: f32,
  y: f32,
  cluster: usize,
}

/// Shaped result for one word, positions relative to the word origin.
#[derive(Debug, Clone)]
pub struct LayoutPiece {
  glyphs: Vec<PieceGlyph>,
  advances: Vec<f32>,
  advance: f32,
  bounds: Rect,
}

/// A finished layout for one request.
#[derive(Debug, Clone, Default)]
pub struct Layout {
  glyphs: Vec<LayoutGlyph>,
  advances: Vec<f32>,
  advance: f32,
  bounds: Rect,
}

impl Layout {
  /// Glyphs in logical order.
  #[inline]
  pub fn glyphs(&self) -> &[LayoutGlyph] {
    &self.glyphs
  }

  /// Advance assigned to each UTF-16 code unit; cluster advances sit on
  /// the cluster's first unit, continuation units are zero.
  #[inline]
  pub fn advances(&self) -> &[f32] {
    &self.advances
  }

  /// Total advance of the laid-out text.
  #[inline]
  pub fn advance(&self) -> f32 {
    self.advance
  }

  /// Union ink bounds, y growing downward.
  #[inline]
  pub fn bounds(&self) -> Rect {
    self.bounds
  }

  /// Lays out `text`, consulting and filling the context's layout cache.
  pub fn do_layout(
    ctx: &TextContext,
    collection: &Arc<FontCollection>,
    backend: &dyn ShapeBackend,
    text: &[u16],
    style: FontStyle,
    paint: &Paint,
    bidi_flags: Bidi,
  ) -> Layout {
    let mut layout = Layout {
      advances: vec![0.0; text.len()],
      ..Default::default()
    };
    if text.is_empty() {
      return layout;
    }

    // (logical word start, visual x, shaped piece)
    let mut placed: Vec<(usize, f32, Arc<LayoutPiece>)> = Vec::new();
    let mut x = 0.0f32;
    for run in bidi::bidi_level_runs(text, bidi_flags) {
      // Word boundaries are computed logically; for RTL runs the last
      // logical word is leftmost, so placement walks them in reverse.
      let mut words: Vec<(usize, usize)> = Vec::new();
      let mut pos = run.start;
      while pos < run.end {
        let end = word_break::next_word_boundary(text, pos).min(run.end);
        words.push((pos, end));
        pos = end;
      }
      if run.rtl {
        words.reverse();
      }
      for (word_start, word_end) in words {
        let hyphen = HyphenEdit {
          start: if word_start == 0 {
            paint.hyphen.start
          } else {
            StartHyphenEdit::NoEdit
          },
          end: if word_end == text.len() {
            paint.hyphen.end
          } else {
            EndHyphenEdit::NoEdit
          },
        };
        let piece = cached_word_layout(
          ctx,
          collection,
          backend,
          &text[word_start..word_end],
          style,
          paint,
          hyphen,
          run.rtl,
        );
        placed.push((word_start, x, Arc::clone(&piece)));
        x += piece.advance;
      }
    }

    // Glyphs are appended in logical order even though x positions were
    // assigned in visual order.
    placed.sort_by_key(|(start, _, _)| *start);
    for (word_start, word_x, piece) in placed {
      for glyph in &piece.glyphs {
        layout.glyphs.push(LayoutGlyph {
          font: Arc::clone(&glyph.font),
          fakery: glyph.fakery,
          glyph_id: glyph.glyph_id,
          x: word_x + glyph.x,
          y: glyph.y,
          cluster: word_start + glyph.cluster,
        });
      }
      for (i, advance) in piece.advances.iter().enumerate() {
        layout.advances[word_start + i] = *advance;
      }
      layout.bounds.join_offset(&piece.bounds, word_x, 0.0);
    }
    layout.advance = x;
    layout
  }

  /// Measures `text` without keeping glyph data. Cache behavior is
  /// identical to [`do_layout`](Self::do_layout).
  pub fn measure_text(
    ctx: &TextContext,
    collection: &Arc<FontCollection>,
    backend: &dyn ShapeBackend,
    text: &[u16],
    style: FontStyle,
    paint: &Paint,
    bidi_flags: Bidi,
  ) -> f32 {
    Self::do_layout(ctx, collection, backend, text, style, paint, bidi_flags).advance
  }
}

#[allow(clippy::too_many_arguments)]
fn cached_word_layout(
  ctx: &TextContext,
  collection: &Arc<FontCollection>,
  backend: &dyn ShapeBackend,
  word: &[u16],
  style: FontStyle,
  paint: &Paint,
  hyphen: HyphenEdit,
  rtl: bool,
) -> Arc<LayoutPiece> {
  let key = LayoutCacheKey::new(collection, style, paint, hyphen, rtl, word);
  if let Some(piece) = ctx.layout_cache().get(&key) {
    return Arc::clone(piece);
  }
  let piece = Arc::new(layout_word(
    ctx, collection, backend, word, style, paint, hyphen, rtl,
  ));
  ctx.layout_cache().put(key, Arc::clone(&piece));
  piece
}

fn has_color_bitmaps(font: &dyn Font) -> bool {
  font.table(Tag::from_bytes(b"CBDT")).is_some()
    || font.table(Tag::from_bytes(b"sbix")).is_some()
    || font.table(Tag::from_bytes(b"CBLC")).is_some()
}

/// Picks the hyphen character for a script, falling back to ASCII
/// hyphen-minus when the font cannot render the preferred one.
fn hyphen_char_for(font: &dyn Font, script: Script) -> Option<(u32, u16)> {
  let preferred = unicode::hyphen_for_script(script);
  if let Some(glyph) = font.glyph_id(preferred) {
    return Some((preferred, glyph));
  }
  font.glyph_id(0x002D).map(|glyph| (0x002D, glyph))
}

#[allow(clippy::too_many_arguments)]
fn layout_word(
  ctx: &TextContext,
  collection: &Arc<FontCollection>,
  backend: &dyn ShapeBackend,
  word: &[u16],
  style: FontStyle,
  paint: &Paint,
  hyphen: HyphenEdit,
  rtl: bool,
) -> LayoutPiece {
  let mut piece = LayoutPiece {
    glyphs: Vec::new(),
    advances: vec![0.0; word.len()],
    advance: 0.0,
    bounds: Rect::default(),
  };

  // ReplaceWithHyphen drops the trailing code point before shaping.
  let mut effective_len = word.len();
  if hyphen.end == EndHyphenEdit::ReplaceWithHyphen && !word.is_empty() {
    let (_, len) = unicode::code_point_before(word, word.len());
    effective_len -= len;
  }
  let effective = &word[..effective_len];

  let runs = collection.itemize(ctx, effective, style);
  let letter_space = paint.letter_spacing * paint.size * paint.scale_x;

  struct SubRun {
    start: usize,
    end: usize,
    script: Script,
    run_index: usize,
  }
  let mut sub_runs: Vec<SubRun> = Vec::new();
  for (run_index, run) in runs.iter().enumerate() {
    let mut pos = run.start;
    while pos < run.end {
      let (end, script) = unicode::script_run(&effective[..run.end], pos);
      sub_runs.push(SubRun {
        start: pos,
        end,
        script,
        run_index,
      });
      pos = end;
    }
  }
  if rtl {
    sub_runs.reverse();
  }

  let first_script = sub_runs.first().map(|s| s.script).unwrap_or(Script::Latin);
  let last_script = sub_runs.last().map(|s| s.script).unwrap_or(Script::Latin);

  let mut x = 0.0f32;

  // The start edit is leftmost for LTR and rightmost for RTL; with the
  // sub-runs already in visual order that means before-first and
  // after-last respectively.
  let start_hyphen_font = runs.first().map(|run| run.faked_font.clone());
  let end_hyphen_font = runs.last().map(|run| run.faked_font.clone());
  let emit_start_hyphen = |piece: &mut LayoutPiece, x: &mut f32| {
    if hyphen.start != StartHyphenEdit::InsertHyphen {
      return;
    }
    let Some(faked) = &start_hyphen_font else {
      return;
    };
    let script = if rtl { last_script } else { first_script };
    if let Some((_, glyph)) = hyphen_char_for(&*faked.font, script) {
      let advance = faked.font.advance(glyph, paint);
      piece.glyphs.push(PieceGlyph {
        font: Arc::clone(&faked.font),
        fakery: faked.fakery,
        glyph_id: u32::from(glyph),
        x: *x,
        y: 0.0,
        cluster: 0,
      });
      let bounds = faked.font.bounds(glyph, paint);
      piece.bounds.join_offset(&bounds, *x, 0.0);
      if !piece.advances.is_empty() {
        piece.advances[0] += advance;
      }
      *x += advance;
    }
  };
  let emit_end_hyphen = |piece: &mut LayoutPiece, x: &mut f32| {
    if !matches!(
      hyphen.end,
      EndHyphenEdit::InsertHyphen | EndHyphenEdit::ReplaceWithHyphen
    ) {
      return;
    }
    let Some(faked) = &end_hyphen_font else {
      return;
    };
    let script = if rtl { first_script } else { last_script };
    if let Some((_, glyph)) = hyphen_char_for(&*faked.font, script) {
      let advance = faked.font.advance(glyph, paint);
      let cluster = effective_len.min(word.len().saturating_sub(1));
      piece.glyphs.push(PieceGlyph {
        font: Arc::clone(&faked.font),
        fakery: faked.fakery,
        glyph_id: u32::from(glyph),
        x: *x,
        y: 0.0,
        cluster,
      });
      let bounds = faked.font.bounds(glyph, paint);
      piece.bounds.join_offset(&bounds, *x, 0.0);
      if let Some(slot) = piece.advances.get_mut(cluster) {
        *slot += advance;
      }
      *x += advance;
    }
  };

  if !rtl {
    emit_start_hyphen(&mut piece, &mut x);
  } else {
    emit_end_hyphen(&mut piece, &mut x);
  }

  for sub in &sub_runs {
    let run = &runs[sub.run_index];
    let faked = &run.faked_font;
    let slice = &effective[sub.start..sub.end];
    let shaped = match backend.shape(&*faked.font, paint, sub.script, rtl, slice) {
      Ok(shaped) => shaped,
      Err(err) => {
        log::warn!("shaping failed for font {}: {err}", faked.font.unique_id());
        continue;
      }
    };

    let spacing = if letter_space != 0.0 && unicode::allows_letter_spacing(sub.script) {
      letter_space
    } else {
      0.0
    };
    let half_spacing = spacing * 0.5;
    let color_bitmaps = has_color_bitmaps(&*faked.font);

    let mut i = 0usize;
    while i < shaped.len() {
      let cluster = shaped[i].cluster;
      let mut cluster_end = i;
      while cluster_end < shaped.len() && shaped[cluster_end].cluster == cluster {
        cluster_end += 1;
      }
      let cluster_index = sub.start + cluster as usize;

      x += half_spacing;
      let mut cluster_advance = spacing;
      for glyph in &shaped[i..cluster_end] {
        let gx = x + glyph.x_offset;
        let gy = -glyph.y_offset;
        piece.glyphs.push(PieceGlyph {
          font: Arc::clone(&faked.font),
          fakery: faked.fakery,
          glyph_id: glyph.glyph_id,
          x: gx,
          y: gy,
          cluster: cluster_index,
        });
        let bounds = if color_bitmaps {
          backend
            .glyph_extents(&*faked.font, glyph.glyph_id, paint)
            .unwrap_or_else(|| faked.font.bounds(glyph.glyph_id as u16, paint))
        } else {
          faked.font.bounds(glyph.glyph_id as u16, paint)
        };
        piece.bounds.join_offset(&bounds, gx, gy);
        x += glyph.x_advance;
        cluster_advance += glyph.x_advance;
      }
      x += half_spacing;
      if let Some(slot) = piece.advances.get_mut(cluster_index) {
        *slot += cluster_advance;
      }
      i = cluster_end;
    }
  }

  if !rtl {
    emit_end_hyphen(&mut piece, &mut x);
  } else {
    emit_start_hyphen(&mut piece, &mut x);
  }

  piece.advance = x;
  piece
}
