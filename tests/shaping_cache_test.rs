//! Layout cache behavior observed through a counting backend.

mod common;

use common::utf16;
use common::FixtureFont;
use std::sync::Arc;
use textflow::Bidi;
use textflow::FamilyVariant;
use textflow::FontCollection;
use textflow::FontFamily;
use textflow::FontStyle;
use textflow::FontVariant;
use textflow::Layout;
use textflow::Paint;
use textflow::RecordingBackend;
use textflow::TextContext;

fn collection(ctx: &TextContext) -> Arc<FontCollection> {
  let family = FontFamily::new(
    ctx,
    vec![FontVariant::new(FixtureFont::covering(&[
      (0x20, 0x7E),
      (0x2010, 0x2010),
      (0x5D0, 0x5EA),
    ]))],
    "",
    FamilyVariant::Default,
  )
  .unwrap();
  FontCollection::new(vec![family]).unwrap()
}

#[test]
fn identical_requests_share_cache_entries() {
  let ctx = TextContext::new();
  let collection = collection(&ctx);
  let backend = RecordingBackend::new();
  let text = utf16("the quick brown fox");
  let style = FontStyle::default();
  let paint = Paint::default();

  let first = Layout::do_layout(&ctx, &collection, &backend, &text, style, &paint, Bidi::Ltr);
  let calls = backend.total_calls();
  assert!(calls > 0);

  let second = Layout::do_layout(&ctx, &collection, &backend, &text, style, &paint, Bidi::Ltr);
  assert_eq!(
    backend.total_calls(),
    calls,
    "second layout must not re-invoke the shaping backend"
  );

  assert_eq!(first.advances().len(), second.advances().len());
  for (a, b) in first.advances().iter().zip(second.advances()) {
    assert_eq!(a.to_bits(), b.to_bits(), "advances must be bit-identical");
  }
  assert_eq!(first.advance().to_bits(), second.advance().to_bits());
}

#[test]
fn measure_text_is_idempotent_and_cached() {
  let ctx = TextContext::new();
  let collection = collection(&ctx);
  let backend = RecordingBackend::new();
  let text = utf16("measure me");
  let style = FontStyle::default();
  let paint = Paint::default();

  let first = Layout::measure_text(&ctx, &collection, &backend, &text, style, &paint, Bidi::Ltr);
  let calls = backend.total_calls();
  let second = Layout::measure_text(&ctx, &collection, &backend, &text, style, &paint, Bidi::Ltr);
  assert_eq!(first.to_bits(), second.to_bits());
  assert_eq!(backend.total_calls(), calls);
  // Measuring and laying out share the same cache entries.
  let layout = Layout::do_layout(&ctx, &collection, &backend, &text, style, &paint, Bidi::Ltr);
  assert_eq!(backend.total_calls(), calls);
  assert_eq!(layout.advance().to_bits(), first.to_bits());
}

#[test]
fn shared_words_hit_across_different_requests() {
  let ctx = TextContext::new();
  let collection = collection(&ctx);
  let backend = RecordingBackend::new();
  let style = FontStyle::default();
  let paint = Paint::default();

  Layout::do_layout(
    &ctx,
    &collection,
    &backend,
    &utf16("alpha beta"),
    style,
    &paint,
    Bidi::Ltr,
  );
  let calls = backend.total_calls();
  // "alpha" is already cached; only the new word shapes.
  Layout::do_layout(
    &ctx,
    &collection,
    &backend,
    &utf16("alpha gamma"),
    style,
    &paint,
    Bidi::Ltr,
  );
  assert_eq!(backend.total_calls(), calls + 1);
}

#[test]
fn distinct_collections_do_not_share_entries() {
  let ctx = TextContext::new();
  let c1 = collection(&ctx);
  let c2 = collection(&ctx);
  assert_ne!(c1.id(), c2.id());
  let backend = RecordingBackend::new();
  let text = utf16("word");
  let style = FontStyle::default();
  let paint = Paint::default();

  Layout::do_layout(&ctx, &c1, &backend, &text, style, &paint, Bidi::Ltr);
  let calls = backend.total_calls();
  Layout::do_layout(&ctx, &c2, &backend, &text, style, &paint, Bidi::Ltr);
  assert!(backend.total_calls() > calls);
}

#[test]
fn purge_caches_preserves_collection_identity() {
  let ctx = TextContext::new();
  let collection = collection(&ctx);
  let id = collection.id();
  let backend = RecordingBackend::new();
  let text = utf16("word");
  Layout::do_layout(
    &ctx,
    &collection,
    &backend,
    &text,
    FontStyle::default(),
    &Paint::default(),
    Bidi::Ltr,
  );
  let calls = backend.total_calls();
  ctx.purge_caches();
  assert_eq!(collection.id(), id);
  Layout::do_layout(
    &ctx,
    &collection,
    &backend,
    &text,
    FontStyle::default(),
    &Paint::default(),
    Bidi::Ltr,
  );
  assert!(backend.total_calls() > calls);
}

#[test]
fn eviction_keeps_results_correct() {
  // A tiny cache forces constant eviction; results stay identical.
  let ctx = TextContext::with_layout_cache_capacity(2);
  let collection = collection(&ctx);
  let backend = RecordingBackend::new();
  let style = FontStyle::default();
  let paint = Paint::default();
  let text = utf16("one two three four five six");
  let first = Layout::do_layout(&ctx, &collection, &backend, &text, style, &paint, Bidi::Ltr);
  let second = Layout::do_layout(&ctx, &collection, &backend, &text, style, &paint, Bidi::Ltr);
  assert_eq!(first.advance().to_bits(), second.advance().to_bits());
  assert_eq!(first.glyphs().len(), second.glyphs().len());
}

#[test]
fn rtl_and_ltr_requests_are_keyed_separately() {
  let ctx = TextContext::new();
  let collection = collection(&ctx);
  let backend = RecordingBackend::new();
  let text = utf16("אב");
  let style = FontStyle::default();
  let paint = Paint::default();
  Layout::do_layout(&ctx, &collection, &backend, &text, style, &paint, Bidi::ForceLtr);
  let calls = backend.total_calls();
  Layout::do_layout(&ctx, &collection, &backend, &text, style, &paint, Bidi::ForceRtl);
  assert!(backend.total_calls() > calls);
}
