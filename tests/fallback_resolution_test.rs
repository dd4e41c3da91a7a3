//! Fallback resolution and itemization properties over synthetic fonts.

mod common;

use common::utf16;
use common::FixtureFont;
use std::sync::Arc;
use textflow::FamilyVariant;
use textflow::FontCollection;
use textflow::FontFamily;
use textflow::FontStyle;
use textflow::FontVariant;
use textflow::TextContext;

fn family(ctx: &TextContext, ranges: &[(u32, u32)], langs: &str) -> Arc<FontFamily> {
  FontFamily::new(
    ctx,
    vec![FontVariant::new(FixtureFont::covering(ranges))],
    langs,
    FamilyVariant::Default,
  )
  .unwrap()
}

#[test]
fn first_family_beats_language_score() {
  let ctx = TextContext::new();
  let f0 = family(&ctx, &[(0x41, 0x5A)], "");
  let f1 = family(&ctx, &[(0x41, 0x5A)], "fr-FR");
  let collection = FontCollection::new(vec![Arc::clone(&f0), f1]).unwrap();
  let lang = ctx.get_language_list_id("fr-FR");
  let resolved = collection.family_for_char(&ctx, u32::from('A'), 0, lang, FamilyVariant::Default);
  assert!(Arc::ptr_eq(&resolved, &f0));
}

#[test]
fn primary_covered_chars_always_resolve_to_primary() {
  let ctx = TextContext::new();
  let primary = family(&ctx, &[(0x20, 0x7E)], "");
  let other = family(&ctx, &[(0x20, 0x7E)], "en-US");
  let collection = FontCollection::new(vec![Arc::clone(&primary), other]).unwrap();
  let lang = ctx.get_language_list_id("en-US,fr-FR");
  for cp in 0x20..0x7F {
    let resolved = collection.family_for_char(&ctx, cp, 0, lang, FamilyVariant::Compact);
    assert!(Arc::ptr_eq(&resolved, &primary), "codepoint {cp:#X}");
  }
}

#[test]
fn itemize_partitions_arbitrary_text() {
  let ctx = TextContext::new();
  let latin = family(&ctx, &[(0x20, 0x7E)], "");
  let hebrew = family(&ctx, &[(0x5D0, 0x5EA)], "he-Hebr");
  let emoji = FontFamily::new(
    &ctx,
    vec![FontVariant::new(FixtureFont::covering(&[
      (0x1F300, 0x1F6FF),
      (0x2600, 0x27BF),
    ]))],
    "und-Zsye",
    FamilyVariant::Default,
  )
  .unwrap();
  let collection = FontCollection::new(vec![latin, hebrew, emoji]).unwrap();

  let samples = [
    "hello",
    "שלום world",
    "mixed 🚀 text",
    "aé中x",
    "",
    " ",
    "🚀🚀🚀",
  ];
  for sample in samples {
    let text = utf16(sample);
    let runs = collection.itemize(&ctx, &text, FontStyle::default());
    if text.is_empty() {
      assert!(runs.is_empty());
      continue;
    }
    assert_eq!(runs[0].start, 0, "sample {sample:?}");
    assert_eq!(runs.last().unwrap().end, text.len(), "sample {sample:?}");
    for run in &runs {
      assert!(run.start < run.end, "sample {sample:?}");
    }
    for pair in runs.windows(2) {
      assert_eq!(pair[0].end, pair[1].start, "sample {sample:?}");
    }
  }
}

#[test]
fn lone_surrogates_do_not_panic() {
  let ctx = TextContext::new();
  let latin = family(&ctx, &[(0x20, 0x7E)], "");
  let collection = FontCollection::new(vec![latin]).unwrap();
  let text = [0xD800u16, 0xDC00, 0xDFFF, 0xD83D, u16::from(b'a')];
  let runs = collection.itemize(&ctx, &text, FontStyle::default());
  assert_eq!(runs[0].start, 0);
  assert_eq!(runs.last().unwrap().end, text.len());
}

#[test]
fn variation_selector_round_trips_with_itemize() {
  let ctx = TextContext::new();
  let latin = family(&ctx, &[(0x20, 0x7E)], "");
  let snowman_vs = FontFamily::new(
    &ctx,
    vec![FontVariant::new(FixtureFont::build(
      &[(0x2600, 0x26FF)],
      &[(0xFE0F, vec![], vec![0x2603])],
      None,
      None,
    ))],
    "und-Zsye",
    FamilyVariant::Default,
  )
  .unwrap();
  let collection = FontCollection::new(vec![latin, snowman_vs]).unwrap();

  assert!(collection.has_variation_selector(0x2603, 0xFE0F));
  let text: Vec<u16> = vec![0x2603, 0xFE0F];
  let runs = collection.itemize(&ctx, &text, FontStyle::default());
  assert_eq!(runs.len(), 1, "variation sequence must stay in one run");
}

#[test]
fn emoji_presentation_prefers_emoji_family() {
  let ctx = TextContext::new();
  let latin = family(&ctx, &[(0x20, 0x7E)], "");
  let symbols = family(&ctx, &[(0x2600, 0x26FF)], "");
  let emoji = FontFamily::new(
    &ctx,
    vec![FontVariant::new(FixtureFont::covering(&[(0x2600, 0x26FF)]))],
    "und-Zsye",
    FamilyVariant::Default,
  )
  .unwrap();
  let collection =
    FontCollection::new(vec![latin, symbols, Arc::clone(&emoji)]).unwrap();
  // U+2614 UMBRELLA WITH RAIN DROPS followed by VS16: neither family has
  // sequence data, so the emoji-flagged family wins on presentation.
  let resolved = collection.family_for_char(&ctx, 0x2614, 0xFE0F, 0, FamilyVariant::Default);
  assert!(Arc::ptr_eq(&resolved, &emoji));
}

#[test]
fn derived_variation_collection_has_fresh_identity() {
  let ctx = TextContext::new();
  let variable = FontFamily::new(
    &ctx,
    vec![FontVariant::new(FixtureFont::build(
      &[(0x41, 0x5A)],
      &[],
      None,
      Some(common::build_fvar(&[(b"wght", 100.0, 400.0, 900.0)])),
    ))],
    "",
    FamilyVariant::Default,
  )
  .unwrap();
  let collection = FontCollection::new(vec![variable]).unwrap();
  let wght = textflow::FontVariation {
    tag: textflow::Tag::from_bytes(b"wght"),
    value: 650.0,
  };
  let derived = collection.create_collection_with_variation(&[wght]).unwrap();
  assert_ne!(collection.id(), derived.id());

  // Unsupported axes yield nothing.
  let zzzz = textflow::FontVariation {
    tag: textflow::Tag::from_bytes(b"zzzz"),
    value: 1.0,
  };
  assert!(collection.create_collection_with_variation(&[zzzz]).is_none());
}
