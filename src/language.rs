//! Language tags and the interned language-list table
//!
//! Families declare the languages they were designed for and callers request
//! a prioritized language list; fallback scoring compares the two. Tags are
//! BCP-47-like but reduced to the four fields scoring actually reads:
//! primary language, script, region, and emoji style. Everything else in the
//! input string is ignored except the `-u-em-` extension, which carries an
//! explicit emoji-presentation preference.
//!
//! Parsed lists are interned: the same literal string always yields the same
//! small integer id, and distinct strings that canonicalize identically may
//! share an id's list content. Ids are what travels inside [`crate::style::FontStyle`]
//! and cache keys.

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Maximum number of tags kept from one comma-separated list.
pub const MAX_LANGUAGES_PER_LIST: usize = 12;

/// Emoji presentation preference carried by a language tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmojiStyle {
  /// Tag says nothing about emoji presentation
  #[default]
  Empty,
  /// Explicit `-u-em-default`
  Default,
  /// Color emoji presentation (`Zsye` script or `-u-em-emoji`)
  Emoji,
  /// Text presentation (`Zsym` script or `-u-em-text`)
  Text,
}

/// One parsed language tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Language {
  language: [u8; 3],
  script: [u8; 4],
  region: [u8; 2],
  emoji_style: EmojiStyle,
}

fn pack_language(subtag: &str) -> [u8; 3] {
  let mut out = [0u8; 3];
  for (i, b) in subtag.bytes().take(3).enumerate() {
    out[i] = b.to_ascii_lowercase();
  }
  out
}

fn pack_script(subtag: &str) -> [u8; 4] {
  let mut out = [0u8; 4];
  for (i, b) in subtag.bytes().take(4).enumerate() {
    out[i] = if i == 0 {
      b.to_ascii_uppercase()
    } else {
      b.to_ascii_lowercase()
    };
  }
  out
}

fn pack_region(subtag: &str) -> [u8; 2] {
  let mut out = [0u8; 2];
  for (i, b) in subtag.bytes().take(2).enumerate() {
    out[i] = b.to_ascii_uppercase();
  }
  out
}

/// True if `declared` can render text written in `requested` script.
///
/// Japanese and Korean umbrella scripts cover their constituent scripts;
/// traditional Chinese covers Bopomofo.
fn script_supports(declared: &[u8; 4], requested: &[u8; 4]) -> bool {
  if declared == requested {
    return true;
  }
  match declared {
    b"Jpan" => matches!(requested, b"Hira" | b"Kana" | b"Hani"),
    b"Kore" => matches!(requested, b"Hang" | b"Hani"),
    b"Hanb" => matches!(requested, b"Hant" | b"Bopo"),
    _ => false,
  }
}

impl Language {
  /// Parses one tag. Unrecognized subtags are skipped, so this never fails;
  /// a completely unusable input yields the undetermined language.
  pub fn parse(tag: &str) -> Self {
    let mut lang = Language::default();
    let mut saw_language = false;
    let mut in_unicode_ext = false;
    let mut em_value_next = false;
    for subtag in tag.split(['-', '_']) {
      if em_value_next {
        lang.emoji_style = match subtag {
          "emoji" => EmojiStyle::Emoji,
          "text" => EmojiStyle::Text,
          "default" => EmojiStyle::Default,
          _ => lang.emoji_style,
        };
        em_value_next = false;
        continue;
      }
      if in_unicode_ext {
        if subtag.eq_ignore_ascii_case("em") {
          em_value_next = true;
        }
        continue;
      }
      if subtag.eq_ignore_ascii_case("u") {
        in_unicode_ext = true;
        continue;
      }
      let alpha = subtag.bytes().all(|b| b.is_ascii_alphabetic());
      if !saw_language && (2..=3).contains(&subtag.len()) && alpha {
        lang.language = pack_language(subtag);
        saw_language = true;
      } else if subtag.len() == 4 && alpha && lang.script == [0; 4] {
        lang.script = pack_script(subtag);
      } else if subtag.len() == 2 && alpha && lang.region == [0; 2] {
        lang.region = pack_region(subtag);
      }
    }
    if lang.emoji_style == EmojiStyle::Empty {
      lang.emoji_style = match &lang.script {
        b"Zsye" => EmojiStyle::Emoji,
        b"Zsym" => EmojiStyle::Text,
        _ => EmojiStyle::Empty,
      };
    }
    lang
  }

  /// Emoji presentation preference of this tag.
  #[inline]
  pub fn emoji_style(&self) -> EmojiStyle {
    self.emoji_style
  }

  /// True if the tag declared no usable fields at all.
  pub fn is_unsupported(&self) -> bool {
    self.language == [0; 3] && self.script == [0; 4]
  }

  /// Match quality of this (declared) tag against a requested tag, 0 to 4.
  ///
  /// Script support gates everything: without it only an explicit emoji
  /// style agreement scores (1). With it, the base is 2, matching primary
  /// language adds 1, and matching region on top adds 1 more.
  pub fn score_for(&self, requested: &Language) -> u32 {
    let script_match = requested.script != [0; 4] && script_supports(&self.script, &requested.script);
    let emoji_match = self.emoji_style != EmojiStyle::Empty && self.emoji_style == requested.emoji_style;
    if !script_match {
      return u32::from(emoji_match);
    }
    let mut score = 2;
    if self.language != [0; 3] && self.language == requested.language {
      score += 1;
      if self.region != [0; 2] && self.region == requested.region {
        score += 1;
      }
    }
    score
  }
}

/// An immutable, deduplicated, order-preserving list of parsed tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguageList {
  languages: Vec<Language>,
}

impl LanguageList {
  /// Parses a comma-separated tag list, dropping duplicates and anything
  /// past [`MAX_LANGUAGES_PER_LIST`].
  pub fn parse(input: &str) -> Self {
    let mut languages = Vec::new();
    for tag in input.split(',') {
      let tag = tag.trim();
      if tag.is_empty() {
        continue;
      }
      let parsed = Language::parse(tag);
      if parsed.is_unsupported() {
        continue;
      }
      if languages.contains(&parsed) {
        continue;
      }
      languages.push(parsed);
      if languages.len() == MAX_LANGUAGES_PER_LIST {
        break;
      }
    }
    Self { languages }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.languages.is_empty()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.languages.len()
  }

  /// Tags in request order.
  #[inline]
  pub fn languages(&self) -> &[Language] {
    &self.languages
  }

  /// Best score any of these declared tags achieves for `requested`.
  pub fn best_score_for(&self, requested: &Language) -> u32 {
    self
      .languages
      .iter()
      .map(|lang| lang.score_for(requested))
      .max()
      .unwrap_or(0)
  }
}

/// Interning table mapping literal tag-list strings to stable ids.
///
/// Id 0 is reserved for the empty list. The table lives inside
/// [`crate::context::TextContext`] and is only touched under its lock.
#[derive(Debug)]
pub struct LanguageListCache {
  by_string: FxHashMap<String, u32>,
  lists: Vec<Arc<LanguageList>>,
}

impl Default for LanguageListCache {
  fn default() -> Self {
    Self {
      by_string: FxHashMap::default(),
      lists: vec![Arc::new(LanguageList::default())],
    }
  }
}

impl LanguageListCache {
  /// Returns the id for a literal tag-list string, interning it on first
  /// sight. The same literal always yields the same id.
  pub fn get_id(&mut self, input: &str) -> u32 {
    if input.is_empty() {
      return 0;
    }
    if let Some(&id) = self.by_string.get(input) {
      return id;
    }
    let list = LanguageList::parse(input);
    let id = if list.is_empty() {
      0
    } else {
      let id = self.lists.len() as u32;
      self.lists.push(Arc::new(list));
      id
    };
    self.by_string.insert(input.to_owned(), id);
    id
  }

  /// Resolves an id back to its list. Unknown ids resolve to the empty list.
  pub fn get_by_id(&self, id: u32) -> Arc<LanguageList> {
    self
      .lists
      .get(id as usize)
      .cloned()
      .unwrap_or_else(|| Arc::clone(&self.lists[0]))
  }
}
