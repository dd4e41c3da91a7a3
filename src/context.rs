//! Process-wide context for shared caches
//!
//! All shared mutable state lives here behind locks: the language-list
//! interning table, the bounded layout cache, and the parsed-face cache
//! used by the default shaping backend. Entry points take the context by
//! reference, so tests construct isolated contexts instead of leaning on
//! hidden globals. A process normally holds exactly one.
//!
//! Everything else in the engine (coverage sets, families, collections) is
//! immutable after construction and needs no locking.

use crate::cache::BoundedCache;
use crate::language::LanguageListCache;
use crate::language::LanguageList;
use crate::layout::LayoutCacheKey;
use crate::layout::LayoutPiece;
use crate::shape::FaceCache;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// Entries kept in the per-word layout cache.
const LAYOUT_CACHE_CAPACITY: usize = 5000;

/// Shared caches for one engine instance.
pub struct TextContext {
  languages: Mutex<LanguageListCache>,
  layout_cache: Mutex<BoundedCache<LayoutCacheKey, Arc<LayoutPiece>>>,
  face_cache: Arc<FaceCache>,
}

impl Default for TextContext {
  fn default() -> Self {
    Self::new()
  }
}

impl TextContext {
  /// Creates a context with the default cache capacity.
  pub fn new() -> Self {
    Self::with_layout_cache_capacity(LAYOUT_CACHE_CAPACITY)
  }

  /// Creates a context with an explicit layout cache capacity, mainly for
  /// tests that want to observe eviction.
  pub fn with_layout_cache_capacity(capacity: usize) -> Self {
    Self {
      languages: Mutex::new(LanguageListCache::default()),
      layout_cache: Mutex::new(BoundedCache::new(capacity)),
      face_cache: Arc::new(FaceCache::default()),
    }
  }

  /// Interns a comma-separated language tag list, returning its stable id.
  pub fn get_language_list_id(&self, tags: &str) -> u32 {
    match self.languages.lock() {
      Ok(mut cache) => cache.get_id(tags),
      Err(_) => 0,
    }
  }

  /// Resolves an interned id back to its parsed list.
  pub fn language_list_by_id(&self, id: u32) -> Arc<LanguageList> {
    match self.languages.lock() {
      Ok(cache) => cache.get_by_id(id),
      Err(_) => Arc::new(LanguageList::default()),
    }
  }

  /// The parsed-face cache shared with shaping backends built from this
  /// context.
  pub(crate) fn face_cache(&self) -> Arc<FaceCache> {
    Arc::clone(&self.face_cache)
  }

  pub(crate) fn layout_cache(
    &self,
  ) -> MutexGuard<'_, BoundedCache<LayoutCacheKey, Arc<LayoutPiece>>> {
    match self.layout_cache.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }

  /// Drops all shaping and font-object caches. Collection identity and the
  /// language interning table are unaffected, so cache keys stay valid.
  pub fn purge_caches(&self) {
    self.layout_cache().clear();
    self.face_cache.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn language_ids_are_stable_per_context() {
    let ctx = TextContext::new();
    let a = ctx.get_language_list_id("en-US");
    let b = ctx.get_language_list_id("en-US");
    assert_eq!(a, b);
    assert_eq!(ctx.language_list_by_id(a).len(), 1);
  }

  #[test]
  fn contexts_are_isolated() {
    let ctx1 = TextContext::new();
    let ctx2 = TextContext::new();
    ctx1.get_language_list_id("fr-FR");
    // A fresh context has not seen the string; ids may or may not collide,
    // but the second context resolves its own table.
    let id = ctx2.get_language_list_id("ja-JP");
    assert_eq!(ctx2.language_list_by_id(id).len(), 1);
  }
}
