//! The program scope's canonical-signature table: `signature → BoundType`,
//! plus the signature-redirect table used to map generated anonymous types
//! to their public forms (spec.md §4.4).

use rustc_hash::FxHashMap;
use tenet_types::BoundType;

#[derive(Debug, Default)]
pub struct BoundTypeCache {
    by_signature: FxHashMap<String, BoundType>,
    /// `src signature → dst signature`, consulted by `get` when
    /// `use_mappings` is set.
    mappings: FxHashMap<String, String>,
}

impl BoundTypeCache {
    #[must_use]
    pub fn new() -> Self {
        BoundTypeCache::default()
    }

    /// Inserts a freshly materialized `BoundType`.
    ///
    /// # Panics
    /// Panics if a type with free variables is inserted — spec.md §4.5's
    /// invariant that an un-grounded type is never upserted is an internal
    /// bug, not a user error, if it's ever violated this deep in the
    /// pipeline.
    pub fn put(&mut self, signature: String, bound_type: BoundType, pool: &tenet_types::Pool) {
        assert!(
            tenet_types::is_ground(pool, bound_type.term),
            "tenet internal error: inserted non-ground type '{signature}' into bound-type cache"
        );
        self.by_signature.insert(signature, bound_type);
    }

    #[must_use]
    pub fn get(&self, signature: &str, use_mappings: bool) -> Option<&BoundType> {
        if use_mappings {
            if let Some(mapped) = self.mappings.get(signature) {
                return self.by_signature.get(mapped);
            }
        }
        self.by_signature.get(signature)
    }

    pub fn put_mapping(&mut self, src: String, dst: String) {
        self.mappings.insert(src, dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenet_types::bound::{IrLayoutHandle, IrTypeHandle};
    use tenet_types::Pool;

    fn dummy_bound_type(pool: &mut Pool) -> BoundType {
        let loc = tenet_ir::Located::new(tenet_ir::SourceFile::new("t.tn"), tenet_ir::Span::new(1, 1));
        let term = pool.intern_id(tenet_ir::intern("int32"), loc.clone());
        BoundType {
            term,
            ir_type: IrTypeHandle(0),
            ir_layout: IrLayoutHandle(0),
            loc,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut pool = Pool::new();
        let mut cache = BoundTypeCache::new();
        let bt = dummy_bound_type(&mut pool);
        cache.put("int32".into(), bt, &pool);
        assert!(cache.get("int32", false).is_some());
    }

    #[test]
    fn mapping_redirects_lookup() {
        let mut pool = Pool::new();
        let mut cache = BoundTypeCache::new();
        let bt = dummy_bound_type(&mut pool);
        cache.put("int32".into(), bt, &pool);
        cache.put_mapping("anon#1".into(), "int32".into());
        assert!(cache.get("anon#1", true).is_some());
        assert!(cache.get("anon#1", false).is_none());
    }
}
