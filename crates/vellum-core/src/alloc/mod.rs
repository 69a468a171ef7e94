//! Allocation and collection types.
//!
//! - Re-exports of hash collections using AHash
//! - [`SlotMap`], a generational arena for small sets of owned objects

pub mod slot_map;

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
pub use slot_map::{SlotId, SlotMap};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_ahash() {
        let mut map = HashMap::new();
        map.insert("u_mvp", 3);
        assert_eq!(map.get("u_mvp"), Some(&3));
    }

    #[test]
    fn test_hashset_ahash() {
        let mut set = HashSet::new();
        set.insert(42u32);
        assert!(set.contains(&42));
    }
}
