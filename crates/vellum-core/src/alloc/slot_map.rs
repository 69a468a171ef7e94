use std::num::NonZeroU64;

/// Generational key into a [`SlotMap`].
///
/// A key whose slot has been freed and reused no longer resolves, so stale keys
/// read as "missing" instead of aliasing the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(NonZeroU64);

impl SlotId {
    pub fn new(generation: u32, idx: u32) -> Self {
        let raw = ((generation as u64) << 32) | (idx as u64 + 1);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn generation(&self) -> u32 {
        (self.0.get() >> 32) as u32
    }

    pub fn index(&self) -> u32 {
        (self.0.get() & u32::MAX as u64) as u32 - 1
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub struct SlotMap<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotMap<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> SlotId {
        self.len += 1;
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.value = Some(value);
            SlotId::new(slot.generation, idx)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            SlotId::new(0, idx)
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let index = id.index();
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.value
                .as_ref()
                .map(|value| (SlotId::new(slot.generation, idx as u32), value))
        })
    }
}

static_assertions::assert_eq_size!(SlotId, Option<SlotId>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_map_insert() {
        let mut map = SlotMap::<u8>::new();
        let id = map.insert(15);
        assert_eq!(id.generation(), 0);
        assert_eq!(id.index(), 0);
        assert_eq!(map.get(id), Some(&15));
    }

    #[test]
    fn test_stale_id_misses() {
        let mut map = SlotMap::<u8>::new();
        let id = map.insert(15);
        assert_eq!(map.remove(id), Some(15));
        let reused = map.insert(45);
        assert_eq!(id.index(), reused.index());
        assert_ne!(id.generation(), reused.generation());
        assert_eq!(map.get(id), None);
        assert_eq!(map.remove(id), None);
        assert_eq!(map.get(reused), Some(&45));
    }

    #[test]
    fn test_slot_map_iter_skips_free_slots() {
        let mut map = SlotMap::<u8>::new();
        let ids: Vec<_> = (0..10).map(|i| map.insert(i)).collect();
        map.remove(ids[0]);
        map.remove(ids[3]);
        let values: Vec<u8> = map.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 2, 4, 5, 6, 7, 8, 9]);
        assert_eq!(map.len(), 8);
    }
}
