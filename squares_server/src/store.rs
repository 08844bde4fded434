//! Entity store: square hash to current record.

use std::collections::HashMap;

use squares_shared::square::{Square, SquareHash};

/// Process-wide square table. Owned by the relay task; never shared directly.
#[derive(Debug, Default)]
pub struct SquareStore {
    squares: HashMap<SquareHash, Square>,
}

impl SquareStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record under its own hash.
    pub fn upsert(&mut self, square: Square) -> Option<Square> {
        self.squares.insert(square.hash.clone(), square)
    }

    pub fn get(&self, hash: &SquareHash) -> Option<&Square> {
        self.squares.get(hash)
    }

    pub fn remove(&mut self, hash: &SquareHash) -> Option<Square> {
        self.squares.remove(hash)
    }

    pub fn contains(&self, hash: &SquareHash) -> bool {
        self.squares.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    /// Copy of every record, ordered by hash.
    pub fn snapshot(&self) -> Vec<Square> {
        let mut out: Vec<Square> = self.squares.values().cloned().collect();
        out.sort_by(|a, b| a.hash.cmp(&b.hash));
        out
    }
}

#[cfg(test)]
mod tests {
    use squares_shared::square::now_ms;

    use super::*;

    fn square(hash: &str, dest_y: f64) -> Square {
        let mut sq = Square::new(SquareHash(hash.into()), 100.0, "#000000".into(), now_ms());
        sq.dest_y = dest_y;
        sq
    }

    #[test]
    fn upsert_replaces_whole_record() {
        let mut store = SquareStore::new();
        assert!(store.upsert(square("a", 0.0)).is_none());
        let old = store.upsert(square("a", 50.0));
        assert_eq!(old.map(|s| s.dest_y), Some(0.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&SquareHash("a".into())).map(|s| s.dest_y), Some(50.0));
    }

    #[test]
    fn remove_happens_once() {
        let mut store = SquareStore::new();
        store.upsert(square("a", 0.0));
        let hash = SquareHash("a".into());
        assert!(store.remove(&hash).is_some());
        assert!(store.remove(&hash).is_none());
        assert!(!store.contains(&hash));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_is_sorted() {
        let mut store = SquareStore::new();
        for h in ["c", "a", "b"] {
            store.upsert(square(h, 0.0));
        }
        let hashes: Vec<String> = store.snapshot().into_iter().map(|s| s.hash.0).collect();
        assert_eq!(hashes, ["a", "b", "c"]);
    }
}
