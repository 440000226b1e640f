use std::collections::{HashMap, VecDeque};

use crate::movegen::Move;
use crate::zobrist::Fingerprint;

pub const DEFAULT_TABLE_CAPACITY: usize = 1_000_000;

// Upper bound on the up-front allocation; the map grows past it as needed.
const PREALLOCATE_LIMIT: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Exact,
    LowerBound,
    UpperBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranspositionEntry {
    pub depth: u32,
    pub score: i32,
    pub node_type: NodeType,
    pub best_move: Option<Move>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Cutoff(i32),
    Window {
        alpha: i32,
        beta: i32,
        best_move: Option<Move>,
    },
}

pub struct TranspositionTable {
    table: HashMap<Fingerprint, TranspositionEntry>,
    insertion_order: VecDeque<Fingerprint>,
    size: usize,
    hits: u64,
    misses: u64,
}

impl TranspositionTable {
    pub fn new(size: usize) -> Self {
        Self {
            table: HashMap::with_capacity(size.min(PREALLOCATE_LIMIT)),
            insertion_order: VecDeque::with_capacity(size.min(PREALLOCATE_LIMIT)),
            size,
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    pub fn clear(&mut self) {
        self.table.clear();
        self.insertion_order.clear();
    }

    pub fn store(&mut self, key: Fingerprint, entry: TranspositionEntry) {
        if self.size == 0 {
            return;
        }

        if let Some(existing) = self.table.get_mut(&key) {
            if entry.depth >= existing.depth {
                *existing = entry;
            }
            return;
        }

        while self.table.len() >= self.size {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.table.remove(&oldest);
                }
                None => break,
            }
        }
        self.table.insert(key, entry);
        self.insertion_order.push_back(key);
    }

    pub fn lookup(&self, key: &Fingerprint) -> Option<&TranspositionEntry> {
        self.table.get(key)
    }

    pub fn best_move(&self, key: &Fingerprint) -> Option<Move> {
        self.table.get(key).and_then(|entry| entry.best_move)
    }

    pub fn probe(&mut self, key: &Fingerprint, depth: u32, alpha: i32, beta: i32) -> Probe {
        let Some(entry) = self.table.get(key) else {
            self.misses += 1;
            return Probe::Window {
                alpha,
                beta,
                best_move: None,
            };
        };
        self.hits += 1;

        let (mut alpha, mut beta) = (alpha, beta);
        if entry.depth >= depth {
            match entry.node_type {
                NodeType::Exact => return Probe::Cutoff(entry.score),
                NodeType::LowerBound => alpha = alpha.max(entry.score),
                NodeType::UpperBound => beta = beta.min(entry.score),
            }
            if alpha >= beta {
                return Probe::Cutoff(entry.score);
            }
        }

        Probe::Window {
            alpha,
            beta,
            best_move: entry.best_move,
        }
    }

    // Keeps entries at least min_depth deep, lowered by decay
    pub fn age(&mut self, min_depth: u32, decay: u32) {
        self.table.retain(|_, entry| entry.depth >= min_depth);
        for entry in self.table.values_mut() {
            entry.depth = entry.depth.saturating_sub(decay);
        }
        let table = &self.table;
        self.insertion_order.retain(|key| table.contains_key(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Color};
    use crate::state::GameState;

    fn entry(depth: u32, score: i32, node_type: NodeType) -> TranspositionEntry {
        TranspositionEntry {
            depth,
            score,
            node_type,
            best_move: Move::place(2, 3),
        }
    }

    fn key(n: u64) -> Fingerprint {
        let board = Board::from_masks(n, 0).unwrap();
        Fingerprint::new(n, &board, Color::Black)
    }

    #[test]
    fn test_store_then_lookup() {
        let mut table = TranspositionTable::new(16);
        let fp = GameState::new().fingerprint();
        table.store(fp, entry(4, 12, NodeType::LowerBound));

        let found = table.lookup(&fp).unwrap();
        assert!(found.depth >= 4);
        assert_eq!(found.node_type, NodeType::LowerBound);
        assert_eq!(table.best_move(&fp), Move::place(2, 3));
    }

    #[test]
    fn test_shallower_entry_does_not_replace() {
        let mut table = TranspositionTable::new(16);
        table.store(key(1), entry(6, 10, NodeType::Exact));
        table.store(key(1), entry(3, -5, NodeType::UpperBound));
        assert_eq!(table.lookup(&key(1)).unwrap().depth, 6);

        table.store(key(1), entry(6, 7, NodeType::LowerBound));
        assert_eq!(table.lookup(&key(1)).unwrap().score, 7);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut table = TranspositionTable::new(2);
        table.store(key(1), entry(1, 0, NodeType::Exact));
        table.store(key(2), entry(1, 0, NodeType::Exact));
        table.store(key(3), entry(1, 0, NodeType::Exact));
        assert_eq!(table.len(), 2);
        assert!(table.lookup(&key(1)).is_none());
        assert!(table.lookup(&key(2)).is_some());
        assert!(table.lookup(&key(3)).is_some());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut table = TranspositionTable::new(0);
        table.store(key(1), entry(1, 0, NodeType::Exact));
        assert!(table.is_empty());
    }

    #[test]
    fn test_probe_bounds() {
        let mut table = TranspositionTable::new(16);
        table.store(key(1), entry(5, 30, NodeType::LowerBound));
        table.store(key(2), entry(5, -30, NodeType::UpperBound));
        table.store(key(3), entry(5, 7, NodeType::Exact));

        assert_eq!(table.probe(&key(1), 5, 0, 20), Probe::Cutoff(30));
        assert_eq!(
            table.probe(&key(1), 5, 0, 50),
            Probe::Window {
                alpha: 30,
                beta: 50,
                best_move: Move::place(2, 3)
            }
        );
        assert_eq!(table.probe(&key(2), 4, -10, 10), Probe::Cutoff(-30));
        assert_eq!(table.probe(&key(3), 1, -100, 100), Probe::Cutoff(7));

        // Too shallow: only the move hint is used
        assert_eq!(
            table.probe(&key(3), 6, -100, 100),
            Probe::Window {
                alpha: -100,
                beta: 100,
                best_move: Move::place(2, 3)
            }
        );
        assert_eq!(table.hits(), 5);

        table.probe(&key(9), 1, 0, 1);
        assert_eq!(table.misses(), 1);
    }

    #[test]
    fn test_age_keeps_deep_entries() {
        let mut table = TranspositionTable::new(2);
        table.store(key(1), entry(2, 0, NodeType::Exact));
        table.store(key(2), entry(8, 0, NodeType::Exact));
        table.age(3, 2);
        assert!(table.lookup(&key(1)).is_none());
        assert_eq!(table.lookup(&key(2)).unwrap().depth, 6);

        // Freed slot is reused before the survivor is evicted
        table.store(key(3), entry(1, 0, NodeType::Exact));
        assert_eq!(table.len(), 2);
        table.store(key(4), entry(1, 0, NodeType::Exact));
        assert!(table.lookup(&key(2)).is_none());
    }

    #[test]
    fn test_clear() {
        let mut table = TranspositionTable::new(4);
        table.store(key(1), entry(1, 0, NodeType::Exact));
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 4);
    }
}
