//! Episodic memory for iterative patterns.
//!
//! Two tiers:
//!
//! - **Episodes**: the last `capacity` producer attempts with their critiques,
//!   kept in a ring buffer. When full, the oldest episode is evicted.
//! - **Notes**: distilled long-term lessons. Unbounded, de-duplicated and kept
//!   in insertion order.
//!
//! Memory lives for one run; nothing is persisted.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One producer attempt paired with the critique it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub round: usize,
    pub attempt: String,
    /// Condensed critique (the feedback text given to the producer)
    pub critique: String,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicMemory {
    capacity: usize,
    episodes: VecDeque<Episode>,
    notes: Vec<String>,
}

impl EpisodicMemory {
    /// A memory holding at most `capacity` episodes (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            episodes: VecDeque::with_capacity(capacity),
            notes: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record an episode, returning the evicted one if the buffer was full.
    pub fn record(&mut self, episode: Episode) -> Option<Episode> {
        let evicted = if self.episodes.len() == self.capacity {
            self.episodes.pop_front()
        } else {
            None
        };
        self.episodes.push_back(episode);
        evicted
    }

    /// Episodes from oldest to newest.
    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.iter()
    }

    pub fn latest(&self) -> Option<&Episode> {
        self.episodes.back()
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Add a long-term note. Returns `false` if an equal note already exists.
    pub fn add_note(&mut self, note: &str) -> bool {
        let note = note.trim();
        if note.is_empty() || self.notes.iter().any(|n| n.eq_ignore_ascii_case(note)) {
            return false;
        }
        self.notes.push(note.to_string());
        true
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Render both tiers as a prompt section. Empty when nothing is stored.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.episodes.is_empty() {
            out.push_str("Recent rounds:\n");
            for ep in &self.episodes {
                let headline = ep.critique.lines().next().unwrap_or_default();
                out.push_str(&format!("- Draft {} scored {}/100. {}\n", ep.round, ep.score, headline));
            }
        }
        if !self.notes.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("Lessons so far:\n");
            for note in &self.notes {
                out.push_str(&format!("- {note}\n"));
            }
        }
        out
    }
}

impl Default for EpisodicMemory {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(round: usize, score: u8) -> Episode {
        Episode {
            round,
            attempt: format!("draft {round}"),
            critique: format!("Overall: attempt {round}"),
            score,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut memory = EpisodicMemory::new(2);
        assert!(memory.record(episode(1, 50)).is_none());
        assert!(memory.record(episode(2, 60)).is_none());

        let evicted = memory.record(episode(3, 70)).unwrap();
        assert_eq!(evicted.round, 1);

        let rounds: Vec<usize> = memory.episodes().map(|e| e.round).collect();
        assert_eq!(rounds, vec![2, 3]);
        assert_eq!(memory.latest().unwrap().score, 70);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut memory = EpisodicMemory::new(3);
        for round in 1..=10 {
            memory.record(episode(round, round as u8 * 5));
            assert!(memory.len() <= 3);
        }
        let rounds: Vec<usize> = memory.episodes().map(|e| e.round).collect();
        assert_eq!(rounds, vec![8, 9, 10]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut memory = EpisodicMemory::new(0);
        assert_eq!(memory.capacity(), 1);
        memory.record(episode(1, 10));
        memory.record(episode(2, 20));
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.latest().unwrap().round, 2);
    }

    #[test]
    fn notes_are_deduplicated_in_order() {
        let mut memory = EpisodicMemory::default();
        assert!(memory.add_note("Add a call-to-action"));
        assert!(memory.add_note("Shorten the intro"));
        assert!(!memory.add_note("  add a call-to-action "));
        assert!(!memory.add_note(""));
        assert_eq!(memory.notes(), ["Add a call-to-action", "Shorten the intro"]);
    }

    #[test]
    fn notes_survive_eviction() {
        let mut memory = EpisodicMemory::new(1);
        memory.add_note("Cite a statistic");
        memory.record(episode(1, 40));
        memory.record(episode(2, 50));
        assert_eq!(memory.notes().len(), 1);
    }

    #[test]
    fn render_lists_rounds_and_lessons() {
        let mut memory = EpisodicMemory::new(2);
        assert!(memory.render().is_empty());

        memory.record(episode(1, 55));
        memory.add_note("Use concrete examples");
        let text = memory.render();
        assert!(text.contains("Draft 1 scored 55/100. Overall: attempt 1"));
        assert!(text.contains("Lessons so far:\n- Use concrete examples"));
    }
}
