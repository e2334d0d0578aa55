//! Phrase selection for reply intros.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::IndexedRandom;

/// Picks one phrase out of a fixed set.
pub trait PhraseSource: Send + Sync {
    /// `None` only when `options` is empty.
    fn pick<'a>(&self, options: &[&'a str]) -> Option<&'a str>;
}

/// Uniform random choice from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPhrases;

impl PhraseSource for RandomPhrases {
    fn pick<'a>(&self, options: &[&'a str]) -> Option<&'a str> {
        options.choose(&mut rand::rng()).copied()
    }
}

/// Deterministic source: always the same index, wrapped to the set size.
#[derive(Debug, Default)]
pub struct FixedPhrases {
    index: usize,
    picks: AtomicUsize,
}

impl FixedPhrases {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            picks: AtomicUsize::new(0),
        }
    }

    /// Number of times a phrase was requested.
    pub fn picks(&self) -> usize {
        self.picks.load(Ordering::SeqCst)
    }
}

impl PhraseSource for FixedPhrases {
    fn pick<'a>(&self, options: &[&'a str]) -> Option<&'a str> {
        self.picks.fetch_add(1, Ordering::SeqCst);
        if options.is_empty() {
            return None;
        }
        Some(options[self.index % options.len()])
    }
}
