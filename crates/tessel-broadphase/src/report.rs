//! Pair reporting to external contact/proximity containers
//!
//! The solver side consumes the pair list through a begin / add / end
//! protocol: `begin` once with the pair count, `add` exactly once per
//! produced pair, `end` once. Containers build solver-ready contact or
//! proximity data from the stream; what they do with it is outside
//! this crate.

use crate::OverlapPair;

/// Consumer of one step's overlap pairs
pub trait PairConsumer {
    /// Called once before any pair, with the number of pairs to follow
    fn begin(&mut self, expected: usize);

    /// Called exactly once per produced pair
    fn add(&mut self, pair: &OverlapPair);

    /// Called once after the last pair
    fn end(&mut self);
}

/// Trivial consumer that collects pairs into a `Vec`.
///
/// Handy for tests and for containers that want the whole list before
/// processing.
#[derive(Debug, Default)]
pub struct CollectingConsumer {
    pairs: Vec<OverlapPair>,
    open: bool,
}

impl CollectingConsumer {
    /// Create an empty consumer
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected pairs
    pub fn pairs(&self) -> &[OverlapPair] {
        &self.pairs
    }
}

impl PairConsumer for CollectingConsumer {
    fn begin(&mut self, expected: usize) {
        self.pairs.clear();
        self.pairs.reserve(expected);
        self.open = true;
    }

    fn add(&mut self, pair: &OverlapPair) {
        debug_assert!(self.open, "add outside begin/end");
        self.pairs.push(*pair);
    }

    fn end(&mut self) {
        self.open = false;
    }
}
