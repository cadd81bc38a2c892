//! Exhaustive top-K selection.
//!
//! The backend only offers an unordered forward cursor, so search keeps a
//! fixed buffer of `k` slots, starts every slot as a sentinel at `+inf`, and
//! lets each candidate replace the current worst slot when it is strictly
//! closer. Slots remember the order candidates were encountered in, so equal
//! distances resolve first-encountered-wins both when evicting and in the
//! final ordering.

use std::cmp::Ordering;

use vecblock_types::{Entry, Metric, SearchHit};

use crate::filter::Filter;

/// Parameters of a similarity search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub vector: Vec<f64>,
    pub metric: Metric,
    pub top_k: usize,
    pub filter: Filter,
}

impl SearchQuery {
    /// Cosine search for the 5 nearest entries, unfiltered.
    pub fn new(vector: Vec<f64>) -> Self {
        Self {
            vector,
            metric: Metric::default(),
            top_k: 5,
            filter: Filter::empty(),
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Debug)]
struct Slot {
    hit: SearchHit,
    /// Encounter order; sentinels sort after every real candidate
    seq: u64,
}

impl Slot {
    fn rank(&self, other: &Slot) -> Ordering {
        self.hit
            .distance
            .total_cmp(&other.hit.distance)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Fixed-size buffer of the `k` closest candidates seen so far.
#[derive(Debug)]
pub struct TopK {
    slots: Vec<Slot>,
    next_seq: u64,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        let slots = (0..k)
            .map(|_| Slot {
                hit: SearchHit::sentinel(),
                seq: u64::MAX,
            })
            .collect();
        Self { slots, next_seq: 0 }
    }

    /// Offer a candidate. Returns whether it took a slot.
    pub fn offer(&mut self, entry: Entry, distance: f64) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;

        let Some(worst) = self
            .slots
            .iter_mut()
            .max_by(|a, b| a.rank(b))
        else {
            return false;
        };
        if distance.partial_cmp(&worst.hit.distance) != Some(Ordering::Less) {
            return false;
        }

        *worst = Slot {
            hit: SearchHit {
                entry: Some(entry),
                distance,
            },
            seq,
        };
        true
    }

    /// Number of candidates offered so far
    pub fn seen(&self) -> u64 {
        self.next_seq
    }

    /// Slots ordered by ascending distance, ties by encounter order.
    ///
    /// Unfilled slots remain as sentinels at the end.
    pub fn into_sorted(mut self) -> Vec<SearchHit> {
        self.slots.sort_by(|a, b| a.rank(b));
        self.slots.into_iter().map(|slot| slot.hit).collect()
    }
}
