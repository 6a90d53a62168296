//! # Top-3 Pace Ranking
//!
//! Marks the three fastest items of a result list without re-querying.
//!
//! Items are scanned in query order against three running slots. An item
//! with undefined pace never competes; a strictly lower pace displaces a slot
//! and pushes the slots below it down by one. Equal paces keep the item seen
//! first.
//!
//! Distance buckets add "stretch" candidates: exercises longer than the band
//! that still make the bucket's podium.

use crate::config::DistanceBand;
use crate::items::{Exerlite, Ranked};

/// Running slots for the fastest items, best first.
#[derive(Debug, Clone, Default)]
struct Podium {
    slots: [Option<(usize, f64)>; 3],
}

impl Podium {
    /// Offer an item; a strictly faster pace displaces a slot and cascades.
    fn offer(&mut self, index: usize, pace: f64) {
        for slot in 0..self.slots.len() {
            let takes = match self.slots[slot] {
                None => true,
                Some((_, held)) => pace < held,
            };
            if takes {
                for below in (slot + 1..self.slots.len()).rev() {
                    self.slots[below] = self.slots[below - 1];
                }
                self.slots[slot] = Some((index, pace));
                return;
            }
        }
    }
}

/// Indices of the three fastest items, best first.
pub fn top_three<T>(items: &[T], pace: impl Fn(&T) -> Option<f64>) -> [Option<usize>; 3] {
    let mut podium = Podium::default();
    for (index, item) in items.iter().enumerate() {
        if let Some(p) = pace(item) {
            podium.offer(index, p);
        }
    }
    podium.slots.map(|slot| slot.map(|(index, _)| index))
}

/// Wrap items in query order, ranking the three fastest 1, 2 and 3.
pub fn rank_by_pace<T>(items: Vec<T>, pace: impl Fn(&T) -> Option<f64>) -> Vec<Ranked<T>> {
    let podium = top_three(&items, &pace);
    let mut ranked: Vec<Ranked<T>> = items.into_iter().map(Ranked::unranked).collect();
    for (rank, index) in (1u8..).zip(podium) {
        if let Some(index) = index {
            ranked[index].rank = Some(rank);
        }
    }
    ranked
}

/// Select and rank a distance bucket listing.
///
/// `items` are the exercises with effective distance at or above the band
/// minimum, in the caller's sort order. Every in-band exercise is kept. A
/// longer exercise is kept when it is among the three fastest of all items
/// and, if the band holds paced exercises, strictly faster than the slowest
/// of the band's own top three.
///
/// Ranks are then assigned over the kept items.
pub fn select_bucket(items: Vec<Exerlite>, band: DistanceBand) -> Vec<Ranked<Exerlite>> {
    let items: Vec<Exerlite> = items
        .into_iter()
        .filter(|e| e.distance >= band.min)
        .collect();

    let overall = top_three(&items, Exerlite::pace);
    let in_band = top_three(&items, |e| {
        if band.contains(e.distance) {
            e.pace()
        } else {
            None
        }
    });
    let band_cutoff = in_band
        .iter()
        .flatten()
        .filter_map(|&index| items[index].pace())
        .reduce(f64::max);

    let stretch: Vec<usize> = overall
        .iter()
        .flatten()
        .copied()
        .filter(|&index| items[index].distance > band.max)
        .filter(|&index| match (items[index].pace(), band_cutoff) {
            (Some(pace), Some(cutoff)) => pace < cutoff,
            (Some(_), None) => true,
            (None, _) => false,
        })
        .collect();

    let kept: Vec<Exerlite> = items
        .into_iter()
        .enumerate()
        .filter(|(index, item)| band.contains(item.distance) || stretch.contains(index))
        .map(|(_, item)| item)
        .collect();

    log::debug!(
        "[Ranking] Bucket {} kept {} exercises ({} stretch)",
        band.target,
        kept.len(),
        stretch.len()
    );
    rank_by_pace(kept, Exerlite::pace)
}
