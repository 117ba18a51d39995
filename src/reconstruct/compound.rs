//! Per-lap tyre compound by majority vote.

use super::resample::CompoundObservations;
use crate::types::Lap;

/// Most frequent compound; ties go to the value seen first.
pub fn majority_compound(observed: &[u8]) -> Option<u8> {
    let mut counts: Vec<(u8, usize)> = Vec::new();
    for &compound in observed {
        match counts.iter_mut().find(|(value, _)| *value == compound) {
            Some((_, count)) => *count += 1,
            None => counts.push((compound, 1)),
        }
    }

    let mut best: Option<(u8, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Set each lap's compound from the observations collected during
/// resampling. Laps without observations are left unset.
pub fn attribute_compounds(laps: &mut [Lap], observations: &CompoundObservations) {
    for lap in laps.iter_mut() {
        lap.compound = observations.get(&lap.number).and_then(|observed| majority_compound(observed));
    }
}
