use crate::model::NormalizedFare;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Keeps the cheapest fare per airline, ordered by airline code.
/// Only a strictly lower price replaces the current pick, so ties keep
/// the first fare seen.
pub fn lowest_per_carrier<I>(fares: I) -> Vec<NormalizedFare>
where
    I: IntoIterator<Item = NormalizedFare>,
{
    let mut best: BTreeMap<String, NormalizedFare> = BTreeMap::new();

    for fare in fares {
        match best.entry(fare.airline.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(fare);
            }
            Entry::Occupied(mut slot) => {
                if fare.price < slot.get().price {
                    slot.insert(fare);
                }
            }
        }
    }

    best.into_values().collect()
}
