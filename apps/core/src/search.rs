use crate::model::{fold_case, Entry};

const TIERS: [fn(&Entry, &str) -> bool; 5] = [
    name_prefix,
    name_segment_prefix,
    name_contains,
    command_prefix,
    description_contains,
];

/// Ranks the visible entries of `catalog` against `query`.
///
/// Tiers run in priority order and each one only appends entries that an
/// earlier tier has not taken. Inside a tier the catalog order is kept, so the
/// frequency bias applied to the catalog carries through to the result.
pub fn rank(catalog: &[Entry], query: &str) -> Vec<Entry> {
    collect_ranked(catalog, query, usize::MAX)
}

/// Same order as `rank`, but stops once `limit` entries are taken.
pub fn rank_limited(catalog: &[Entry], query: &str, limit: usize) -> Vec<Entry> {
    collect_ranked(catalog, query, limit)
}

fn collect_ranked(catalog: &[Entry], query: &str, limit: usize) -> Vec<Entry> {
    let folded_query = fold_case(query);
    let mut taken = vec![false; catalog.len()];
    let mut ranked = Vec::with_capacity(limit.min(catalog.len()));

    for tier in TIERS {
        for (index, entry) in catalog.iter().enumerate() {
            if ranked.len() == limit {
                return ranked;
            }
            if taken[index] || !entry.visible {
                continue;
            }
            if tier(entry, &folded_query) {
                taken[index] = true;
                ranked.push(entry.clone());
            }
        }
    }

    ranked
}

/// Returns the 1-based tier that claims `entry` for `query`, if any.
pub fn matching_tier(entry: &Entry, query: &str) -> Option<usize> {
    let folded_query = fold_case(query);
    TIERS
        .iter()
        .position(|tier| tier(entry, &folded_query))
        .map(|index| index + 1)
}

fn name_prefix(entry: &Entry, query: &str) -> bool {
    entry.folded_name().starts_with(query)
}

fn name_segment_prefix(entry: &Entry, query: &str) -> bool {
    // split_whitespace never yields empty segments, so runs of spaces
    // cannot turn an empty segment into a match-everything prefix.
    entry
        .folded_name()
        .split_whitespace()
        .any(|segment| segment.starts_with(query))
}

fn name_contains(entry: &Entry, query: &str) -> bool {
    entry.folded_name().contains(query)
}

fn command_prefix(entry: &Entry, query: &str) -> bool {
    entry
        .folded_command()
        .is_some_and(|command| command.starts_with(query))
}

fn description_contains(entry: &Entry, query: &str) -> bool {
    entry
        .folded_description()
        .is_some_and(|description| description.contains(query))
}
