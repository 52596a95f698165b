use super::SortOrder;
use crate::models::{MetricResult, MetricValue};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Order the target metric and align every other sortable metric to it
///
/// The target's values are sorted by sample value; each identifier gets the
/// ordinal of its position. Identifiers that only appear in other metrics
/// follow in lexical order. Every other sortable metric is then rewritten
/// into a fixed array indexed by ordinal, with default values for
/// identifiers it has no series for.
pub fn sort(result: &mut MetricResult, target: &str, order: SortOrder, identifier: &str) {
    if target.is_empty() || identifier.is_empty() || result.results.is_empty() {
        return;
    }

    let mut ordinals: HashMap<String, usize> = HashMap::new();

    if let Some(metric) = result
        .results
        .iter_mut()
        .find(|m| m.metric_name == target && m.is_sortable())
    {
        metric
            .data
            .result
            .sort_by(|a, b| compare(a, b, order, identifier));
        for value in &metric.data.result {
            if let Some(id) = value.label(identifier) {
                let next = ordinals.len();
                ordinals.entry(id.to_string()).or_insert(next);
            }
        }
    }

    let leftovers: BTreeSet<String> = result
        .results
        .iter()
        .filter(|m| m.metric_name != target && m.is_sortable())
        .flat_map(|m| m.data.result.iter())
        .filter_map(|v| v.label(identifier))
        .filter(|id| !ordinals.contains_key(*id))
        .map(str::to_string)
        .collect();
    for id in leftovers {
        let next = ordinals.len();
        ordinals.insert(id, next);
    }

    let size = ordinals.len();
    for metric in result
        .results
        .iter_mut()
        .filter(|m| m.metric_name != target && m.is_sortable())
    {
        let mut slots = vec![MetricValue::default(); size];
        for value in std::mem::take(&mut metric.data.result) {
            let slot = value.label(identifier).and_then(|id| ordinals.get(id)).copied();
            if let Some(slot) = slot {
                slots[slot] = value;
            }
        }
        metric.data.result = slots;
    }

    result.current_page = 1;
    result.total_pages = 1;
    result.total_items = size;
}

fn compare(a: &MetricValue, b: &MetricValue, order: SortOrder, identifier: &str) -> Ordering {
    let by_identifier = || {
        a.label(identifier)
            .unwrap_or_default()
            .cmp(b.label(identifier).unwrap_or_default())
    };

    match (a.sample, b.sample) {
        (None, None) => by_identifier(),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match (x.value.is_nan(), y.value.is_nan()) {
            (true, true) => by_identifier(),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if x.value == y.value => by_identifier(),
            (false, false) => {
                let ord = x.value.partial_cmp(&y.value).unwrap_or(Ordering::Equal);
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
        },
    }
}
