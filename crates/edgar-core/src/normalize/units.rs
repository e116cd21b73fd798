//! Per-unit fact reduction.

use crate::query::QueryOptions;
use serde_json::{Map, Value};
use tracing::debug;

fn end_date(fact: &Value) -> Option<&str> {
    fact.get("end").and_then(Value::as_str)
}

/// Apply the date window and latest-only reduction to one unit's facts.
///
/// Latest-only keeps the single fact with the greatest `end`; on ties the
/// first one seen wins.
pub fn filter_facts(facts: &[Value], options: &QueryOptions) -> Vec<Value> {
    let narrowing = !options.date_range.is_unbounded() || options.latest_only;

    let in_window = facts.iter().filter(|fact| match end_date(fact) {
        Some(end) => options.date_range.contains(end),
        None => !narrowing,
    });

    if !options.latest_only {
        return in_window.cloned().collect();
    }

    let mut latest: Option<(&str, &Value)> = None;
    for fact in in_window {
        let Some(end) = end_date(fact) else { continue };
        match latest {
            Some((best, _)) if end <= best => {}
            _ => latest = Some((end, fact)),
        }
    }
    latest.map(|(_, fact)| vec![fact.clone()]).unwrap_or_default()
}

/// Filter a concept's `units` map, dropping units that end up empty.
///
/// A missing map, or a unit whose value is not an array, is treated as "no
/// data" for that slice.
pub fn flatten_units(units: Option<&Value>, options: &QueryOptions) -> Map<String, Value> {
    let Some(Value::Object(units)) = units else {
        return Map::new();
    };

    units
        .iter()
        .filter(|(unit, _)| options.allows_unit(unit))
        .filter_map(|(unit, facts)| match facts {
            Value::Array(facts) => {
                let kept = filter_facts(facts, options);
                (!kept.is_empty()).then(|| (unit.clone(), Value::Array(kept)))
            }
            _ => {
                debug!(unit = %unit, "Skipping unit with non-array facts");
                None
            }
        })
        .collect()
}
