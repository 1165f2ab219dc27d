// src/aggregate/movers.rs
use std::collections::HashMap;

use super::Mover;
use crate::model::NameCountRow;
use crate::normalize::slugify;

struct Tally {
    name: String,
    previous: u64,
    current: u64,
}

/// Entities whose count changed between two period snapshots, biggest gain first.
///
/// Rows are keyed by entity key, previous period first and current overlaid, so
/// entities present in only one period appear with the other side at 0.
/// Unchanged entities are dropped. Order: delta desc, current desc, name asc.
pub fn biggest_movers(current: &[NameCountRow], previous: &[NameCountRow], n: usize) -> Vec<Mover> {
    let mut tallies: HashMap<String, Tally> = HashMap::new();

    for row in previous {
        let slug = slugify(&row.name);
        if slug.is_empty() {
            continue;
        }
        tallies
            .entry(slug)
            .or_insert_with(|| Tally {
                name: row.name.trim().to_string(),
                previous: 0,
                current: 0,
            })
            .previous += row.count;
    }

    for row in current {
        let slug = slugify(&row.name);
        if slug.is_empty() {
            continue;
        }
        let tally = tallies.entry(slug).or_insert_with(|| Tally {
            name: String::new(),
            previous: 0,
            current: 0,
        });
        if tally.current == 0 {
            // the latest period's spelling wins
            tally.name = row.name.trim().to_string();
        }
        tally.current += row.count;
    }

    let mut out: Vec<Mover> = tallies
        .into_iter()
        .filter_map(|(slug, t)| {
            let delta = t.current as i64 - t.previous as i64;
            (delta != 0).then_some(Mover {
                name: t.name,
                previous: t.previous,
                current: t.current,
                delta,
                slug,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.delta
            .cmp(&a.delta)
            .then_with(|| b.current.cmp(&a.current))
            .then_with(|| a.name.cmp(&b.name))
    });
    out.truncate(n);
    out
}
