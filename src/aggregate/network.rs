// src/aggregate/network.rs
//! Bipartite official ↔ lobbyist views over one period's contact edges.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{DegreeEntry, SharedNeighbors};
use crate::model::EdgeRow;
use crate::normalize::slugify;

/// Edges deduplicated on entity keys, with the first spelling seen for each key.
#[derive(Debug, Default)]
struct EdgeSet {
    officials: HashMap<String, String>,
    lobbyists: HashMap<String, String>,
    edges: BTreeSet<(String, String)>,
}

impl EdgeSet {
    fn from_rows(rows: &[EdgeRow]) -> Self {
        let mut set = EdgeSet::default();
        for row in rows {
            let o = slugify(&row.official);
            let l = slugify(&row.lobbyist);
            if o.is_empty() || l.is_empty() {
                continue;
            }
            set.officials
                .entry(o.clone())
                .or_insert_with(|| row.official.trim().to_string());
            set.lobbyists
                .entry(l.clone())
                .or_insert_with(|| row.lobbyist.trim().to_string());
            set.edges.insert((o, l));
        }
        set
    }
}

fn rank_degrees(
    degrees: HashMap<&String, u64>,
    names: &HashMap<String, String>,
    n: usize,
) -> Vec<DegreeEntry> {
    let mut out: Vec<DegreeEntry> = degrees
        .into_iter()
        .map(|(slug, degree)| DegreeEntry {
            name: names.get(slug).cloned().unwrap_or_default(),
            degree,
            slug: slug.clone(),
        })
        .collect();
    out.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.name.cmp(&b.name)));
    out.truncate(n);
    out
}

/// Distinct lobbyists per official.
pub fn official_degrees(rows: &[EdgeRow], n: usize) -> Vec<DegreeEntry> {
    let set = EdgeSet::from_rows(rows);
    let mut degrees: HashMap<&String, u64> = HashMap::new();
    for (o, _) in &set.edges {
        *degrees.entry(o).or_default() += 1;
    }
    rank_degrees(degrees, &set.officials, n)
}

/// Distinct officials per lobbyist.
pub fn lobbyist_degrees(rows: &[EdgeRow], n: usize) -> Vec<DegreeEntry> {
    let set = EdgeSet::from_rows(rows);
    let mut degrees: HashMap<&String, u64> = HashMap::new();
    for (_, l) in &set.edges {
        *degrees.entry(l).or_default() += 1;
    }
    rank_degrees(degrees, &set.lobbyists, n)
}

/// Official pairs contacted by the same lobbyists, most shared first.
///
/// Self-join on the edge set grouped by lobbyist: each lobbyist contributes one
/// to every pair of officials it contacted. Within a pair `official_a` sorts
/// before `official_b`. Order: shared count desc, then names asc.
pub fn shared_lobbyists(rows: &[EdgeRow], n: usize) -> Vec<SharedNeighbors> {
    let set = EdgeSet::from_rows(rows);

    let mut by_lobbyist: BTreeMap<&String, Vec<&String>> = BTreeMap::new();
    for (o, l) in &set.edges {
        by_lobbyist.entry(l).or_default().push(o);
    }

    let name_of = |slug: &String| set.officials.get(slug).cloned().unwrap_or_default();

    let mut pairs: HashMap<(&String, &String), u64> = HashMap::new();
    for officials in by_lobbyist.values_mut() {
        officials.sort_by_key(|slug| name_of(*slug));
        for (i, a) in officials.iter().enumerate() {
            for b in &officials[i + 1..] {
                *pairs.entry((*a, *b)).or_default() += 1;
            }
        }
    }

    let mut out: Vec<SharedNeighbors> = pairs
        .into_iter()
        .map(|((a, b), shared)| SharedNeighbors {
            official_a: name_of(a),
            official_b: name_of(b),
            shared_lobbyists: shared,
            slug_a: a.clone(),
            slug_b: b.clone(),
        })
        .collect();
    out.sort_by(|x, y| {
        y.shared_lobbyists
            .cmp(&x.shared_lobbyists)
            .then_with(|| x.official_a.cmp(&y.official_a))
            .then_with(|| x.official_b.cmp(&y.official_b))
    });
    out.truncate(n);
    out
}
