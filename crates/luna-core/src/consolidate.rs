//! Consolidation planning: find near-duplicate records and compute the
//! merged state each record should end up in.
//!
//! Two records whose contents have Jaccard similarity above the threshold
//! are merged: each gets the other's id and associations, and both take the
//! higher importance. Applying that rule pairwise until nothing changes is
//! the same as merging every connected component of the similarity graph at
//! once, which is what the plan does. One application is therefore a fixed
//! point, and planning again over the merged records yields no updates.
//!
//! Planning is pure. Persisting the updates is the caller's concern.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::memory::{MemoryId, MemoryRecord};
use crate::similarity::jaccard;
use crate::tokenizer::token_set;

/// How candidate pairs are enumerated. Both produce identical plans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConsolidationStrategy {
    /// Every unordered pair of distinct records. O(n²) comparisons.
    #[default]
    AllPairs,
    /// Only pairs sharing at least one token, found through an inverted
    /// index. Pairs with no shared token have similarity 0 and can never
    /// merge, so skipping them changes nothing.
    SharedToken,
}

/// A pair of records above the merge threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarPair {
    pub a: MemoryId,
    pub b: MemoryId,
    pub similarity: f64,
}

/// The merged state of one record. Only records that change get one.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordUpdate {
    pub id: MemoryId,
    pub importance: f64,
    pub associations: BTreeSet<MemoryId>,
}

impl RecordUpdate {
    /// Apply onto `record`, keeping importance raise-only and associations
    /// grow-only.
    pub fn apply_to(&self, record: &mut MemoryRecord) {
        record.raise_importance(self.importance);
        for id in &self.associations {
            record.associate(*id);
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConsolidationPlan {
    /// Pairs whose similarity was computed.
    pub pairs_examined: usize,
    pub similar_pairs: Vec<SimilarPair>,
    pub updates: Vec<RecordUpdate>,
}

impl ConsolidationPlan {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Plan a consolidation pass over `records`, in the given order.
pub fn plan_consolidation(
    records: &[MemoryRecord],
    threshold: f64,
    strategy: ConsolidationStrategy,
) -> ConsolidationPlan {
    let token_sets: Vec<HashSet<String>> = records.iter().map(|r| token_set(&r.content)).collect();

    let candidates = match strategy {
        ConsolidationStrategy::AllPairs => all_pairs(records.len()),
        ConsolidationStrategy::SharedToken => shared_token_pairs(&token_sets),
    };

    let mut components = DisjointSet::new(records.len());
    let mut similar_pairs = Vec::new();
    for &(i, j) in &candidates {
        let similarity = jaccard(&token_sets[i], &token_sets[j]);
        if similarity > threshold {
            components.union(i, j);
            similar_pairs.push(SimilarPair {
                a: records[i].id,
                b: records[j].id,
                similarity,
            });
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..records.len() {
        groups.entry(components.find(i)).or_default().push(i);
    }

    let mut updates = Vec::new();
    for members in groups.values().filter(|m| m.len() > 1) {
        let importance = members
            .iter()
            .map(|&i| records[i].importance)
            .fold(0.0, f64::max);
        let mut linked: BTreeSet<MemoryId> = BTreeSet::new();
        for &i in members {
            linked.insert(records[i].id);
            linked.extend(records[i].associations.iter().copied());
        }

        for &i in members {
            let record = &records[i];
            let mut associations = linked.clone();
            associations.remove(&record.id);
            let changed = importance > record.importance || !associations.is_subset(&record.associations);
            if changed {
                updates.push(RecordUpdate {
                    id: record.id,
                    importance: importance.max(record.importance),
                    associations: associations.union(&record.associations).copied().collect(),
                });
            }
        }
    }
    updates.sort_by_key(|u| u.id);

    ConsolidationPlan {
        pairs_examined: candidates.len(),
        similar_pairs,
        updates,
    }
}

fn all_pairs(n: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(n.saturating_sub(1) * n / 2);
    for i in 0..n {
        for j in i + 1..n {
            pairs.push((i, j));
        }
    }
    pairs
}

fn shared_token_pairs(token_sets: &[HashSet<String>]) -> Vec<(usize, usize)> {
    let mut postings: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, tokens) in token_sets.iter().enumerate() {
        for token in tokens {
            postings.entry(token.as_str()).or_default().push(i);
        }
    }

    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for list in postings.values() {
        for (k, &i) in list.iter().enumerate() {
            for &j in &list[k + 1..] {
                pairs.insert((i.min(j), i.max(j)));
            }
        }
    }
    pairs.into_iter().collect()
}

/// Union-find over record indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = (ra.min(rb), ra.max(rb));
            self.parent[hi] = lo;
        }
    }
}
