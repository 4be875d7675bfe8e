//! Bounded enumeration of k-segment candidate sets.
//!
//! Segments are nodes of an endpoint-proximity graph. Only segments that can
//! take part in a valid polygon are kept (each needs enough proximate
//! neighbours), the graph is split into connected components, and
//! k-subsets are enumerated inside each component with an explicit index
//! stack. Under [`ProximityRule::AllPairs`] a partial subset is extended only
//! while it stays a clique.

use geomarker_core::LineSegment;
use log::warn;

use crate::validate::ProximityRule;

/// Counters from one enumeration run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub components: usize,
    pub evaluated: usize,
    pub truncated: bool,
}

/// Enumerates candidate index sets of size `k`.
pub struct CandidateSearch {
    k: usize,
    rule: ProximityRule,
    max_candidates: usize,
    near: Vec<Vec<bool>>,
}

impl CandidateSearch {
    /// Build the proximity graph of `segments` and prune segments that
    /// cannot be part of any `k`-candidate under `rule`.
    pub fn new(
        segments: &[LineSegment],
        k: usize,
        proximity_px: f64,
        rule: ProximityRule,
        max_candidates: usize,
    ) -> Self {
        let n = segments.len();
        let mut near = vec![vec![false; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let close = segments[i].is_near(&segments[j], proximity_px);
                near[i][j] = close;
                near[j][i] = close;
            }
        }
        Self {
            k,
            rule,
            max_candidates,
            near,
        }
    }

    fn min_degree(&self) -> usize {
        match self.rule {
            ProximityRule::AllPairs => self.k.saturating_sub(1),
            // Every side touches its two cyclic neighbours.
            ProximityRule::CyclicNeighbors => 2.min(self.k.saturating_sub(1)),
        }
    }

    /// Nodes surviving repeated removal of low-degree nodes.
    fn core_nodes(&self) -> Vec<bool> {
        let n = self.near.len();
        let need = self.min_degree();
        let mut alive = vec![true; n];
        let mut degree: Vec<usize> = self
            .near
            .iter()
            .map(|row| row.iter().filter(|&&b| b).count())
            .collect();
        let mut stack: Vec<usize> = (0..n).filter(|&i| degree[i] < need).collect();
        while let Some(i) = stack.pop() {
            if !alive[i] {
                continue;
            }
            alive[i] = false;
            for j in 0..n {
                if alive[j] && self.near[i][j] {
                    degree[j] -= 1;
                    if degree[j] < need {
                        stack.push(j);
                    }
                }
            }
        }
        alive
    }

    /// Connected components of the pruned graph with at least `k` members.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.near.len();
        let alive = self.core_nodes();
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if alive[i] && alive[j] && self.near[i][j] {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[ri] = rj;
                    }
                }
            }
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut slot: Vec<Option<usize>> = vec![None; n];
        for i in (0..n).filter(|&i| alive[i]) {
            let root = find(&mut parent, i);
            let g = match slot[root] {
                Some(g) => g,
                None => {
                    groups.push(Vec::new());
                    slot[root] = Some(groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[g].push(i);
        }
        groups.retain(|g| g.len() >= self.k);
        groups
    }

    /// Call `visit` with each candidate (indices into the input segments).
    pub fn run<F: FnMut(&[usize])>(&self, mut visit: F) -> SearchStats {
        let mut stats = SearchStats::default();
        if self.k == 0 {
            return stats;
        }
        let components = self.components();
        stats.components = components.len();

        let mut picked: Vec<usize> = Vec::with_capacity(self.k);
        for comp in &components {
            let n = comp.len();
            let mut pos: Vec<usize> = Vec::with_capacity(self.k);
            let mut next = 0usize;
            loop {
                if pos.len() == self.k {
                    if stats.evaluated >= self.max_candidates {
                        stats.truncated = true;
                        warn!(
                            "candidate search stopped after {} subsets (k={})",
                            stats.evaluated, self.k
                        );
                        return stats;
                    }
                    picked.clear();
                    picked.extend(pos.iter().map(|&p| comp[p]));
                    visit(&picked);
                    stats.evaluated += 1;
                    match pos.pop() {
                        Some(p) => next = p + 1,
                        None => break,
                    }
                    continue;
                }
                if next + (self.k - pos.len()) > n {
                    match pos.pop() {
                        Some(p) => next = p + 1,
                        None => break,
                    }
                    continue;
                }
                let cand = comp[next];
                let fits = match self.rule {
                    ProximityRule::AllPairs => pos.iter().all(|&p| self.near[comp[p]][cand]),
                    ProximityRule::CyclicNeighbors => true,
                };
                if fits {
                    pos.push(next);
                }
                next += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(search: &CandidateSearch) -> (Vec<Vec<usize>>, SearchStats) {
        let mut out = Vec::new();
        let stats = search.run(|c| out.push(c.to_vec()));
        (out, stats)
    }

    #[test]
    fn enumerates_all_subsets_of_a_clique() {
        // Four segments sharing the origin: every pair is proximate.
        let segs = [
            LineSegment::new(0, 0, 100, 0),
            LineSegment::new(0, 0, 0, 100),
            LineSegment::new(0, 0, 100, 100),
            LineSegment::new(0, 0, -100, 50),
        ];
        let search = CandidateSearch::new(&segs, 3, 40.0, ProximityRule::AllPairs, 1000);
        let (cands, stats) = collect(&search);
        assert_eq!(cands.len(), 4);
        assert_eq!(stats.components, 1);
        assert!(!stats.truncated);
        assert!(cands.contains(&vec![0, 1, 2]));
        assert!(cands.contains(&vec![1, 2, 3]));
    }

    #[test]
    fn distant_segments_are_pruned_and_components_split() {
        let segs = [
            // Triangle A.
            LineSegment::new(0, 0, 100, 0),
            LineSegment::new(100, 0, 50, 86),
            LineSegment::new(50, 86, 0, 0),
            // Lonely segment.
            LineSegment::new(500, 500, 600, 500),
            // Triangle B.
            LineSegment::new(1000, 0, 1100, 0),
            LineSegment::new(1100, 0, 1050, 86),
            LineSegment::new(1050, 86, 1000, 0),
        ];
        let search = CandidateSearch::new(&segs, 3, 40.0, ProximityRule::AllPairs, 1000);
        assert_eq!(search.components(), vec![vec![0, 1, 2], vec![4, 5, 6]]);
        let (cands, _) = collect(&search);
        assert_eq!(cands, vec![vec![0, 1, 2], vec![4, 5, 6]]);
    }

    #[test]
    fn cyclic_rule_keeps_chains_and_drops_dangling_ends() {
        // Open chain 0-1-2-3: ends have a single neighbour and are pruned
        // repeatedly until nothing is left.
        let chain = [
            LineSegment::new(0, 0, 100, 0),
            LineSegment::new(100, 0, 200, 0),
            LineSegment::new(200, 0, 300, 0),
            LineSegment::new(300, 0, 400, 0),
        ];
        let search = CandidateSearch::new(&chain, 3, 40.0, ProximityRule::CyclicNeighbors, 1000);
        assert!(search.components().is_empty());
    }

    #[test]
    fn stops_at_candidate_cap() {
        let segs: Vec<LineSegment> = (0..10).map(|i| LineSegment::new(0, 0, 100, i * 10)).collect();
        let search = CandidateSearch::new(&segs, 3, 40.0, ProximityRule::AllPairs, 5);
        let (cands, stats) = collect(&search);
        assert_eq!(cands.len(), 5);
        assert!(stats.truncated);
    }
}
