//! Contained-section discovery (§4.2.1) and data-parallelism
//! classification (§4.2.2).

use super::graph::{leaf_predecessors, leaf_successors};
use super::leaf_eq::chains_equal;
use f2cc_ir::{CombKind, LeafVariant, ProcessId, ProcessNetwork};
use std::collections::HashSet;

/// A `(diverge, converge)` bracket: `diverge` is an `unzipx`, `converge`
/// is a `zipx`, with full forward/backward convergence between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainedSection {
    pub start: ProcessId,
    pub end: ProcessId,
}

/// DFS from every `zipx` reachable in the network (a superset of "DFS
/// from each model output": every `zipx` lies on some path to a model
/// output since it has an out-port that must terminate somewhere).
/// At each `zipx`, search backward for the nearest `unzipx` common to
/// every in-port's branch, then verify the two convergence properties.
pub fn find_contained_sections(net: &ProcessNetwork) -> Vec<ContainedSection> {
    let mut sections = Vec::new();
    for id in net.reachable_leaves(net.root) {
        if !matches!(net.process(id).as_leaf().map(|l| &l.variant), Some(LeafVariant::ZipX)) {
            continue;
        }
        if let Some(diverge) = nearest_common_unzipx(net, id) {
            if verify_contained(net, diverge, id) {
                sections.push(ContainedSection {
                    start: diverge,
                    end: id,
                });
            }
        }
    }
    sections
}

/// Walk backward from each in-port of `zipx` along single-predecessor
/// chains until an `unzipx` is reached; all branches must agree on the
/// same `unzipx`.
fn nearest_common_unzipx(net: &ProcessNetwork, zipx: ProcessId) -> Option<ProcessId> {
    let preds = leaf_predecessors(net, zipx);
    if preds.is_empty() {
        return None;
    }
    let mut found: Option<ProcessId> = None;
    for start in preds {
        let mut cur = start;
        loop {
            if matches!(net.process(cur).as_leaf().map(|l| &l.variant), Some(LeafVariant::UnzipX)) {
                break;
            }
            let ps = leaf_predecessors(net, cur);
            if ps.len() != 1 {
                return None;
            }
            cur = ps[0];
        }
        match found {
            None => found = Some(cur),
            Some(f) if f == cur => {}
            Some(_) => return None,
        }
    }
    found
}

/// Every maximal forward path from `diverge` must end at `converge`,
/// and every maximal backward path from `converge` must start at
/// `diverge` (§4.2.1).
fn verify_contained(net: &ProcessNetwork, diverge: ProcessId, converge: ProcessId) -> bool {
    forward_reaches_only(net, diverge, converge) && backward_reaches_only(net, converge, diverge)
}

fn forward_reaches_only(net: &ProcessNetwork, diverge: ProcessId, converge: ProcessId) -> bool {
    let mut visited = HashSet::new();
    let mut stack = leaf_successors(net, diverge);
    while let Some(cur) = stack.pop() {
        if cur == converge {
            continue;
        }
        if !visited.insert(cur) {
            continue;
        }
        let succs = leaf_successors(net, cur);
        if succs.is_empty() {
            return false;
        }
        stack.extend(succs);
    }
    true
}

fn backward_reaches_only(net: &ProcessNetwork, converge: ProcessId, diverge: ProcessId) -> bool {
    let mut visited = HashSet::new();
    let mut stack = leaf_predecessors(net, converge);
    while let Some(cur) = stack.pop() {
        if cur == diverge {
            continue;
        }
        if !visited.insert(cur) {
            continue;
        }
        let preds = leaf_predecessors(net, cur);
        if preds.is_empty() {
            return false;
        }
        stack.extend(preds);
    }
    true
}

/// §4.2.2: a contained section is data-parallel when every branch
/// between `diverge` and `converge` is a non-empty chain of `Map`
/// leaves, and all branches are pairwise equal. Returns the branches
/// (diverge/converge excluded) in out-port order when so, else `None`.
///
/// A branch member may also be a `CoalescedMap` (coalesce, §4.2.3, may
/// already have collapsed a longer chain into one such leaf before fuse
/// runs) — its function list stands in for "the inner coalesced
/// function list" the fuse rewrite collects.
pub fn classify_data_parallel(
    net: &ProcessNetwork,
    section: &ContainedSection,
) -> Option<Vec<Vec<ProcessId>>> {
    let successors = leaf_successors(net, section.start);
    let mut branches = Vec::with_capacity(successors.len());
    for mut cur in successors {
        let mut chain = Vec::new();
        loop {
            if cur == section.end {
                break;
            }
            let is_map = matches!(
                net.process(cur).as_leaf().map(|l| &l.variant),
                Some(LeafVariant::Comb(CombKind::Map(_)))
                    | Some(LeafVariant::Comb(CombKind::CoalescedMap(_)))
            );
            if !is_map {
                return None;
            }
            chain.push(cur);
            let succs = leaf_successors(net, cur);
            if succs.len() != 1 {
                return None;
            }
            cur = succs[0];
        }
        if chain.is_empty() {
            return None;
        }
        branches.push(chain);
    }
    let first = branches.first()?;
    if !branches.iter().all(|b| chains_equal(net, first, b)) {
        return None;
    }
    Some(branches)
}
