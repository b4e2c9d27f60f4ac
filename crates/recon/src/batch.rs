use log::{debug, warn};

use crate::matcher::Matchable;
use crate::pool::Pool;

/// Limits for one batch search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchParams {
    /// Claims must be dated within ± this many days of the deposit.
    pub window_days: u32,
    pub tolerance_cents: i64,
    /// Largest subset tried. The smallest is always 2.
    pub max_subset_size: usize,
    /// Node budget for one deposit across all sizes.
    pub max_nodes: u64,
}

/// Claims that together explain one deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSelection {
    /// Indices into the claim pool, in chronological order.
    pub members: Vec<usize>,
    pub sum_cents: i64,
    /// sum − deposit.
    pub delta_cents: i64,
    pub nodes_visited: u64,
    pub nodes_pruned: u64,
}

fn same_sign(a: i64, b: i64) -> bool {
    (a > 0 && b > 0) || (a < 0 && b < 0)
}

/// Find the first subset of live claims whose sum lands within tolerance of
/// the deposit.
///
/// Candidates are claims with the deposit's sign, dated inside the window,
/// ordered chronologically (pool order breaks ties). Sizes are tried from 2
/// upward and, within a size, in lexicographic index order, so the result is
/// the smallest and earliest explanation. A branch whose running magnitude
/// already exceeds the deposit plus tolerance cannot recover (every
/// candidate has the same sign) and is cut.
///
/// `None` is the ordinary outcome: most deposits are paid one-to-one. It is
/// also the outcome once the search has spent `max_nodes` without a hit.
pub fn resolve_batch<C: Matchable, D: Matchable>(
    claims: &Pool<'_, C>,
    deposit: &D,
    params: BatchParams,
) -> Option<BatchSelection> {
    let target = deposit.amount_cents()?;
    if target == 0 {
        return None;
    }

    let mut candidates: Vec<(usize, i64)> = claims
        .live()
        .filter_map(|(idx, claim)| {
            let cents = claim.amount_cents()?;
            let offset = (claim.date() - deposit.date()).num_days();
            (same_sign(cents, target) && offset.unsigned_abs() <= u64::from(params.window_days))
                .then_some((idx, cents))
        })
        .collect();
    candidates.sort_by_key(|(idx, _)| (claims.get(*idx).date(), *idx));

    let magnitudes: Vec<i64> = candidates.iter().map(|(_, c)| c.abs()).collect();
    let goal = target.abs();
    let mut nodes_visited: u64 = 0;
    let mut nodes_pruned: u64 = 0;
    let mut cap_hit = false;

    let max_size = params.max_subset_size.min(magnitudes.len());
    for size in 2..=max_size {
        let mut stack: Vec<usize> = Vec::with_capacity(size);
        let found = search(
            &magnitudes,
            goal,
            params.tolerance_cents,
            size,
            params.max_nodes,
            0,
            0,
            &mut stack,
            &mut nodes_visited,
            &mut nodes_pruned,
            &mut cap_hit,
        );
        if cap_hit {
            warn!(
                "batch: node budget {} spent on deposit {} at subset size {size}",
                params.max_nodes,
                deposit.record_id()
            );
            return None;
        }
        if found {
            let members: Vec<usize> = stack.iter().map(|&i| candidates[i].0).collect();
            let sum_cents: i64 = stack.iter().map(|&i| candidates[i].1).sum();
            return Some(BatchSelection {
                members,
                sum_cents,
                delta_cents: sum_cents - target,
                nodes_visited,
                nodes_pruned,
            });
        }
    }

    debug!(
        "batch: no subset for deposit {} ({} candidates, {nodes_visited} nodes, {nodes_pruned} pruned)",
        deposit.record_id(),
        magnitudes.len()
    );
    None
}

/// Depth-first over combinations of exactly `size` indices. Leaves the
/// winning combination on `stack` and returns `true` on success. Sets
/// `cap_hit` and unwinds once `max_nodes` have been visited.
#[allow(clippy::too_many_arguments)]
fn search(
    magnitudes: &[i64],
    goal: i64,
    tolerance: i64,
    size: usize,
    max_nodes: u64,
    start: usize,
    running: i64,
    stack: &mut Vec<usize>,
    nodes_visited: &mut u64,
    nodes_pruned: &mut u64,
    cap_hit: &mut bool,
) -> bool {
    if *cap_hit {
        return false;
    }
    *nodes_visited += 1;
    if *nodes_visited >= max_nodes {
        *cap_hit = true;
        return false;
    }

    if stack.len() == size {
        return (running - goal).abs() <= tolerance;
    }

    let still_needed = size - stack.len();
    if magnitudes.len() < start + still_needed {
        return false;
    }

    for i in start..=magnitudes.len() - still_needed {
        let next = running + magnitudes[i];
        if next > goal + tolerance {
            *nodes_pruned += 1;
            continue;
        }
        stack.push(i);
        if search(
            magnitudes,
            goal,
            tolerance,
            size,
            max_nodes,
            i + 1,
            next,
            stack,
            nodes_visited,
            nodes_pruned,
            cap_hit,
        ) {
            return true;
        }
        stack.pop();
        if *cap_hit {
            return false;
        }
    }
    false
}
