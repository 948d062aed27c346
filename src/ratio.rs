//! Integer usage multipliers that make `length x qty` agree across pieces.
//!
//! Returning `None` is the normal "no solution" answer; callers move on to
//! the next candidate.

use num_integer::Integer;

/// `None` on overflow or when either side is zero.
pub fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return None;
    }
    (a / a.gcd(&b)).checked_mul(b)
}

/// Smallest exact ratio and how many times it fits under the limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactRatio {
    pub unit: Vec<u32>,
    pub k_max: u32,
}

impl ExactRatio {
    pub fn quantities(&self) -> Vec<u32> {
        self.unit.iter().map(|&u| u * self.k_max).collect()
    }
}

/// Quantities with every `lengths[i] * x[i]` exactly equal, as large as the
/// limits allow.
pub fn solve_exact(lengths: &[u32], limits: &[u32]) -> Option<ExactRatio> {
    debug_assert_eq!(lengths.len(), limits.len());
    if lengths.is_empty() || lengths.contains(&0) {
        return None;
    }
    if lengths.len() == 1 {
        return (limits[0] > 0).then(|| ExactRatio {
            unit: vec![1],
            k_max: limits[0],
        });
    }

    let g = lengths.iter().fold(0u64, |acc, &a| acc.gcd(&(a as u64)));
    let normalized: Vec<u64> = lengths.iter().map(|&a| a as u64 / g).collect();
    let l = normalized
        .iter()
        .try_fold(1u64, |acc, &a| lcm(acc, a))?;

    let unit: Vec<u64> = normalized.iter().map(|&a| l / a).collect();
    let k_max = unit
        .iter()
        .zip(limits)
        .map(|(&u, &x)| x as u64 / u)
        .min()
        .unwrap_or(0);
    if k_max == 0 {
        return None;
    }

    // k_max >= 1 implies every unit is at most its u32 limit.
    Some(ExactRatio {
        unit: unit.into_iter().map(|u| u as u32).collect(),
        k_max: k_max as u32,
    })
}

/// Quantities whose `lengths[i] * x[i]` pairwise differ by at most
/// `tolerance`. The first piece is the reference; its quantity is scanned
/// from the largest plausible value down and the first consistent
/// assignment wins.
pub fn solve_within(lengths: &[u32], limits: &[u32], tolerance: u64) -> Option<Vec<u32>> {
    debug_assert_eq!(lengths.len(), limits.len());
    if lengths.is_empty() || lengths.contains(&0) {
        return None;
    }
    if lengths.len() == 1 {
        return (limits[0] > 0).then(|| vec![limits[0]]);
    }
    if limits.contains(&0) {
        return None;
    }

    let a_ref = lengths[0] as u64;
    let x0_max = lengths[1..]
        .iter()
        .zip(&limits[1..])
        .map(|(&a, &x)| (a as u64).saturating_mul(x as u64).saturating_add(tolerance) / a_ref)
        .fold(limits[0] as u64, u64::min);

    'scan: for x0 in (1..=x0_max).rev() {
        let target = a_ref * x0;
        let mut xs = Vec::with_capacity(lengths.len());
        xs.push(x0 as u32);

        for (&a, &limit) in lengths[1..].iter().zip(&limits[1..]) {
            let a = a as u64;
            let low = target.saturating_sub(tolerance).div_ceil(a);
            let high = (target.saturating_add(tolerance) / a).min(limit as u64);
            if high == 0 || low > high {
                continue 'scan;
            }
            xs.push(high as u32);
        }

        if spread(lengths, &xs) <= tolerance {
            return Some(xs);
        }
    }
    None
}

/// Exact mode when `tolerance` is zero, tolerance mode otherwise.
pub fn solve(lengths: &[u32], limits: &[u32], tolerance: u64) -> Option<Vec<u32>> {
    if tolerance == 0 {
        solve_exact(lengths, limits).map(|r| r.quantities())
    } else {
        solve_within(lengths, limits, tolerance)
    }
}

/// Largest minus smallest `lengths[i] * xs[i]`.
pub fn spread(lengths: &[u32], xs: &[u32]) -> u64 {
    let totals = lengths.iter().zip(xs).map(|(&a, &x)| a as u64 * x as u64);
    match (totals.clone().max(), totals.min()) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcm() {
        assert_eq!(lcm(4, 6), Some(12));
        assert_eq!(lcm(0, 6), None);
        assert_eq!(lcm(u64::MAX, u64::MAX - 1), None);
    }

    #[test]
    fn test_exact_two_pieces() {
        let r = solve_exact(&[2, 3], &[10, 10]).unwrap();
        assert_eq!(r.unit, vec![3, 2]);
        assert_eq!(r.k_max, 3);
        assert_eq!(r.quantities(), vec![9, 6]);
    }

    #[test]
    fn test_exact_shared_factor() {
        // gcd 50 normalizes to [2, 3]; same ratio as above.
        let r = solve_exact(&[100, 150], &[7, 100]).unwrap();
        assert_eq!(r.unit, vec![3, 2]);
        assert_eq!(r.k_max, 2);
        assert_eq!(spread(&[100, 150], &r.quantities()), 0);
    }

    #[test]
    fn test_exact_no_room() {
        assert_eq!(solve_exact(&[2, 3], &[2, 10]), None);
        assert_eq!(solve_exact(&[0, 3], &[10, 10]), None);
        assert_eq!(solve_exact(&[], &[]), None);
    }

    #[test]
    fn test_exact_single_piece() {
        let r = solve_exact(&[120], &[8]).unwrap();
        assert_eq!(r.quantities(), vec![8]);
        assert_eq!(solve_exact(&[120], &[0]), None);
    }

    #[test]
    fn test_exact_three_pieces() {
        let r = solve_exact(&[2, 3, 4], &[100, 100, 100]).unwrap();
        // lcm 12 -> unit [6, 4, 3]
        assert_eq!(r.unit, vec![6, 4, 3]);
        assert_eq!(r.k_max, 16);
        assert_eq!(spread(&[2, 3, 4], &r.quantities()), 0);
    }

    #[test]
    fn test_within_exact_match() {
        assert_eq!(solve_within(&[100, 120], &[6, 6], 20), Some(vec![6, 5]));
    }

    #[test]
    fn test_within_skips_empty_window() {
        // x0 = 10 leaves piece 2 with the window [7, 6]; 9 works.
        assert_eq!(solve_within(&[100, 150], &[10, 10], 20), Some(vec![9, 6]));
    }

    #[test]
    fn test_within_prefers_largest_reference() {
        let xs = solve_within(&[100, 150], &[20, 15], 300).unwrap();
        assert_eq!(xs, vec![20, 15]);
        assert!(spread(&[100, 150], &xs) <= 300);
    }

    #[test]
    fn test_within_pairwise_check() {
        // With x0 = 1 both partners sit within 10 of the reference but
        // 20 apart from each other.
        let lengths = [100, 90, 110];
        let xs = solve_within(&lengths, &[1, 5, 5], 10);
        assert_eq!(xs, None);
        let xs = solve_within(&lengths, &[2, 5, 5], 20).unwrap();
        assert!(spread(&lengths, &xs) <= 20);
    }

    #[test]
    fn test_within_rejects_zero_limits() {
        assert_eq!(solve_within(&[100, 120], &[6, 0], 20), None);
        assert_eq!(solve_within(&[0, 120], &[6, 6], 20), None);
        assert_eq!(solve_within(&[100], &[4], 20), Some(vec![4]));
    }

    #[test]
    fn test_solve_dispatch() {
        assert_eq!(solve(&[2, 3], &[10, 10], 0), Some(vec![9, 6]));
        assert_eq!(solve(&[100, 120], &[6, 6], 20), Some(vec![6, 5]));
    }
}
