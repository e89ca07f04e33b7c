//! Parameter-ordering permutation helpers.
//!
//! The estimators build moment conditions portfolio-major (each
//! portfolio's intercept and factor slots contiguous) but report some
//! covariance blocks grouped by parameter kind instead. The gather
//! indices for those rearrangements live here so every estimator shares
//! the same arithmetic.

use ndarray::Array2;

/// Gather order that regroups `n_groups` consecutive blocks of
/// `group_len` slots from block-major to slot-major layout.
///
/// Applied to a portfolio-major loading layout, this moves every
/// intercept slot to the front, followed by every first-factor slot, and
/// so on.
#[must_use]
pub fn transpose_order(n_groups: usize, group_len: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(n_groups * group_len);
    for slot in 0..group_len {
        for group in 0..n_groups {
            order.push(group * group_len + slot);
        }
    }
    order
}

/// Selection order for the two-pass covariance pivot.
///
/// The two-pass moment vector stacks `n_portfolios` first-pass blocks of
/// `n_factors + 1` slots, then `n_factors + n_rf` risk-premia slots, then
/// `n_portfolios` pricing-error slots. The pivot replaces each
/// portfolio's first-pass intercept slot (a nuisance parameter) with its
/// pricing-error slot, yielding per-portfolio `[alpha, betas...]` blocks
/// followed by the risk premia.
#[must_use]
pub fn two_pass_order(n_portfolios: usize, n_factors: usize, n_rf: usize) -> Vec<usize> {
    let block = n_factors + 1;
    let premia_start = n_portfolios * block;
    let alpha_start = premia_start + n_factors + n_rf;

    let mut order = Vec::with_capacity(alpha_start);
    for portfolio in 0..n_portfolios {
        order.push(alpha_start + portfolio);
        for slot in 1..block {
            order.push(portfolio * block + slot);
        }
    }
    order.extend(premia_start..alpha_start);
    order
}

/// Indices of the per-portfolio intercept slots in a portfolio-major
/// loading layout.
#[must_use]
pub fn intercept_slots(n_portfolios: usize, n_factors: usize) -> Vec<usize> {
    (0..n_portfolios).map(|i| i * (n_factors + 1)).collect()
}

/// Gather rows and columns of a square matrix by the same index order.
#[must_use]
pub fn select_square(a: &Array2<f64>, order: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((order.len(), order.len()), |(i, j)| a[[order[i], order[j]]])
}
