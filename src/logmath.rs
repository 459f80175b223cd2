//! Log-domain numerics shared by the mixture model and the UCB family.
//!
//! Two primitives live here because their edge behaviour is load-bearing:
//! `log_add` keeps the PTW mixture stable over 2^30 steps, and
//! `bernoulli_rel_entropy` drives the KL-UCB bisection, where the ±∞
//! conventions at the simplex corners decide which arm wins.

/// Gap (in nats) beyond which `log1p(exp(-gap))` is numerically zero.
const LOG_ADD_CUTOFF: f64 = 100.0;

/// Given `log(x)` and `log(y)`, compute `log(x + y)` without leaving the
/// log domain.
///
/// Uses `log(x + y) = log(y) + log1p(exp(log(x) - log(y)))` with
/// `log(y) >= log(x)`, skipping the `log1p` entirely when the gap exceeds
/// 100 nats and the smaller term would vanish.
pub fn log_add(log_x: f64, log_y: f64) -> f64 {
    let (lo, hi) = if log_x > log_y {
        (log_y, log_x)
    } else {
        (log_x, log_y)
    };

    let gap = hi - lo;
    if gap < LOG_ADD_CUTOFF {
        hi + (-gap).exp().ln_1p()
    } else {
        hi
    }
}

/// Relative entropy (KL divergence) between Bernoulli(p) and Bernoulli(q).
///
/// Edge conventions:
/// - NaN outside the unit square,
/// - `d(0,0) = d(1,1) = 0`,
/// - `d(0,q) = -ln(1-q)`, `d(1,q) = -ln q`,
/// - `d(p,0) = d(p,1) = +∞` for interior `p`.
pub fn bernoulli_rel_entropy(p: f64, q: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) || !(0.0..=1.0).contains(&q) {
        return f64::NAN;
    }

    // singularities at the corners
    if (p == 0.0 && q == 0.0) || (p == 1.0 && q == 1.0) {
        return 0.0;
    }

    if p == 0.0 {
        return -(1.0 - q).ln();
    } else if p == 1.0 {
        return -q.ln();
    }

    if q == 0.0 || q == 1.0 {
        return f64::INFINITY;
    }

    p * (p / q).ln() + (1.0 - p) * ((1.0 - p) / (1.0 - q)).ln()
}
