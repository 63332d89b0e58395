//! Log-probability arithmetic. Two primitives, never bare `+`: a product of
//! independent probabilities (where a zero probability absorbs) and a sum of
//! disjoint probabilities (where a zero probability is the identity).

/// log(a * b) for log-probabilities, i.e. the conjunction "a *and* b".
/// -inf (probability zero) absorbs.
#[inline]
pub fn log_product(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY || b == f64::NEG_INFINITY {
        f64::NEG_INFINITY
    } else {
        a + b
    }
}

/// log(a + b) for log-probabilities, i.e. the disjunction "a *or* b".
/// -inf (probability zero) is the identity.
#[inline]
pub fn log_sum_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}
