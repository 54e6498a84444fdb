use crate::{ColMut, RealField};
use reborrow::*;

// Scaled sum-of-squares accumulation, so that intermediate squares never overflow for
// representable inputs.
fn norm2<T: RealField>(v: crate::ColRef<'_, T>) -> T {
    let n = v.nrows();
    if n == 0 {
        return T::zero();
    }
    if n == 1 {
        return (*v.get(0)).abs();
    }

    let mut scale = T::zero();
    let mut ssq = T::one();
    for i in 0..n {
        let vi = (*v.get(i)).abs();
        if vi > T::zero() {
            if scale < vi {
                let ratio = scale / vi;
                ssq = T::one() + ssq * ratio * ratio;
                scale = vi;
            } else {
                let ratio = vi / scale;
                ssq = ssq + ratio * ratio;
            }
        }
    }
    scale * ssq.sqrt()
}

// sqrt(x^2 + y^2) without undue overflow or underflow.
fn hypot<T: RealField>(x: T, y: T) -> T {
    let x = x.abs();
    let y = y.abs();
    let (big, small) = if x > y { (x, y) } else { (y, x) };
    if small == T::zero() {
        big
    } else {
        let ratio = small / big;
        big * (T::one() + ratio * ratio).sqrt()
    }
}

/// Computes the Householder reflection `H = I - tau * v * v^T` that maps the vector
/// `(head, essential)` to `(beta, 0)`, where `v = (1, essential')`.
///
/// On input, `essential` holds the tail of the vector to be reflected. On output it holds
/// the essential part of the Householder vector (the implicit leading `1` is not stored).
/// Returns `(tau, beta)`.
///
/// If the tail is exactly zero, the vector is already in reflected form: `tau` is zero,
/// `beta` is `head`, and `essential` is left untouched. Note that `H` is then the
/// identity, not a sign flip, so `beta` keeps the sign of `head`.
///
/// Otherwise `beta = -sign(head) * hypot(head, norm2(essential))`, with the sign of zero
/// taken to be positive, so `beta * head <= 0`. Inputs with tiny norms are rescaled
/// before the computation and the result is scaled back, to avoid underflow in the
/// quotients.
pub fn make_householder_in_place<T: RealField>(mut essential: ColMut<'_, T>, head: T) -> (T, T) {
    let mut xnorm = norm2(essential.rb());
    if xnorm == T::zero() {
        return (T::zero(), head);
    }

    let mut alpha = head;
    let mut beta = if alpha < T::zero() {
        hypot(alpha, xnorm)
    } else {
        -hypot(alpha, xnorm)
    };

    let safmin = T::min_positive() / T::epsilon();
    let mut knt = 0usize;
    if beta.abs() < safmin {
        let rsafmn = safmin.inv();
        while beta.abs() < safmin && knt < 20 {
            knt += 1;
            for i in 0..essential.nrows() {
                essential[i] = essential[i] * rsafmn;
            }
            beta = beta * rsafmn;
            alpha = alpha * rsafmn;
            xnorm = xnorm * rsafmn;
        }
        xnorm = norm2(essential.rb());
        beta = if alpha < T::zero() {
            hypot(alpha, xnorm)
        } else {
            -hypot(alpha, xnorm)
        };
    }

    let tau = (beta - alpha) / beta;
    let scale = (alpha - beta).inv();
    for i in 0..essential.nrows() {
        essential[i] = essential[i] * scale;
    }

    for _ in 0..knt {
        beta = beta * safmin;
    }
    (tau, beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColRef;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn reflect_ones_column() {
        // x = (1, 1, 1, 1): beta = -2, tau = 3/2, essential = (1/3, 1/3, 1/3).
        let mut tail = [1.0f64, 1.0, 1.0];
        let (tau, beta) = make_householder_in_place(ColMut::from_slice(&mut tail), 1.0);

        assert_approx_eq!(tau, 1.5);
        assert_approx_eq!(beta, -2.0);
        for &e in &tail {
            assert_approx_eq!(e, 1.0 / 3.0);
        }
    }

    #[test]
    fn negative_head_gets_positive_beta() {
        let mut tail = [3.0f64, 4.0];
        let (tau, beta) = make_householder_in_place(ColMut::from_slice(&mut tail), 0.0);

        // sign(0) is taken positive, so beta is negative even for a zero head.
        assert_approx_eq!(beta, -5.0);
        assert_approx_eq!(tau, 1.0);

        let mut tail = [3.0f64, 4.0];
        let (tau, beta) = make_householder_in_place(ColMut::from_slice(&mut tail), -5.0);
        assert_approx_eq!(beta, 50.0f64.sqrt());
        // tau lies in (1, 2) when the head and beta have opposite signs.
        assert_approx_eq!(tau, (50.0f64.sqrt() + 5.0) / 50.0f64.sqrt());
    }

    #[test]
    fn zero_tail_is_identity() {
        let mut tail = [0.0f64, 0.0, 0.0];
        let (tau, beta) = make_householder_in_place(ColMut::from_slice(&mut tail), -7.0);

        assert_eq!(tau, 0.0);
        assert_eq!(beta, -7.0);
        assert_eq!(tail, [0.0, 0.0, 0.0]);

        let mut tail: [f64; 0] = [];
        let (tau, beta) = make_householder_in_place(ColMut::from_slice(&mut tail), 3.0);
        assert_eq!(tau, 0.0);
        assert_eq!(beta, 3.0);
    }

    #[test]
    fn reflection_annihilates_tail() {
        let head = 0.5f64;
        let x = [0.25f64, -1.5, 2.0, 0.125];

        let mut tail = x;
        let (tau, beta) = make_householder_in_place(ColMut::from_slice(&mut tail), head);

        // Apply H = I - tau v v^T to the original vector; the image must be (beta, 0).
        let mut dot = head;
        for i in 0..x.len() {
            dot += tail[i] * x[i];
        }
        let mapped_head = head - tau * dot;
        assert_approx_eq!(mapped_head, beta);
        for i in 0..x.len() {
            assert_approx_eq!(x[i] - tau * tail[i] * dot, 0.0);
        }
    }

    #[test]
    fn subnormal_input_is_rescaled() {
        let tiny = f64::MIN_POSITIVE / 128.0;
        let mut tail = [3.0 * tiny, 4.0 * tiny];
        let (tau, beta) = make_householder_in_place(ColMut::from_slice(&mut tail), 0.0);

        assert!(beta.is_finite());
        assert!(tau.is_finite());
        assert_approx_eq!(beta / tiny, -5.0, 1e-10);
        for &e in &tail {
            assert!(e.is_finite());
        }
    }

    #[test]
    fn norm2_avoids_overflow() {
        let big = f64::MAX / 2.0;
        let data = [big, big];
        let norm = norm2(ColRef::from_slice(&data));
        assert!(norm.is_finite());
        assert_approx_eq!(norm / big, core::f64::consts::SQRT_2);
    }
}
