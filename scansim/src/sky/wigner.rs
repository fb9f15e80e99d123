//! Wigner small-d functions by upward recurrence in ℓ
//!
//! For fixed orders (m, m') the values d^ℓ_{m,m'}(β), ℓ = ℓmin..=ℓmax with
//! ℓmin = max(|m|, |m'|), follow from the three-term recurrence
//!
//! ```text
//! d^{ℓ+1} = A_ℓ (cos β − B_ℓ) d^ℓ − C_ℓ d^{ℓ−1}
//! ```
//!
//! seeded by the closed form of d^ℓmin. The seed is evaluated in log space so
//! large factorials never overflow; a seed that underflows is simply zero.

/// ln(n!) by direct summation.
fn ln_factorial(n: usize) -> f64 {
    (2..=n).map(|k| (k as f64).ln()).sum()
}

/// Recurrence coefficients for one (m, m') pair, reusable for any angle.
#[derive(Debug, Clone)]
pub struct WignerRecurrence {
    lmin: usize,
    lmax: usize,
    /// sign · sqrt((2l)!/((l+k)!(l−k)!)) of the seed, as (sign, log)
    seed_sign: f64,
    seed_log_norm: f64,
    /// exponents of cos(β/2) and sin(β/2) in the seed
    cos_power: i32,
    sin_power: i32,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
}

impl WignerRecurrence {
    /// Prepare the recurrence for orders `m`, `mp` up to `lmax`.
    ///
    /// When `lmax < max(|m|, |mp|)` the recurrence yields no values.
    pub fn new(m: i64, mp: i64, lmax: usize) -> Self {
        let lmin = m.unsigned_abs().max(mp.unsigned_abs()) as usize;

        // Map (m, m') onto d^l_{l,k} using d_{ab} = d_{-b,-a} and
        // d_{ab} = (-1)^{a-b} d_{ba}.
        let l = lmin as i64;
        let (k, extra_sign) = if m >= mp.abs() {
            (mp, 1.0)
        } else if -m >= mp.abs() {
            (-mp, parity(l + mp))
        } else if mp < 0 {
            (-m, 1.0)
        } else {
            (m, parity(l - m))
        };

        let seed_log_norm = 0.5
            * (ln_factorial(2 * lmin)
                - ln_factorial((l + k) as usize)
                - ln_factorial((l - k) as usize));
        let seed_sign = extra_sign * parity(l - k);

        let count = lmax.saturating_sub(lmin);
        let mut a = Vec::with_capacity(count);
        let mut b = Vec::with_capacity(count);
        let mut c = Vec::with_capacity(count);
        let (m2, mp2) = ((m * m) as f64, (mp * mp) as f64);
        for ell in lmin..lmax {
            let lf = ell as f64;
            let l1 = lf + 1.0;
            let next = ((l1 * l1 - m2) * (l1 * l1 - mp2)).sqrt();
            a.push(l1 * (2.0 * lf + 1.0) / next);
            if ell == 0 {
                b.push(0.0);
                c.push(0.0);
            } else {
                b.push((m * mp) as f64 / (lf * l1));
                let here = ((lf * lf - m2) * (lf * lf - mp2)).max(0.0).sqrt();
                c.push(l1 * here / (lf * next));
            }
        }

        Self {
            lmin,
            lmax,
            seed_sign,
            seed_log_norm,
            cos_power: (l + k) as i32,
            sin_power: (l - k) as i32,
            a,
            b,
            c,
        }
    }

    pub fn lmin(&self) -> usize {
        self.lmin
    }

    /// d^ℓmin_{m,m'}(β) from half-angle cosine and sine.
    fn seed(&self, cos_half: f64, sin_half: f64) -> f64 {
        let mut log = self.seed_log_norm;
        for (base, power) in [(cos_half, self.cos_power), (sin_half, self.sin_power)] {
            if power == 0 {
                continue;
            }
            if base <= 0.0 {
                return 0.0;
            }
            log += power as f64 * base.ln();
        }
        self.seed_sign * log.exp()
    }

    /// Visit (ℓ, d^ℓ_{m,m'}(β)) for ℓ = ℓmin..=ℓmax.
    ///
    /// `cos_beta`/`sin_beta` describe β ∈ [0, π]; passing both avoids a
    /// precision loss near the poles.
    pub fn for_each<F: FnMut(usize, f64)>(&self, cos_beta: f64, sin_beta: f64, mut f: F) {
        if self.lmax < self.lmin {
            return;
        }
        // half-angle forms that stay accurate at both poles
        let cos_half = ((1.0 + cos_beta) / 2.0).max(0.0).sqrt();
        let sin_half = if cos_half > 0.5 {
            sin_beta / (2.0 * cos_half)
        } else {
            ((1.0 - cos_beta) / 2.0).max(0.0).sqrt()
        };

        let mut prev = 0.0;
        let mut cur = self.seed(cos_half, sin_half);
        f(self.lmin, cur);
        for (i, ell) in (self.lmin + 1..=self.lmax).enumerate() {
            let next = self.a[i] * (cos_beta - self.b[i]) * cur - self.c[i] * prev;
            prev = cur;
            cur = next;
            f(ell, cur);
        }
    }

    /// All values as a vector indexed from ℓmin.
    pub fn values(&self, beta: f64) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.lmax.saturating_sub(self.lmin) + 1);
        self.for_each(beta.cos(), beta.sin(), |_, d| out.push(d));
        out
    }
}

fn parity(n: i64) -> f64 {
    if n.rem_euclid(2) == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Single value d^ℓ_{m,m'}(β); zero when |m| or |m'| exceeds ℓ.
pub fn wigner_d(ell: usize, m: i64, mp: i64, beta: f64) -> f64 {
    let rec = WignerRecurrence::new(m, mp, ell);
    if rec.lmin() > ell {
        return 0.0;
    }
    rec.values(beta)[ell - rec.lmin()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ANGLES: [f64; 5] = [0.0, 0.3, 1.2, 2.5, std::f64::consts::PI];

    #[test]
    fn test_closed_forms() {
        for &beta in &ANGLES {
            let (s, c) = beta.sin_cos();
            assert_relative_eq!(wigner_d(1, 0, 0, beta), c, epsilon = 1e-14);
            assert_relative_eq!(wigner_d(1, 1, 0, beta), -s / 2f64.sqrt(), epsilon = 1e-14);
            assert_relative_eq!(wigner_d(1, 1, 1, beta), (1.0 + c) / 2.0, epsilon = 1e-14);
            assert_relative_eq!(wigner_d(1, 1, -1, beta), (1.0 - c) / 2.0, epsilon = 1e-14);
            assert_relative_eq!(wigner_d(2, 2, 0, beta), 6f64.sqrt() / 4.0 * s * s, epsilon = 1e-14);
            assert_relative_eq!(wigner_d(2, 0, -2, beta), 6f64.sqrt() / 4.0 * s * s, epsilon = 1e-14);
            assert_relative_eq!(wigner_d(2, 1, 0, beta), -(1.5f64).sqrt() * s * c, epsilon = 1e-14);
            assert_relative_eq!(
                wigner_d(2, 2, -2, beta),
                ((1.0 - c) / 2.0).powi(2),
                epsilon = 1e-14
            );
        }
    }

    #[test]
    fn test_legendre_limit() {
        // d^l_00 = P_l(cos β)
        let beta = 0.7f64;
        let x = beta.cos();
        let values = WignerRecurrence::new(0, 0, 20).values(beta);
        let (mut p0, mut p1) = (1.0, x);
        assert_relative_eq!(values[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(values[1], x, epsilon = 1e-14);
        for ell in 2..=20 {
            let lf = ell as f64;
            let p2 = ((2.0 * lf - 1.0) * x * p1 - (lf - 1.0) * p0) / lf;
            assert_relative_eq!(values[ell], p2, epsilon = 1e-12);
            p0 = p1;
            p1 = p2;
        }
    }

    #[test]
    fn test_symmetries() {
        let beta = 1.1;
        for ell in 0..6usize {
            let l = ell as i64;
            for m in -l..=l {
                for mp in -l..=l {
                    let d = wigner_d(ell, m, mp, beta);
                    let swapped = wigner_d(ell, mp, m, beta);
                    let negated = wigner_d(ell, -mp, -m, beta);
                    assert_relative_eq!(d, parity(m - mp) * swapped, epsilon = 1e-12);
                    assert_relative_eq!(d, negated, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_rows_are_unit_norm() {
        let beta = 2.1;
        let ell = 9usize;
        let l = ell as i64;
        for m in -l..=l {
            let norm: f64 = (-l..=l).map(|mp| wigner_d(ell, m, mp, beta).powi(2)).sum();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-11);
        }
    }

    #[test]
    fn test_large_orders_stay_finite() {
        let rec = WignerRecurrence::new(600, -2, 700);
        let mut count = 0;
        rec.for_each(0.001f64.cos(), 0.001f64.sin(), |_, d| {
            assert!(d.is_finite());
            count += 1;
        });
        assert_eq!(count, 101);
        // a recurrence that never reaches its first order produces nothing
        let empty = WignerRecurrence::new(5, 0, 3);
        assert!(empty.values(0.5).is_empty());
    }
}
