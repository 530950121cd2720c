//! Shamir sharing over scalars and curve points
//!
//! Shares are evaluations of a degree-`t` polynomial at `α₁..αₙ`. Any `t + 1`
//! of them interpolate the constant term at `X = 0`, in the scalar domain or
//! "in the exponent" on points. Enforcing `t + 1` is the caller's job.

use std::iter::Sum;
use std::ops::Mul;

use k256::{ProjectivePoint, Scalar};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use k256::elliptic_curve::Field;

use crate::error::{Error, Result};
use crate::params::ProtocolParameters;

/// One share: scalar value at αᵢ and its image `aᵢ·G`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Share {
    pub scalar: Scalar,
    pub point: ProjectivePoint,
}

impl std::fmt::Debug for Share {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Share")
            .field("scalar", &"[REDACTED]")
            .field("point", &self.point)
            .finish()
    }
}

/// Secret polynomial with constant term = the shared secret
pub struct SharingPolynomial {
    coefficients: Vec<Scalar>,
}

impl SharingPolynomial {
    /// Random degree-`degree` polynomial with constant term `secret`
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R, secret: Scalar, degree: usize) -> Self {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(secret);
        coefficients.extend((0..degree).map(|_| Scalar::random(&mut *rng)));
        Self { coefficients }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn secret(&self) -> Scalar {
        self.coefficients[0]
    }

    pub fn evaluate(&self, x: &Scalar) -> Scalar {
        evaluate_polynomial(&self.coefficients, x)
    }
}

impl Drop for SharingPolynomial {
    fn drop(&mut self) {
        self.coefficients.zeroize();
    }
}

/// Horner evaluation of `Σ cₖ·xᵏ`
pub fn evaluate_polynomial(coefficients: &[Scalar], x: &Scalar) -> Scalar {
    coefficients
        .iter()
        .rev()
        .fold(Scalar::ZERO, |acc, c| acc * x + c)
}

/// Share `secret` among the `n` parties of `pp` with a fresh degree-`t` polynomial.
///
/// Returns the shares in party order together with the polynomial.
pub fn generate_shares<R: RngCore + CryptoRng>(
    rng: &mut R,
    secret: Scalar,
    pp: &ProtocolParameters,
) -> (Vec<Share>, SharingPolynomial) {
    let polynomial = SharingPolynomial::random(rng, secret, pp.t);
    let shares = (0..pp.n as crate::PartyIndex)
        .map(|party| {
            let scalar = polynomial.evaluate(&pp.alpha_for_party(party));
            Share {
                scalar,
                point: ProjectivePoint::GENERATOR * scalar,
            }
        })
        .collect();
    (shares, polynomial)
}

/// Lagrange coefficients `λᵢ = ∏_{k≠i} xₖ / (xₖ − xᵢ)` for interpolation at zero
pub fn lagrange_coefficients_at_zero(xs: &[Scalar]) -> Result<Vec<Scalar>> {
    xs.iter()
        .enumerate()
        .map(|(i, x_i)| {
            let mut numerator = Scalar::ONE;
            let mut denominator = Scalar::ONE;
            for (k, x_k) in xs.iter().enumerate() {
                if i == k {
                    continue;
                }
                numerator *= x_k;
                denominator *= *x_k - x_i;
            }
            let inverse: Option<Scalar> = denominator.invert().into();
            inverse.map(|inv| numerator * inv).ok_or_else(|| {
                Error::DegenerateParameters(format!("Duplicate interpolation point at position {}", i))
            })
        })
        .collect()
}

fn interpolate_at_zero<T>(values: &[T], xs: &[Scalar]) -> Result<T>
where
    T: Copy + Mul<Scalar, Output = T> + Sum<T>,
{
    if values.len() != xs.len() {
        return Err(Error::MalformedContribution(format!(
            "{} values but {} interpolation points",
            values.len(),
            xs.len()
        )));
    }
    if values.is_empty() {
        return Err(Error::MalformedContribution(
            "Nothing to interpolate".to_string(),
        ));
    }
    let lambdas = lagrange_coefficients_at_zero(xs)?;
    Ok(values
        .iter()
        .zip(lambdas)
        .map(|(value, lambda)| *value * lambda)
        .sum())
}

/// Recover the constant term from scalar shares at the given points
pub fn reconstruct_scalar(shares: &[Scalar], xs: &[Scalar]) -> Result<Scalar> {
    interpolate_at_zero(shares, xs)
}

/// Recover `s·G` from point shares at the given points
pub fn reconstruct_point(shares: &[ProjectivePoint], xs: &[Scalar]) -> Result<ProjectivePoint> {
    interpolate_at_zero(shares, xs)
}
