use crate::error::Groth16Error;
use crate::helpers::checked_inverse;
use crate::polynomial::Polynomial;
use ark_ff::Field;
use log::trace;
use rootcause::{Report, report};

/// The points `1, 2, ..., n` that gate `k` (0-indexed) is interpolated at (`x = k + 1`).
///
/// The compiler interpolates wire columns over it and the trusted setup builds the vanishing
/// polynomial from it, so both sides always agree on the roots of `Z`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationDomain<F: Field> {
    points: Vec<F>,
}

impl<F: Field> EvaluationDomain<F> {
    pub fn new(size: usize) -> Self {
        EvaluationDomain {
            points: (1..=size as u64).map(F::from).collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[F] {
        &self.points
    }

    /// Get zero polynomial (x - 1)(x - 2)(...)(x - n)
    pub fn vanishing_polynomial(&self) -> Polynomial<F> {
        self.points
            .iter()
            .map(|point| Polynomial::linear_factor(*point))
            .fold(Polynomial::new(vec![F::one()]), |acc, factor| &acc * &factor)
    }

    /// The Lagrange basis: polynomial `k` is one at point `k` and zero at every other point.
    pub fn lagrange_basis(&self) -> Result<Vec<Polynomial<F>>, Report<Groth16Error>> {
        self.points
            .iter()
            .enumerate()
            .map(|(k, x_k)| {
                let (numerator, denominator) = self
                    .points
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != k)
                    .fold(
                        (Polynomial::new(vec![F::one()]), F::one()),
                        |(numerator, denominator), (_, x_j)| {
                            (
                                &numerator * &Polynomial::linear_factor(*x_j),
                                denominator * (*x_k - x_j),
                            )
                        },
                    );
                let denominator_inverse = checked_inverse(denominator, "lagrange basis")?;
                trace!("Built Lagrange basis polynomial {}", k);
                Ok(&numerator * denominator_inverse)
            })
            .collect()
    }

    /// Interpolate the unique polynomial of degree `< n` taking `values[k]` at point `k`.
    pub fn interpolate(&self, values: &[F]) -> Result<Polynomial<F>, Report<Groth16Error>> {
        let basis = self.lagrange_basis()?;
        Self::interpolate_with_basis(&basis, values)
    }

    /// Interpolation against a precomputed basis, so callers interpolating many columns over the
    /// same domain build the basis once.
    pub fn interpolate_with_basis(
        basis: &[Polynomial<F>],
        values: &[F],
    ) -> Result<Polynomial<F>, Report<Groth16Error>> {
        if basis.len() != values.len() {
            return Err(report!(Groth16Error::Dimension {
                context: "interpolation values vs domain size",
                expected: basis.len(),
                actual: values.len(),
            }));
        }

        Ok(basis
            .iter()
            .zip(values)
            .filter(|(_, value)| !value.is_zero())
            .map(|(basis_polynomial, value)| basis_polynomial * *value)
            .sum())
    }
}
