use crate::error::Groth16Error;
use crate::helpers::checked_inverse;
use ark_ec::CurveGroup;
use ark_ff::Field;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rootcause::{Report, report};
use std::fmt::Debug;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Dense univariate polynomial.
///
/// Coefficients are stored lowest degree first and are always normalized: the last stored
/// coefficient is non-zero, and the zero polynomial stores none. Equality is therefore equality of
/// polynomials, not of padded vectors.
#[derive(Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct Polynomial<F>
where
    F: Field,
{
    /// x^0, x^1, x^2, ...
    coefficients: Vec<F>,
}

impl<F: Field> Polynomial<F> {
    pub fn new(coefficients: Vec<F>) -> Self {
        let mut poly = Polynomial { coefficients };
        poly.truncate_leading_zeros();
        poly
    }

    pub fn zero() -> Self {
        Polynomial {
            coefficients: Vec::new(),
        }
    }

    /// Build a polynomial from small non-negative integer coefficients, lowest degree first.
    pub fn from_ints(coefficients: Vec<u64>) -> Self {
        Self::new(coefficients.into_iter().map(F::from).collect())
    }

    /// The monic linear factor `x - root`.
    pub fn linear_factor(root: F) -> Self {
        Polynomial {
            coefficients: vec![-root, F::one()],
        }
    }

    pub fn coefficients(&self) -> &[F] {
        &self.coefficients
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Degree of the polynomial; the zero polynomial is reported as degree 0.
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    fn truncate_leading_zeros(&mut self) {
        match self.coefficients.iter().rposition(|c| !c.is_zero()) {
            Some(pos) => self.coefficients.truncate(pos + 1),
            None => self.coefficients.clear(),
        }
    }

    /// Evaluate at `x` with Horner's rule.
    pub fn evaluate(&self, x: &F) -> F {
        self.coefficients
            .iter()
            .rev()
            .fold(F::zero(), |acc, coefficient| acc * x + coefficient)
    }

    /// Evaluate "in the exponent": given `srs = [G, tau*G, tau^2*G, ...]` return `p(tau)*G`
    /// without knowing tau.
    pub fn evaluate_over_srs<T>(&self, srs: &[T]) -> Result<T, Report<Groth16Error>>
    where
        T: CurveGroup<ScalarField = F> + Debug,
    {
        if srs.len() < self.coefficients.len() {
            return Err(report!(Groth16Error::Dimension {
                context: "SRS too small for polynomial",
                expected: self.coefficients.len(),
                actual: srs.len(),
            })
            .attach(format!("Polynomial: {:?}", self.coefficients)));
        }

        Ok(self
            .coefficients
            .iter()
            .zip(srs)
            .map(|(coefficient, power)| *power * coefficient)
            .sum())
    }

    /// Euclidean division, returning `(quotient, remainder)`.
    pub fn div_rem(&self, divisor: &Self) -> Result<(Self, Self), Report<Groth16Error>> {
        let Some(leading) = divisor.coefficients.last() else {
            return Err(report!(Groth16Error::arithmetic(
                "polynomial division",
                "division by the zero polynomial"
            )));
        };
        let leading_inverse = checked_inverse(*leading, "polynomial division")?;

        if self.coefficients.len() < divisor.coefficients.len() {
            return Ok((Self::zero(), self.clone()));
        }

        let divisor_len = divisor.coefficients.len();
        let mut remainder = self.coefficients.clone();
        let mut quotient = vec![F::zero(); remainder.len() - divisor_len + 1];

        for shift in (0..quotient.len()).rev() {
            let coefficient = remainder[shift + divisor_len - 1] * leading_inverse;
            quotient[shift] = coefficient;
            for (offset, d) in divisor.coefficients.iter().enumerate() {
                remainder[shift + offset] -= coefficient * d;
            }
        }
        remainder.truncate(divisor_len - 1);

        Ok((Self::new(quotient), Self::new(remainder)))
    }
}

impl<F: Field> Add<&Polynomial<F>> for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn add(self, rhs: &Polynomial<F>) -> Self::Output {
        let (longer, shorter) = if self.coefficients.len() >= rhs.coefficients.len() {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let mut coefficients = longer.coefficients.clone();
        for (a_i, b_i) in coefficients.iter_mut().zip(&shorter.coefficients) {
            *a_i += b_i;
        }
        Polynomial::new(coefficients)
    }
}

impl<F: Field> Add for Polynomial<F> {
    type Output = Polynomial<F>;

    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl<F: Field> Neg for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn neg(self) -> Self::Output {
        Polynomial {
            coefficients: self.coefficients.iter().map(|c| -*c).collect(),
        }
    }
}

impl<F: Field> Sub<&Polynomial<F>> for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn sub(self, rhs: &Polynomial<F>) -> Self::Output {
        self + &(-rhs)
    }
}

impl<F: Field> Sub for Polynomial<F> {
    type Output = Polynomial<F>;

    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl<F: Field> Mul<&Polynomial<F>> for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn mul(self, rhs: &Polynomial<F>) -> Self::Output {
        if self.is_zero() || rhs.is_zero() {
            return Polynomial::zero();
        }

        // Schoolbook O(n^2); circuits here are small enough that FFT multiplication isn't worth it.
        let mut out = vec![F::zero(); self.coefficients.len() + rhs.coefficients.len() - 1];
        for (i, a_i) in self.coefficients.iter().enumerate() {
            if a_i.is_zero() {
                continue;
            }
            for (j, b_j) in rhs.coefficients.iter().enumerate() {
                out[i + j] += *a_i * b_j;
            }
        }
        Polynomial::new(out)
    }
}

impl<F: Field> Mul for Polynomial<F> {
    type Output = Polynomial<F>;

    fn mul(self, rhs: Polynomial<F>) -> Self::Output {
        &self * &rhs
    }
}

impl<F: Field> Mul<F> for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn mul(self, rhs: F) -> Self::Output {
        Polynomial::new(self.coefficients.iter().map(|x| *x * rhs).collect())
    }
}

/// Exact division: fails with an arithmetic error unless the remainder is zero.
impl<F: Field> Div<&Polynomial<F>> for &Polynomial<F> {
    type Output = Result<Polynomial<F>, Report<Groth16Error>>;

    fn div(self, rhs: &Polynomial<F>) -> Self::Output {
        let (quotient, remainder) = self.div_rem(rhs)?;
        if !remainder.is_zero() {
            return Err(report!(Groth16Error::arithmetic(
                "polynomial division",
                "non-zero remainder where exact division was required"
            ))
            .attach(format!("Dividend: {:?}", self.coefficients))
            .attach(format!("Divisor: {:?}", rhs.coefficients))
            .attach(format!("Remainder: {:?}", remainder.coefficients)));
        }
        Ok(quotient)
    }
}

impl<F: Field> Sum for Polynomial<F> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Polynomial::zero(), |acc, p| &acc + &p)
    }
}
