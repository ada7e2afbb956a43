use crate::circuits::{NUM_PUBLIC_WIRES, QAP};
use crate::error::Groth16Error;
use crate::helpers::{checked_inverse, rand_scalar};
use crate::polynomial::Polynomial;
use ark_ec::pairing::Pairing;
use ark_ec::{CurveGroup, PrimeGroup};
use ark_ff::fields::Field;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use itertools::izip;
use log::{debug, trace};
use rand::Rng;
use rootcause::prelude::ResultExt;
use rootcause::{Report, report};
use std::iter::zip;

/// Leading bytes of a serialized [`TrustedSetup`].
pub const SETUP_FORMAT_MAGIC: [u8; 4] = *b"G16S";
/// Bumped whenever the serialized layout of [`TrustedSetup`] changes.
pub const SETUP_FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Proof<C: Pairing> {
    pub a: C::G1,
    pub b: C::G2,
    pub c: C::G1,
}

/// The secret scalars of a trusted setup. Only ever lives on the stack of [`TrustedSetup::new`].
pub(crate) struct ToxicWaste<F: Field> {
    pub(crate) tau: F,
    pub(crate) alpha: F,
    pub(crate) beta: F,
    pub(crate) gamma: F,
    pub(crate) delta: F,
}

impl<F: Field> ToxicWaste<F> {
    /// Draws tau, alpha, beta, gamma, delta in that order.
    pub(crate) fn sample<R: Rng + ?Sized>(rng: &mut R) -> Result<Self, Report<Groth16Error>> {
        let waste: Self = ToxicWaste {
            tau: rand_scalar(rng),
            alpha: rand_scalar(rng),
            beta: rand_scalar(rng),
            gamma: rand_scalar(rng),
            delta: rand_scalar(rng),
        };
        if waste.gamma.is_zero() {
            return Err(report!(Groth16Error::SetupConsistency { scalar: "gamma" }));
        }
        if waste.delta.is_zero() {
            return Err(report!(Groth16Error::SetupConsistency { scalar: "delta" }));
        }
        Ok(waste)
    }
}

/// The prover's blinding scalars, drawn fresh for every proof.
pub(crate) struct BlindingFactors<F: Field> {
    pub(crate) r: F,
    pub(crate) s: F,
}

impl<F: Field> BlindingFactors<F> {
    /// Draws r, then s.
    pub(crate) fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        BlindingFactors {
            r: rand_scalar(rng),
            s: rand_scalar(rng),
        }
    }
}

/// Public output of the trusted setup for one circuit.
///
/// Holds curve encodings only; the secrets they were derived from are dropped before
/// [`TrustedSetup::new`] returns. `[x]₁`/`[x]₂` below mean `x` times the generator of G1/G2.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct TrustedSetup<C: Pairing> {
    num_wires: usize,
    num_gates: usize,
    z: Polynomial<C::ScalarField>,
    alpha_1: C::G1,
    beta_1: C::G1,
    beta_2: C::G2,
    gamma_2: C::G2,
    delta_1: C::G1,
    delta_2: C::G2,
    /// `[τʲ]₁` for `j < 2n - 1`
    tau_powers_1: Vec<C::G1>,
    /// `[τʲ]₂` for `j < n`
    tau_powers_2: Vec<C::G2>,
    /// `[α·τʲ]₁` for `j < n`
    alpha_tau_powers_1: Vec<C::G1>,
    /// `[β·τʲ]₁` for `j < n`
    beta_tau_powers_1: Vec<C::G1>,
    /// `[aᵢ(τ)]₁` per wire
    a_query: Vec<C::G1>,
    /// `[bᵢ(τ)]₁` per wire
    b_query_1: Vec<C::G1>,
    /// `[bᵢ(τ)]₂` per wire
    b_query_2: Vec<C::G2>,
    /// `[Lᵢ(τ)/γ]₁` for public wires, `[Lᵢ(τ)/δ]₁` for private ones
    l_query: Vec<C::G1>,
    /// `[τʲ·Z(τ)/δ]₁` for `j < n - 1`
    h_query: Vec<C::G1>,
}

fn powers<G: PrimeGroup>(base: G, scale: G::ScalarField, x: G::ScalarField, count: usize) -> Vec<G> {
    let mut power = scale;
    (0..count)
        .map(|_| {
            let point = base * power;
            power *= x;
            point
        })
        .collect()
}

/// `Σ scalarᵢ·baseᵢ`
fn weighted_sum<G: CurveGroup>(bases: &[G], scalars: &[G::ScalarField]) -> G {
    zip(bases, scalars).map(|(base, scalar)| *base * scalar).sum()
}

impl<C: Pairing> TrustedSetup<C> {
    /// Run the setup for `qap`, whose vanishing polynomial is `z`, drawing every secret from `rng`.
    pub fn new<R: Rng + ?Sized>(
        qap: &QAP<C::ScalarField>,
        z: &Polynomial<C::ScalarField>,
        rng: &mut R,
    ) -> Result<TrustedSetup<C>, Report<Groth16Error>> {
        if qap.num_gates() == 0 {
            return Err(report!(Groth16Error::Dimension {
                context: "QAP gate count",
                expected: 1,
                actual: 0,
            })
            .attach("QAP has degree zero"));
        }
        if z.is_zero() || z.degree() != qap.num_gates() {
            return Err(report!(Groth16Error::Dimension {
                context: "vanishing polynomial degree vs gate count",
                expected: qap.num_gates(),
                actual: z.degree(),
            }));
        }

        debug!("Starting trusted setup");
        let secrets = ToxicWaste::sample(rng).attach("Sampling trusted setup secrets")?;
        debug!("Generated random scalars");

        Self::from_secrets(qap, z, &secrets)
    }

    fn from_secrets(
        qap: &QAP<C::ScalarField>,
        z: &Polynomial<C::ScalarField>,
        secrets: &ToxicWaste<C::ScalarField>,
    ) -> Result<TrustedSetup<C>, Report<Groth16Error>> {
        let ToxicWaste {
            tau,
            alpha,
            beta,
            gamma,
            delta,
        } = *secrets;
        let n = qap.num_gates();
        let g1 = C::G1::generator();
        let g2 = C::G2::generator();
        let one = C::ScalarField::ONE;

        let gamma_inverse = checked_inverse(gamma, "trusted setup: 1/gamma")?;
        let delta_inverse = checked_inverse(delta, "trusted setup: 1/delta")?;

        let tau_powers_1 = powers(g1, one, tau, 2 * n - 1);
        let tau_powers_2 = powers(g2, one, tau, n);
        let alpha_tau_powers_1 = powers(g1, alpha, tau, n);
        let beta_tau_powers_1 = powers(g1, beta, tau, n);
        debug!("Generated powers of tau");

        let z_tau = z.evaluate(&tau);
        let h_query = powers(g1, z_tau * delta_inverse, tau, n - 1);
        debug!("Generated zero polynomial srs");

        let mut a_query = Vec::with_capacity(qap.num_wires());
        let mut b_query_1 = Vec::with_capacity(qap.num_wires());
        let mut b_query_2 = Vec::with_capacity(qap.num_wires());
        let mut l_query = Vec::with_capacity(qap.num_wires());
        for (i, (a_i, b_i, c_i)) in izip!(qap.a(), qap.b(), qap.c()).enumerate() {
            let a_tau = a_i.evaluate(&tau);
            let b_tau = b_i.evaluate(&tau);
            let l_tau = beta * a_tau + alpha * b_tau + c_i.evaluate(&tau);
            let divisor_inverse = if i < NUM_PUBLIC_WIRES {
                gamma_inverse
            } else {
                delta_inverse
            };
            a_query.push(g1 * a_tau);
            b_query_1.push(g1 * b_tau);
            b_query_2.push(g2 * b_tau);
            l_query.push(g1 * (l_tau * divisor_inverse));
            trace!("Generated queries for wire {}", i);
        }
        debug!("Generated per-wire queries for {} wires", qap.num_wires());

        Ok(TrustedSetup {
            num_wires: qap.num_wires(),
            num_gates: n,
            z: z.clone(),
            alpha_1: g1 * alpha,
            beta_1: g1 * beta,
            beta_2: g2 * beta,
            gamma_2: g2 * gamma,
            delta_1: g1 * delta,
            delta_2: g2 * delta,
            tau_powers_1,
            tau_powers_2,
            alpha_tau_powers_1,
            beta_tau_powers_1,
            a_query,
            b_query_1,
            b_query_2,
            l_query,
            h_query,
        })
    }

    pub fn num_wires(&self) -> usize {
        self.num_wires
    }

    pub fn num_gates(&self) -> usize {
        self.num_gates
    }

    pub fn vanishing_polynomial(&self) -> &Polynomial<C::ScalarField> {
        &self.z
    }

    pub fn alpha_1(&self) -> C::G1 {
        self.alpha_1
    }

    pub fn beta_1(&self) -> C::G1 {
        self.beta_1
    }

    pub fn beta_2(&self) -> C::G2 {
        self.beta_2
    }

    pub fn gamma_2(&self) -> C::G2 {
        self.gamma_2
    }

    pub fn delta_1(&self) -> C::G1 {
        self.delta_1
    }

    pub fn delta_2(&self) -> C::G2 {
        self.delta_2
    }

    pub fn tau_powers_1(&self) -> &[C::G1] {
        &self.tau_powers_1
    }

    pub fn tau_powers_2(&self) -> &[C::G2] {
        &self.tau_powers_2
    }

    pub fn a_query(&self) -> &[C::G1] {
        &self.a_query
    }

    pub fn b_query_1(&self) -> &[C::G1] {
        &self.b_query_1
    }

    pub fn b_query_2(&self) -> &[C::G2] {
        &self.b_query_2
    }

    /// `[Lᵢ(τ)/γ]₁` for the public wires followed by `[Lᵢ(τ)/δ]₁` for the private ones.
    pub fn l_query(&self) -> &[C::G1] {
        &self.l_query
    }

    pub fn h_query(&self) -> &[C::G1] {
        &self.h_query
    }

    fn check_qap(&self, qap: &QAP<C::ScalarField>) -> Result<(), Report<Groth16Error>> {
        if qap.num_wires() != self.num_wires {
            return Err(report!(Groth16Error::Dimension {
                context: "QAP wire count vs trusted setup",
                expected: self.num_wires,
                actual: qap.num_wires(),
            }));
        }
        if qap.num_gates() != self.num_gates {
            return Err(report!(Groth16Error::Dimension {
                context: "QAP gate count vs trusted setup",
                expected: self.num_gates,
                actual: qap.num_gates(),
            }));
        }
        Ok(())
    }

    /// Recompute `[Lᵢ(τ)]₁ = [β·aᵢ(τ) + α·bᵢ(τ) + cᵢ(τ)]₁` from the shifted powers of tau.
    ///
    /// Independent of [`TrustedSetup::l_query`], so the two can be cross-checked.
    pub fn compute_li(
        &self,
        index: usize,
        qap: &QAP<C::ScalarField>,
    ) -> Result<C::G1, Report<Groth16Error>> {
        self.check_qap(qap)?;
        if index >= self.num_wires {
            return Err(report!(Groth16Error::Dimension {
                context: "wire index",
                expected: self.num_wires,
                actual: index,
            }));
        }

        Ok(qap.a()[index].evaluate_over_srs(&self.beta_tau_powers_1)?
            + qap.b()[index].evaluate_over_srs(&self.alpha_tau_powers_1)?
            + qap.c()[index].evaluate_over_srs(&self.tau_powers_1)?)
    }

    /// Produce a proof that `witness` satisfies `qap`, blinding with fresh scalars from `rng`.
    pub fn prove<R: Rng + ?Sized>(
        &self,
        witness: &[C::ScalarField],
        qap: &QAP<C::ScalarField>,
        rng: &mut R,
    ) -> Result<Proof<C>, Report<Groth16Error>> {
        if witness.len() != self.num_wires {
            return Err(report!(Groth16Error::Dimension {
                context: "witness length vs trusted setup",
                expected: self.num_wires,
                actual: witness.len(),
            }));
        }
        self.check_qap(qap)?;

        let h = compute_quotient(witness, qap, &self.z).attach("Calculating quotient polynomial")?;
        debug!("Calculated quotient polynomial of degree {}", h.degree());

        let BlindingFactors { r, s } = BlindingFactors::<C::ScalarField>::sample(rng);

        let a = self.alpha_1 + weighted_sum(&self.a_query, witness) + self.delta_1 * r;
        let b = self.beta_2 + weighted_sum(&self.b_query_2, witness) + self.delta_2 * s;
        let b_1 = self.beta_1 + weighted_sum(&self.b_query_1, witness) + self.delta_1 * s;

        let ht_tau = h
            .evaluate_over_srs(&self.h_query)
            .attach(format!("Quotient: {:?}", h))?;
        let private_inputs = weighted_sum(
            &self.l_query[NUM_PUBLIC_WIRES..],
            &witness[NUM_PUBLIC_WIRES..],
        );

        let c = private_inputs + ht_tau + (a * s) + (b_1 * r) - (self.delta_1 * (r * s));
        debug!("Proof generated");

        Ok(Proof { a, b, c })
    }

    /// Serialize as the magic bytes, the little-endian format version, then the compressed
    /// canonical encoding of every field.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Report<Groth16Error>> {
        let mut bytes = Vec::with_capacity(8 + self.compressed_size());
        bytes.extend_from_slice(&SETUP_FORMAT_MAGIC);
        bytes.extend_from_slice(&SETUP_FORMAT_VERSION.to_le_bytes());
        self.serialize_compressed(&mut bytes)
            .map_err(|e| report!(Groth16Error::Serialization(e.to_string())))?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Report<Groth16Error>> {
        if bytes.len() < 8 || bytes[..4] != SETUP_FORMAT_MAGIC {
            return Err(report!(Groth16Error::Serialization(
                "missing trusted setup header".to_string()
            )));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != SETUP_FORMAT_VERSION {
            return Err(report!(Groth16Error::Serialization(format!(
                "unsupported trusted setup format version {version}"
            )))
            .attach(format!("Supported version: {SETUP_FORMAT_VERSION}")));
        }

        let mut reader = &bytes[8..];
        let setup = Self::deserialize_compressed(&mut reader)
            .map_err(|e| report!(Groth16Error::Serialization(e.to_string())))?;
        if !reader.is_empty() {
            return Err(report!(Groth16Error::Serialization(format!(
                "{} trailing bytes after trusted setup",
                reader.len()
            ))));
        }
        setup
            .check_layout()
            .map_err(|e| report!(Groth16Error::Serialization(e.to_string())))?;
        Ok(setup)
    }

    /// Check every artifact against the wire and gate counts it claims to be for.
    fn check_layout(&self) -> Result<(), Groth16Error> {
        let n = self.num_gates;
        if n == 0 {
            return Err(Groth16Error::Dimension {
                context: "setup gate count",
                expected: 1,
                actual: 0,
            });
        }
        if self.z.is_zero() || self.z.degree() != n {
            return Err(Groth16Error::Dimension {
                context: "setup vanishing polynomial degree",
                expected: n,
                actual: self.z.degree(),
            });
        }

        let m = self.num_wires;
        let lengths = [
            ("setup tau_powers_1", 2 * n - 1, self.tau_powers_1.len()),
            ("setup tau_powers_2", n, self.tau_powers_2.len()),
            ("setup alpha_tau_powers_1", n, self.alpha_tau_powers_1.len()),
            ("setup beta_tau_powers_1", n, self.beta_tau_powers_1.len()),
            ("setup a_query", m, self.a_query.len()),
            ("setup b_query_1", m, self.b_query_1.len()),
            ("setup b_query_2", m, self.b_query_2.len()),
            ("setup l_query", m, self.l_query.len()),
            ("setup h_query", n - 1, self.h_query.len()),
        ];
        for (context, expected, actual) in lengths {
            if expected != actual {
                return Err(Groth16Error::Dimension {
                    context,
                    expected,
                    actual,
                });
            }
        }
        if m < NUM_PUBLIC_WIRES {
            return Err(Groth16Error::Dimension {
                context: "setup wire count",
                expected: NUM_PUBLIC_WIRES,
                actual: m,
            });
        }
        Ok(())
    }
}

/// `H(x) = (A(x)B(x) - C(x)) / Z(x)` for the witness-weighted QAP sums. Fails unless the division
/// is exact, which happens exactly when the witness does not satisfy the circuit.
pub fn compute_quotient<F: Field>(
    witness: &[F],
    qap: &QAP<F>,
    z: &Polynomial<F>,
) -> Result<Polynomial<F>, Report<Groth16Error>> {
    let (a, b, c) = qap.combine(witness)?;
    &(&(&a * &b) - &c) / z
}

/// Run the trusted setup for one circuit. See [`TrustedSetup::new`].
pub fn run_trusted_setup<C: Pairing, R: Rng + ?Sized>(
    qap: &QAP<C::ScalarField>,
    z: &Polynomial<C::ScalarField>,
    rng: &mut R,
) -> Result<TrustedSetup<C>, Report<Groth16Error>> {
    TrustedSetup::new(qap, z, rng)
}

/// Prove that `witness` satisfies `qap`. See [`TrustedSetup::prove`].
pub fn generate_proof<C: Pairing, R: Rng + ?Sized>(
    witness: &[C::ScalarField],
    qap: &QAP<C::ScalarField>,
    setup: &TrustedSetup<C>,
    rng: &mut R,
) -> Result<Proof<C>, Report<Groth16Error>> {
    setup.prove(witness, qap, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits::Circuit;
    use ark_ff::Zero;
    use ark_mnt6_753::{Fr, G1Projective, G2Projective, MNT6_753};
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    const CUBIC: &str = "@Snark\ndef foo(x):\n\ty = x ** 3\n\treturn x + y + 5";
    const SETUP_SEED: u64 = 0x5e7u64;
    const PROOF_SEED: u64 = 0x9f00fu64;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ints(values: &[u64]) -> Vec<Fr> {
        values.iter().map(|v| Fr::from(*v)).collect()
    }

    fn fixture() -> Result<(Circuit<Fr>, Vec<Fr>, Polynomial<Fr>), Report<Groth16Error>> {
        let circuit = Circuit::compile(CUBIC)?;
        let witness = ints(&[1, 3, 27, 9, 35, 30]);
        let z = circuit.qap().vanishing_polynomial();
        Ok((circuit, witness, z))
    }

    fn setup_for(
        circuit: &Circuit<Fr>,
        z: &Polynomial<Fr>,
    ) -> Result<TrustedSetup<MNT6_753>, Report<Groth16Error>> {
        run_trusted_setup(circuit.qap(), z, &mut StdRng::seed_from_u64(SETUP_SEED))
    }

    /// Regenerates the secrets the setup drew from the same seed.
    fn replay_secrets() -> ToxicWaste<Fr> {
        ToxicWaste::sample(&mut StdRng::seed_from_u64(SETUP_SEED)).unwrap()
    }

    fn l_scalar(qap: &QAP<Fr>, secrets: &ToxicWaste<Fr>, i: usize) -> Fr {
        secrets.beta * qap.a()[i].evaluate(&secrets.tau)
            + secrets.alpha * qap.b()[i].evaluate(&secrets.tau)
            + qap.c()[i].evaluate(&secrets.tau)
    }

    /// Yields only zero bytes, so every sampled scalar is zero.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    /// Yields real bytes until `honest_draws` scalars have been accepted, then only zeros.
    struct ZeroAfterRng {
        inner: StdRng,
        honest_draws: usize,
    }

    impl RngCore for ZeroAfterRng {
        fn next_u32(&mut self) -> u32 {
            self.inner.next_u32()
        }

        fn next_u64(&mut self) -> u64 {
            self.inner.next_u64()
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            if self.honest_draws == 0 {
                dst.fill(0);
            } else {
                self.inner.fill_bytes(dst);
                if Fr::from_random_bytes(dst).is_some() {
                    self.honest_draws -= 1;
                }
            }
        }
    }

    /// Fails the test if any randomness is requested.
    struct UntouchedRng;

    impl RngCore for UntouchedRng {
        fn next_u32(&mut self) -> u32 {
            panic!("randomness drawn")
        }

        fn next_u64(&mut self) -> u64 {
            panic!("randomness drawn")
        }

        fn fill_bytes(&mut self, _dst: &mut [u8]) {
            panic!("randomness drawn")
        }
    }

    #[test]
    fn quotient_for_cubic_fixture() -> Result<(), Report<Groth16Error>> {
        init();
        let (circuit, witness, z) = fixture()?;
        assert_eq!(circuit.witness(&ints(&[3]))?, witness);

        let hx = compute_quotient(&witness, circuit.qap(), &z)?;
        let (a, b, c) = circuit.qap().combine(&witness)?;

        let left = &(&a * &b) - &c;
        let right = &hx * &z;
        assert_eq!(left.coefficients().len(), right.coefficients().len());
        assert_eq!(left, right);
        Ok(())
    }

    #[test]
    fn quotient_rejects_wrong_witness_length() -> Result<(), Report<Groth16Error>> {
        let (circuit, witness, z) = fixture()?;
        let err = compute_quotient(&witness[..5], circuit.qap(), &z).unwrap_err();
        assert!(matches!(
            err.current_context(),
            Groth16Error::Dimension {
                expected: 6,
                actual: 5,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn quotient_rejects_unsatisfying_witness() -> Result<(), Report<Groth16Error>> {
        let (circuit, _, z) = fixture()?;
        let err = compute_quotient(&ints(&[1, 3, 27, 9, 36, 30]), circuit.qap(), &z).unwrap_err();
        assert!(matches!(
            err.current_context(),
            Groth16Error::Arithmetic { .. }
        ));
        Ok(())
    }

    #[test]
    fn group_1_srs() -> Result<(), Report<Groth16Error>> {
        let (circuit, _, z) = fixture()?;
        let setup = setup_for(&circuit, &z)?;
        let secrets = replay_secrets();

        assert_eq!(setup.tau_powers_1().len(), 2 * 4 - 1);
        assert_eq!(setup.tau_powers_2().len(), 4);
        assert_eq!(setup.h_query().len(), 3);

        let polynomial = Polynomial::<Fr>::from_ints(vec![3, 5, 10, 20]);
        assert_eq!(
            G1Projective::generator() * polynomial.evaluate(&secrets.tau),
            polynomial.evaluate_over_srs(setup.tau_powers_1())?
        );
        assert_eq!(
            G2Projective::generator() * polynomial.evaluate(&secrets.tau),
            polynomial.evaluate_over_srs(setup.tau_powers_2())?
        );
        Ok(())
    }

    #[test]
    fn li_recomputation_matches_divided_query() -> Result<(), Report<Groth16Error>> {
        init();
        let (circuit, _, z) = fixture()?;
        let qap = circuit.qap();
        let setup = setup_for(&circuit, &z)?;
        let secrets = replay_secrets();

        for i in 0..qap.num_wires() {
            let recomputed = setup.compute_li(i, qap)?;
            let divisor = if i < NUM_PUBLIC_WIRES {
                secrets.gamma
            } else {
                secrets.delta
            };

            assert_eq!(recomputed, setup.l_query()[i] * divisor, "wire {i}");
            assert_eq!(
                recomputed,
                G1Projective::generator() * l_scalar(qap, &secrets, i),
                "wire {i}"
            );
        }
        assert!(setup.compute_li(qap.num_wires(), qap).is_err());
        Ok(())
    }

    #[test]
    fn witness_dot_li_identity() -> Result<(), Report<Groth16Error>> {
        let (circuit, witness, z) = fixture()?;
        let qap = circuit.qap();
        let setup = setup_for(&circuit, &z)?;
        let secrets = replay_secrets();

        let from_setup = weighted_sum(&setup.l_query()[1..], &witness[1..]);
        let independent: Fr = (1..qap.num_wires())
            .map(|i| witness[i] * l_scalar(qap, &secrets, i))
            .sum::<Fr>()
            / secrets.delta;

        assert_eq!(from_setup, G1Projective::generator() * independent);
        Ok(())
    }

    #[test]
    fn proof_a_and_b_are_well_formed() -> Result<(), Report<Groth16Error>> {
        init();
        let (circuit, witness, z) = fixture()?;
        let qap = circuit.qap();
        let setup = setup_for(&circuit, &z)?;
        let secrets = replay_secrets();

        let proof = generate_proof(&witness, qap, &setup, &mut StdRng::seed_from_u64(PROOF_SEED))?;
        let BlindingFactors { r, s } =
            BlindingFactors::<Fr>::sample(&mut StdRng::seed_from_u64(PROOF_SEED));

        let a_tau: Fr = zip(qap.a(), &witness)
            .map(|(a_i, w_i)| a_i.evaluate(&secrets.tau) * w_i)
            .sum();
        let b_tau: Fr = zip(qap.b(), &witness)
            .map(|(b_i, w_i)| b_i.evaluate(&secrets.tau) * w_i)
            .sum();

        // Per-wire sum agrees with evaluating the combined polynomial.
        let (a_poly, b_poly, _) = qap.combine(&witness)?;
        assert_eq!(a_tau, a_poly.evaluate(&secrets.tau));
        assert_eq!(b_tau, b_poly.evaluate(&secrets.tau));
        assert_eq!(
            weighted_sum(setup.a_query(), &witness),
            a_poly.evaluate_over_srs(setup.tau_powers_1())?
        );
        assert_eq!(
            weighted_sum(setup.b_query_2(), &witness),
            b_poly.evaluate_over_srs(setup.tau_powers_2())?
        );

        assert_eq!(
            proof.a - setup.delta_1() * r,
            G1Projective::generator() * (secrets.alpha + a_tau)
        );
        assert_eq!(
            proof.b - setup.delta_2() * s,
            G2Projective::generator() * (secrets.beta + b_tau)
        );
        Ok(())
    }

    #[test]
    fn proof_c_matches_scalar_formula() -> Result<(), Report<Groth16Error>> {
        let (circuit, witness, z) = fixture()?;
        let qap = circuit.qap();
        let setup = setup_for(&circuit, &z)?;
        let secrets = replay_secrets();
        let tau = secrets.tau;

        let proof = setup.prove(&witness, qap, &mut StdRng::seed_from_u64(PROOF_SEED))?;
        let BlindingFactors { r, s } =
            BlindingFactors::<Fr>::sample(&mut StdRng::seed_from_u64(PROOF_SEED));

        let (a_poly, b_poly, _) = qap.combine(&witness)?;
        let a = secrets.alpha + a_poly.evaluate(&tau) + r * secrets.delta;
        let b = secrets.beta + b_poly.evaluate(&tau) + s * secrets.delta;
        let private: Fr = (1..qap.num_wires())
            .map(|i| witness[i] * l_scalar(qap, &secrets, i))
            .sum();
        let h = compute_quotient(&witness, qap, &z)?;
        let c = (private + h.evaluate(&tau) * z.evaluate(&tau)) / secrets.delta + s * a + r * b
            - r * s * secrets.delta;

        assert_eq!(proof.c, G1Projective::generator() * c);
        Ok(())
    }

    #[test]
    fn proof_satisfies_pairing_equation() -> Result<(), Report<Groth16Error>> {
        init();
        let circuit = Circuit::<Fr>::compile(
            "def f(a, b):\n    c = a * b - 7\n    d = c ** 2 + a\n    return d * b - c",
        )?;
        let witness = circuit.witness(&ints(&[5, 11]))?;
        let qap = circuit.qap();
        let z = qap.vanishing_polynomial();
        let setup: TrustedSetup<MNT6_753> =
            run_trusted_setup(qap, &z, &mut StdRng::seed_from_u64(17))?;

        let proof = generate_proof(&witness, qap, &setup, &mut StdRng::seed_from_u64(18))?;

        let public_inputs = weighted_sum(
            &setup.l_query()[..NUM_PUBLIC_WIRES],
            &witness[..NUM_PUBLIC_WIRES],
        );
        let lhs = MNT6_753::pairing(proof.a, proof.b);
        let rhs = MNT6_753::pairing(setup.alpha_1(), setup.beta_2())
            + MNT6_753::pairing(public_inputs, setup.gamma_2())
            + MNT6_753::pairing(proof.c, setup.delta_2());
        assert_eq!(lhs, rhs);

        let tampered = MNT6_753::pairing(proof.a + G1Projective::generator(), proof.b);
        assert_ne!(tampered, rhs);
        Ok(())
    }

    #[test]
    fn fresh_blinding_changes_proof() -> Result<(), Report<Groth16Error>> {
        let (circuit, witness, z) = fixture()?;
        let setup = setup_for(&circuit, &z)?;
        let first = setup.prove(&witness, circuit.qap(), &mut StdRng::seed_from_u64(1))?;
        let second = setup.prove(&witness, circuit.qap(), &mut StdRng::seed_from_u64(2))?;
        let replayed = setup.prove(&witness, circuit.qap(), &mut StdRng::seed_from_u64(1))?;
        assert_ne!(first.a, second.a);
        assert_ne!(first.b, second.b);
        assert_ne!(first.c, second.c);
        assert_eq!(first, replayed);
        Ok(())
    }

    #[test]
    fn setup_is_deterministic_in_its_randomness() -> Result<(), Report<Groth16Error>> {
        let (circuit, _, z) = fixture()?;
        let first = setup_for(&circuit, &z)?;
        let second = setup_for(&circuit, &z)?;
        assert_eq!(first, second);

        let other: TrustedSetup<MNT6_753> =
            run_trusted_setup(circuit.qap(), &z, &mut StdRng::seed_from_u64(SETUP_SEED + 1))?;
        assert_ne!(first, other);
        Ok(())
    }

    #[test]
    fn setup_rejects_zero_delta() -> Result<(), Report<Groth16Error>> {
        let (circuit, _, z) = fixture()?;
        let mut rng = ZeroAfterRng {
            inner: StdRng::seed_from_u64(SETUP_SEED),
            honest_draws: 4,
        };
        let err = TrustedSetup::<MNT6_753>::new(circuit.qap(), &z, &mut rng).unwrap_err();
        assert!(matches!(
            err.current_context(),
            Groth16Error::SetupConsistency { scalar: "delta" }
        ));
        Ok(())
    }

    #[test]
    fn setup_rejects_zero_gamma() -> Result<(), Report<Groth16Error>> {
        let (circuit, _, z) = fixture()?;
        let err = TrustedSetup::<MNT6_753>::new(circuit.qap(), &z, &mut ZeroRng).unwrap_err();
        assert!(matches!(
            err.current_context(),
            Groth16Error::SetupConsistency { scalar: "gamma" }
        ));
        Ok(())
    }

    #[test]
    fn setup_rejects_mismatched_vanishing_polynomial() -> Result<(), Report<Groth16Error>> {
        let (circuit, _, _) = fixture()?;
        let z = crate::domain::EvaluationDomain::<Fr>::new(3).vanishing_polynomial();
        let err =
            TrustedSetup::<MNT6_753>::new(circuit.qap(), &z, &mut UntouchedRng).unwrap_err();
        assert!(matches!(
            err.current_context(),
            Groth16Error::Dimension {
                expected: 4,
                actual: 3,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn prove_rejects_wrong_witness_length_before_arithmetic() -> Result<(), Report<Groth16Error>> {
        let (circuit, witness, z) = fixture()?;
        let setup = setup_for(&circuit, &z)?;

        let mut long_witness = witness.clone();
        long_witness.push(Fr::zero());
        for bad in [&witness[..5], &long_witness[..]] {
            let err = setup.prove(bad, circuit.qap(), &mut UntouchedRng).unwrap_err();
            assert!(matches!(
                err.current_context(),
                Groth16Error::Dimension { expected: 6, .. }
            ));
        }
        Ok(())
    }

    #[test]
    fn prove_rejects_setup_for_another_circuit() -> Result<(), Report<Groth16Error>> {
        let (circuit, witness, z) = fixture()?;
        let setup = setup_for(&circuit, &z)?;
        let other = Circuit::<Fr>::compile("def g(x, y):\n    z = x * y\n    return z * x + y")?;
        assert_eq!(other.wire_count(), witness.len());
        assert_eq!(other.gate_count(), 3);

        let err = setup
            .prove(&witness, other.qap(), &mut UntouchedRng)
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            Groth16Error::Dimension { .. }
        ));
        Ok(())
    }

    #[test]
    fn prove_rejects_unsatisfying_witness() -> Result<(), Report<Groth16Error>> {
        let (circuit, _, z) = fixture()?;
        let setup = setup_for(&circuit, &z)?;
        let err = setup
            .prove(&ints(&[1, 3, 27, 9, 36, 30]), circuit.qap(), &mut UntouchedRng)
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            Groth16Error::Arithmetic { .. }
        ));
        Ok(())
    }

    #[test]
    fn deserialized_setup_must_match_its_counts() -> Result<(), Report<Groth16Error>> {
        let (circuit, _, z) = fixture()?;
        let setup = setup_for(&circuit, &z)?;

        let mut short_a = setup.clone();
        short_a.a_query.truncate(2);
        let mut no_l = setup.clone();
        no_l.l_query.clear();
        let mut short_h = setup.clone();
        short_h.h_query.pop();
        let mut wrong_gates = setup.clone();
        wrong_gates.num_gates = 5;

        for corrupt in [short_a, no_l, short_h, wrong_gates] {
            let err = TrustedSetup::<MNT6_753>::from_bytes(&corrupt.to_bytes()?).unwrap_err();
            assert!(matches!(
                err.current_context(),
                Groth16Error::Serialization(_)
            ));
        }
        Ok(())
    }

    #[test]
    fn setup_serialization_is_versioned() -> Result<(), Report<Groth16Error>> {
        let (circuit, witness, z) = fixture()?;
        let setup = setup_for(&circuit, &z)?;

        let bytes = setup.to_bytes()?;
        assert_eq!(&bytes[..4], &SETUP_FORMAT_MAGIC);
        assert_eq!(&bytes[4..8], &SETUP_FORMAT_VERSION.to_le_bytes());

        let restored = TrustedSetup::<MNT6_753>::from_bytes(&bytes)?;
        assert_eq!(restored, setup);
        assert_eq!(
            restored.prove(&witness, circuit.qap(), &mut StdRng::seed_from_u64(PROOF_SEED))?,
            setup.prove(&witness, circuit.qap(), &mut StdRng::seed_from_u64(PROOF_SEED))?
        );

        let mut wrong_version = bytes.clone();
        wrong_version[4..8].copy_from_slice(&(SETUP_FORMAT_VERSION + 1).to_le_bytes());
        let mut trailing = bytes.clone();
        trailing.push(0);
        for corrupt in [&wrong_version[..], &trailing[..], &bytes[..6], &bytes[4..]] {
            let err = TrustedSetup::<MNT6_753>::from_bytes(corrupt).unwrap_err();
            assert!(matches!(
                err.current_context(),
                Groth16Error::Serialization(_)
            ));
        }
        Ok(())
    }
}
