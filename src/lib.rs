//! # WARNING
//! This library was made for purely academic purposes, and has not been audited for security!
//! Don't use this in production!
//!# Groth16 circuits
//!
//!This crate compiles small arithmetic functions into Groth16 circuits, runs a trusted setup for them and generates
//!proofs that a witness satisfies them.
//!
//!Circuits are written as a single function in a small Python-like language:
//!
//!```text
//!@Snark
//!def foo(x):
//!    y = x ** 3
//!    return x + y + 5
//!```
//!
//!The implementation is type generic over any curve that implements `ark_ec::Pairing`, but is tested in this library with
//!MNT6-753 since it's the highest security MNT curve.
//!
//!Errors are handled using the `rootcause` crate: every fallible operation returns a `Report<Groth16Error>`, so callers
//!can match on the kind with `report.current_context()` while still getting the attached debug information (think
//!showing operands to a failed call) when the report is printed.
//!
//!The core types are `circuits::Circuit`, `circuits::R1CS`, `circuits::QAP`, `groth16::TrustedSetup` and
//!`groth16::Proof`.
//!
//!The general flow is:
//!
//!- Compile source with `Circuit::compile` (or `compile` for just the QAP and its counts)
//!- Compute a witness with `circuit.witness(inputs)`
//!- Generate a Trusted Setup using `TrustedSetup::new(qap, z, rng)`
//!- Generate a proof using `trusted_setup.prove(witness, qap, rng)`
//!
//!All randomness is drawn from the `rng` handed in, so seeding it makes setups and proofs reproducible.
//!

/// Contains the circuit compiler and the types for Rank 1 Constraint Systems and Quadratic Arithmetic Programs.
pub mod circuits;
/// Contains the evaluation domain shared by interpolation and the vanishing polynomial.
pub mod domain;
mod error;
/// Contains types for the trusted setup and the prover.
pub mod groth16;
mod helpers;
/// Contains the parser for circuit source.
pub mod parser;
/// Contains types for polynomials.
pub mod polynomial;

pub use circuits::{Circuit, CompilerOptions, QAP, R1CS, compile, compile_circuit};
pub use domain::EvaluationDomain;
pub use error::Groth16Error;
pub use groth16::{Proof, TrustedSetup, compute_quotient, generate_proof, run_trusted_setup};
pub use helpers::rand_scalar;
pub use polynomial::Polynomial;
