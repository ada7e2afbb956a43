use thiserror::Error;

/// The kinds of failure every fallible operation in this crate reports.
///
/// Errors travel inside a [`rootcause::Report`], so the variant names the kind and carries the
/// minimum needed to locate the fault, while the report's attachments hold the operands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Groth16Error {
    /// The source text uses something the circuit language cannot express.
    #[error("compilation failed on line {line}: {message}")]
    Compilation { line: usize, message: String },

    /// Two sequences that must line up (witness vs wires, QAP columns, setup vs QAP) do not.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    Dimension {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Inverting zero, or a polynomial division that had to be exact left a remainder.
    #[error("arithmetic error in {step}: {message}")]
    Arithmetic { step: &'static str, message: String },

    /// A secret scalar of the trusted setup was sampled as zero.
    #[error("trusted setup sampled {scalar} as zero")]
    SetupConsistency { scalar: &'static str },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Groth16Error {
    pub(crate) fn compilation(line: usize, message: impl Into<String>) -> Self {
        Groth16Error::Compilation {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn arithmetic(step: &'static str, message: impl Into<String>) -> Self {
        Groth16Error::Arithmetic {
            step,
            message: message.into(),
        }
    }
}
