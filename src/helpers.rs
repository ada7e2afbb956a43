use crate::error::Groth16Error;
use ark_ff::{Field, PrimeField};
use rand::Rng;
use rootcause::{Report, report};

/// Sample a uniformly random field element by rejection sampling raw bytes from `rng`.
///
/// Draws exactly the bytes it needs per attempt, so a seeded RNG replays the same scalars in the
/// same order.
pub fn rand_scalar<T, S>(rng: &mut T) -> S
where
    T: Rng + ?Sized,
    S: Field,
{
    let mut bytes = vec![0u8; scalar_byte_len::<S>()];
    loop {
        rng.fill_bytes(&mut bytes);
        if let Some(out) = S::from_random_bytes(&bytes) {
            return out;
        }
    }
}

/// Bytes needed to cover every bit of the base prime field, plus one for the flag byte
/// `from_random_bytes` may consume.
fn scalar_byte_len<S: Field>() -> usize {
    let bits = <S::BasePrimeField as PrimeField>::MODULUS_BIT_SIZE as usize
        * S::extension_degree() as usize;
    bits.div_ceil(8) + 1
}

/// Invert `value`, reporting `step` as the origin when it is zero.
pub(crate) fn checked_inverse<F: Field>(
    value: F,
    step: &'static str,
) -> Result<F, Report<Groth16Error>> {
    value.inverse().ok_or_else(|| {
        report!(Groth16Error::arithmetic(
            step,
            "inverse of the additive identity"
        ))
    })
}
