//! Injected randomness for request ids and PKCE verifiers.
//!
//! The flow never reaches for an ambient RNG: it is handed a [`RandomSource`]
//! so tests can substitute fixed bytes and assert on the derived id and
//! verifier.

/// A supplier of cryptographically strong random bytes.
pub trait RandomSource: Send + Sync {
    /// Fills `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);
}

/// The default [`RandomSource`], backed by the operating system RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(buf);
    }
}
