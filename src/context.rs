//! BFV scheme context: parameters, key pair, and the three primitives
//! (encrypt, add, decrypt) every engine operation is built from.

use std::sync::Arc;

use fhe::bfv::{BfvParameters, BfvParametersBuilder, Ciphertext, Encoding, Plaintext, PublicKey, SecretKey};
use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};

use crate::error::TallyError;

/// NTT-friendly ciphertext moduli (all ≡ 1 mod 2·degree for degrees up
/// to 2048), one per multiplicative level.
const CIPHERTEXT_MODULI: [u64; 4] = [0x3FFFFFFF000001, 0xffffee001, 0xffffc4001, 0x1ffffe0001];

/// Parameters of the leveled BFV scheme. Immutable once a context has
/// been built from them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemeParameters {
    /// Plaintext modulus `t`. Decrypted counts are only meaningful
    /// modulo `t`, so production sizing must keep `t` above the maximum
    /// plausible per-candidate vote count by a safety margin.
    pub plaintext_modulus: u64,
    /// Number of multiplicative levels the context supports. Tallying
    /// only ever chains additions, so one level is enough.
    pub multiplicative_depth: usize,
    /// Degree of the polynomial modulus; bounds the number of packed
    /// slots (candidates) per ciphertext.
    pub degree: usize,
}

impl Default for SchemeParameters {
    fn default() -> Self {
        // t = 65537 and depth 1, as in the election simulation defaults.
        Self {
            plaintext_modulus: 65537,
            multiplicative_depth: 1,
            degree: 2048,
        }
    }
}

/// Process-wide crypto capability: owns the BFV parameter set and the
/// key pair, and exposes encode-and-encrypt, homomorphic add, and
/// decrypt-and-decode.
///
/// Build once, then share by reference (or `Arc`); rebuilding while
/// ciphertexts are live would silently invalidate every handle.
/// Key material never leaves this struct.
pub struct SchemeContext {
    scheme: SchemeParameters,
    params: Arc<BfvParameters>,
    public: PublicKey,
    secret: SecretKey,
}

impl SchemeContext {
    /// Build the BFV context and generate a fresh key pair.
    ///
    /// # Errors
    /// [`TallyError::SchemeSetupFailure`] when the parameter set is
    /// rejected by the scheme (e.g. a plaintext modulus that does not
    /// support packed encoding for the chosen degree) or the requested
    /// depth exceeds the modulus table.
    pub fn setup(scheme: SchemeParameters) -> Result<Self, TallyError> {
        let levels = scheme.multiplicative_depth.max(1);
        if levels > CIPHERTEXT_MODULI.len() {
            return Err(TallyError::SchemeSetupFailure(format!(
                "multiplicative depth {} exceeds the {} supported levels",
                scheme.multiplicative_depth,
                CIPHERTEXT_MODULI.len()
            )));
        }

        let params = BfvParametersBuilder::new()
            .set_degree(scheme.degree)
            .set_plaintext_modulus(scheme.plaintext_modulus)
            .set_moduli(&CIPHERTEXT_MODULI[..levels])
            .build_arc()
            .map_err(|e| TallyError::SchemeSetupFailure(e.to_string()))?;

        let mut rng = rand::rng();
        let secret = SecretKey::random(&params, &mut rng);
        let public = PublicKey::new(&secret, &mut rng);

        Ok(Self {
            scheme,
            params,
            public,
            secret,
        })
    }

    /// Parameters this context was built from.
    #[must_use]
    pub fn parameters(&self) -> &SchemeParameters {
        &self.scheme
    }

    /// Plaintext modulus `t`.
    #[must_use]
    pub fn plaintext_modulus(&self) -> u64 {
        self.scheme.plaintext_modulus
    }

    /// Encode `slots` as a packed plaintext and encrypt it under the
    /// public key. One ciphertext carries the whole candidate vector.
    pub fn encrypt(&self, slots: &[u64]) -> Result<Ciphertext, TallyError> {
        let pt = Plaintext::try_encode(slots, Encoding::simd(), &self.params)?;
        let ct = self.public.try_encrypt(&pt, &mut rand::rng())?;
        Ok(ct)
    }

    /// Slot-wise homomorphic addition; decrypting the result yields the
    /// element-wise sum of the two plaintext vectors modulo `t`.
    #[must_use]
    pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Ciphertext {
        a + b
    }

    /// Decrypt and decode the full slot vector.
    ///
    /// The sign convention of the raw values is implementation-defined;
    /// they are only meaningful modulo `t`. Callers normalize, see
    /// [`crate::engine::TallyEngine::decrypt_tally`].
    pub fn decrypt_raw(&self, ct: &Ciphertext) -> Result<Vec<u64>, TallyError> {
        let pt = self.secret.try_decrypt(ct)?;
        let slots = Vec::<u64>::try_decode(&pt, Encoding::simd())?;
        Ok(slots)
    }
}
