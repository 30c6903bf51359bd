use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand_core::{CryptoRng, OsRng, RngCore};
use crate::paillier::ciphertext::Ciphertext;
use crate::paillier::p_keygen::{PublicKey, PublicParams};
use crate::paillier::math::gcd;
use crate::crypto_error::CryptoError;

// ============================================================================
// Moteur de chiffrement — construit à partir de la seule clé publique
//
// Direct               : c = g^m · r^n            mod n²
// GeneratorSimplified  : c = (1 + m·n) · r^n      mod n²
// ExponentOptimized/Crt: c = (1 + m·n) · hs^α     mod n²
//
// Chaque appel tire un aléa frais (r ou α) : deux chiffrements du même clair
// diffèrent avec une probabilité écrasante.
// ============================================================================
#[derive(Clone, Debug)]
pub struct Encryptor {
    public_key: PublicKey,
}

impl Encryptor {
    pub fn new(public_key: PublicKey) -> Self {
        Encryptor { public_key }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    // ---------------------------------------------------------------------------
    // Retourne Err(CryptoError::MessageOutOfRange) si m >= n.
    // ---------------------------------------------------------------------------
    pub fn encrypt<R>(&self, m: &BigUint, rng: &mut R) -> Result<Ciphertext, CryptoError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let pk = &self.public_key;
        if m >= pk.n() {
            return Err(CryptoError::MessageOutOfRange);
        }
        let n_squared = pk.n_squared();

        let value = match pk.params() {
            PublicParams::Direct { g } => {
                let g_m = g.modpow(m, n_squared);
                let r_n = random_unit(pk.n(), rng).modpow(pk.n(), n_squared);
                (g_m * r_n) % n_squared
            }
            PublicParams::GeneratorSimplified { .. } => {
                let r_n = random_unit(pk.n(), rng).modpow(pk.n(), n_squared);
                (one_plus_mn(m, pk.n()) * r_n) % n_squared
            }
            PublicParams::ExponentOptimized { hs, max_alpha }
            | PublicParams::Crt { hs, max_alpha } => {
                let alpha = rng.gen_biguint_range(&BigUint::from(2u32), max_alpha);
                let hs_alpha = hs.modpow(&alpha, n_squared);
                (one_plus_mn(m, pk.n()) * hs_alpha) % n_squared
            }
        };

        Ok(Ciphertext::new_unchecked(value, n_squared.clone()))
    }

    /// Chiffre avec l'entropie système (`OsRng`).
    pub fn encrypt_with_os_rng(&self, m: &BigUint) -> Result<Ciphertext, CryptoError> {
        self.encrypt(m, &mut OsRng)
    }
}

// (n+1)^m mod n² = 1 + m·n  (binôme de Newton, les termes en n² s'annulent)
fn one_plus_mn(m: &BigUint, n: &BigUint) -> BigUint {
    BigUint::one() + m * n
}

// Choisit r dans Z*_n : r ∈ [1, n-1] et gcd(r, n) = 1
fn random_unit<R>(n: &BigUint, rng: &mut R) -> BigUint
where
    R: RngCore + CryptoRng + ?Sized,
{
    loop {
        let candidate = rng.gen_biguint_range(&BigUint::one(), n);
        if gcd(&candidate, n).is_one() {
            break candidate;
        }
    }
}

/// Construit un moteur en mode chiffrement.
pub fn make_encryptor(public_key: PublicKey) -> Encryptor {
    Encryptor::new(public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::p_keygen::generate_keypair;
    use crate::paillier::strategy::Strategy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_message_out_of_range() {
        let mut rng = StdRng::seed_from_u64(30);
        let kp = generate_keypair(256, Strategy::GeneratorSimplified, &mut rng).unwrap();
        let enc = make_encryptor(kp.public_key.clone());

        let n = kp.public_key.n().clone();
        assert_eq!(enc.encrypt(&n, &mut rng), Err(CryptoError::MessageOutOfRange));
        assert_eq!(enc.encrypt(&(&n + BigUint::from(5u32)), &mut rng), Err(CryptoError::MessageOutOfRange));
        assert!(enc.encrypt(&(&n - BigUint::one()), &mut rng).is_ok());
    }

    #[test]
    fn test_ciphertext_lives_mod_n_squared() {
        let mut rng = StdRng::seed_from_u64(31);
        for strategy in Strategy::ALL {
            let kp = generate_keypair(256, strategy, &mut rng).unwrap();
            let enc = Encryptor::new(kp.public_key.clone());
            let c = enc.encrypt(&BigUint::from(42u32), &mut rng).unwrap();
            assert_eq!(c.n_squared(), kp.public_key.n_squared());
            assert!(c.value() < kp.public_key.n_squared());
        }
    }

    #[test]
    fn test_encryption_is_probabilistic() {
        let mut rng = StdRng::seed_from_u64(32);
        for strategy in Strategy::ALL {
            let kp = generate_keypair(256, strategy, &mut rng).unwrap();
            let enc = Encryptor::new(kp.public_key.clone());
            let m = BigUint::from(7u32);
            let samples: Vec<_> = (0..8)
                .map(|_| enc.encrypt(&m, &mut rng).unwrap())
                .collect();
            let distinct = samples
                .iter()
                .enumerate()
                .filter(|(i, c)| samples[..*i].iter().all(|prev| prev != *c))
                .count();
            assert!(distinct >= 7, "{strategy}: {distinct} chiffrés distincts sur 8");
        }
    }

    #[test]
    fn test_os_rng_encryption() {
        let mut rng = StdRng::seed_from_u64(33);
        let kp = generate_keypair(256, Strategy::Crt, &mut rng).unwrap();
        let enc = Encryptor::new(kp.public_key.clone());
        assert!(enc.encrypt_with_os_rng(&BigUint::from(1u32)).is_ok());
    }
}
