use num_bigint::BigUint;
use num_traits::One;
use crate::paillier::ciphertext::Ciphertext;
use crate::paillier::math::{gcd, l_function};
use crate::paillier::p_encrypt::Encryptor;
use crate::paillier::p_keygen::{CrtParams, PrivateKey, PrivateParams, PublicKey};
use crate::crypto_error::CryptoError;

// ============================================================================
// Moteur de déchiffrement — construit à partir de la clé privée
//
// Le rôle est fixé à la construction ; la forme des paramètres privés a déjà
// été validée contre la stratégie par PrivateKey::new.
// ============================================================================
#[derive(Clone, Debug)]
pub struct Decryptor {
    private_key: PrivateKey,
}

impl Decryptor {
    pub fn new(private_key: PrivateKey) -> Self {
        Decryptor { private_key }
    }

    pub fn public_key(&self) -> &PublicKey {
        self.private_key.public_key()
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Un déchiffreur peut aussi chiffrer avec sa clé publique.
    pub fn encryptor(&self) -> Encryptor {
        Encryptor::new(self.public_key().clone())
    }

    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<BigUint, CryptoError> {
        let pk = self.public_key();
        if ciphertext.n_squared() != pk.n_squared() {
            return Err(CryptoError::ModulusMismatch);
        }
        let c = ciphertext.value();
        // c doit appartenir à Z*_{n²} : sinon L(·) n'est plus défini
        if c >= pk.n_squared() || !gcd(c, pk.n()).is_one() {
            return Err(CryptoError::CiphertextOutOfRange);
        }

        match self.private_key.params() {
            PrivateParams::Lambda { lambda, mu } => Ok(decrypt_lambda(c, pk, lambda, mu)),
            PrivateParams::Factors(crt) => Ok(decrypt_crt(c, pk.n(), crt)),
        }
    }
}

// m = L(c^λ mod n²) · μ  mod n
fn decrypt_lambda(c: &BigUint, pk: &PublicKey, lambda: &BigUint, mu: &BigUint) -> BigUint {
    let c_lambda = c.modpow(lambda, pk.n_squared());
    let numerator = l_function(&c_lambda, pk.n());
    (numerator * mu) % pk.n()
}

// ---------------------------------------------------------------------------
// Déchiffrement CRT : deux exponentiations sur des opérandes de demi-taille
//   mp = L_p(c^(p-1) mod p²) · hp  mod p
//   mq = L_q(c^(q-1) mod q²) · hq  mod q
// puis recombinaison
//   u = (mq - mp) · p^-1  mod q
//   m = mp + u·p          mod n
// ---------------------------------------------------------------------------
fn decrypt_crt(c: &BigUint, n: &BigUint, crt: &CrtParams) -> BigUint {
    let one = BigUint::one();
    let (p, q) = (crt.p(), crt.q());

    let cp = c.modpow(&(p - &one), crt.p_squared());
    let mp = (l_function(&cp, p) * crt.hp()) % p;

    let cq = c.modpow(&(q - &one), crt.q_squared());
    let mq = (l_function(&cq, q) * crt.hq()) % q;

    // mq - mp peut être négatif : on travaille sur mq + q - (mp mod q)
    let diff = (&mq + q - (&mp % q)) % q;
    let u = (diff * crt.p_inverse()) % q;

    (mp + u * p) % n
}

/// Construit un moteur en mode déchiffrement.
pub fn make_decryptor(private_key: PrivateKey) -> Decryptor {
    Decryptor::new(private_key)
}
