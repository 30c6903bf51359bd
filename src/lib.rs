//! Cryptosystème de Paillier (chiffrement partiellement homomorphe).
//!
//! Quatre stratégies partagent le même contrat : `Direct` (g aléatoire),
//! `GeneratorSimplified` (g = n+1), `ExponentOptimized` (générateur aveuglé
//! hs, aléa borné) et `Crt` (déchiffrement par restes chinois).
//!
//! ```no_run
//! use num_bigint::BigUint;
//! use paillier_phe::{generate_keypair, make_decryptor, make_encryptor, Strategy};
//! use rand_core::OsRng;
//!
//! let kp = generate_keypair(2048, Strategy::Crt, &mut OsRng)?;
//! let enc = make_encryptor(kp.public_key.clone());
//! let dec = make_decryptor(kp.private_key);
//!
//! let c1 = enc.encrypt(&BigUint::from(20u32), &mut OsRng)?;
//! let c2 = enc.encrypt(&BigUint::from(22u32), &mut OsRng)?;
//! assert_eq!(dec.decrypt(&c1.add(&c2)?)?, BigUint::from(42u32));
//! # Ok::<(), paillier_phe::CryptoError>(())
//! ```

// Déclaration des modules
pub mod crypto_error;
pub mod paillier;
pub mod key_management;

pub use crate::paillier::math;
pub use crate::paillier::p_keygen;
pub use crate::paillier::p_encrypt;
pub use crate::paillier::p_decrypt;

// Fonctions mathématiques principales
pub use crate::paillier::math::{l_function, gcd, lcm, mod_inverse};

// Types et points d'entrée
pub use crate::paillier::strategy::Strategy;
pub use crate::paillier::ciphertext::Ciphertext;
pub use p_keygen::{
    PublicKey, PublicParams, PrivateKey, PrivateParams, CrtParams, KeyPair,
    KeyGenerator, generate_keypair, MIN_KEY_BITS,
};
pub use p_encrypt::{Encryptor, make_encryptor};
pub use p_decrypt::{Decryptor, make_decryptor};

// Erreur centralisée
pub use crypto_error::CryptoError;
