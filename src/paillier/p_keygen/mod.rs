pub mod p_keygen;

pub use p_keygen::{
    PublicKey, PublicParams, PrivateKey, PrivateParams, CrtParams, KeyPair,
    KeyGenerator, generate_keypair,
    MIN_KEY_BITS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MILLER_RABIN_ROUNDS,
};
