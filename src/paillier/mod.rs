pub mod math;
pub mod strategy;
pub mod ciphertext;
pub mod p_keygen;
pub mod p_encrypt;
pub mod p_decrypt;
