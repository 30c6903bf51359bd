pub mod p_encrypt;

pub use p_encrypt::{Encryptor, make_encryptor};
