use num_bigint::BigUint;
use crate::crypto_error::CryptoError;

// ============================================================================
// Chiffré Paillier : élément de Z*_{n²}, accompagné de son module n².
//
// Immuable : add / scalar_mul renvoient un nouveau chiffré. La plage du
// clair n'est vérifiée qu'au chiffrement, jamais ici.
// ============================================================================
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    value:     BigUint,
    n_squared: BigUint,
}

impl Ciphertext {
    /// Reconstruit un chiffré transporté hors de la crate.
    ///
    /// Retourne `CiphertextOutOfRange` si `value >= n_squared`.
    pub fn from_parts(value: BigUint, n_squared: BigUint) -> Result<Self, CryptoError> {
        if value >= n_squared {
            return Err(CryptoError::CiphertextOutOfRange);
        }
        Ok(Ciphertext { value, n_squared })
    }

    // Construction interne : value déjà réduit mod n²
    pub(crate) fn new_unchecked(value: BigUint, n_squared: BigUint) -> Self {
        Ciphertext { value, n_squared }
    }

    pub fn value(&self) -> &BigUint { &self.value }

    pub fn n_squared(&self) -> &BigUint { &self.n_squared }

    /// Addition homomorphe : Dec(c1 · c2 mod n²) = m1 + m2 mod n.
    pub fn add(&self, other: &Ciphertext) -> Result<Ciphertext, CryptoError> {
        if self.n_squared != other.n_squared {
            return Err(CryptoError::ModulusMismatch);
        }
        let value = (&self.value * &other.value) % &self.n_squared;
        Ok(Ciphertext::new_unchecked(value, self.n_squared.clone()))
    }

    /// Multiplication par un scalaire connu : Dec(c^k mod n²) = k·m mod n.
    pub fn scalar_mul(&self, k: &BigUint) -> Ciphertext {
        let value = self.value.modpow(k, &self.n_squared);
        Ciphertext::new_unchecked(value, self.n_squared.clone())
    }

    /// Paillier n'est pas multiplicativement homomorphe : le produit de deux
    /// chiffrés est toujours refusé.
    pub fn multiply(&self, _other: &Ciphertext) -> Result<Ciphertext, CryptoError> {
        Err(CryptoError::UnsupportedOperation(
            "produit de deux chiffrés Paillier (seul le produit par un scalaire clair est défini)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ct(value: u32, n_squared: u32) -> Ciphertext {
        Ciphertext::from_parts(BigUint::from(value), BigUint::from(n_squared)).unwrap()
    }

    #[test]
    fn test_from_parts_range() {
        assert!(Ciphertext::from_parts(BigUint::from(49u32), BigUint::from(49u32)).is_err());
        assert!(Ciphertext::from_parts(BigUint::from(48u32), BigUint::from(49u32)).is_ok());
    }

    #[test]
    fn test_add_multiplies_mod_n_squared() {
        let sum = ct(10, 49).add(&ct(8, 49)).unwrap();
        assert_eq!(sum.value(), &BigUint::from(80u32 % 49));
        assert_eq!(sum.n_squared(), &BigUint::from(49u32));
    }

    #[test]
    fn test_add_rejects_different_keys() {
        assert_eq!(ct(3, 49).add(&ct(3, 121)), Err(CryptoError::ModulusMismatch));
    }

    #[test]
    fn test_scalar_mul_exponentiates() {
        let c = ct(3, 49).scalar_mul(&BigUint::from(4u32));
        assert_eq!(c.value(), &BigUint::from(81u32 % 49));
    }

    #[test]
    fn test_operands_are_untouched() {
        let a = ct(5, 49);
        let b = ct(6, 49);
        let _ = a.add(&b).unwrap();
        let _ = a.scalar_mul(&BigUint::from(9u32));
        assert_eq!(a, ct(5, 49));
        assert_eq!(b, ct(6, 49));
    }

    #[test]
    fn test_ciphertext_product_is_unsupported() {
        let err = ct(3, 49).multiply(&ct(4, 49)).unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedOperation(_)));
    }
}
