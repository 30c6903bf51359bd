use std::sync::atomic::{AtomicBool, Ordering};
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::RngCore;
use crate::crypto_error::CryptoError;

// ---------------------------------------------------------------------------
// Table de petits premiers (crible préliminaire, couvre jusqu'à 997)
// ---------------------------------------------------------------------------
const SMALL_PRIMES: &[u32] = &[
      3,   5,   7,  11,  13,  17,  19,  23,  29,  31,
     37,  41,  43,  47,  53,  59,  61,  67,  71,  73,
     79,  83,  89,  97, 101, 103, 107, 109, 113, 127,
    131, 137, 139, 149, 151, 157, 163, 167, 173, 179,
    181, 191, 193, 197, 199, 211, 223, 227, 229, 233,
    239, 241, 251, 257, 263, 269, 271, 277, 281, 283,
    293, 307, 311, 313, 317, 331, 337, 347, 349, 353,
    359, 367, 373, 379, 383, 389, 397, 401, 409, 419,
    421, 431, 433, 439, 443, 449, 457, 461, 463, 467,
    479, 487, 491, 499, 503, 509, 521, 523, 541, 547,
    557, 563, 569, 571, 577, 587, 593, 599, 601, 607,
    613, 617, 619, 631, 641, 643, 647, 653, 659, 661,
    673, 677, 683, 691, 701, 709, 719, 727, 733, 739,
    743, 751, 757, 761, 769, 773, 787, 797, 809, 811,
    821, 823, 827, 829, 839, 853, 857, 859, 863, 877,
    881, 883, 887, 907, 911, 919, 929, 937, 941, 947,
    953, 967, 971, 977, 983, 991, 997,
];

/// Fonction L(u) = (u-1)/n.
///
/// Division entière exacte : l'argument est ≡ 1 (mod n) par construction
/// (c^λ mod n², ou c^(p-1) mod p² côté CRT).
pub fn l_function(u: &BigUint, n: &BigUint) -> BigUint {
    (u - BigUint::one()) / n
}

// Calcule le pgcd de deux nombres
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    a.gcd(b)
}

pub fn lcm(a: &BigUint, b: &BigUint) -> BigUint {
    a.lcm(b)
}

// Opposé modulaire : -x mod m, dans [0, m)
pub fn neg_mod(x: &BigUint, m: &BigUint) -> BigUint {
    let r = x % m;
    if r.is_zero() {
        r
    } else {
        m - r
    }
}

// ---------------------------------------------------------------------------
// Calcule l'inverse modulaire de a mod n.
// Retourne Err(CryptoError::NoModularInverse) si gcd(a,n) != 1.
// ---------------------------------------------------------------------------
pub fn mod_inverse(a: &BigUint, n: &BigUint) -> Result<BigUint, CryptoError> {
    if n.is_zero() {
        return Err(CryptoError::NoModularInverse);
    }
    let (g, x) = extended_gcd(&(a % n), n);
    if !g.is_one() {
        return Err(CryptoError::NoModularInverse);
    }

    let n_big = BigInt::from(n.clone());
    let x_mod = x.mod_floor(&n_big);

    x_mod.to_biguint().ok_or(CryptoError::NegativeConversion)
}

// Euclide étendu : renvoie (gcd, s) tel que s·a ≡ gcd (mod b)
fn extended_gcd(a: &BigUint, b: &BigUint) -> (BigUint, BigInt) {
    let (mut old_r, mut r) = (BigInt::from(a.clone()), BigInt::from(b.clone()));
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let quotient = &old_r / &r;

        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    (old_r.to_biguint().unwrap_or_default(), old_s)
}

// Vérifie si n est divisible par un des petits premiers de la table
// (n lui-même premier de la table n'est pas rejeté).
fn is_divisible_by_small_prime(n: &BigUint) -> bool {
    for &p in SMALL_PRIMES {
        let bp = BigUint::from(p);
        if n == &bp {
            return false;
        }
        if (n % &bp).is_zero() {
            return true;
        }
    }
    false
}

/// Test de primalité probabiliste de Miller-Rabin avec `rounds` témoins
/// aléatoires tirés dans [2, n-2].
pub fn is_probable_prime<R>(n: &BigUint, rounds: u32, rng: &mut R) -> bool
where
    R: RngCore + ?Sized,
{
    let two = BigUint::from(2u32);
    if n < &two { return false; }
    if n == &two { return true; }
    if n.is_even() { return false; }
    if SMALL_PRIMES.iter().any(|&p| n == &BigUint::from(p)) { return true; }
    if is_divisible_by_small_prime(n) { return false; }

    let n_minus_1 = n - BigUint::one();
    let mut d = n_minus_1.clone();
    let mut r = 0u32;
    while d.is_even() {
        d >>= 1;
        r += 1;
    }

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_1 {
            continue 'witness;
        }
        for _ in 0..r.saturating_sub(1) {
            x = (&x * &x) % n;
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Plus petit premier probable strictement supérieur à `start`.
///
/// `cancel` est relu avant chaque test de candidat ; s'il passe à `true` la
/// recherche s'arrête sur `KeyGenerationCancelled`.
pub fn next_probable_prime<R>(
    start: &BigUint,
    rounds: u32,
    rng: &mut R,
    cancel: Option<&AtomicBool>,
) -> Result<BigUint, CryptoError>
where
    R: RngCore + ?Sized,
{
    let two = BigUint::from(2u32);
    if start < &two {
        return Ok(two);
    }

    let mut candidate = start + BigUint::one();
    if candidate.is_even() {
        candidate += BigUint::one();
    }
    loop {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(CryptoError::KeyGenerationCancelled);
        }
        if is_probable_prime(&candidate, rounds, rng) {
            return Ok(candidate);
        }
        candidate += &two;
    }
}

// ---------------------------------------------------------------------------
// Tire `nbits` bits aléatoires, force le bit de poids fort, puis avance
// jusqu'au premier probable suivant.
//
// Le résultat a en général exactement `nbits` bits ; le cas rare où la
// recherche déborde d'un bit est absorbé par le contrôle bits(n) du keygen.
// ---------------------------------------------------------------------------
pub fn random_prime_over<R>(
    nbits: u64,
    rounds: u32,
    rng: &mut R,
    cancel: Option<&AtomicBool>,
) -> Result<BigUint, CryptoError>
where
    R: RngCore + ?Sized,
{
    let mut candidate = rng.gen_biguint(nbits);
    candidate.set_bit(nbits - 1, true);
    next_probable_prime(&candidate, rounds, rng, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_l_function_exact_division() {
        let n = BigUint::from(35u32);
        let u = BigUint::from(1u32 + 4 * 35);
        assert_eq!(l_function(&u, &n), BigUint::from(4u32));
    }

    #[test]
    fn test_mod_inverse() {
        let inv = mod_inverse(&BigUint::from(3u32), &BigUint::from(11u32)).unwrap();
        assert_eq!(inv, BigUint::from(4u32));

        // a > n est réduit d'abord
        let inv = mod_inverse(&BigUint::from(14u32), &BigUint::from(11u32)).unwrap();
        assert_eq!(inv, BigUint::from(4u32));

        assert_eq!(
            mod_inverse(&BigUint::from(6u32), &BigUint::from(9u32)),
            Err(CryptoError::NoModularInverse)
        );
    }

    #[test]
    fn test_neg_mod() {
        let m = BigUint::from(13u32);
        assert_eq!(neg_mod(&BigUint::from(4u32), &m), BigUint::from(9u32));
        assert_eq!(neg_mod(&BigUint::from(26u32), &m), BigUint::zero());
        assert_eq!(neg_mod(&BigUint::from(17u32), &m), BigUint::from(9u32));
    }

    #[test]
    fn test_gcd_lcm() {
        let a = BigUint::from(12u32);
        let b = BigUint::from(18u32);
        assert_eq!(gcd(&a, &b), BigUint::from(6u32));
        assert_eq!(lcm(&a, &b), BigUint::from(36u32));
    }

    #[test]
    fn test_is_probable_prime_small_values() {
        let mut rng = StdRng::seed_from_u64(1);
        let primes = [2u32, 3, 5, 97, 997, 1009, 7919, 65537];
        for p in primes {
            assert!(is_probable_prime(&BigUint::from(p), 20, &mut rng), "{p}");
        }
        let composites = [0u32, 1, 4, 561, 1105, 7917, 65535];
        for c in composites {
            assert!(!is_probable_prime(&BigUint::from(c), 20, &mut rng), "{c}");
        }
    }

    #[test]
    fn test_next_probable_prime() {
        let mut rng = StdRng::seed_from_u64(2);
        let next = |start: u32, rng: &mut StdRng| {
            next_probable_prime(&BigUint::from(start), 20, rng, None).unwrap()
        };
        assert_eq!(next(0, &mut rng), BigUint::from(2u32));
        assert_eq!(next(2, &mut rng), BigUint::from(3u32));
        assert_eq!(next(14, &mut rng), BigUint::from(17u32));
        assert_eq!(next(7907, &mut rng), BigUint::from(7919u32));
    }

    #[test]
    fn test_prime_search_stops_when_cancelled() {
        let mut rng = StdRng::seed_from_u64(4);
        let cancel = AtomicBool::new(true);
        let err = random_prime_over(512, 20, &mut rng, Some(&cancel)).unwrap_err();
        assert_eq!(err, CryptoError::KeyGenerationCancelled);

        // flag baissé : recherche normale
        let cancel = AtomicBool::new(false);
        assert!(next_probable_prime(&BigUint::from(14u32), 20, &mut rng, Some(&cancel)).is_ok());
    }

    #[test]
    fn test_random_prime_over_sets_top_bit() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..4 {
            let p = random_prime_over(128, 20, &mut rng, None).unwrap();
            assert!(p.bits() >= 128);
            assert!(is_probable_prime(&p, 20, &mut rng));
        }
    }
}
