use std::sync::atomic::{AtomicBool, Ordering};
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info};
use zeroize::Zeroize;
use crate::paillier::math::{gcd, l_function, lcm, mod_inverse, neg_mod, random_prime_over};
use crate::paillier::strategy::Strategy;
use crate::crypto_error::CryptoError;

// Taille minimale de module n acceptée
pub const MIN_KEY_BITS: u64 = 128;

// Budget de tentatives (paires de premiers, recherche de g) avant abandon
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1_000;

// Nombre de témoins Miller-Rabin par candidat
pub const DEFAULT_MILLER_RABIN_ROUNDS: u32 = 20;

// ============================================================================
// Paramètres publics propres à chaque stratégie
// ============================================================================
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicParams {
    /// g aléatoire de Z*_{n²}
    Direct { g: BigUint },
    /// g = n+1
    GeneratorSimplified { g: BigUint },
    /// hs = (-x²)^n mod n², max_alpha = 2^⌈k/2⌉
    ExponentOptimized { hs: BigUint, max_alpha: BigUint },
    /// Mêmes paramètres publics que ExponentOptimized
    Crt { hs: BigUint, max_alpha: BigUint },
}

impl PublicParams {
    pub fn strategy(&self) -> Strategy {
        match self {
            PublicParams::Direct { .. }              => Strategy::Direct,
            PublicParams::GeneratorSimplified { .. } => Strategy::GeneratorSimplified,
            PublicParams::ExponentOptimized { .. }   => Strategy::ExponentOptimized,
            PublicParams::Crt { .. }                 => Strategy::Crt,
        }
    }
}

// ============================================================================
// Clé publique Paillier — pas de données secrètes, pas de zeroize nécessaire
// ============================================================================
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    n:         BigUint,
    n_squared: BigUint,
    params:    PublicParams,
}

impl PublicKey {
    /// Assemble une clé publique et vérifie la cohérence des paramètres
    /// avec n. Utilisé par le keygen et par le chargement depuis le disque.
    pub fn new(n: BigUint, params: PublicParams) -> Result<Self, CryptoError> {
        if n < BigUint::from(3u32) {
            return Err(CryptoError::KeyCoherenceError("n trop petit"));
        }
        let n_squared = &n * &n;

        match &params {
            PublicParams::Direct { g } => {
                if g >= &n_squared || !gcd(g, &n_squared).is_one() {
                    return Err(CryptoError::KeyCoherenceError("g hors de Z*_{n²}"));
                }
            }
            PublicParams::GeneratorSimplified { g } => {
                if g != &(&n + BigUint::one()) {
                    return Err(CryptoError::KeyCoherenceError("g != n+1"));
                }
            }
            PublicParams::ExponentOptimized { hs, max_alpha }
            | PublicParams::Crt { hs, max_alpha } => {
                if hs.is_zero() || hs >= &n_squared {
                    return Err(CryptoError::KeyCoherenceError("hs hors de [1, n²)"));
                }
                if max_alpha <= &BigUint::from(2u32) {
                    return Err(CryptoError::KeyCoherenceError("max_alpha <= 2"));
                }
            }
        }

        Ok(PublicKey { n, n_squared, params })
    }

    pub fn n(&self) -> &BigUint { &self.n }

    pub fn n_squared(&self) -> &BigUint { &self.n_squared }

    pub fn params(&self) -> &PublicParams { &self.params }

    pub fn strategy(&self) -> Strategy { self.params.strategy() }

    /// Taille de la clé en bits (bits de n)
    pub fn bits(&self) -> u64 { self.n.bits() }
}

// ============================================================================
// Helper : efface les octets internes d'un BigUint
// ============================================================================
fn zeroize_biguint(n: &mut BigUint) {
    n.set_zero();
}

// ============================================================================
// Termes précalculés du déchiffrement CRT
// ============================================================================
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrtParams {
    p:         BigUint,
    q:         BigUint,
    p_squared: BigUint,
    q_squared: BigUint,
    /// ((p-1)·q)^-1 mod p
    hp:        BigUint,
    /// ((q-1)·p)^-1 mod q
    hq:        BigUint,
    /// p^-1 mod q
    p_inverse: BigUint,
}

impl CrtParams {
    /// Recalcule tous les termes à partir des seuls facteurs p et q.
    ///
    /// p et q doivent être distincts, impairs, ≥ 3 et ≡ 3 (mod 4), comme ceux
    /// tirés par le keygen. Tout autre couple est refusé avant le moindre calcul.
    pub fn from_factors(p: BigUint, q: BigUint) -> Result<Self, CryptoError> {
        let three = BigUint::from(3u32);
        let four = BigUint::from(4u32);
        if p < three || q < three {
            return Err(CryptoError::KeyCoherenceError("facteur < 3"));
        }
        if p.is_even() || q.is_even() {
            return Err(CryptoError::KeyCoherenceError("facteur pair"));
        }
        if &p % &four != three || &q % &four != three {
            return Err(CryptoError::KeyCoherenceError("facteur non ≡ 3 (mod 4)"));
        }
        if p == q {
            return Err(CryptoError::KeyCoherenceError("p == q"));
        }
        let one = BigUint::one();
        let p_minus_1 = &p - &one;
        let q_minus_1 = &q - &one;

        let hp = mod_inverse(&(&p_minus_1 * &q), &p)?;
        let hq = mod_inverse(&(&q_minus_1 * &p), &q)?;
        let p_inverse = mod_inverse(&p, &q)?;

        Ok(CrtParams {
            p_squared: &p * &p,
            q_squared: &q * &q,
            p,
            q,
            hp,
            hq,
            p_inverse,
        })
    }

    pub fn p(&self) -> &BigUint { &self.p }
    pub fn q(&self) -> &BigUint { &self.q }
    pub fn p_squared(&self) -> &BigUint { &self.p_squared }
    pub fn q_squared(&self) -> &BigUint { &self.q_squared }
    pub fn hp(&self) -> &BigUint { &self.hp }
    pub fn hq(&self) -> &BigUint { &self.hq }
    pub fn p_inverse(&self) -> &BigUint { &self.p_inverse }
}

impl Zeroize for CrtParams {
    fn zeroize(&mut self) {
        zeroize_biguint(&mut self.p);
        zeroize_biguint(&mut self.q);
        zeroize_biguint(&mut self.p_squared);
        zeroize_biguint(&mut self.q_squared);
        zeroize_biguint(&mut self.hp);
        zeroize_biguint(&mut self.hq);
        zeroize_biguint(&mut self.p_inverse);
    }
}

// ============================================================================
// Paramètres privés : (λ, μ) ou les facteurs de n pour le CRT
// ============================================================================
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrivateParams {
    Lambda { lambda: BigUint, mu: BigUint },
    Factors(CrtParams),
}

impl Zeroize for PrivateParams {
    fn zeroize(&mut self) {
        match self {
            PrivateParams::Lambda { lambda, mu } => {
                zeroize_biguint(lambda);
                zeroize_biguint(mu);
            }
            PrivateParams::Factors(crt) => crt.zeroize(),
        }
    }
}

// ============================================================================
// Clé privée Paillier — ZEROISÉE À LA DESTRUCTION
// ============================================================================
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateKey {
    public_key: PublicKey,
    params:     PrivateParams,
}

impl PrivateKey {
    /// Associe des paramètres privés à une clé publique.
    ///
    /// Retourne `Configuration` si la forme des paramètres ne correspond pas
    /// à la stratégie publique (`Factors` exigé pour Crt, `Lambda` sinon),
    /// et `KeyCoherenceError` si p·q != n ou si μ n'inverse pas λ.
    pub fn new(public_key: PublicKey, params: PrivateParams) -> Result<Self, CryptoError> {
        let strategy = public_key.strategy();
        match (&params, strategy) {
            (PrivateParams::Factors(crt), Strategy::Crt) => {
                if &(crt.p() * crt.q()) != public_key.n() {
                    return Err(CryptoError::KeyCoherenceError("p·q != n"));
                }
            }
            (PrivateParams::Lambda { lambda, mu }, s) if s != Strategy::Crt => {
                let n = public_key.n();
                if mu.is_zero() || mu >= n {
                    return Err(CryptoError::KeyCoherenceError("mu hors de [1, n)"));
                }
                // μ doit inverser L(g^λ mod n²), qui vaut λ mod n pour g = n+1
                // comme pour hs
                let l_g_lambda = match public_key.params() {
                    PublicParams::Direct { g } => l_function(&g.modpow(lambda, public_key.n_squared()), n),
                    _ => lambda % n,
                };
                if !((mu * l_g_lambda) % n).is_one() {
                    return Err(CryptoError::KeyCoherenceError("mu·L(g^λ) != 1 (mod n)"));
                }
            }
            (PrivateParams::Factors(_), s) | (PrivateParams::Lambda { .. }, s) => {
                return Err(CryptoError::Configuration(format!(
                    "paramètres privés incompatibles avec la stratégie {s}"
                )));
            }
        }
        Ok(PrivateKey { public_key, params })
    }

    pub fn public_key(&self) -> &PublicKey { &self.public_key }

    pub fn params(&self) -> &PrivateParams { &self.params }

    pub fn strategy(&self) -> Strategy { self.public_key.strategy() }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.params.zeroize();
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

// ============================================================================
// Paire de clés
// ============================================================================
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public_key:  PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public_key, self.private_key)
    }
}

// ============================================================================
// Génération de clés Paillier
//
// p et q de key_size/2 bits (bit de poids fort forcé, puis premier suivant),
// tirés jusqu'à ce que p != q et bits(p·q) == key_size. Pour ExponentOptimized
// et Crt les premiers sont de plus ≡ 3 (mod 4), ce qui autorise
//   λ = (p-1)(q-1)/2
// et fait de h = -x² un élément tué par λ dans Z*_n.
//
// Rien n'est publié tant que p, q et tous les paramètres dérivés ne sont pas
// calculés : une annulation ou un échec ne laisse aucun état partiel.
// ============================================================================
#[derive(Clone, Debug)]
pub struct KeyGenerator {
    max_attempts: u32,
    rounds:       u32,
}

impl Default for KeyGenerator {
    fn default() -> Self { Self::new() }
}

impl KeyGenerator {
    pub fn new() -> Self {
        KeyGenerator {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rounds:       DEFAULT_MILLER_RABIN_ROUNDS,
        }
    }

    /// Borne le nombre de tentatives de chaque boucle de rejet.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn miller_rabin_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds.max(1);
        self
    }

    pub fn generate<R>(&self, key_size: u64, strategy: Strategy, rng: &mut R) -> Result<KeyPair, CryptoError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        self.run(key_size, strategy, rng, None)
    }

    /// Comme `generate`, mais abandonne la recherche dès que `cancel` passe
    /// à `true` (vérifié à chaque candidat premier et à chaque tirage de g).
    pub fn generate_cancellable<R>(
        &self,
        key_size: u64,
        strategy: Strategy,
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> Result<KeyPair, CryptoError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        self.run(key_size, strategy, rng, Some(cancel))
    }

    fn run<R>(
        &self,
        key_size: u64,
        strategy: Strategy,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<KeyPair, CryptoError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        if key_size < MIN_KEY_BITS {
            return Err(CryptoError::KeySizeTooSmall {
                requested: key_size,
                minimum:   MIN_KEY_BITS,
            });
        }
        if key_size % 2 != 0 {
            return Err(CryptoError::Configuration(format!(
                "la taille de clé doit être paire, reçu {key_size}"
            )));
        }

        let (p, q, attempts) = self.generate_p_q(key_size, strategy, rng, cancel)?;
        let keypair = self.derive(key_size, strategy, p, q, rng, cancel)?;

        info!(key_size, %strategy, attempts, "paire de clés Paillier générée");
        Ok(keypair)
    }

    // Tire des paires (p, q) jusqu'à bits(p·q) == key_size
    fn generate_p_q<R>(
        &self,
        key_size: u64,
        strategy: Strategy,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<(BigUint, BigUint, u32), CryptoError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let half = key_size / 2;

        for attempt in 1..=self.max_attempts {
            let p = self.draw_prime(half, strategy, rng, cancel)?;
            let mut q = self.draw_prime(half, strategy, rng, cancel)?;
            while q == p {
                q = self.draw_prime(half, strategy, rng, cancel)?;
            }

            let n_bits = (&p * &q).bits();
            if n_bits == key_size {
                return Ok((p, q, attempt));
            }
            debug!(attempt, n_bits, key_size, "module rejeté, nouvelle paire");
        }

        Err(CryptoError::KeyGenerationFailure { attempts: self.max_attempts })
    }

    // Un premier de `bits` bits ; ≡ 3 (mod 4) si la stratégie l'exige
    fn draw_prime<R>(
        &self,
        bits: u64,
        strategy: Strategy,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<BigUint, CryptoError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let three = BigUint::from(3u32);
        let four = BigUint::from(4u32);

        for _ in 0..self.max_attempts {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                debug!("recherche de premiers annulée");
                return Err(CryptoError::KeyGenerationCancelled);
            }
            let prime = random_prime_over(bits, self.rounds, rng, cancel)?;
            if !strategy.requires_blum_primes() || &prime % &four == three {
                return Ok(prime);
            }
        }

        Err(CryptoError::KeyGenerationFailure { attempts: self.max_attempts })
    }

    fn derive<R>(
        &self,
        key_size: u64,
        strategy: Strategy,
        p: BigUint,
        q: BigUint,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<KeyPair, CryptoError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let one = BigUint::one();
        let n = &p * &q;
        let n_squared = &n * &n;
        let p_minus_1 = &p - &one;
        let q_minus_1 = &q - &one;

        let (public_params, private_params) = match strategy {
            Strategy::Direct => {
                let lambda = lcm(&p_minus_1, &q_minus_1);
                let (g, mu) = self.search_generator(&n, &n_squared, &lambda, rng, cancel)?;
                (PublicParams::Direct { g }, PrivateParams::Lambda { lambda, mu })
            }
            Strategy::GeneratorSimplified => {
                // (n+1)^λ mod n² = 1 + λ·n, donc L(g^λ) = λ mod n
                let lambda = lcm(&p_minus_1, &q_minus_1);
                let mu = mod_inverse(&lambda, &n)?;
                let g = &n + &one;
                (PublicParams::GeneratorSimplified { g }, PrivateParams::Lambda { lambda, mu })
            }
            Strategy::ExponentOptimized | Strategy::Crt => {
                let (hs, max_alpha) = blinded_generator(key_size, &p, &q, &n, &n_squared, rng);
                if strategy == Strategy::Crt {
                    let crt = CrtParams::from_factors(p, q)?;
                    (PublicParams::Crt { hs, max_alpha }, PrivateParams::Factors(crt))
                } else {
                    let lambda = (&p_minus_1 * &q_minus_1) >> 1u32;
                    let mu = mod_inverse(&lambda, &n)?;
                    (
                        PublicParams::ExponentOptimized { hs, max_alpha },
                        PrivateParams::Lambda { lambda, mu },
                    )
                }
            }
        };

        let public_key = PublicKey::new(n, public_params)?;
        let private_key = PrivateKey::new(public_key.clone(), private_params)?;
        Ok(KeyPair { public_key, private_key })
    }

    // ------------------------------------------------------------------------
    // Recherche de g pour la stratégie Direct.
    //
    // g est validé (gcd(g, n²) = 1 et L(g^λ mod n²) inversible mod n) AVANT
    // que μ ne soit retenu : un g rejeté ne produit jamais de clé.
    // ------------------------------------------------------------------------
    fn search_generator<R>(
        &self,
        n: &BigUint,
        n_squared: &BigUint,
        lambda: &BigUint,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<(BigUint, BigUint), CryptoError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                debug!(attempt, "recherche de g annulée");
                return Err(CryptoError::KeyGenerationCancelled);
            }
            let g = rng.gen_biguint_range(n, n_squared);
            if !gcd(&g, n_squared).is_one() {
                debug!(attempt, "g non inversible mod n², nouveau tirage");
                continue;
            }
            let l_g_lambda = l_function(&g.modpow(lambda, n_squared), n);
            match mod_inverse(&l_g_lambda, n) {
                Ok(mu) => return Ok((g, mu)),
                Err(_) => debug!(attempt, "L(g^λ) non inversible mod n, nouveau tirage"),
            }
        }
        Err(CryptoError::KeyGenerationFailure { attempts: self.max_attempts })
    }
}

// hs = (-x²)^n mod n² avec x secret dans [2, min(p, q)), max_alpha = 2^⌈k/2⌉
fn blinded_generator<R>(
    key_size: u64,
    p: &BigUint,
    q: &BigUint,
    n: &BigUint,
    n_squared: &BigUint,
    rng: &mut R,
) -> (BigUint, BigUint)
where
    R: RngCore + CryptoRng + ?Sized,
{
    let bound = if p < q { p } else { q };
    let mut x = rng.gen_biguint_range(&BigUint::from(2u32), bound);
    let h = neg_mod(&(&x * &x), n_squared);
    let hs = h.modpow(n, n_squared);
    zeroize_biguint(&mut x);

    let max_alpha = BigUint::one() << key_size.div_ceil(2);
    (hs, max_alpha)
}

/// Génère une paire de clés avec le `KeyGenerator` par défaut.
pub fn generate_keypair<R>(key_size: u64, strategy: Strategy, rng: &mut R) -> Result<KeyPair, CryptoError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    KeyGenerator::new().generate(key_size, strategy, rng)
}
