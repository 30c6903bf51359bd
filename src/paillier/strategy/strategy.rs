use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use crate::crypto_error::CryptoError;

// ============================================================================
// Stratégies d'implémentation Paillier
//
// Les quatre variantes partagent le même contrat (dec(enc(m)) = m, addition
// et multiplication scalaire homomorphes) mais diffèrent par ce qui est
// stocké dans la clé et par le coût du déchiffrement.
// ============================================================================
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// g aléatoire dans [n, n²), c = g^m · r^n mod n²
    Direct,
    /// g = n+1, g^m calculé comme 1 + m·n
    GeneratorSimplified,
    /// hs = (-x²)^n mod n², aléa α borné par 2^⌈k/2⌉
    ExponentOptimized,
    /// Chiffrement identique à ExponentOptimized, déchiffrement par CRT sur p² et q²
    Crt,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Direct,
        Strategy::GeneratorSimplified,
        Strategy::ExponentOptimized,
        Strategy::Crt,
    ];

    /// Nom canonique, accepté par `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Direct              => "direct",
            Strategy::GeneratorSimplified => "generator",
            Strategy::ExponentOptimized   => "exponent",
            Strategy::Crt                 => "crt",
        }
    }

    /// Les premiers doivent vérifier p ≡ q ≡ 3 (mod 4) pour λ = (p-1)(q-1)/2.
    pub fn requires_blum_primes(self) -> bool {
        matches!(self, Strategy::ExponentOptimized | Strategy::Crt)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "origin"                        => Ok(Strategy::Direct),
            "generator" | "g" | "generator_simplified" => Ok(Strategy::GeneratorSimplified),
            "exponent" | "exp" | "exponent_optimized"  => Ok(Strategy::ExponentOptimized),
            "crt"                                      => Ok(Strategy::Crt),
            other => Err(CryptoError::Configuration(format!("stratégie inconnue : {other:?}"))),
        }
    }
}
