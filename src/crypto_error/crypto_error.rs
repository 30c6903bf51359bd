// ===========================================================================
// Gestion centralisée des erreurs cryptographiques
//
// Tous les modules utilisent ce type au lieu de panic!/assert!/unwrap().
// L'appelant reçoit une Err(...) et décide quoi faire ; aucune opération
// ne laisse d'état partiel derrière elle.
// ===========================================================================

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    // --- Erreurs de configuration ---
    /// Stratégie inconnue, ou clé privée incohérente avec la stratégie publique
    #[error("configuration invalide : {0}")]
    Configuration(String),

    // --- Erreurs de paramètres d'entrée ---
    /// Le message m est hors de [0, n) (domaine plaintext Paillier)
    #[error("le message doit être dans [0, n)")]
    MessageOutOfRange,
    /// Le chiffré c est >= n² (hors domaine ciphertext Paillier)
    #[error("le chiffré doit être dans [0, n²)")]
    CiphertextOutOfRange,
    /// Deux chiffrés (ou un chiffré et une clé) n'ont pas le même module n²
    #[error("les chiffrés ne partagent pas le même module n²")]
    ModulusMismatch,
    /// Opération non homomorphe (Paillier est additif, pas multiplicatif)
    #[error("opération non supportée : {0}")]
    UnsupportedOperation(&'static str),

    // --- Erreurs de génération de clés ---
    /// La taille de clé demandée est trop petite (< MIN_KEY_BITS)
    #[error("taille de clé {requested} bits insuffisante, minimum requis : {minimum} bits")]
    KeySizeTooSmall { requested: u64, minimum: u64 },
    /// Budget de tentatives épuisé sans atteindre bits(n) == key_size
    #[error("génération de clés abandonnée après {attempts} tentatives")]
    KeyGenerationFailure { attempts: u32 },
    /// La recherche de premiers a été annulée par l'appelant
    #[error("génération de clés annulée")]
    KeyGenerationCancelled,

    // --- Erreurs mathématiques internes ---
    /// L'inverse modulaire n'existe pas (gcd != 1)
    #[error("impossible de calculer l'inverse modulaire (gcd != 1)")]
    NoModularInverse,
    /// Conversion BigInt -> BigUint échouée (résultat négatif — invariant interne)
    #[error("conversion interne BigInt -> BigUint : résultat négatif inattendu")]
    NegativeConversion,

    // --- Erreurs de stockage / parsing des clés ---
    /// Parsing hexadécimal invalide dans un champ JSON
    #[error("parsing hexadécimal invalide dans le fichier de clés")]
    HexParseError,
    /// Champ hex trop long : vecteur DoS potentiel (conversion BigUint coûteuse)
    #[error("champ hexadécimal trop long : {actual} caractères (maximum autorisé : {maximum})")]
    HexFieldTooLong { actual: usize, maximum: usize },
    /// Champs incohérents au chargement : fichier corrompu ou falsifié
    #[error("fichier de clés incohérent : {0}")]
    KeyCoherenceError(&'static str),
}
