use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;
use std::io;
use num_bigint::BigUint;
use num_traits::Num;
use crate::paillier::ciphertext::Ciphertext;
use crate::paillier::p_keygen::{
    CrtParams, KeyPair, PrivateKey, PrivateParams, PublicKey, PublicParams,
};
use crate::paillier::strategy::Strategy;
use crate::crypto_error::CryptoError;

// ============================================================================
// Protection DoS parsing — limites de taille des entrées
//
// Vérifiées AVANT toute opération coûteuse (lecture du fichier, conversion
// hex -> BigUint, qui est quadratique en la taille de l'entrée).
// Dimensionnées pour des clés Paillier jusqu'à 4096 bits :
//   un chiffré vit mod n², soit au plus 8192 bits = 2048 caractères hex.
// ============================================================================

/// Taille maximale d'un fichier JSON en octets (32 Ko)
const MAX_KEY_FILE_BYTES: u64 = 32_768;

/// Longueur maximale d'un champ hexadécimal en caractères.
const MAX_HEX_FIELD_LEN: usize = 3_072;

// ============================================================================
// Structures JSON
//
// Les champs propres à une stratégie sont optionnels ; leur présence est
// contrôlée à la conversion. Les termes CRT dérivés (hp, hq, p², q², p^-1)
// ne sont jamais écrits : ils sont recalculés à partir de p et q.
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyJson {
    pub strategy: Strategy,
    pub n:        String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g:         Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hs:        Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_alpha: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PrivateKeyJson {
    pub public_key: PublicKeyJson,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mu:     Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p:      Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q:      Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CiphertextJson {
    pub value:     String,
    pub n_squared: String,
}

// ============================================================================
// Conversion BigUint ↔ hexadécimal
// ============================================================================

pub fn biguint_to_hex(value: &BigUint) -> String {
    value.to_str_radix(16).to_uppercase()
}

/// Convertit une string hex en BigUint.
///
/// Vérifie la longueur du champ AVANT la conversion.
///
/// Retourne :
///   Err(HexFieldTooLong)  si len > MAX_HEX_FIELD_LEN
///   Err(HexParseError)    si le contenu n'est pas un hex valide
pub fn hex_to_biguint(hex_str: &str) -> Result<BigUint, CryptoError> {
    if hex_str.len() > MAX_HEX_FIELD_LEN {
        return Err(CryptoError::HexFieldTooLong {
            actual:  hex_str.len(),
            maximum: MAX_HEX_FIELD_LEN,
        });
    }
    BigUint::from_str_radix(hex_str, 16)
        .map_err(|_| CryptoError::HexParseError)
}

// Champ optionnel obligatoire pour la stratégie courante
fn required_hex(field: &Option<String>, name: &'static str) -> Result<BigUint, CryptoError> {
    match field {
        Some(hex) => hex_to_biguint(hex),
        None => Err(CryptoError::KeyCoherenceError(name)),
    }
}

// ============================================================================
// Conversion structures Rust → JSON
// ============================================================================

pub fn public_key_to_json(pk: &PublicKey) -> PublicKeyJson {
    let mut json = PublicKeyJson {
        strategy:  pk.strategy(),
        n:         biguint_to_hex(pk.n()),
        g:         None,
        hs:        None,
        max_alpha: None,
    };
    match pk.params() {
        PublicParams::Direct { g } | PublicParams::GeneratorSimplified { g } => {
            json.g = Some(biguint_to_hex(g));
        }
        PublicParams::ExponentOptimized { hs, max_alpha }
        | PublicParams::Crt { hs, max_alpha } => {
            json.hs = Some(biguint_to_hex(hs));
            json.max_alpha = Some(biguint_to_hex(max_alpha));
        }
    }
    json
}

pub fn private_key_to_json(sk: &PrivateKey) -> PrivateKeyJson {
    let mut json = PrivateKeyJson {
        public_key: public_key_to_json(sk.public_key()),
        lambda: None,
        mu:     None,
        p:      None,
        q:      None,
    };
    match sk.params() {
        PrivateParams::Lambda { lambda, mu } => {
            json.lambda = Some(biguint_to_hex(lambda));
            json.mu = Some(biguint_to_hex(mu));
        }
        PrivateParams::Factors(crt) => {
            json.p = Some(biguint_to_hex(crt.p()));
            json.q = Some(biguint_to_hex(crt.q()));
        }
    }
    json
}

pub fn ciphertext_to_json(ct: &Ciphertext) -> CiphertextJson {
    CiphertextJson {
        value:     biguint_to_hex(ct.value()),
        n_squared: biguint_to_hex(ct.n_squared()),
    }
}

// ============================================================================
// Conversion JSON → structures Rust
// La cohérence est revérifiée par PublicKey::new / PrivateKey::new.
// ============================================================================

pub fn json_to_public_key(json: &PublicKeyJson) -> Result<PublicKey, CryptoError> {
    let n = hex_to_biguint(&json.n)?;
    let params = match json.strategy {
        Strategy::Direct => PublicParams::Direct { g: required_hex(&json.g, "g manquant")? },
        Strategy::GeneratorSimplified => {
            PublicParams::GeneratorSimplified { g: required_hex(&json.g, "g manquant")? }
        }
        Strategy::ExponentOptimized => PublicParams::ExponentOptimized {
            hs:        required_hex(&json.hs, "hs manquant")?,
            max_alpha: required_hex(&json.max_alpha, "max_alpha manquant")?,
        },
        Strategy::Crt => PublicParams::Crt {
            hs:        required_hex(&json.hs, "hs manquant")?,
            max_alpha: required_hex(&json.max_alpha, "max_alpha manquant")?,
        },
    };
    PublicKey::new(n, params)
}

pub fn json_to_private_key(json: &PrivateKeyJson) -> Result<PrivateKey, CryptoError> {
    let public_key = json_to_public_key(&json.public_key)?;
    let params = match (&json.lambda, &json.mu, &json.p, &json.q) {
        (Some(_), Some(_), None, None) => PrivateParams::Lambda {
            lambda: required_hex(&json.lambda, "lambda manquant")?,
            mu:     required_hex(&json.mu, "mu manquant")?,
        },
        (None, None, Some(_), Some(_)) => PrivateParams::Factors(CrtParams::from_factors(
            required_hex(&json.p, "p manquant")?,
            required_hex(&json.q, "q manquant")?,
        )?),
        _ => return Err(CryptoError::KeyCoherenceError("attendu (lambda, mu) ou (p, q)")),
    };
    PrivateKey::new(public_key, params)
}

pub fn json_to_keypair(json: &PrivateKeyJson) -> Result<KeyPair, CryptoError> {
    let private_key = json_to_private_key(json)?;
    Ok(KeyPair { public_key: private_key.public_key().clone(), private_key })
}

pub fn json_to_ciphertext(json: &CiphertextJson) -> Result<Ciphertext, CryptoError> {
    Ciphertext::from_parts(hex_to_biguint(&json.value)?, hex_to_biguint(&json.n_squared)?)
}

// ============================================================================
// Vérification de taille de fichier (DoS protection)
//
// Appelée avant fs::read_to_string ; la métadonnée est lue sans ouvrir le
// contenu.
// ============================================================================

fn check_file_size(filepath: &Path) -> io::Result<()> {
    let meta = fs::metadata(filepath)?;
    if meta.len() > MAX_KEY_FILE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "fichier trop grand : {} octets (maximum autorisé : {} octets)",
                meta.len(),
                MAX_KEY_FILE_BYTES
            ),
        ));
    }
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(filepath: &Path) -> io::Result<T> {
    check_file_size(filepath)?;
    let raw = fs::read_to_string(filepath)?;
    Ok(serde_json::from_str(&raw)?)
}

fn invalid_data(e: CryptoError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

// ============================================================================
// Sauvegarde JSON sur disque
// ============================================================================

pub fn save_public_key_json(pk: &PublicKey, filepath: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&public_key_to_json(pk))?;
    fs::write(filepath, json)
}

pub fn save_private_key_json(sk: &PrivateKey, filepath: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&private_key_to_json(sk))?;
    fs::write(filepath, json)
}

pub fn save_ciphertext_json(ct: &Ciphertext, filepath: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&ciphertext_to_json(ct))?;
    fs::write(filepath, json)
}

// ============================================================================
// Chargement JSON depuis disque
// ============================================================================

pub fn load_public_key_json(filepath: impl AsRef<Path>) -> io::Result<PublicKey> {
    let json: PublicKeyJson = read_json(filepath.as_ref())?;
    json_to_public_key(&json).map_err(invalid_data)
}

pub fn load_private_key_json(filepath: impl AsRef<Path>) -> io::Result<PrivateKey> {
    let json: PrivateKeyJson = read_json(filepath.as_ref())?;
    json_to_private_key(&json).map_err(invalid_data)
}

pub fn load_keypair_json(filepath: impl AsRef<Path>) -> io::Result<KeyPair> {
    let json: PrivateKeyJson = read_json(filepath.as_ref())?;
    json_to_keypair(&json).map_err(invalid_data)
}

pub fn load_ciphertext_json(filepath: impl AsRef<Path>) -> io::Result<Ciphertext> {
    let json: CiphertextJson = read_json(filepath.as_ref())?;
    json_to_ciphertext(&json).map_err(invalid_data)
}

// ============================================================================
// Utilitaires
// ============================================================================

pub fn key_file_exists(filepath: impl AsRef<Path>) -> bool {
    filepath.as_ref().exists()
}

pub fn ensure_keys_directory(dir_path: impl AsRef<Path>) -> io::Result<()> {
    fs::create_dir_all(dir_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::p_decrypt::Decryptor;
    use crate::paillier::p_encrypt::Encryptor;
    use crate::paillier::p_keygen::generate_keypair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_hex_field_too_long() {
        let long = "F".repeat(MAX_HEX_FIELD_LEN + 1);
        assert_eq!(
            hex_to_biguint(&long),
            Err(CryptoError::HexFieldTooLong { actual: MAX_HEX_FIELD_LEN + 1, maximum: MAX_HEX_FIELD_LEN })
        );
        assert_eq!(hex_to_biguint("XYZ"), Err(CryptoError::HexParseError));
        assert_eq!(hex_to_biguint("ff").unwrap(), BigUint::from(255u32));
    }

    #[test]
    fn test_private_key_json_round_trip_all_strategies() {
        let mut rng = StdRng::seed_from_u64(50);
        for strategy in Strategy::ALL {
            let kp = generate_keypair(256, strategy, &mut rng).unwrap();
            let json = private_key_to_json(&kp.private_key);
            let restored = json_to_private_key(&json).unwrap();
            assert_eq!(restored, kp.private_key, "{strategy}");
        }
    }

    #[test]
    fn test_crt_json_omits_derived_terms() {
        let mut rng = StdRng::seed_from_u64(51);
        let kp = generate_keypair(256, Strategy::Crt, &mut rng).unwrap();
        let text = serde_json::to_string(&private_key_to_json(&kp.private_key)).unwrap();
        assert!(text.contains("\"strategy\":\"crt\""));
        assert!(text.contains("\"p\""));
        assert!(!text.contains("lambda"));
        assert!(!text.contains("\"g\""));
    }

    #[test]
    fn test_mismatched_fields_rejected() {
        let mut rng = StdRng::seed_from_u64(52);
        let kp = generate_keypair(256, Strategy::Crt, &mut rng).unwrap();
        let mut json = private_key_to_json(&kp.private_key);
        json.public_key.strategy = Strategy::ExponentOptimized;
        // p/q sous une clé publique ExponentOptimized : mauvaise forme
        assert!(matches!(json_to_private_key(&json), Err(CryptoError::Configuration(_))));

        let mut json = private_key_to_json(&kp.private_key);
        json.lambda = Some("01".into());
        assert!(matches!(json_to_private_key(&json), Err(CryptoError::KeyCoherenceError(_))));

        let mut json = public_key_to_json(&kp.public_key);
        json.hs = None;
        assert!(matches!(json_to_public_key(&json), Err(CryptoError::KeyCoherenceError(_))));
    }

    #[test]
    fn test_crt_factors_must_match_modulus() {
        let mut rng = StdRng::seed_from_u64(53);
        let a = generate_keypair(256, Strategy::Crt, &mut rng).unwrap();
        let b = generate_keypair(256, Strategy::Crt, &mut rng).unwrap();
        let mut json = private_key_to_json(&a.private_key);
        let other = private_key_to_json(&b.private_key);
        json.p = other.p;
        assert!(matches!(json_to_private_key(&json), Err(CryptoError::KeyCoherenceError(_))));
    }

    #[test]
    fn test_degenerate_crt_factors_rejected() {
        let mut rng = StdRng::seed_from_u64(55);
        let kp = generate_keypair(256, Strategy::Crt, &mut rng).unwrap();

        let mut json = private_key_to_json(&kp.private_key);
        json.p = Some("0".into());
        assert!(matches!(json_to_private_key(&json), Err(CryptoError::KeyCoherenceError(_))));

        // p·q == n mais p = 1 : refusé avant d'atteindre le déchiffrement
        let mut json = private_key_to_json(&kp.private_key);
        json.p = Some("1".into());
        json.q = Some(biguint_to_hex(kp.public_key.n()));
        assert!(matches!(json_to_private_key(&json), Err(CryptoError::KeyCoherenceError(_))));

        let mut json = private_key_to_json(&kp.private_key);
        json.p = Some("2".into());
        assert!(matches!(json_to_private_key(&json), Err(CryptoError::KeyCoherenceError(_))));
    }

    #[test]
    fn test_tampered_lambda_rejected() {
        let mut rng = StdRng::seed_from_u64(56);
        for strategy in [Strategy::Direct, Strategy::GeneratorSimplified, Strategy::ExponentOptimized] {
            let kp = generate_keypair(256, strategy, &mut rng).unwrap();
            let PrivateParams::Lambda { lambda, .. } = kp.private_key.params() else {
                panic!("mauvaise variante");
            };
            let mut json = private_key_to_json(&kp.private_key);
            json.lambda = Some(biguint_to_hex(&(lambda * BigUint::from(2u32))));
            assert!(
                matches!(json_to_private_key(&json), Err(CryptoError::KeyCoherenceError(_))),
                "{strategy}"
            );
        }
    }

    #[test]
    fn test_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(54);
        let kp = generate_keypair(256, Strategy::ExponentOptimized, &mut rng).unwrap();

        let pk_path = dir.path().join("public_key.json");
        let sk_path = dir.path().join("private_key.json");
        let ct_path = dir.path().join("ciphertext.json");

        save_public_key_json(&kp.public_key, &pk_path).unwrap();
        save_private_key_json(&kp.private_key, &sk_path).unwrap();
        assert!(key_file_exists(&pk_path));

        let pk = load_public_key_json(&pk_path).unwrap();
        let c = Encryptor::new(pk).encrypt(&BigUint::from(31_337u32), &mut rng).unwrap();
        save_ciphertext_json(&c, &ct_path).unwrap();

        let loaded = load_keypair_json(&sk_path).unwrap();
        let c = load_ciphertext_json(&ct_path).unwrap();
        let m = Decryptor::new(loaded.private_key).decrypt(&c).unwrap();
        assert_eq!(m, BigUint::from(31_337u32));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        fs::write(&path, vec![b' '; MAX_KEY_FILE_BYTES as usize + 1]).unwrap();
        let err = load_public_key_json(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_ensure_keys_directory_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_keys_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
