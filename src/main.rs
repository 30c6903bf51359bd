// =========================================================
// Métriques — durées keygen / chiffrement / déchiffrement
// des quatre stratégies Paillier
// =========================================================

use paillier_phe::key_management::{
    ensure_keys_directory, key_file_exists, load_keypair_json,
    save_private_key_json, save_public_key_json,
};
use paillier_phe::{CryptoError, Decryptor, KeyGenerator, KeyPair, Strategy};

use clap::Parser;
use num_bigint::RandBigInt;
use rand_core::OsRng;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ─────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "paillier_metrics", about = "Mesure les quatre stratégies Paillier")]
struct Args {
    /// Taille du module n en bits
    #[arg(long, default_value_t = 1024)]
    bits: u64,

    /// Stratégie(s) à mesurer : direct, generator, exponent, crt (toutes par défaut)
    #[arg(long = "strategy", value_parser = parse_strategy)]
    strategies: Vec<Strategy>,

    /// Nombre de chiffrements / déchiffrements mesurés par stratégie
    #[arg(long, default_value_t = 10)]
    iterations: u32,

    /// Répertoire où charger / sauvegarder les clés JSON
    #[arg(long)]
    keys_dir: Option<PathBuf>,
}

fn parse_strategy(s: &str) -> Result<Strategy, String> {
    s.parse().map_err(|e: CryptoError| e.to_string())
}

// ─────────────────────────────────────────────────────────
// Erreur applicative centrale
//
// Unifie CryptoError et io::Error pour propager toutes les
// erreurs via ?
// ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("erreur cryptographique : {0}")]
    Crypto(#[from] CryptoError),
    #[error("erreur I/O : {0}")]
    Io(#[from] std::io::Error),
    #[error("vérification homomorphe échouée ({0})")]
    Mismatch(&'static str),
}

#[derive(Default)]
struct Timings {
    keygen:  Option<Duration>,
    encrypt: Duration,
    decrypt: Duration,
    add:     Duration,
    scalar:  Duration,
}

// ─────────────────────────────────────────────────────────
// Point d'entrée
// ─────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("[ERREUR] {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    if let Some(dir) = &args.keys_dir {
        ensure_keys_directory(dir)?;
    }

    let strategies = if args.strategies.is_empty() {
        Strategy::ALL.to_vec()
    } else {
        args.strategies.clone()
    };

    for strategy in strategies {
        let (kp, keygen) = charger_ou_generer_cles(args, strategy)?;
        let mut timings = mesurer(&kp, args.iterations.max(1))?;
        timings.keygen = keygen;
        afficher_resume(strategy, args, &timings);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Gestion des clés : chargement ou génération + sauvegarde
// ─────────────────────────────────────────────────────────

fn chemin_cle(dir: &Path, strategy: Strategy, bits: u64) -> PathBuf {
    dir.join(format!("{strategy}_{bits}_private_key.json"))
}

fn charger_ou_generer_cles(args: &Args, strategy: Strategy) -> Result<(KeyPair, Option<Duration>), AppError> {
    if let Some(dir) = &args.keys_dir {
        let path = chemin_cle(dir, strategy, args.bits);
        if key_file_exists(&path) {
            match load_keypair_json(&path) {
                Ok(kp) if kp.public_key.bits() == args.bits => {
                    info!(%strategy, path = %path.display(), "clés chargées depuis le disque");
                    return Ok((kp, None));
                }
                Ok(_) => warn!(%strategy, "taille de clé différente sur le disque, regénération"),
                Err(e) => warn!(%strategy, error = %e, "chargement impossible, regénération"),
            }
        }
    }

    let t = Instant::now();
    let kp = KeyGenerator::new().generate(args.bits, strategy, &mut OsRng)?;
    let duree = t.elapsed();

    if let Some(dir) = &args.keys_dir {
        let path = chemin_cle(dir, strategy, args.bits);
        save_private_key_json(&kp.private_key, &path)?;
        save_public_key_json(&kp.public_key, dir.join(format!("{strategy}_{}_public_key.json", args.bits)))?;
        info!(%strategy, path = %path.display(), "clés sauvegardées");
    }
    Ok((kp, Some(duree)))
}

// ─────────────────────────────────────────────────────────
// Mesures : chiffrement, addition, produit scalaire, déchiffrement
// ─────────────────────────────────────────────────────────

fn mesurer(kp: &KeyPair, iterations: u32) -> Result<Timings, AppError> {
    let mut rng = OsRng;
    let decryptor = Decryptor::new(kp.private_key.clone());
    let encryptor = decryptor.encryptor();
    let n = kp.public_key.n();
    let mut timings = Timings::default();

    for _ in 0..iterations {
        let m1 = rng.gen_biguint_below(n);
        let m2 = rng.gen_biguint_below(n);
        let k = rng.gen_biguint(16);

        let t = Instant::now();
        let c1 = encryptor.encrypt(&m1, &mut rng)?;
        timings.encrypt += t.elapsed();
        let c2 = encryptor.encrypt(&m2, &mut rng)?;

        let t = Instant::now();
        let c_somme = c1.add(&c2)?;
        timings.add += t.elapsed();

        let t = Instant::now();
        let c_produit = c1.scalar_mul(&k);
        timings.scalar += t.elapsed();

        let t = Instant::now();
        let dec = decryptor.decrypt(&c1)?;
        timings.decrypt += t.elapsed();

        if dec != m1 {
            return Err(AppError::Mismatch("D(E(m)) != m"));
        }
        if decryptor.decrypt(&c_somme)? != (&m1 + &m2) % n {
            return Err(AppError::Mismatch("D(E(m1)·E(m2)) != m1+m2"));
        }
        if decryptor.decrypt(&c_produit)? != (&m1 * &k) % n {
            return Err(AppError::Mismatch("D(E(m)^k) != k·m"));
        }
    }

    timings.encrypt /= iterations;
    timings.decrypt /= iterations;
    timings.add /= iterations;
    timings.scalar /= iterations;
    Ok(timings)
}

fn afficher_resume(strategy: Strategy, args: &Args, t: &Timings) {
    println!("\n==============================================");
    println!("    RÉSUMÉ DES TEMPS — {strategy} ({} bits)", args.bits);
    println!("==============================================");
    match t.keygen {
        Some(d) => println!("  Génération des clés    : {d:.3?}  (nouvelle génération)"),
        None    => println!("  Génération des clés    : —  (chargées depuis le disque)"),
    }
    println!("  Chiffrement (moy.)     : {:.3?}", t.encrypt);
    println!("  Addition homomorphique : {:.3?}", t.add);
    println!("  Produit scalaire       : {:.3?}", t.scalar);
    println!("  Déchiffrement (moy.)   : {:.3?}", t.decrypt);
    println!("  Itérations vérifiées   : {}", args.iterations.max(1));
    println!("==============================================");
}
