pub mod key_storage;

// Réexportations key_storage
pub use key_storage::{
    PublicKeyJson, PrivateKeyJson, CiphertextJson,
    biguint_to_hex, hex_to_biguint,
    public_key_to_json, private_key_to_json, ciphertext_to_json,
    json_to_public_key, json_to_private_key, json_to_keypair, json_to_ciphertext,
    save_public_key_json, save_private_key_json, save_ciphertext_json,
    load_public_key_json, load_private_key_json, load_keypair_json, load_ciphertext_json,
    key_file_exists, ensure_keys_directory,
};
