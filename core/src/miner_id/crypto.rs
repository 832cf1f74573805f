//! secp256k1 ECDSA verification helpers shared by the document validator
//! (§4.F), the block-bind check (§4.G), and `revokemid` processing (§4.I).
//!
//! All miner-ID signatures are "sign the SHA-256 of a byte string, verify
//! with a compressed public key" — this module is the single place that
//! touches the `secp256k1` crate so the rest of the miner-ID code works
//! purely in terms of byte slices and [`crate::primitives::Hash256`].

use crate::primitives::{is_compressed_key, is_der_signature, sha256, Hash256};
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, Verification};
use std::sync::OnceLock;

fn context() -> &'static Secp256k1<impl Verification> {
    static CTX: OnceLock<Secp256k1<secp256k1::VerifyOnly>> = OnceLock::new();
    CTX.get_or_init(Secp256k1::verification_only)
}

/// Verifies `sig` (DER-encoded) under `pubkey` (compressed) over
/// `SHA256(message)`. Returns `false` on any shape or cryptographic
/// mismatch; never panics on attacker-controlled input.
pub fn verify(pubkey: &[u8], message: &[u8], sig: &[u8]) -> bool {
    verify_hash(pubkey, sha256(message), sig)
}

/// As [`verify`], but the caller has already hashed the signed payload.
pub fn verify_hash(pubkey: &[u8], hash: Hash256, sig: &[u8]) -> bool {
    if !is_compressed_key(pubkey) || !is_der_signature(sig) {
        return false;
    }
    let Ok(pk) = PublicKey::from_slice(pubkey) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(sig) else {
        return false;
    };
    let Ok(msg) = Message::from_digest_slice(&hash) else {
        return false;
    };
    context().verify_ecdsa(&msg, &signature, &pk).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{rand, SecretKey};

    #[test]
    fn round_trip_sign_and_verify() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut rand::thread_rng());
        let pk = PublicKey::from_secret_key(&secp, &sk);
        let msg_bytes = b"miner identity payload";
        let hash = sha256(msg_bytes);
        let msg = Message::from_digest_slice(&hash).unwrap();
        let sig = secp.sign_ecdsa(&msg, &sk);
        assert!(verify(&pk.serialize(), msg_bytes, &sig.serialize_der()));
    }

    #[test]
    fn rejects_wrong_key() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut rand::thread_rng());
        let pk = PublicKey::from_secret_key(&secp, &sk);
        let other_sk = SecretKey::new(&mut rand::thread_rng());
        let other_pk = PublicKey::from_secret_key(&secp, &other_sk);
        let hash = sha256(b"payload");
        let msg = Message::from_digest_slice(&hash).unwrap();
        let sig = secp.sign_ecdsa(&msg, &sk);
        assert!(!verify_hash(&other_pk.serialize(), hash, &sig.serialize_der()));
        let _ = pk;
    }

    #[test]
    fn rejects_malshaped_input_without_panic() {
        assert!(!verify(&[0u8; 10], b"x", &[0u8; 5]));
    }
}
