//! Classic detached PGP signature verification.
//!
//! Used for releases signed with a long-lived key (HashiCorp style) and
//! as the fallback when cosign is not installed. The signature is binary
//! detached; the public key is ASCII armored.

use std::io::Cursor;

use pgp::{Deserializable, SignedPublicKey, StandaloneSignature};

use crate::error::{Result, TervError};

/// Verify the binary detached signature `data_sig` over `data` against
/// the armored public key `armored_key`. The primary key is tried first,
/// then every signing-capable subkey.
pub fn check(data: &[u8], data_sig: &[u8], armored_key: &str) -> Result<()> {
    let (public_key, _) = SignedPublicKey::from_armor_single(Cursor::new(armored_key.as_bytes()))
        .map_err(|err| TervError::SignatureInvalid(format!("unreadable public key: {err}")))?;

    let signature = StandaloneSignature::from_bytes(Cursor::new(data_sig))
        .map_err(|err| TervError::SignatureInvalid(format!("unreadable signature: {err}")))?;

    if signature.verify(&public_key, data).is_ok() {
        return Ok(());
    }
    for subkey in &public_key.public_subkeys {
        if signature.verify(subkey, data).is_ok() {
            return Ok(());
        }
    }
    Err(TervError::SignatureInvalid(
        "signature does not match any key in the keyring".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_key_is_rejected() {
        let err = check(b"data", b"sig", "not a key").unwrap_err();
        assert!(matches!(err, TervError::SignatureInvalid(_)));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        // a structurally valid armored key block with bogus content still
        // fails before signature matching
        let key = "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nQUFBQQ==\n-----END PGP PUBLIC KEY BLOCK-----\n";
        assert!(check(b"data", b"sig", key).is_err());
    }
}
