//! Keyless signature verification through a locally installed cosign.
//!
//! cosign binds the signed artifact to a certificate identity recorded in
//! a transparency log; no long-lived public key is involved. The binary is
//! an external collaborator: when it is absent we return
//! [`TervError::CosignNotInstalled`] so the caller can fall back to the
//! classic detached-signature scheme.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::error::{Result, TervError};
use crate::reporter::Reporter;

const COSIGN_EXEC_NAME: &str = "cosign";
const VERIFIED: &str = "Verified OK";

/// Verify `data` with its detached signature and certificate, bound to
/// `certificate_identity` issued by `certificate_oidc_issuer`.
pub async fn check(
    data: &[u8],
    data_sig: &[u8],
    data_cert: &[u8],
    certificate_identity: &str,
    certificate_oidc_issuer: &str,
    reporter: &dyn Reporter,
) -> Result<()> {
    let cosign_path =
        which::which(COSIGN_EXEC_NAME).map_err(|_| TervError::CosignNotInstalled)?;

    let data_file = temp_file(data)?;
    let sig_file = temp_file(data_sig)?;
    let cert_file = temp_file(data_cert)?;

    let output = tokio::process::Command::new(cosign_path)
        .arg("verify-blob")
        .arg("--certificate-identity")
        .arg(certificate_identity)
        .arg("--signature")
        .arg(sig_file.path())
        .arg("--certificate")
        .arg(cert_file.path())
        .arg("--certificate-oidc-issuer")
        .arg(certificate_oidc_issuer)
        .arg(data_file.path())
        .output()
        .await
        .map_err(|err| TervError::ProcessSpawn {
            path: COSIGN_EXEC_NAME.to_string(),
            source: err,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    reporter.debug(&format!(
        "cosign output: {} {}",
        String::from_utf8_lossy(&output.stdout),
        stderr
    ));

    // cosign reports the verdict on stderr
    if !stderr.contains(VERIFIED) {
        return Err(TervError::SignatureInvalid(format!(
            "cosign rejected the artifact for identity {certificate_identity}"
        )));
    }
    Ok(())
}

fn temp_file(data: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;

    #[tokio::test]
    async fn missing_cosign_is_distinguished() {
        // cosign is not installed in the test environment; the error must
        // be the fallback marker, not a signature failure
        if which::which(COSIGN_EXEC_NAME).is_err() {
            let err = check(b"data", b"sig", b"cert", "id", "issuer", &NullReporter)
                .await
                .unwrap_err();
            assert!(matches!(err, TervError::CosignNotInstalled));
        }
    }
}
