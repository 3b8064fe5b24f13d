//! Checksum and signature validation of downloaded bytes.
//!
//! Verification always runs before anything is written under the target
//! version directory. The fallback order between signature schemes is a
//! documented policy, not an accident: cosign keyless first, classic
//! detached PGP second, and an explicit warned skip for prereleases with
//! no applicable key.

pub mod cosign;
pub mod pgp;
pub mod sha256;
