//! `crxpack verify` - validate a package and print its ID.

use std::path::Path;

use anyhow::{Context, Result};

/// Verify the package at `path`; exits non-zero if it does not validate.
pub fn verify(path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let id = crxpack_core::verify::verify(&bytes)
        .with_context(|| format!("{} failed verification", path.display()))?;

    println!("OK {id}");
    Ok(())
}
