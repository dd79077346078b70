//! `crxpack pack` - directory in, signed .crx out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use crxpack_core::{KeyStore, KeyStoreConfig, Packer};
use tracing::info;

/// Pack `dir` and write the result to `output` (or `<dir name>.crx`).
pub async fn pack(dir: &Path, output: Option<PathBuf>, key: Option<PathBuf>) -> Result<()> {
    let config = match key {
        Some(path) => KeyStoreConfig::persistent(path),
        None => KeyStoreConfig::ephemeral(),
    };

    let packer = Packer::new(Arc::new(KeyStore::new(config)));
    let packed = packer
        .pack(dir)
        .await
        .with_context(|| format!("failed to pack {}", dir.display()))?;

    let output = output.unwrap_or_else(|| default_output(dir));
    std::fs::write(&output, &packed.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        id = %packed.id,
        output = %output.display(),
        package_len = packed.bytes.len(),
        "wrote package"
    );

    let (name, version) = manifest_summary(dir);
    println!("Packed {name} {version}");
    println!("  id:   {}", packed.id);
    println!("  file: {} ({} bytes)", output.display(), packed.bytes.len());
    Ok(())
}

fn default_output(dir: &Path) -> PathBuf {
    let stem = dir
        .file_name()
        .map_or_else(|| "extension".to_string(), |n| n.to_string_lossy().into_owned());
    PathBuf::from(format!("{stem}.crx"))
}

/// Best-effort name/version from manifest.json; packing never depends on it.
fn manifest_summary(dir: &Path) -> (String, String) {
    let fallback = || ("extension".to_string(), "unknown".to_string());
    let Ok(raw) = std::fs::read_to_string(dir.join("manifest.json")) else {
        return fallback();
    };
    let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return fallback();
    };
    let field = |key: &str| {
        manifest
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(ToOwned::to_owned)
    };
    (
        field("name").unwrap_or_else(|| "extension".to_string()),
        field("version").unwrap_or_else(|| "unknown".to_string()),
    )
}
