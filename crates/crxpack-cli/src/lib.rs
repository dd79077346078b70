//! crxpack - CRX3 packer CLI
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
//!
//! Thin host around [`crxpack_core`]: argument parsing, key-path policy, and
//! file I/O live here; all signing and assembly logic lives in the core.

pub mod cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "crxpack")]
#[command(author, version, about = "Pack unpacked extensions into signed CRX3 files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pack an unpacked extension directory into a signed .crx file
    Pack {
        /// Directory containing the unpacked extension
        dir: PathBuf,
        /// Output path; defaults to `<dir name>.crx` in the working directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Persist the signing key at this path (reused on later runs, so
        /// the extension ID stays stable across invocations)
        #[arg(short, long)]
        key: Option<PathBuf>,
    },
    /// Print the extension ID a signing key produces
    Id {
        /// PKCS#8 PEM private key file
        key: PathBuf,
    },
    /// Verify a .crx file and print its extension ID
    Verify {
        /// Package file to check
        package: PathBuf,
    },
}
