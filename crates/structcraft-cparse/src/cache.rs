//! Location of the XML produced by castxml.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Number of hex characters of the input digest used as file name.
const KEY_LEN: usize = 10;

/// Directory holding castxml output, one file per distinct input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlCache {
    dir: PathBuf,
}

impl XmlCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache in the system temporary directory.
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reproducible short name for a list of inputs: the first hex digits of the SHA-256 of the
    /// concatenated input names.
    pub fn key<P: AsRef<Path>>(inputs: &[P]) -> String {
        let mut hasher = Sha256::new();
        for input in inputs {
            hasher.update(input.as_ref().to_string_lossy().as_bytes());
        }

        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>()[..KEY_LEN]
            .to_string()
    }

    /// XML path used for `inputs`.
    pub fn path_for<P: AsRef<Path>>(&self, inputs: &[P]) -> PathBuf {
        self.dir.join(format!("{}.xml", Self::key(inputs)))
    }
}

impl Default for XmlCache {
    fn default() -> Self {
        Self::temp()
    }
}
