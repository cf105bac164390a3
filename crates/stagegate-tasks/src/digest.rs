use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Hex SHA-256 of the file at `path`
pub fn file_digest(path: &Path) -> io::Result<String> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Digests of several files, in input order
pub fn file_digests<'a, I>(paths: I) -> io::Result<Vec<String>>
where
    I: IntoIterator<Item = &'a Path>,
{
    paths.into_iter().map(file_digest).collect()
}
