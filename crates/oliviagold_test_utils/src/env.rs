//! Dotenv fixtures for tests.
//!
//! Tests build an `EnvSnapshot` directly; only dotenv files live on disk.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project directory holding dotenv files.
pub struct EnvFixture {
    dir: TempDir,
}

impl EnvFixture {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `name` (e.g. `.env.test`) with one `KEY=value` line per pair.
    pub fn write(&self, name: &str, pairs: &[(&str, &str)]) -> std::io::Result<PathBuf> {
        let body: String = pairs
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect();
        self.write_raw(name, &body)
    }

    pub fn write_raw(&self, name: &str, body: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, body)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_dotenv() {
        let fixture = EnvFixture::new().unwrap();
        let path = fixture
            .write(".env.test", &[("DATABASE_URL", "postgres://h/shop_test")])
            .unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "DATABASE_URL=postgres://h/shop_test\n"
        );
    }
}
