//! `KEY=VALUE` env file loading.
//!
//! The loaded values are immutable and handed explicitly to whatever needs
//! them (the database pool, compose child processes, config overrides); the
//! process environment itself is never modified.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    vars: BTreeMap<String, String>,
}

impl EnvFile {
    /// Read `path` and check that every key in `required` is present and
    /// non-empty.
    pub fn load(path: &Path, required: &[String]) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::EnvFile {
            path: path.display().to_string(),
            message: if e.kind() == std::io::ErrorKind::NotFound {
                "file not found".into()
            } else {
                e.to_string()
            },
        })?;
        let env = Self::parse(path, &raw)?;
        env.require(required)?;

        tracing::info!(
            path = %path.display(),
            keys = env.vars.len(),
            "env file loaded"
        );
        Ok(env)
    }

    /// Parse env file contents. `path` is only used in error messages.
    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let mut vars = BTreeMap::new();

        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::EnvFile {
                    path: path.display().to_string(),
                    message: format!("line {}: expected KEY=VALUE", idx + 1),
                });
            };
            let key = key.trim();
            if key.is_empty() || key.chars().any(char::is_whitespace) {
                return Err(Error::EnvFile {
                    path: path.display().to_string(),
                    message: format!("line {}: invalid key {key:?}", idx + 1),
                });
            }

            vars.insert(key.to_owned(), parse_value(value.trim()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            vars,
        })
    }

    /// Fail with [`Error::MissingEnvKey`] on the first absent or empty key.
    pub fn require(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            if self.get(key).map_or(true, str::is_empty) {
                return Err(Error::MissingEnvKey {
                    path: self.path.display().to_string(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// All key/value pairs, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Strip matching quotes; for unquoted values drop a trailing ` # comment`.
fn parse_value(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_owned();
        }
    }
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_owned(),
        None => value.to_owned(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<EnvFile> {
        EnvFile::parse(Path::new(".env"), raw)
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let env = parse("# header\n\nDATABASE_URL=postgres://u:p@localhost/db\n  # indented\n")
            .unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("DATABASE_URL"), Some("postgres://u:p@localhost/db"));
    }

    #[test]
    fn strips_quotes_export_and_inline_comments() {
        let env = parse(
            "export A=1\nB=\"two words\"\nC='single'\nD=plain # trailing\nE=\"keep # this\"\n",
        )
        .unwrap();
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("B"), Some("two words"));
        assert_eq!(env.get("C"), Some("single"));
        assert_eq!(env.get("D"), Some("plain"));
        assert_eq!(env.get("E"), Some("keep # this"));
    }

    #[test]
    fn value_may_contain_equals() {
        let env = parse("URL=postgres://h/db?sslmode=disable\n").unwrap();
        assert_eq!(env.get("URL"), Some("postgres://h/db?sslmode=disable"));
    }

    #[test]
    fn later_duplicates_win() {
        let env = parse("K=1\nK=2\n").unwrap();
        assert_eq!(env.get("K"), Some("2"));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = parse("A=1\nnot a pair\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn missing_required_key_fails() {
        let env = parse("OTHER=1\nDATABASE_URL=\n").unwrap();
        let err = env.require(&["DATABASE_URL".into()]).unwrap_err();
        assert!(matches!(err, Error::MissingEnvKey { ref key, .. } if key == "DATABASE_URL"));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnvFile::load(&dir.path().join(".env"), &[]).unwrap_err();
        assert!(err.to_string().contains("file not found"), "{err}");
    }

    #[test]
    fn load_checks_required_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "DATABASE_URL=postgres://localhost/agentstack\n").unwrap();

        let env = EnvFile::load(&path, &["DATABASE_URL".into()]).unwrap();
        assert_eq!(env.path(), path.as_path());
        assert!(EnvFile::load(&path, &["REDIS_URL".into()]).is_err());
    }
}
