//! Signature loading from YAML and TOML files.
//!
//! This module handles loading signatures from the `signatures/` directory.
//! Every file is attempted even when a sibling fails; what happens to the
//! failures afterwards is decided by the loader's [`LoadPolicy`].
//!
//! Sandbox signatures live in the [`SANDBOX_DIR`] subdirectory of the root.
//! A normal walk never descends into it; [`SignatureLoader::sandbox`] loads
//! only that subdirectory.

use crate::{
    definition::Signature,
    error::{LoadFailure, Result, SignatureError},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use watchman_core::LoadPolicy;

/// Subdirectory holding sandbox signatures.
pub const SANDBOX_DIR: &str = "sandbox";

/// Everything a load pass produced.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Enabled signatures that parsed, validated and passed their self-tests
    pub signatures: Vec<Signature>,
    /// Files that failed, in path order
    pub failures: Vec<LoadFailure>,
}

/// Loader for signatures from a directory tree.
pub struct SignatureLoader {
    /// Root directory containing signature files
    signatures_dir: PathBuf,
    /// What to do with files that fail
    policy: LoadPolicy,
    /// Run embedded test cases while loading
    self_test: bool,
}

impl SignatureLoader {
    /// Create a new loader with the given signatures directory.
    ///
    /// # Errors
    /// Returns error if the directory doesn't exist or is not a directory.
    pub fn new(signatures_dir: impl Into<PathBuf>) -> Result<Self> {
        let signatures_dir = signatures_dir.into();

        if !signatures_dir.is_dir() {
            return Err(SignatureError::DirectoryNotFound {
                path: signatures_dir.display().to_string(),
            });
        }

        Ok(Self {
            signatures_dir,
            policy: LoadPolicy::default(),
            self_test: true,
        })
    }

    /// Create a loader for the sandbox signatures under `signatures_dir`.
    ///
    /// # Errors
    /// Returns error if the sandbox subdirectory doesn't exist.
    pub fn sandbox(signatures_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(signatures_dir.into().join(SANDBOX_DIR))
    }

    /// Set the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enable or disable self-tests at load time.
    #[must_use]
    pub fn with_self_test(mut self, self_test: bool) -> Self {
        self.self_test = self_test;
        self
    }

    /// Root directory this loader reads from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.signatures_dir
    }

    /// Load all enabled signatures, applying the failure policy.
    ///
    /// # Errors
    /// Returns the first failure under [`LoadPolicy::FirstError`], every
    /// failure under [`LoadPolicy::Aggregate`], and only directory errors under
    /// [`LoadPolicy::SkipInvalid`].
    pub fn load_all(&self) -> Result<Vec<Signature>> {
        let mut report = self.load_report()?;

        if !report.failures.is_empty() {
            match self.policy {
                LoadPolicy::FirstError => return Err(report.failures.remove(0).error),
                LoadPolicy::Aggregate => {
                    return Err(SignatureError::Aggregate {
                        failures: report.failures,
                    })
                }
                LoadPolicy::SkipInvalid => {
                    for failure in &report.failures {
                        warn!(
                            path = %failure.path.display(),
                            error = %failure.error,
                            "skipping invalid signature"
                        );
                    }
                }
            }
        }

        info!(
            count = report.signatures.len(),
            dir = %self.signatures_dir.display(),
            "loaded signatures"
        );

        Ok(report.signatures)
    }

    /// Attempt every signature file and report successes and failures.
    ///
    /// # Errors
    /// Returns error only if the directory tree can't be read.
    pub fn load_report(&self) -> Result<LoadReport> {
        let mut paths = Vec::new();
        Self::collect_paths(&self.signatures_dir, &mut paths)?;
        paths.sort();

        let mut report = LoadReport::default();
        for path in paths {
            match self.load_file(&path) {
                Ok(Some(signature)) => report.signatures.push(signature),
                Ok(None) => {}
                Err(error) => report.failures.push(LoadFailure { path, error }),
            }
        }

        Ok(report)
    }

    /// Load, validate and self-test a single file.
    ///
    /// Returns `Ok(None)` for a disabled signature.
    pub fn load_file(&self, path: &Path) -> Result<Option<Signature>> {
        let signature = Self::load_from_path(path)?;

        if !signature.enabled {
            debug!(
                path = %path.display(),
                name = %signature.name(),
                "skipping disabled signature"
            );
            return Ok(None);
        }

        signature.validate()?;
        if self.self_test {
            signature.self_test()?;
        }

        debug!(
            name = %signature.name(),
            severity = signature.severity(),
            "loaded signature"
        );

        Ok(Some(signature))
    }

    /// Recursively gather every YAML and TOML file under `dir`, skipping
    /// sandbox subdirectories.
    fn collect_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                if entry.file_name() == SANDBOX_DIR {
                    continue;
                }
                Self::collect_paths(&path, paths)?;
            } else if Format::of(&path).is_some() {
                paths.push(path);
            }
        }

        Ok(())
    }

    /// Parse a signature from a specific file path.
    fn load_from_path(path: &Path) -> Result<Signature> {
        let contents = std::fs::read_to_string(path).map_err(|source| SignatureError::LoadError {
            path: path.display().to_string(),
            source,
        })?;

        let parsed: std::result::Result<Signature, Box<dyn std::error::Error + Send + Sync>> =
            match Format::of(path) {
                Some(Format::Toml) => toml::from_str(&contents).map_err(Into::into),
                Some(Format::Yaml) | None => serde_yaml::from_str(&contents).map_err(Into::into),
            };

        parsed.map_err(|source| SignatureError::ParseError {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Yaml,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Scope;
    use tempfile::TempDir;

    fn write_signature(dir: &Path, file: &str, name: &str, enabled: bool, pattern: &str) -> PathBuf {
        std::fs::create_dir_all(dir).expect("create signature dir");
        let path = dir.join(file);
        let content = format!(
            r#"
filename: {file}
enabled: {enabled}
meta:
  name: {name}
  author: test
  date: "2024-01-01"
  version: "1.0"
  description: test signature
  severity: 50
scope:
  - messages
  - files
locations:
  - public
  - private
search_strings:
  - token
pattern: '{pattern}'
test_cases:
  match_cases:
    - token-1234
  fail_cases:
    - blank
"#
        );
        std::fs::write(&path, content).expect("write signature file");
        path
    }

    #[test]
    fn test_loader_new_with_existing_dir() {
        let temp_dir = TempDir::new().expect("create temp dir");
        assert!(SignatureLoader::new(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_loader_new_with_nonexistent_dir() {
        let loader = SignatureLoader::new("/nonexistent/path/to/signatures");
        assert!(matches!(
            loader,
            Err(SignatureError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn test_load_all_recurses_and_sorts() {
        let temp_dir = TempDir::new().expect("create temp dir");
        write_signature(&temp_dir.path().join("b"), "two.yaml", "Two", true, "token-[0-9]+");
        write_signature(&temp_dir.path().join("a"), "one.yml", "One", true, "token-[0-9]+");
        std::fs::write(temp_dir.path().join("README.md"), "ignored").expect("write readme");

        let loader = SignatureLoader::new(temp_dir.path()).expect("create loader");
        let signatures = loader.load_all().expect("load all signatures");

        let names: Vec<&str> = signatures.iter().map(Signature::name).collect();
        assert_eq!(names, vec!["One", "Two"]);
        assert!(signatures[0].applies_to(Scope::Files));
    }

    #[test]
    fn test_sandbox_signatures_load_separately() {
        let temp_dir = TempDir::new().expect("create temp dir");
        write_signature(temp_dir.path(), "real.yaml", "Real", true, "token-[0-9]+");
        write_signature(&temp_dir.path().join(SANDBOX_DIR), "marker.yaml", "Marker", true, "token");

        let normal = SignatureLoader::new(temp_dir.path())
            .expect("create loader")
            .load_all()
            .expect("load signatures");
        let names: Vec<&str> = normal.iter().map(Signature::name).collect();
        assert_eq!(names, vec!["Real"]);

        let sandbox = SignatureLoader::sandbox(temp_dir.path())
            .expect("create sandbox loader")
            .load_all()
            .expect("load sandbox signatures");
        let names: Vec<&str> = sandbox.iter().map(Signature::name).collect();
        assert_eq!(names, vec!["Marker"]);
    }

    #[test]
    fn test_load_all_skips_disabled() {
        let temp_dir = TempDir::new().expect("create temp dir");
        write_signature(temp_dir.path(), "on.yaml", "On", true, "token");
        write_signature(temp_dir.path(), "off.yaml", "Off", false, "token");

        let loader = SignatureLoader::new(temp_dir.path()).expect("create loader");
        let signatures = loader.load_all().expect("load all signatures");

        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].name(), "On");
    }

    #[test]
    fn test_toml_signature() {
        let temp_dir = TempDir::new().expect("create temp dir");
        std::fs::write(
            temp_dir.path().join("key.toml"),
            r#"
scope = ["drafts"]
search_strings = ["secret"]
pattern = "secret=[a-z]+"

[meta]
name = "Toml Secret"
severity = 10

[test_cases]
match_cases = ["secret=abc"]
fail_cases = ["secret=123"]
"#,
        )
        .expect("write toml signature");

        let loader = SignatureLoader::new(temp_dir.path()).expect("create loader");
        let signatures = loader.load_all().expect("load all signatures");

        assert_eq!(signatures.len(), 1);
        assert!(signatures[0].applies_to(Scope::Drafts));
    }

    #[test]
    fn test_first_error_policy_still_attempts_siblings() {
        let temp_dir = TempDir::new().expect("create temp dir");
        write_signature(temp_dir.path(), "a_valid.yaml", "Valid", true, "token-[0-9]+");
        std::fs::write(temp_dir.path().join("b_broken.yaml"), "meta: [[[").expect("write file");
        write_signature(temp_dir.path(), "c_selftest.yaml", "Bad Test", true, "never");

        let loader = SignatureLoader::new(temp_dir.path()).expect("create loader");

        let report = loader.load_report().expect("load report");
        assert_eq!(report.signatures.len(), 1);
        assert_eq!(report.failures.len(), 2);

        let err = loader.load_all().unwrap_err();
        assert!(matches!(err, SignatureError::ParseError { .. }));
    }

    #[test]
    fn test_aggregate_policy_returns_every_failure() {
        let temp_dir = TempDir::new().expect("create temp dir");
        std::fs::write(temp_dir.path().join("a.yaml"), "meta: [[[").expect("write file");
        write_signature(temp_dir.path(), "b.yaml", "Bad Pattern", true, "(");

        let loader = SignatureLoader::new(temp_dir.path())
            .expect("create loader")
            .with_policy(LoadPolicy::Aggregate);

        match loader.load_all() {
            Err(SignatureError::Aggregate { failures }) => {
                assert_eq!(failures.len(), 2);
                assert!(matches!(
                    failures[1].error,
                    SignatureError::InvalidPattern { .. }
                ));
            }
            other => panic!("expected aggregate error, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_invalid_policy_keeps_valid() {
        let temp_dir = TempDir::new().expect("create temp dir");
        write_signature(temp_dir.path(), "good.yaml", "Good", true, "token-[0-9]+");
        std::fs::write(temp_dir.path().join("bad.yaml"), "not: [valid").expect("write file");

        let loader = SignatureLoader::new(temp_dir.path())
            .expect("create loader")
            .with_policy(LoadPolicy::SkipInvalid);
        let signatures = loader.load_all().expect("load all signatures");

        assert_eq!(signatures.len(), 1);
    }

    #[test]
    fn test_self_test_can_be_disabled() {
        let temp_dir = TempDir::new().expect("create temp dir");
        write_signature(temp_dir.path(), "loose.yaml", "Loose", true, "never");

        let strict = SignatureLoader::new(temp_dir.path()).expect("create loader");
        assert!(matches!(
            strict.load_all(),
            Err(SignatureError::SelfTestFailed { .. })
        ));

        let relaxed = SignatureLoader::new(temp_dir.path())
            .expect("create loader")
            .with_self_test(false);
        assert_eq!(relaxed.load_all().expect("load").len(), 1);
    }
}
