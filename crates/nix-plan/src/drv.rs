//! Derivation paths: extraction from dry-run output and local build status.

use crate::error::NixError;
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store path of a `.drv` file, e.g. `/nix/store/<hash>-hello-2.12.drv`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrvPath(String);

impl DrvPath {
    pub fn new(path: impl Into<String>) -> Self {
        DrvPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name part after the hash, e.g. `hello-2.12.drv`.
    pub fn name(&self) -> &str {
        let file = self.0.rsplit('/').next().unwrap_or(&self.0);
        file.split_once('-').map(|(_, name)| name).unwrap_or(file)
    }
}

impl std::fmt::Display for DrvPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recognises derivation paths in free-form command output
#[derive(Debug, Clone)]
pub struct DrvPattern {
    regex: Regex,
}

impl DrvPattern {
    /// Build a pattern matching `<store_dir>/<name>.drv`.
    pub fn new(store_dir: &Path) -> Self {
        let store = store_dir.to_string_lossy();
        let store = store.trim_end_matches('/');
        let pattern = format!(r"{}/[^/\s]*\.drv", regex::escape(store));
        // The store prefix is escaped, so the pattern is always valid.
        let regex = Regex::new(&pattern).expect("escaped drv pattern compiles");
        DrvPattern { regex }
    }

    /// Every derivation path mentioned in `text`, deduplicated.
    pub fn extract(&self, text: &str) -> std::collections::BTreeSet<DrvPath> {
        self.regex
            .find_iter(text)
            .map(|m| DrvPath::new(m.as_str()))
            .collect()
    }
}

/// Answers whether a derivation is already built locally
pub trait StoreQuery: Send + Sync {
    fn is_built(&self, drv: &DrvPath) -> Result<bool>;
}

/// Checks derivation outputs against the local filesystem
#[derive(Debug, Clone)]
pub struct LocalStore {
    store_dir: PathBuf,
}

impl LocalStore {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        LocalStore {
            store_dir: store_dir.into(),
        }
    }

    /// Output paths declared by a derivation file
    pub fn outputs(&self, drv: &DrvPath) -> Result<Vec<PathBuf>> {
        let text = std::fs::read_to_string(drv.as_str()).map_err(|source| {
            NixError::DerivationUnreadable {
                path: drv.to_string(),
                source,
            }
        })?;
        let paths = parse_output_paths(&text).ok_or_else(|| NixError::InvalidDerivation {
            path: drv.to_string(),
            reason: "no output list".to_string(),
        })?;

        let mut outputs = Vec::with_capacity(paths.len());
        for path in paths {
            // Floating content-addressed outputs have no path until realised.
            if path.is_empty() {
                continue;
            }
            let path = PathBuf::from(path);
            if !path.starts_with(&self.store_dir) {
                return Err(NixError::InvalidDerivation {
                    path: drv.to_string(),
                    reason: format!("output {:?} is outside {:?}", path, self.store_dir),
                });
            }
            outputs.push(path);
        }
        Ok(outputs)
    }
}

impl StoreQuery for LocalStore {
    /// Built when any declared output exists.
    fn is_built(&self, drv: &DrvPath) -> Result<bool> {
        let built = self.outputs(drv)?.iter().any(|p| p.exists());
        debug!(drv = %drv, built, "store query");
        Ok(built)
    }
}

/// Second field of every tuple in the first list of an ATerm derivation:
/// `Derive([("out","/nix/store/...","",""),...],...)`.
fn parse_output_paths(text: &str) -> Option<Vec<String>> {
    let start = text.find('[')?;
    let mut outputs = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text[start + 1..].chars() {
        if in_string {
            if escaped {
                current.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                fields.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '(' => fields.clear(),
            ')' => outputs.push(fields.get(1)?.clone()),
            ']' => return Some(outputs),
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STDERR: &str = "these 3 derivations will be built:
  /nix/store/0a1b2c-hello-2.12.drv
  /nix/store/3d4e5f-glibc-2.38.drv
  /nix/store/0a1b2c-hello-2.12.drv
these 2 paths will be fetched (1.20 MiB download):
  /nix/store/zzzz-bash-5.2
";

    #[test]
    fn extracts_unique_drvs() {
        let pattern = DrvPattern::new(Path::new("/nix/store"));
        let drvs = pattern.extract(STDERR);
        let names: Vec<_> = drvs.iter().map(|d| d.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "/nix/store/0a1b2c-hello-2.12.drv",
                "/nix/store/3d4e5f-glibc-2.38.drv",
            ]
        );
    }

    #[test]
    fn ignores_fetched_paths_and_other_stores() {
        let pattern = DrvPattern::new(Path::new("/gnu/store/"));
        assert!(pattern.extract(STDERR).is_empty());
    }

    #[test]
    fn drv_name_strips_hash() {
        let drv = DrvPath::new("/nix/store/0a1b2c-hello-2.12.drv");
        assert_eq!(drv.name(), "hello-2.12.drv");
    }

    #[test]
    fn parses_multiple_outputs() {
        let text = r#"Derive([("dev","/nix/store/aaa-foo-dev","",""),("out","/nix/store/bbb-foo","","")],[("/nix/store/ccc-dep.drv",["out"])],[],"x86_64-linux","/bin/sh",[],[])"#;
        let outputs = parse_output_paths(text).unwrap();
        assert_eq!(outputs, vec!["/nix/store/aaa-foo-dev", "/nix/store/bbb-foo"]);
    }

    #[test]
    fn parse_rejects_truncated_file() {
        assert!(parse_output_paths(r#"Derive([("out","/nix/store/a"#).is_none());
        assert!(parse_output_paths("garbage").is_none());
    }

    #[test]
    fn is_built_when_any_output_exists() {
        let store = tempdir().unwrap();
        let present = store.path().join("bbb-foo");
        std::fs::create_dir(&present).unwrap();

        let drv_path = store.path().join("xyz-foo.drv");
        let text = format!(
            r#"Derive([("dev","{}","",""),("out","{}","","")],[],[],"x86_64-linux","/bin/sh",[],[])"#,
            store.path().join("aaa-foo-dev").display(),
            present.display()
        );
        std::fs::write(&drv_path, text).unwrap();

        let local = LocalStore::new(store.path());
        let drv = DrvPath::new(drv_path.to_string_lossy());
        assert!(local.is_built(&drv).unwrap());

        std::fs::remove_dir(&present).unwrap();
        assert!(!local.is_built(&drv).unwrap());
    }

    #[test]
    fn output_outside_store_is_invalid() {
        let store = tempdir().unwrap();
        let drv_path = store.path().join("xyz-foo.drv");
        std::fs::write(
            &drv_path,
            r#"Derive([("out","/elsewhere/foo","","")],[],[],"x","/bin/sh",[],[])"#,
        )
        .unwrap();

        let local = LocalStore::new(store.path());
        let err = local
            .is_built(&DrvPath::new(drv_path.to_string_lossy()))
            .unwrap_err();
        assert!(matches!(err, NixError::InvalidDerivation { .. }));
    }

    #[test]
    fn content_addressed_output_counts_as_missing() {
        let store = tempdir().unwrap();
        let drv_path = store.path().join("xyz-ca.drv");
        std::fs::write(
            &drv_path,
            r#"Derive([("out","","r:sha256","")],[],[],"x","/bin/sh",[],[])"#,
        )
        .unwrap();

        let local = LocalStore::new(store.path());
        assert!(!local
            .is_built(&DrvPath::new(drv_path.to_string_lossy()))
            .unwrap());
    }

    #[test]
    fn missing_drv_file_names_its_path() {
        let store = tempdir().unwrap();
        let drv_path = store.path().join("gone-foo.drv");

        let local = LocalStore::new(store.path());
        let err = local
            .is_built(&DrvPath::new(drv_path.to_string_lossy()))
            .unwrap_err();
        assert!(matches!(err, NixError::DerivationUnreadable { .. }));
        assert!(err.to_string().contains("gone-foo.drv"));
    }
}
