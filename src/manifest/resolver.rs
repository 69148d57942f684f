//! Directory resolution: find the true manifests, reconcile the rest.
//!
//! Every `*.xml` file under the root is a candidate. Some candidates are
//! session manifests; others are auxiliary XML files (slide decks,
//! presentation data) that a manifest references and that share the
//! extension by design. A parse failure is therefore only *provisional*:
//! after all candidates have been parsed, any failure whose path matches a
//! file referenced by some confirmed manifest is discarded. What remains
//! are genuine errors. This is inherently two passes; a referenced file's
//! innocence can only be established once every manifest has been parsed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::manifest::schema::{SessionManifest, MANIFEST_EXTENSION};

/// A genuine manifest parse failure, post-reconciliation
#[derive(Debug, Clone)]
pub struct ManifestIssue {
    pub path: PathBuf,
    pub detail: String,
}

/// A confirmed manifest and the files it depends on
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    /// Absolute (root-joined) path of the manifest file
    pub path: PathBuf,
    /// Session title, for progress reporting
    pub title: Option<String>,
    /// Referenced files resolved against the manifest's directory,
    /// first-occurrence order, de-duplicated
    pub referenced_files: Vec<PathBuf>,
}

/// Outcome of scanning a directory tree
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    pub manifests: Vec<ResolvedManifest>,
    pub errors: Vec<ManifestIssue>,
}

/// Scan `root` recursively and resolve session manifests.
///
/// The result is deterministic for an unchanged tree: candidates are
/// visited in sorted order, so running this twice yields identical
/// confirmed-manifest and error sets.
pub fn resolve_directory(root: &Path) -> Result<ResolvedSet> {
    let mut provisional: Vec<ManifestIssue> = Vec::new();
    let mut manifests: Vec<ResolvedManifest> = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            std::io::Error::other(format!("failed to walk {}: {}", root.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_candidate = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXTENSION));
        if !is_candidate {
            continue;
        }

        let text = std::fs::read_to_string(path)?;
        match SessionManifest::parse(&text) {
            Ok(manifest) => {
                let dir = path.parent().unwrap_or(root);
                let mut seen = HashSet::new();
                let referenced_files: Vec<PathBuf> = manifest
                    .referenced_files()
                    .into_iter()
                    .map(|name| dir.join(name))
                    .filter(|p| seen.insert(p.clone()))
                    .collect();

                debug!(
                    manifest = %path.display(),
                    title = manifest.title().unwrap_or("<untitled>"),
                    files = referenced_files.len(),
                    "confirmed session manifest"
                );

                manifests.push(ResolvedManifest {
                    path: path.to_path_buf(),
                    title: manifest.title().map(String::from),
                    referenced_files,
                });
            }
            Err(e) => {
                // May just be an auxiliary XML file; reconciled below.
                provisional.push(ManifestIssue {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                });
            }
        }
    }

    // Second pass: a provisional failure referenced by any confirmed
    // manifest is not a manifest at all.
    let referenced: HashSet<&PathBuf> = manifests
        .iter()
        .flat_map(|m| m.referenced_files.iter())
        .collect();

    let errors: Vec<ManifestIssue> = provisional
        .into_iter()
        .filter(|issue| {
            if referenced.contains(&issue.path) {
                debug!(
                    path = %issue.path.display(),
                    "unparsable XML is referenced by a manifest, not an error"
                );
                false
            } else {
                true
            }
        })
        .collect();

    for issue in &errors {
        warn!(
            path = %issue.path.display(),
            detail = %issue.detail,
            "file could not be parsed as a session manifest"
        );
    }

    Ok(ResolvedSet { manifests, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, name: &str, referenced: &[&str]) -> PathBuf {
        let videos: String = referenced
            .iter()
            .map(|f| format!("<Video><Filename>{f}</Filename></Video>"))
            .collect();
        let xml = format!("<PanoptoSession><Title>{name}</Title><Videos>{videos}</Videos></PanoptoSession>");
        let path = dir.join(name);
        fs::write(&path, xml).unwrap();
        path
    }

    #[test]
    fn test_confirmed_manifest_with_files() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), "session.xml", &["a.mp4", "b.mp4"]);

        let set = resolve_directory(tmp.path()).unwrap();
        assert_eq!(set.manifests.len(), 1);
        assert!(set.errors.is_empty());
        assert_eq!(
            set.manifests[0].referenced_files,
            vec![tmp.path().join("a.mp4"), tmp.path().join("b.mp4")]
        );
        assert_eq!(set.manifests[0].title.as_deref(), Some("session.xml"));
    }

    #[test]
    fn test_referenced_xml_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        // Manifest A references slides.xml, which itself is not a manifest
        write_manifest(tmp.path(), "session.xml", &["slides.xml"]);
        fs::write(tmp.path().join("slides.xml"), "<SlideDeck><Slide/></SlideDeck>").unwrap();
        // Y.xml is malformed and referenced by nothing
        fs::write(tmp.path().join("y.xml"), "<broken").unwrap();

        let set = resolve_directory(tmp.path()).unwrap();
        assert_eq!(set.manifests.len(), 1);
        assert_eq!(set.errors.len(), 1);
        assert_eq!(set.errors[0].path, tmp.path().join("y.xml"));
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), "session.xml", &["slides.xml", "a.mp4"]);
        fs::write(tmp.path().join("slides.xml"), "<SlideDeck/>").unwrap();
        fs::write(tmp.path().join("orphan.xml"), "<Orphan/>").unwrap();

        let first = resolve_directory(tmp.path()).unwrap();
        let second = resolve_directory(tmp.path()).unwrap();

        let paths = |s: &ResolvedSet| {
            (
                s.manifests.iter().map(|m| m.path.clone()).collect::<Vec<_>>(),
                s.errors.iter().map(|e| e.path.clone()).collect::<Vec<_>>(),
            )
        };
        assert_eq!(paths(&first), paths(&second));
        assert_eq!(first.errors.len(), 1);
        assert_eq!(first.errors[0].path, tmp.path().join("orphan.xml"));
    }

    #[test]
    fn test_recursive_scan() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("week1");
        fs::create_dir(&sub).unwrap();
        write_manifest(&sub, "session.xml", &["lecture.mp4"]);

        let set = resolve_directory(tmp.path()).unwrap();
        assert_eq!(set.manifests.len(), 1);
        // References resolve against the manifest's own directory
        assert_eq!(set.manifests[0].referenced_files, vec![sub.join("lecture.mp4")]);
    }

    #[test]
    fn test_duplicate_references_deduplicated() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), "session.xml", &["a.mp4", "a.mp4", "b.mp4"]);

        let set = resolve_directory(tmp.path()).unwrap();
        assert_eq!(
            set.manifests[0].referenced_files,
            vec![tmp.path().join("a.mp4"), tmp.path().join("b.mp4")]
        );
    }

    #[test]
    fn test_mixed_schema_versions() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), "old.xml", &["a.mp4"]);
        fs::write(
            tmp.path().join("new.xml"),
            "<Session><Videos><Video><File>b.mp4</File></Video></Videos></Session>",
        )
        .unwrap();

        let set = resolve_directory(tmp.path()).unwrap();
        assert_eq!(set.manifests.len(), 2);
        assert!(set.errors.is_empty());
    }

    #[test]
    fn test_non_xml_files_ignored() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), "session.xml", &[]);
        fs::write(tmp.path().join("lecture.mp4"), b"not xml at all").unwrap();
        fs::write(tmp.path().join("notes.txt"), "plain text").unwrap();

        let set = resolve_directory(tmp.path()).unwrap();
        assert_eq!(set.manifests.len(), 1);
        assert!(set.errors.is_empty());
    }

    #[test]
    fn test_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let set = resolve_directory(tmp.path()).unwrap();
        assert!(set.manifests.is_empty());
        assert!(set.errors.is_empty());
    }

    #[test]
    fn test_case_insensitive_extension() {
        let tmp = TempDir::new().unwrap();
        let xml = "<PanoptoSession><Title>T</Title></PanoptoSession>";
        fs::write(tmp.path().join("SESSION.XML"), xml).unwrap();

        let set = resolve_directory(tmp.path()).unwrap();
        assert_eq!(set.manifests.len(), 1);
    }
}
