//! Unit tests for the reconciler.

use super::*;
use crate::ignore::IgnoreRules;
use crate::manifest::parse_manifest;
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

fn manifest(id: &str, version: &str) -> AddonManifest {
    let text = format!(r#"<addon id="{id}" version="{version}"/>"#);
    parse_manifest(&text, Utf8Path::new("test/addon.xml")).expect("valid manifest")
}

#[rstest]
#[case::new_package(None, "1.0", false, Decision::Insert)]
#[case::new_package_forced(None, "1.0", true, Decision::Insert)]
#[case::same_version(Some("1.0"), "1.0", false, Decision::Skip)]
#[case::same_version_forced(Some("1.0"), "1.0", true, Decision::Replace)]
#[case::newer_version(Some("1.0"), "2.0", false, Decision::Replace)]
#[case::older_version(Some("2.0"), "1.0", false, Decision::Replace)]
#[case::literal_comparison(Some("1.0"), "1.0.0", false, Decision::Replace)]
fn decide_table(
    #[case] existing_version: Option<&str>,
    #[case] scanned_version: &str,
    #[case] force: bool,
    #[case] expected: Decision,
) {
    let existing = existing_version.map(|version| manifest("foo", version));
    let scanned = manifest("foo", scanned_version);
    assert_eq!(decide(existing.as_ref(), &scanned, force), expected);
}

struct Release {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Release {
    fn output(&self) -> Utf8PathBuf {
        self.root.join("zips")
    }

    fn reconciler(&self, force: bool) -> Reconciler {
        Reconciler::new(
            Archiver::new(self.output(), IgnoreRules::default()),
            AssetPublisher::new(self.output()),
            force,
        )
    }

    fn package(&self, id: &str, version: &str) -> Utf8PathBuf {
        let dir = self.root.join(id);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(
            dir.join("addon.xml"),
            format!(r#"<addon id="{id}" version="{version}"/>"#),
        )
        .expect("manifest");
        fs::write(dir.join("default.py"), "pass").expect("source");
        dir
    }
}

#[fixture]
fn release() -> Release {
    let dir = TempDir::new().expect("temp dir creation succeeds");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8");
    Release { _dir: dir, root }
}

#[rstest]
fn insert_archives_and_publishes(release: Release) {
    let package = release.package("foo", "1.0");

    let outcome = release
        .reconciler(false)
        .process_package(&Catalog::new(), &package)
        .expect("processed");

    assert_eq!(outcome.decision, Decision::Insert);
    assert!(outcome.archive.as_ref().is_some_and(ArchiveOutcome::was_built));
    assert!(release.output().join("foo/foo-1.0.zip").is_file());
    assert_eq!(outcome.assets, vec![release.output().join("foo/addon.xml")]);
}

#[rstest]
fn skip_has_no_side_effects(release: Release) {
    let package = release.package("foo", "1.0");
    let catalog = Catalog::new().with_entry(manifest("foo", "1.0"));

    let outcome = release
        .reconciler(false)
        .process_package(&catalog, &package)
        .expect("processed");

    assert_eq!(outcome.decision, Decision::Skip);
    assert!(outcome.archive.is_none());
    assert!(!release.output().exists());
}

#[rstest]
fn reconcile_merges_changes_and_reports_dirty(release: Release) {
    let packages = vec![release.package("b.addon", "1"), release.package("a.addon", "1")];

    let result = release.reconciler(false).reconcile(Catalog::new(), packages);

    assert!(result.dirty);
    assert!(result.failures.is_empty());
    let ids: Vec<&str> = result.catalog.iter().map(|m| m.id().as_str()).collect();
    assert_eq!(ids, vec!["a.addon", "b.addon"]);
}

#[rstest]
fn reconcile_without_changes_is_clean(release: Release) {
    let packages = vec![release.package("foo", "1.0")];
    let catalog = Catalog::new().with_entry(manifest("foo", "1.0"));

    let result = release.reconciler(false).reconcile(catalog.clone(), packages);

    assert!(!result.dirty);
    assert_eq!(result.catalog, catalog);
    assert_eq!(result.outcomes.len(), 1);
}

#[rstest]
fn failures_are_isolated(release: Release) {
    let broken = release.root.join("broken");
    fs::create_dir_all(&broken).expect("mkdir");
    fs::write(broken.join("addon.xml"), r#"<addon id="broken"/>"#).expect("manifest");
    let good = release.package("good", "1.0");

    let result = release
        .reconciler(false)
        .reconcile(Catalog::new(), vec![broken.clone(), good]);

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].package_dir, broken);
    assert!(matches!(
        result.failures[0].error,
        PackageError::MissingField { field: "version", .. }
    ));
    assert_eq!(result.catalog.len(), 1);
    assert!(result.dirty);
}

#[rstest]
fn archive_failure_keeps_previous_entry(release: Release) {
    let package = release.package("foo", "2.0");
    // A file where the id directory belongs stops the archive being written.
    fs::create_dir_all(release.output()).expect("mkdir");
    fs::write(release.output().join("foo"), "in the way").expect("blocker");
    let catalog = Catalog::new().with_entry(manifest("foo", "1.0"));

    let result = release.reconciler(false).reconcile(catalog.clone(), vec![package]);

    assert_eq!(result.failures.len(), 1);
    assert!(matches!(result.failures[0].error, PackageError::ArchiveWrite { .. }));
    assert!(!result.dirty);
    assert_eq!(result.catalog, catalog);
}
