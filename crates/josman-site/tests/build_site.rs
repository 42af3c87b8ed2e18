//! End-to-end site generation over a temporary repository.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use josman_config::ProjectConfig;
use josman_site::{
    BuildConfig, Error, FileEnumerator, FsFileEnumerator, ProjectInfo, ProjectVersions, Result,
    SiteBuilder, SiteVersion, Version,
};

/// Release trees held in memory, keyed by tag then path.
struct TagTrees(BTreeMap<String, BTreeMap<String, String>>);

impl TagTrees {
    fn tree(&self, version: &SiteVersion) -> Result<&BTreeMap<String, String>> {
        let tag = match &version.kind {
            josman_site::VersionKind::Release { tag } => tag,
            josman_site::VersionKind::Snapshot => {
                return Err(Error::Source("snapshot is not a tag".to_owned()));
            }
        };
        self.0
            .get(tag)
            .ok_or_else(|| Error::Source(format!("unknown tag {tag}")))
    }
}

impl FileEnumerator for TagTrees {
    fn list_doc_pages(&self, version: &SiteVersion) -> Result<Vec<String>> {
        Ok(self
            .tree(version)?
            .keys()
            .filter(|path| path.starts_with("docs/"))
            .cloned()
            .collect())
    }

    fn read_file(&self, version: &SiteVersion, rel_path: &str) -> Result<Vec<u8>> {
        self.tree(version)?
            .get(rel_path)
            .map(|content| content.as_bytes().to_vec())
            .ok_or_else(|| Error::MissingFile(rel_path.into()))
    }
}

fn write(root: &Path, rel_path: &str, content: &str) {
    let path = root.join(rel_path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> ProjectInfo {
    let mut config = ProjectConfig::default();
    config.name = "Wonder".to_owned();
    config.repo_name = "wonder".to_owned();
    config.url = "https://github.com/acme/wonder".to_owned();
    ProjectInfo::from_config(&config).unwrap()
}

fn sample_repo(root: &Path) {
    write(root, "README.md", "# Wonder\n\nStart with the [usage](docs/README.md).\n");
    write(root, "LICENSE.txt", "Apache License\n");
    write(
        root,
        "docs/README.md",
        "# Usage\n\nThis is version ${project.version}.\n\n### Setup\n\nRead the [guide](userGuide.md).\n",
    );
    write(root, "docs/userGuide.md", "# Guide\n\n### First steps\n\nHello.\n");
    write(root, "docs/CHANGES.md", "# Changes\n\n### 1.2.0\n\nFirst.\n");
    write(root, "docs/img/pic.png", "png");
}

fn config(root: &Path) -> BuildConfig {
    BuildConfig {
        source_dir: root.to_path_buf(),
        pages_dir: root.join("target/site"),
        ignore_errors: false,
        warn_on_todo: false,
        javadoc_dir: None,
    }
}

#[test]
fn test_snapshot_build_writes_versioned_pages() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    sample_repo(root);

    let versions = Arc::new(ProjectVersions::new("wonder", Vec::new()).with_snapshot(Version::new(1, 2, 0)));
    let files = Arc::new(FsFileEnumerator::new(root));
    let report = SiteBuilder::new(config(root), project(), versions, files)
        .build()
        .unwrap();

    assert_eq!(report.versions, vec![Version::new(1, 2, 0)]);
    assert_eq!(report.pages, 4);
    assert_eq!(report.copied, 1);
    assert!(report.skipped.is_empty());

    let site = root.join("target/site");
    for rel in [
        "index.html",
        "1.2/index.html",
        "1.2/userGuide.html",
        "1.2/CHANGES.html",
        "1.2/img/pic.png",
        "latest/index.html",
        "latest/userGuide.html",
        "css/josman.css",
        "js/josman.js",
        "LICENSE.txt",
    ] {
        assert!(site.join(rel).is_file(), "missing {rel}");
    }
    assert!(!site.join("skeleton.html").exists());

    let index = fs::read_to_string(site.join("index.html")).unwrap();
    assert!(index.contains("href=\"1.2/index.html\""));
    assert!(!index.contains("josman-to-strip"));

    let usage = fs::read_to_string(site.join("1.2/index.html")).unwrap();
    assert!(usage.contains("This is version 1.2.0."));
    assert!(usage.contains("href=\"userGuide.html\""));
    assert!(usage.contains("User guide"));
    assert!(usage.contains("Release notes"));
    assert!(usage.contains("href=\"../css/josman.css\""));
}

#[test]
fn test_snapshot_replaces_release_of_same_line() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    sample_repo(root);

    let old_tree = BTreeMap::from([
        ("README.md".to_owned(), "# Wonder 1.1\n".to_owned()),
        ("docs/README.md".to_owned(), "# Old usage\n\nVersion ${project.version}.\n".to_owned()),
    ]);
    let bare_tree = BTreeMap::from([("README.md".to_owned(), "# Wonder 1.0\n\nOnly a readme.\n".to_owned())]);
    let trees = TagTrees(BTreeMap::from([
        ("wonder-1.0.4".to_owned(), bare_tree),
        ("wonder-1.1.3".to_owned(), old_tree.clone()),
        ("wonder-1.2.0".to_owned(), old_tree),
    ]));

    let tags = vec!["wonder-1.0.4".to_owned(), "wonder-1.1.3".to_owned(), "wonder-1.2.0".to_owned()];
    let versions = Arc::new(
        ProjectVersions::new("wonder", tags)
            .with_releases(true)
            .with_snapshot(Version::new(1, 2, 1)),
    );
    let files = Arc::new(FsFileEnumerator::new(root));
    let report = SiteBuilder::new(config(root), project(), versions, files)
        .with_release_files(Arc::new(trees))
        .build()
        .unwrap();

    assert_eq!(
        report.versions,
        vec![Version::new(1, 0, 4), Version::new(1, 1, 3), Version::new(1, 2, 1)]
    );

    let site = root.join("target/site");
    let old = fs::read_to_string(site.join("1.1/index.html")).unwrap();
    assert!(old.contains("Version 1.1.3."));
    let bare = fs::read_to_string(site.join("1.0/index.html")).unwrap();
    assert!(bare.contains("Only a readme."));
    let current = fs::read_to_string(site.join("1.2/index.html")).unwrap();
    assert!(current.contains("This is version 1.2.1."));
}

#[test]
fn test_release_without_file_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    sample_repo(root);

    let versions = Arc::new(
        ProjectVersions::new("wonder", vec!["wonder-1.1.0".to_owned()])
            .with_releases(true)
            .with_snapshot(Version::new(1, 2, 0)),
    );
    let files = Arc::new(FsFileEnumerator::new(root));
    let err = SiteBuilder::new(config(root), project(), versions, files)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Source(_)));
}

#[test]
fn test_lenient_build_skips_broken_page() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    sample_repo(root);
    write(root, "docs/broken.md", "# Broken\n\n$eval{a.B.c(1)}\n");

    let versions = Arc::new(ProjectVersions::new("wonder", Vec::new()).with_snapshot(Version::new(1, 2, 0)));
    let files = Arc::new(FsFileEnumerator::new(root));
    let mut lenient = config(root);
    lenient.ignore_errors = true;
    let report = SiteBuilder::new(lenient, project(), versions, files)
        .build()
        .unwrap();

    assert_eq!(report.skipped, vec!["1.2/docs/broken.md".to_owned()]);
    assert!(!root.join("target/site/1.2/broken.html").exists());
    assert!(root.join("target/site/1.2/userGuide.html").is_file());
}
