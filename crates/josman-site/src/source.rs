//! Collaborators that feed the pipeline: versions, files and logos.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::path::DOCS_FOLDER;
use crate::version::{Version, version_tags_to_process};

/// Where the documentation of a version comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKind {
    /// The working tree.
    Snapshot,
    /// A release tag of the repository.
    Release { tag: String },
}

/// A version to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteVersion {
    pub version: Version,
    pub kind: VersionKind,
}

impl SiteVersion {
    pub fn snapshot(version: Version) -> Self {
        Self {
            version,
            kind: VersionKind::Snapshot,
        }
    }

    pub fn release(version: Version, tag: impl Into<String>) -> Self {
        Self {
            version,
            kind: VersionKind::Release { tag: tag.into() },
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.kind == VersionKind::Snapshot
    }
}

/// Lists the versions of a build.
pub trait VersionSource: Send + Sync {
    /// Releases in ascending order, then the snapshot.
    fn list_versions(&self) -> Result<Vec<SiteVersion>>;
}

/// Lists and reads the files of a version.
pub trait FileEnumerator: Send + Sync {
    /// Every file under `docs/`, as sorted `/`-separated paths relative to
    /// the repository root.
    fn list_doc_pages(&self, version: &SiteVersion) -> Result<Vec<String>>;

    /// Bytes of a file, path relative to the repository root.
    fn read_file(&self, version: &SiteVersion, rel_path: &str) -> Result<Vec<u8>>;
}

/// Existing logo files, used to decide logo visibility.
pub trait AssetLocator: Send + Sync {
    fn program_logo_path(&self) -> Option<PathBuf>;
    fn org_logo_path(&self) -> Option<PathBuf>;
}

/// Versions from a list of repository tags and the project settings.
#[derive(Debug, Clone)]
pub struct ProjectVersions {
    repo_name: String,
    tags: Vec<String>,
    ignored: Vec<Version>,
    snapshot: Option<Version>,
    releases: bool,
}

impl ProjectVersions {
    pub fn new(repo_name: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            tags,
            ignored: Vec::new(),
            snapshot: None,
            releases: false,
        }
    }

    /// Publish the snapshot of the working tree as `version`.
    #[must_use]
    pub fn with_snapshot(mut self, version: Version) -> Self {
        self.snapshot = Some(version);
        self
    }

    /// Publish release tags.
    #[must_use]
    pub fn with_releases(mut self, releases: bool) -> Self {
        self.releases = releases;
        self
    }

    #[must_use]
    pub fn with_ignored(mut self, ignored: Vec<Version>) -> Self {
        self.ignored = ignored;
        self
    }
}

impl VersionSource for ProjectVersions {
    fn list_versions(&self) -> Result<Vec<SiteVersion>> {
        let mut versions = Vec::new();
        if self.releases {
            let tags = version_tags_to_process(&self.repo_name, &self.tags, &self.ignored);
            if tags.is_empty() && self.snapshot.is_none() {
                return Err(Error::MissingData(format!(
                    "no release tags of the form {}-X.Y.Z",
                    self.repo_name
                )));
            }
            versions.extend(
                tags.into_iter()
                    .map(|tag| SiteVersion::release(tag.version, tag.name)),
            );
        }
        if let Some(snapshot) = &self.snapshot {
            versions.push(SiteVersion::snapshot(snapshot.clone()));
        }
        Ok(versions)
    }
}

/// Working-tree files of the snapshot.
#[derive(Debug, Clone)]
pub struct FsFileEnumerator {
    source_dir: PathBuf,
}

impl FsFileEnumerator {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }
}

impl FileEnumerator for FsFileEnumerator {
    fn list_doc_pages(&self, _version: &SiteVersion) -> Result<Vec<String>> {
        let docs_dir = self.source_dir.join(DOCS_FOLDER);
        if !docs_dir.is_dir() {
            return Err(Error::MissingFile(docs_dir));
        }
        let mut files = Vec::new();
        walk_files(&docs_dir, DOCS_FOLDER, &mut files)?;
        files.sort();
        debug!(count = files.len(), dir = %docs_dir.display(), "Listed doc files");
        Ok(files)
    }

    fn read_file(&self, _version: &SiteVersion, rel_path: &str) -> Result<Vec<u8>> {
        let path = self.source_dir.join(rel_path);
        fs::read(&path).map_err(|e| Error::io(&path, e))
    }
}

/// Collect files below `dir`, skipping hidden entries.
pub(crate) fn walk_files(dir: &Path, prefix: &str, files: &mut Vec<String>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let rel_path = format!("{prefix}/{name}");
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        if is_dir {
            walk_files(&entry.path(), &rel_path, files)?;
        } else {
            files.push(rel_path);
        }
    }
    Ok(())
}

/// Logos under `<source>/docs/img/`.
#[derive(Debug, Clone)]
pub struct FsAssetLocator {
    img_dir: PathBuf,
    repo_name: String,
    organization: String,
}

impl FsAssetLocator {
    pub fn new(source_dir: &Path, repo_name: &str, organization: &str) -> Self {
        Self {
            img_dir: source_dir.join(DOCS_FOLDER).join("img"),
            repo_name: repo_name.to_owned(),
            organization: organization.to_owned(),
        }
    }

    fn existing(&self, owner: &str) -> Option<PathBuf> {
        let path = self.img_dir.join(logo_file_name(owner));
        path.is_file().then_some(path)
    }
}

impl AssetLocator for FsAssetLocator {
    fn program_logo_path(&self) -> Option<PathBuf> {
        self.existing(&self.repo_name)
    }

    fn org_logo_path(&self) -> Option<PathBuf> {
        self.existing(&self.organization)
    }
}

/// Logo file name of a program or organization.
pub fn logo_file_name(owner: &str) -> String {
    format!("{owner}-logo-200px.png")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_project_versions() {
        let tags = vec![
            "josman-0.1.0".to_owned(),
            "josman-0.1.2".to_owned(),
            "josman-0.2.0".to_owned(),
            "other-9.9.9".to_owned(),
        ];
        let versions = ProjectVersions::new("josman", tags)
            .with_releases(true)
            .with_ignored(vec![Version::new(0, 2, 0)])
            .with_snapshot(Version::new(0, 3, 0))
            .list_versions()
            .unwrap();

        assert_eq!(
            versions,
            vec![
                SiteVersion::release(Version::new(0, 1, 2), "josman-0.1.2"),
                SiteVersion::snapshot(Version::new(0, 3, 0)),
            ]
        );
    }

    #[test]
    fn test_project_versions_without_releases() {
        let versions = ProjectVersions::new("josman", vec!["josman-0.1.0".to_owned()])
            .with_snapshot(Version::new(0, 2, 0))
            .list_versions()
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].is_snapshot());
    }

    #[test]
    fn test_project_versions_requires_tags() {
        let result = ProjectVersions::new("josman", Vec::new())
            .with_releases(true)
            .list_versions();
        assert!(matches!(result, Err(Error::MissingData(_))));
    }

    #[test]
    fn test_fs_enumerator() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("img")).unwrap();
        fs::create_dir_all(docs.join(".hidden")).unwrap();
        fs::write(docs.join("README.md"), "# Hi").unwrap();
        fs::write(docs.join("b.md"), "b").unwrap();
        fs::write(docs.join("img/a.png"), [1u8, 2]).unwrap();
        fs::write(docs.join(".hidden/x.md"), "x").unwrap();

        let files = FsFileEnumerator::new(dir.path());
        let version = SiteVersion::snapshot(Version::new(1, 0, 0));
        assert_eq!(
            files.list_doc_pages(&version).unwrap(),
            vec!["docs/README.md", "docs/b.md", "docs/img/a.png"]
        );
        assert_eq!(files.read_file(&version, "docs/b.md").unwrap(), b"b");
        assert!(matches!(
            files.read_file(&version, "docs/nope.md"),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_fs_enumerator_missing_docs() {
        let dir = tempfile::tempdir().unwrap();
        let files = FsFileEnumerator::new(dir.path());
        let version = SiteVersion::snapshot(Version::new(1, 0, 0));
        assert!(matches!(
            files.list_doc_pages(&version),
            Err(Error::MissingFile(_))
        ));
    }

    #[test]
    fn test_asset_locator() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("docs/img");
        fs::create_dir_all(&img).unwrap();
        fs::write(img.join("josman-logo-200px.png"), [0u8]).unwrap();

        let assets = FsAssetLocator::new(dir.path(), "josman", "acme");
        assert_eq!(
            assets.program_logo_path(),
            Some(img.join("josman-logo-200px.png"))
        );
        assert_eq!(assets.org_logo_path(), None);
    }
}
