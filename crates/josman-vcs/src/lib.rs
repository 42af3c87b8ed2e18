//! Git access for Josman.
//!
//! [`GitRepo`] lists the release tags of a repository and serves the files
//! of a tag's tree, so past releases can be published without checking them
//! out.

use std::path::{Path, PathBuf};

use gix::bstr::ByteSlice;
use josman_site::{FileEnumerator, SiteVersion, VersionKind};
use tracing::debug;

const DOCS_FOLDER: &str = "docs";

/// Git access error.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("cannot open git repository at {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    #[error("git error in {}: {message}", path.display())]
    Git { path: PathBuf, message: String },

    #[error("tag '{tag}' not found in {}", path.display())]
    TagNotFound { tag: String, path: PathBuf },

    #[error("'{rel_path}' not found at tag '{tag}'")]
    FileNotFound { tag: String, rel_path: String },

    #[error("git holds only release tags, not the working tree")]
    NotATag,
}

impl From<VcsError> for josman_site::Error {
    fn from(err: VcsError) -> Self {
        match err {
            VcsError::FileNotFound { rel_path, .. } => Self::MissingFile(rel_path.into()),
            other => Self::Source(other.to_string()),
        }
    }
}

/// A git repository on disk.
pub struct GitRepo {
    path: PathBuf,
    repo: gix::ThreadSafeRepository,
}

impl GitRepo {
    /// Open the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self, VcsError> {
        let repo = gix::ThreadSafeRepository::discover(path).map_err(|e| VcsError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            repo,
        })
    }

    fn git_error(&self, err: impl std::fmt::Display) -> VcsError {
        VcsError::Git {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }

    /// Short names of all tags.
    pub fn tags(&self) -> Result<Vec<String>, VcsError> {
        let repo = self.repo.to_thread_local();
        let references = repo.references().map_err(|e| self.git_error(e))?;
        let mut tags = Vec::new();
        for reference in references.tags().map_err(|e| self.git_error(e))? {
            let reference = reference.map_err(|e| self.git_error(e))?;
            tags.push(reference.name().shorten().to_str_lossy().into_owned());
        }
        tags.sort();
        debug!(count = tags.len(), repo = %self.path.display(), "Listed tags");
        Ok(tags)
    }

    /// Branch checked out in the working tree, if any.
    pub fn current_branch(&self) -> Result<Option<String>, VcsError> {
        let repo = self.repo.to_thread_local();
        let head = repo.head_name().map_err(|e| self.git_error(e))?;
        Ok(head.map(|name| name.shorten().to_str_lossy().into_owned()))
    }

    fn tag_tree<'r>(&self, repo: &'r gix::Repository, tag: &str) -> Result<gix::Tree<'r>, VcsError> {
        let spec = format!("refs/tags/{tag}");
        let id = repo
            .rev_parse_single(spec.as_str())
            .map_err(|_| VcsError::TagNotFound {
                tag: tag.to_owned(),
                path: self.path.clone(),
            })?;
        id.object()
            .map_err(|e| self.git_error(e))?
            .peel_to_tree()
            .map_err(|e| self.git_error(e))
    }

    /// Files under `docs/` at `tag`, sorted, hidden entries skipped.
    pub fn list_tag_files(&self, tag: &str) -> Result<Vec<String>, VcsError> {
        let repo = self.repo.to_thread_local();
        let root = self.tag_tree(&repo, tag)?;
        let Some(docs) = root
            .lookup_entry_by_path(DOCS_FOLDER)
            .map_err(|e| self.git_error(e))?
        else {
            return Ok(Vec::new());
        };
        if !docs.mode().is_tree() {
            return Ok(Vec::new());
        }
        let docs_tree = docs
            .object()
            .map_err(|e| self.git_error(e))?
            .try_into_tree()
            .map_err(|e| self.git_error(e))?;

        let mut files = Vec::new();
        self.walk_tree(&repo, &docs_tree, DOCS_FOLDER, &mut files)?;
        files.sort();
        debug!(tag, count = files.len(), "Listed tag files");
        Ok(files)
    }

    fn walk_tree(
        &self,
        repo: &gix::Repository,
        tree: &gix::Tree<'_>,
        prefix: &str,
        files: &mut Vec<String>,
    ) -> Result<(), VcsError> {
        for entry in tree.iter() {
            let entry = entry.map_err(|e| self.git_error(e))?;
            let name = entry.filename().to_str_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let rel_path = format!("{prefix}/{name}");
            let mode = entry.mode();
            if mode.is_tree() {
                let subtree = repo
                    .find_object(entry.object_id())
                    .map_err(|e| self.git_error(e))?
                    .try_into_tree()
                    .map_err(|e| self.git_error(e))?;
                self.walk_tree(repo, &subtree, &rel_path, files)?;
            } else if mode.is_blob() {
                files.push(rel_path);
            }
        }
        Ok(())
    }

    /// Bytes of `rel_path` at `tag`.
    pub fn read_tag_file(&self, tag: &str, rel_path: &str) -> Result<Vec<u8>, VcsError> {
        let repo = self.repo.to_thread_local();
        let root = self.tag_tree(&repo, tag)?;
        let not_found = || VcsError::FileNotFound {
            tag: tag.to_owned(),
            rel_path: rel_path.to_owned(),
        };
        let entry = root
            .lookup_entry_by_path(rel_path)
            .map_err(|e| self.git_error(e))?
            .ok_or_else(not_found)?;
        if !entry.mode().is_blob() {
            return Err(not_found());
        }
        let object = entry.object().map_err(|e| self.git_error(e))?;
        Ok(object.detach().data)
    }
}

fn release_tag(version: &SiteVersion) -> Result<&str, VcsError> {
    match &version.kind {
        VersionKind::Release { tag } => Ok(tag),
        VersionKind::Snapshot => Err(VcsError::NotATag),
    }
}

impl FileEnumerator for GitRepo {
    fn list_doc_pages(&self, version: &SiteVersion) -> josman_site::Result<Vec<String>> {
        Ok(self.list_tag_files(release_tag(version)?)?)
    }

    fn read_file(&self, version: &SiteVersion, rel_path: &str) -> josman_site::Result<Vec<u8>> {
        Ok(self.read_tag_file(release_tag(version)?, rel_path)?)
    }
}
