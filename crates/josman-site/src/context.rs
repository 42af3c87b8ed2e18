//! Immutable inputs of a page render.

use std::collections::BTreeMap;

use josman_config::ProjectConfig;

use crate::error::{Error, Result};
use crate::expr::ExpressionResultMap;
use crate::github;
use crate::path::{DOCS_CHANGES, DOCS_README};
use crate::version::Version;

/// Project identity and metadata shared by every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
    pub repo_name: String,
    pub group_id: String,
    pub url: String,
    pub description: String,
    /// GitHub organization, from config or parsed from `url`.
    pub organization: String,
    pub scm_url: String,
    pub scm_connection: String,
    pub scm_developer_connection: String,
    pub scm_tag: String,
    pub properties: BTreeMap<String, String>,
}

impl ProjectInfo {
    /// Resolve the organization once; GitHub links need it on every page.
    pub fn from_config(project: &ProjectConfig) -> Result<Self> {
        let organization = project
            .organization
            .clone()
            .filter(|org| !org.trim().is_empty())
            .or_else(|| github::organization_from_url(&project.url))
            .ok_or_else(|| {
                Error::MissingData(format!(
                    "cannot determine the GitHub organization of '{}': set project.organization or a github.com project.url",
                    project.repo_name
                ))
            })?;

        Ok(Self {
            name: project.name.clone(),
            repo_name: project.repo_name.clone(),
            group_id: project.group_id.clone(),
            url: project.url.clone(),
            description: project.description.clone(),
            organization,
            scm_url: project.scm.url.clone(),
            scm_connection: project.scm.connection.clone(),
            scm_developer_connection: project.scm.developer_connection.clone(),
            scm_tag: project.scm.tag.clone(),
            properties: project.properties.clone(),
        })
    }

    /// Display name, falling back to the repository name.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.repo_name
        } else {
            &self.name
        }
    }

    pub fn repo_url(&self) -> String {
        github::repo_url(&self.organization, &self.repo_name)
    }

    pub fn repo_release(&self, version: &Version) -> String {
        github::repo_release(&self.organization, &self.repo_name, version)
    }

    pub fn repo_wiki(&self) -> String {
        github::repo_wiki(&self.organization, &self.repo_name)
    }

    pub fn repo_issues(&self) -> String {
        github::repo_issues(&self.organization, &self.repo_name)
    }

    pub fn repo_milestones(&self) -> String {
        github::repo_milestones(&self.organization, &self.repo_name)
    }

    /// Values for `${name}` substitution on a page of `version`.
    ///
    /// Entries of `[project.properties]` are applied last and win over the
    /// well-known keys.
    pub fn properties(&self, version: &Version) -> BTreeMap<String, String> {
        let mut props: BTreeMap<String, String> = [
            ("project.name", self.display_name().to_owned()),
            ("project.version", version.to_string()),
            ("project.artifactId", self.repo_name.clone()),
            ("project.groupId", self.group_id.clone()),
            ("project.url", self.url.clone()),
            ("project.description", self.description.clone()),
            ("project.scm.url", self.scm_url.clone()),
            ("project.scm.connection", self.scm_connection.clone()),
            ("project.scm.developerConnection", self.scm_developer_connection.clone()),
            ("project.scm.tag", self.scm_tag.clone()),
            ("josman.version", version.to_string()),
            ("josman.majorMinorVersion", version.major_minor()),
            ("josman.repoRelease", self.repo_release(version)),
            ("josman.repoUrl", self.repo_url()),
            ("josman.repoWiki", self.repo_wiki()),
            ("josman.repoIssues", self.repo_issues()),
            (
                "josman.repoWebsite",
                github::repo_website(&self.organization, &self.repo_name),
            ),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect();
        props.extend(self.properties.clone());
        props
    }

    /// Values for the legacy `#{name}` substitution.
    pub fn legacy_properties(&self, version: &Version) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("version".to_owned(), version.to_string()),
            ("majorMinorVersion".to_owned(), version.major_minor()),
            ("repoRelease".to_owned(), self.repo_release(version)),
        ])
    }
}

/// The pages of one version, as listed in its sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingSet {
    paths: Vec<String>,
}

impl SiblingSet {
    /// Fails on an empty list: every version has at least one page.
    pub fn new(paths: Vec<String>) -> Result<Self> {
        if paths.is_empty() {
            return Err(Error::InvalidSidebarInput(
                "a version needs at least one page".to_owned(),
            ));
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Paths by importance: `docs/README.md` first, `docs/CHANGES.md` last,
    /// the rest in input order.
    pub fn ordered(&self) -> Vec<&str> {
        let mut ordered: Vec<&str> = self
            .paths
            .iter()
            .map(String::as_str)
            .filter(|path| *path != DOCS_README && *path != DOCS_CHANGES)
            .collect();
        if self.paths.iter().any(|path| path == DOCS_README) {
            ordered.insert(0, DOCS_README);
        }
        if self.paths.iter().any(|path| path == DOCS_CHANGES) {
            ordered.push(DOCS_CHANGES);
        }
        ordered
    }
}

/// Everything needed to render one page.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub version: &'a Version,
    pub rel_path: &'a str,
    pub siblings: &'a SiblingSet,
    pub results: &'a ExpressionResultMap,
    pub project: &'a ProjectInfo,
}

/// Version tabs of the page header, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTabs {
    versions: Vec<Version>,
}

impl VersionTabs {
    pub fn new(versions: Vec<Version>) -> Self {
        Self { versions }
    }

    /// Tabs for a build: the snapshot (unless it is older than the latest
    /// release line) followed by releases newest first.
    pub fn for_build(snapshot: Option<&Version>, releases: &[Version]) -> Self {
        let mut newest_first: Vec<Version> = releases.to_vec();
        newest_first.sort_by(|a, b| b.cmp(a));

        let mut versions = Vec::with_capacity(newest_first.len() + 1);
        if let Some(snapshot) = snapshot {
            let not_older = newest_first.first().is_none_or(|latest| {
                (snapshot.major(), snapshot.minor()) >= (latest.major(), latest.minor())
            });
            if not_older {
                versions.push(snapshot.clone());
            }
        }
        for release in newest_first {
            if !versions.iter().any(|v| v.same_release_line(&release)) {
                versions.push(release);
            }
        }
        Self { versions }
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn project_config() -> ProjectConfig {
        ProjectConfig {
            name: "Josman".to_owned(),
            repo_name: "josman".to_owned(),
            url: "https://github.com/opendatatrentino/josman".to_owned(),
            ..ProjectConfig::default()
        }
    }

    #[test]
    fn test_organization_from_url() {
        let info = ProjectInfo::from_config(&project_config()).unwrap();
        assert_eq!(info.organization, "opendatatrentino");
    }

    #[test]
    fn test_organization_from_config_wins() {
        let mut config = project_config();
        config.organization = Some("acme".to_owned());
        let info = ProjectInfo::from_config(&config).unwrap();
        assert_eq!(info.organization, "acme");
    }

    #[test]
    fn test_missing_organization() {
        let mut config = project_config();
        config.url = "https://example.com/josman".to_owned();
        assert!(matches!(
            ProjectInfo::from_config(&config),
            Err(Error::MissingData(_))
        ));
    }

    #[test]
    fn test_properties() {
        let mut config = project_config();
        config
            .properties
            .insert("my.prop".to_owned(), "value".to_owned());
        let info = ProjectInfo::from_config(&config).unwrap();
        let props = info.properties(&Version::new(1, 2, 3));

        assert_eq!(props["project.version"], "1.2.3");
        assert_eq!(props["josman.majorMinorVersion"], "1.2");
        assert_eq!(
            props["josman.repoRelease"],
            "https://github.com/opendatatrentino/josman/blob/josman-1.2.3"
        );
        assert_eq!(props["my.prop"], "value");

        let legacy = info.legacy_properties(&Version::new(1, 2, 3));
        assert_eq!(legacy["majorMinorVersion"], "1.2");
    }

    #[test]
    fn test_sibling_set_rejects_empty() {
        assert!(matches!(
            SiblingSet::new(Vec::new()),
            Err(Error::InvalidSidebarInput(_))
        ));
    }

    #[test]
    fn test_sibling_order() {
        let siblings = SiblingSet::new(vec![
            "docs/CHANGES.md".to_owned(),
            "docs/b.md".to_owned(),
            "docs/README.md".to_owned(),
            "docs/a.md".to_owned(),
        ])
        .unwrap();
        assert_eq!(
            siblings.ordered(),
            vec!["docs/README.md", "docs/b.md", "docs/a.md", "docs/CHANGES.md"]
        );
    }

    #[test]
    fn test_tabs_for_build() {
        let releases = [Version::new(0, 1, 2), Version::new(0, 2, 0)];

        let tabs = VersionTabs::for_build(Some(&Version::new(0, 3, 0)), &releases);
        let names: Vec<String> = tabs.versions().iter().map(Version::major_minor).collect();
        assert_eq!(names, vec!["0.3", "0.2", "0.1"]);

        let tabs = VersionTabs::for_build(Some(&Version::new(0, 1, 5)), &releases);
        let names: Vec<String> = tabs.versions().iter().map(Version::major_minor).collect();
        assert_eq!(names, vec!["0.2", "0.1"]);

        let tabs = VersionTabs::for_build(Some(&Version::new(0, 2, 1)), &releases);
        assert_eq!(tabs.versions()[0], Version::new(0, 2, 1));
        assert_eq!(tabs.versions().len(), 2);
    }
}
