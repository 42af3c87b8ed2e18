//! GitHub URLs of a project.

use crate::version::Version;

pub fn repo_url(organization: &str, repo_name: &str) -> String {
    format!("https://github.com/{organization}/{repo_name}")
}

/// Tree of the repository at a release tag.
pub fn repo_release(organization: &str, repo_name: &str, version: &Version) -> String {
    format!(
        "{}/blob/{}",
        repo_url(organization, repo_name),
        version.release_tag(repo_name)
    )
}

pub fn repo_wiki(organization: &str, repo_name: &str) -> String {
    format!("{}/wiki", repo_url(organization, repo_name))
}

pub fn repo_issues(organization: &str, repo_name: &str) -> String {
    format!("{}/issues", repo_url(organization, repo_name))
}

pub fn repo_milestones(organization: &str, repo_name: &str) -> String {
    format!("{}/milestones", repo_url(organization, repo_name))
}

/// GitHub Pages site of the project.
pub fn repo_website(organization: &str, repo_name: &str) -> String {
    format!("https://{organization}.github.io/{repo_name}")
}

/// Organization (first path segment) of a `github.com` URL.
///
/// ```
/// use josman_site::github::organization_from_url;
///
/// assert_eq!(
///     organization_from_url("https://github.com/opendatatrentino/josman").as_deref(),
///     Some("opendatatrentino")
/// );
/// assert_eq!(organization_from_url("https://example.com/a/b"), None);
/// ```
pub fn organization_from_url(url: &str) -> Option<String> {
    let rest = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))?;
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let path = rest.strip_prefix("github.com/")?;
    path.split('/')
        .next()
        .filter(|org| !org.is_empty())
        .map(str::to_owned)
}
