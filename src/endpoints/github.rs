use crate::config::RepoLocation;

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const RAW_CONTENT_URL: &str = "https://raw.githubusercontent.com";

pub enum GithubEndpoint<'a> {
    Contents(&'a RepoLocation, &'a str),
    RawContents(&'a RepoLocation, &'a str),
}

impl GithubEndpoint<'_> {
    pub fn url(&self) -> String {
        match self {
            GithubEndpoint::Contents(repo, path) => {
                format!(
                    "{}/repos/{}/{}/contents/{}",
                    repo.api_url.trim_end_matches('/'),
                    repo.owner,
                    repo.repo,
                    path
                )
            }
            GithubEndpoint::RawContents(repo, path) => {
                format!(
                    "{}/{}/{}/{}/{}",
                    repo.raw_url.trim_end_matches('/'),
                    repo.owner,
                    repo.repo,
                    repo.branch,
                    path
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoLocation {
        RepoLocation {
            api_url: GITHUB_API_URL.to_owned(),
            raw_url: RAW_CONTENT_URL.to_owned(),
            owner: "mlbb-tools".to_owned(),
            repo: "skins".to_owned(),
            branch: "main".to_owned(),
            data_dir: String::new(),
        }
    }

    #[test]
    fn contents_url() {
        let repo = repo();

        assert_eq!(
            GithubEndpoint::Contents(&repo, "Hero.json").url(),
            "https://api.github.com/repos/mlbb-tools/skins/contents/Hero.json"
        );
    }

    #[test]
    fn raw_url_includes_branch() {
        let repo = repo();

        assert_eq!(
            GithubEndpoint::RawContents(&repo, "data/Skin.json").url(),
            "https://raw.githubusercontent.com/mlbb-tools/skins/main/data/Skin.json"
        );
    }
}
