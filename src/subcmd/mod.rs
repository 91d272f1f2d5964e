use eyre::{bail, Result};
use tracing::warn;

use crate::{
    fl,
    repo::{self, RepoError},
};

pub mod add_key;
pub mod add_repo;
pub mod list_repos;
pub mod toggle_repo;
pub mod which;

/// An operation the detected family cannot perform is reported, not failed.
fn tolerate_unsupported<T>(res: repo::Result<T>) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(RepoError::Unsupported(hint)) => {
            warn!("{hint}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// `[NAME] URL` positional pair.
fn split_name_url(args: &[String]) -> Result<(Option<&str>, &str)> {
    match args {
        [url] => Ok((None, url.as_str())),
        [name, url] => Ok((Some(name.as_str()), url.as_str())),
        _ => bail!(fl!("name-url-usage")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_url() {
        let one = vec!["https://x/docker.repo".to_string()];
        assert_eq!(split_name_url(&one).unwrap(), (None, "https://x/docker.repo"));

        let two = vec!["edge".to_string(), "https://x/edge".to_string()];
        assert_eq!(split_name_url(&two).unwrap(), (Some("edge"), "https://x/edge"));

        assert!(split_name_url(&[]).is_err());
    }

    #[test]
    fn test_unsupported_is_not_an_error() {
        let res: repo::Result<()> = Err(RepoError::Unsupported("edit by hand".into()));
        assert!(tolerate_unsupported(res).unwrap().is_none());

        let res: repo::Result<()> = Err(RepoError::Layout("bad".into()));
        assert!(tolerate_unsupported(res).is_err());
    }
}
