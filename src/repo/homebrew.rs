use tracing::info;

use crate::fl;

use super::{
    EnabledState, Outcome, RepoBackend, RepoContext, RepoEntry, RepoError, RepositoryFamily,
    Result,
};

/// Homebrew: taps are managed by `brew` itself.
pub struct Homebrew;

impl RepoBackend for Homebrew {
    fn family(&self) -> RepositoryFamily {
        RepositoryFamily::Homebrew
    }

    fn add_repo(&self, ctx: &RepoContext, name: Option<&str>, url: &str) -> Result<Outcome> {
        let name = name.filter(|n| !n.is_empty());
        info!("{}", fl!("brew-tap", tap = name.unwrap_or(url)));

        match name {
            Some(name) => ctx.runner.run("brew", &["tap", name, url])?,
            None => ctx.runner.run("brew", &["tap", url])?,
        }

        Ok(Outcome::Delegated)
    }

    fn set_enabled(&self, _ctx: &RepoContext, _id: &str, enable: bool) -> Result<Outcome> {
        Err(RepoError::Unsupported(if enable {
            fl!("brew-enable-hint")
        } else {
            fl!("brew-disable-hint")
        }))
    }

    fn add_key(&self, _ctx: &RepoContext, _name: Option<&str>, _url: &str) -> Result<Outcome> {
        Err(RepoError::Unsupported(fl!("brew-key-hint")))
    }

    fn list(&self, ctx: &RepoContext) -> Result<Vec<RepoEntry>> {
        let taps = ctx.runner.output("brew", &["tap"])?;

        Ok(taps
            .lines()
            .map(str::trim)
            .filter(|tap| !tap.is_empty())
            .map(|tap| RepoEntry::new("brew tap", tap, EnabledState::Enabled))
            .collect())
    }
}
