use eyre::Result;
use tracing::info;

use crate::{
    args::AddRepo,
    detect::PackageManager,
    fl,
    repo::{Outcome, RepoContext},
};

use super::{split_name_url, tolerate_unsupported};

pub fn execute(args: AddRepo, pm: &PackageManager, ctx: &RepoContext) -> Result<()> {
    let (name, url) = split_name_url(&args.args)?;

    match tolerate_unsupported(pm.family.add_repo(ctx, name, url))? {
        Some(Outcome::Changed(path)) => {
            info!("{}", fl!("repo-added", path = path.display().to_string()));
            info!("{}", fl!("run-refresh"));
        }
        Some(Outcome::Unchanged(path)) => {
            info!(
                "{}",
                fl!("repo-already-present", path = path.display().to_string())
            );
        }
        Some(Outcome::Delegated) | None => {}
    }

    Ok(())
}
