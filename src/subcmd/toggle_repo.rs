use eyre::Result;
use tracing::info;

use crate::{
    detect::PackageManager,
    fl,
    repo::{Outcome, RepoContext},
};

use super::tolerate_unsupported;

/// `enable-repo` and `disable-repo`.
pub fn execute(name: &str, enable: bool, pm: &PackageManager, ctx: &RepoContext) -> Result<()> {
    let res = if enable {
        pm.family.enable_repo(ctx, name)
    } else {
        pm.family.disable_repo(ctx, name)
    };

    let Some(outcome) = tolerate_unsupported(res)? else {
        return Ok(());
    };

    let name = name.to_string();
    match (outcome, enable) {
        (Outcome::Changed(path), true) => {
            let path = path.display().to_string();
            info!("{}", fl!("repo-enabled", name = name, path = path));
            info!("{}", fl!("run-refresh"));
        }
        (Outcome::Changed(path), false) => {
            let path = path.display().to_string();
            info!("{}", fl!("repo-disabled", name = name, path = path));
            info!("{}", fl!("run-refresh"));
        }
        (Outcome::Unchanged(_), true) => info!("{}", fl!("repo-already-enabled", name = name)),
        (Outcome::Unchanged(_), false) => info!("{}", fl!("repo-already-disabled", name = name)),
        (Outcome::Delegated, _) => {}
    }

    Ok(())
}
