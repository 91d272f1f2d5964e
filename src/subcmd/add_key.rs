use eyre::Result;
use tracing::info;

use crate::{
    args::AddKey,
    detect::PackageManager,
    fl,
    repo::{Outcome, RepoContext},
};

use super::{split_name_url, tolerate_unsupported};

pub fn execute(args: AddKey, pm: &PackageManager, ctx: &RepoContext) -> Result<()> {
    let (name, url) = split_name_url(&args.args)?;

    match tolerate_unsupported(pm.family.add_key(ctx, name, url))? {
        Some(Outcome::Changed(path)) => {
            info!("{}", fl!("key-added", path = path.display().to_string()));
        }
        Some(Outcome::Unchanged(path)) => {
            info!(
                "{}",
                fl!("key-already-present", path = path.display().to_string())
            );
        }
        Some(Outcome::Delegated) | None => {}
    }

    Ok(())
}
