use dialoguer::console::style;
use eyre::Result;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use crate::{
    detect::PackageManager,
    fl,
    repo::{EnabledState, RepoContext, RepoEntry},
};

use super::tolerate_unsupported;

#[derive(Tabled)]
struct RepoRow {
    source: String,
    repository: String,
    status: String,
}

impl From<RepoEntry> for RepoRow {
    fn from(entry: RepoEntry) -> Self {
        let status = match entry.state {
            EnabledState::Enabled => style(fl!("state-enabled")).green(),
            EnabledState::Disabled => style(fl!("state-disabled")).red(),
            EnabledState::Default => style(fl!("state-default")).green().dim(),
        };

        RepoRow {
            source: entry.source,
            repository: entry.name,
            status: status.to_string(),
        }
    }
}

pub fn execute(pm: &PackageManager, ctx: &RepoContext) -> Result<()> {
    let Some(entries) = tolerate_unsupported(pm.family.list_repos(ctx))? else {
        return Ok(());
    };

    if entries.is_empty() {
        info!("{}", fl!("no-repos"));
        return Ok(());
    }

    let mut t = Table::new(entries.into_iter().map(RepoRow::from));
    t.with(Style::psql());

    println!("{t}");

    Ok(())
}
