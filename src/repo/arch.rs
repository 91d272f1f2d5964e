use crate::fl;

use super::{
    read_file, section::parse_sections, EnabledState, Outcome, RepoBackend, RepoContext,
    RepoEntry, RepoError, RepositoryFamily, Result,
};

/// pacman: repositories live in `pacman.conf`, which is left to the administrator.
pub struct Arch;

impl RepoBackend for Arch {
    fn family(&self) -> RepositoryFamily {
        RepositoryFamily::Arch
    }

    fn add_repo(&self, _ctx: &RepoContext, _name: Option<&str>, _url: &str) -> Result<Outcome> {
        Err(RepoError::Unsupported(fl!("arch-manual", action = "add")))
    }

    fn set_enabled(&self, _ctx: &RepoContext, _id: &str, enable: bool) -> Result<Outcome> {
        let action = if enable { "enable" } else { "disable" };
        Err(RepoError::Unsupported(fl!("arch-manual", action = action)))
    }

    fn add_key(&self, _ctx: &RepoContext, _name: Option<&str>, _url: &str) -> Result<Outcome> {
        Err(RepoError::Unsupported(fl!("arch-key-hint")))
    }

    fn list(&self, ctx: &RepoContext) -> Result<Vec<RepoEntry>> {
        let config = self.family().config();
        let path = ctx
            .path(config.base_dir)
            .join(format!("pacman{}", config.suffix));
        let content = read_file("pacman configuration", &path)?;
        let source = path.display().to_string();

        let entries = parse_sections(&content)
            .values()
            .filter(|section| section.id != "options")
            .map(|section| {
                let name = match section
                    .value("Include")
                    .map(|v| ("Include", v))
                    .or_else(|| section.value("Server").map(|v| ("Server", v)))
                {
                    Some((key, value)) => format!("{} ({key}: {value})", section.id),
                    None => section.id.to_string(),
                };
                RepoEntry::new(&source, name, EnabledState::Enabled)
            })
            .collect();

        Ok(entries)
    }
}
