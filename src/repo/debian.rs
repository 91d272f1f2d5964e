use std::{fs, path::Path};

use tracing::{debug, info};

use crate::fl;

use super::{
    ensure_dir, fetch_to_temp, lines_inclusive, locate::list_repo_files, read_file, uncomment,
    write_atomic, EnabledState, Outcome, RepoBackend, RepoContext, RepoEntry, RepoError,
    RepositoryFamily, Result,
};

const COMMENT: &str = RepositoryFamily::Debian.config().comment;
const MAIN_SOURCES: &str = "/etc/apt/sources.list";
const KEYRINGS_DIR: &str = "/etc/apt/keyrings";

/// apt: one-line `deb` entries in `sources.list.d/<name>.list`.
pub struct Debian;

impl RepoBackend for Debian {
    fn family(&self) -> RepositoryFamily {
        RepositoryFamily::Debian
    }

    fn add_repo(&self, ctx: &RepoContext, name: Option<&str>, line: &str) -> Result<Outcome> {
        let name = required_name(name)?;
        let config = self.family().config();
        let dir = ctx.path(config.base_dir);
        ensure_dir(&dir)?;

        let path = dir.join(format!("{name}{}", config.suffix));

        ctx.write_new_file(&path, format!("{}\n", line.trim_end()).as_bytes())
    }

    fn set_enabled(&self, ctx: &RepoContext, name: &str, enable: bool) -> Result<Outcome> {
        let config = self.family().config();
        let path = ctx
            .path(config.base_dir)
            .join(format!("{name}{}", config.suffix));
        let content = read_file("repository file", &path)?;

        let edited = if enable {
            enable_sources(&content)
        } else {
            disable_sources(&content)
        };

        match edited {
            Some(edited) => {
                write_atomic(&path, edited.as_bytes())?;
                Ok(Outcome::Changed(path))
            }
            None => Ok(Outcome::Unchanged(path)),
        }
    }

    fn add_key(&self, ctx: &RepoContext, name: Option<&str>, url: &str) -> Result<Outcome> {
        let name = required_name(name)?;
        let dir = ctx.path(KEYRINGS_DIR);
        ensure_dir(&dir)?;

        info!("{}", fl!("downloading", url = url));
        let (tmp, _) = fetch_to_temp(ctx, url)?;
        let key = fs::read(tmp.path()).map_err(|e| RepoError::io("read", tmp.path(), e))?;

        ctx.write_new_file(&dir.join(format!("{name}.asc")), &key)
    }

    fn list(&self, ctx: &RepoContext) -> Result<Vec<RepoEntry>> {
        let mut files = vec![];

        let main = ctx.path(MAIN_SOURCES);
        if main.is_file() {
            files.push(main);
        }

        let dir = ctx.path(self.family().config().base_dir);
        if dir.is_dir() {
            files.extend(list_repo_files(&dir, self.family().config().suffix)?);
        }

        let mut entries = vec![];
        for path in files {
            entries.extend(list_file(&path)?);
        }

        Ok(entries)
    }
}

fn required_name(name: Option<&str>) -> Result<&str> {
    name.filter(|n| !n.is_empty())
        .ok_or_else(|| RepoError::Usage(fl!("name-required")))
}

/// `deb` and `deb-src` lines are the only ones ever toggled.
fn is_source_line(line: &str) -> bool {
    matches!(
        line.split_whitespace().next(),
        Some("deb") | Some("deb-src")
    )
}

fn commented_source(line: &str) -> bool {
    line.trim_start()
        .strip_prefix(COMMENT)
        .is_some_and(|rest| is_source_line(rest))
}

fn enable_sources(content: &str) -> Option<String> {
    let mut changed = false;
    let mut out = String::with_capacity(content.len());

    for line in lines_inclusive(content) {
        if commented_source(line) {
            out.push_str(&uncomment(line));
            changed = true;
        } else {
            out.push_str(line);
        }
    }

    changed.then_some(out)
}

fn disable_sources(content: &str) -> Option<String> {
    let mut changed = false;
    let mut out = String::with_capacity(content.len() + 16);

    for line in lines_inclusive(content) {
        if is_source_line(line) {
            out.push_str(COMMENT);
            out.push(' ');
            changed = true;
        }
        out.push_str(line);
    }

    changed.then_some(out)
}

fn list_file(path: &Path) -> Result<Vec<RepoEntry>> {
    let content = read_file("sources file", path)?;
    let source = path.display().to_string();
    debug!("Reading sources from {source}");

    let entries = content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if is_source_line(line) {
                Some(RepoEntry::new(&source, line, EnabledState::Enabled))
            } else if commented_source(line) {
                Some(RepoEntry::new(
                    &source,
                    uncomment(line),
                    EnabledState::Disabled,
                ))
            } else {
                None
            }
        })
        .collect();

    Ok(entries)
}
