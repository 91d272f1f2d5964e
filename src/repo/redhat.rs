use std::{fs, path::PathBuf};

use tracing::{debug, info};
use url::Url;

use crate::fl;

use super::{
    ensure_dir, fetch_to_temp, lines_inclusive,
    locate::{find_repo_file, find_repo_file_by_name, list_repo_files},
    read_file,
    section::{extract_section, parse_sections, Section},
    write_atomic, EnabledState, Outcome, RepoBackend, RepoContext, RepoEntry, RepoError,
    RepositoryFamily, Result,
};

/// dnf/yum: ini-style `.repo` files with `[id]` sections.
pub struct RedHat;

impl RepoBackend for RedHat {
    fn family(&self) -> RepositoryFamily {
        RepositoryFamily::RedHat
    }

    fn add_repo(&self, ctx: &RepoContext, name: Option<&str>, url: &str) -> Result<Outcome> {
        let config = self.family().config();
        let dir = ctx.path(config.base_dir);
        ensure_dir(&dir)?;

        if url.ends_with(config.suffix) {
            let name = match name {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => name_from_url(url, config.suffix)
                    .ok_or_else(|| RepoError::Usage(fl!("name-required")))?,
            };

            info!("{}", fl!("downloading", url = url));
            let (tmp, _) = fetch_to_temp(ctx, url)?;
            let content =
                fs::read(tmp.path()).map_err(|e| RepoError::io("read", tmp.path(), e))?;

            return ctx.write_new_file(&dir.join(format!("{name}{}", config.suffix)), &content);
        }

        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| RepoError::Usage(fl!("name-required")))?;
        let content = format!(
            "[{name}]\nname={name}\nbaseurl={url}\n{key}=1\ngpgcheck=0\n",
            key = config.enable_key
        );

        ctx.write_new_file(&dir.join(format!("{name}{}", config.suffix)), content.as_bytes())
    }

    fn set_enabled(&self, ctx: &RepoContext, id: &str, enable: bool) -> Result<Outcome> {
        let config = self.family().config();
        let (path, id) = locate(ctx, id)?;
        let content = read_file("repository file", &path)?;

        let section = extract_section(&content, &id).ok_or_else(|| RepoError::RepoNotFound {
            id: id.clone(),
            suffix: config.suffix.to_string(),
            dir: ctx.path(config.base_dir),
        })?;

        match set_key(&content, &section, config.enable_key, enable) {
            Some(edited) => {
                write_atomic(&path, edited.as_bytes())?;
                Ok(Outcome::Changed(path))
            }
            None => Ok(Outcome::Unchanged(path)),
        }
    }

    fn add_key(&self, _ctx: &RepoContext, _name: Option<&str>, _url: &str) -> Result<Outcome> {
        Err(RepoError::Unsupported(fl!("redhat-key-hint")))
    }

    fn list(&self, ctx: &RepoContext) -> Result<Vec<RepoEntry>> {
        let config = self.family().config();
        let dir = existing_dir(ctx)?;
        let mut entries = vec![];

        for path in list_repo_files(&dir, config.suffix)? {
            let content = read_file("repository file", &path)?;
            let source = path.display().to_string();

            for section in parse_sections(&content).values() {
                let name = match section.value("name") {
                    Some(name) => format!("{name} ({})", section.id),
                    None => section.id.to_string(),
                };
                let state = match section.value(config.enable_key).and_then(parse_flag) {
                    Some(true) => EnabledState::Enabled,
                    Some(false) => EnabledState::Disabled,
                    None => EnabledState::Default,
                };
                entries.push(RepoEntry::new(&source, name, state));
            }
        }

        Ok(entries)
    }
}

fn existing_dir(ctx: &RepoContext) -> Result<PathBuf> {
    let dir = ctx.path(RepositoryFamily::RedHat.config().base_dir);
    if !dir.is_dir() {
        return Err(RepoError::FileNotFound {
            what: "repository directory",
            path: dir,
        });
    }

    Ok(dir)
}

/// Exact `[id]` match across all files first, then a match on the `name=` value.
fn locate(ctx: &RepoContext, id: &str) -> Result<(PathBuf, String)> {
    let suffix = RepositoryFamily::RedHat.config().suffix;
    let dir = existing_dir(ctx)?;

    if let Some(path) = find_repo_file(&dir, suffix, id)? {
        return Ok((path, id.to_string()));
    }

    if let Some(found) = find_repo_file_by_name(&dir, suffix, id)? {
        debug!("No section [{id}], matched by name instead");
        return Ok(found);
    }

    Err(RepoError::RepoNotFound {
        id: id.to_string(),
        suffix: suffix.to_string(),
        dir,
    })
}

/// `https://host/path/docker-ce.repo` -> `docker-ce`
fn name_from_url(url: &str, suffix: &str) -> Option<String> {
    let file = match Url::parse(url) {
        Ok(url) => url.path_segments()?.next_back()?.to_string(),
        Err(_) => url.rsplit('/').next()?.to_string(),
    };

    let name = file.strip_suffix(suffix)?;
    (!name.is_empty()).then(|| name.to_string())
}

fn is_key(line: &str, key: &str) -> bool {
    line.split_once('=').is_some_and(|(k, _)| k.trim() == key)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Rewrites `key` inside `section` to the requested state, or returns `None` when the
/// section already says so. A missing key goes right after the header; repeated keys
/// collapse into the first one. Nothing outside the section changes.
fn set_key(content: &str, section: &Section, key: &str, enable: bool) -> Option<String> {
    let value = if enable { "1" } else { "0" };
    let lines = lines_inclusive(section.body);
    let (header, rest) = lines.split_first()?;

    let current = rest
        .iter()
        .filter(|line| is_key(line, key))
        .map(|line| line.split_once('=').map(|(_, v)| parse_flag(v.trim())))
        .collect::<Vec<_>>();

    if current.len() == 1 && current[0] == Some(Some(enable)) {
        return None;
    }

    let mut body = String::with_capacity(section.body.len() + key.len() + 3);
    body.push_str(header);

    if current.is_empty() {
        if !header.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(&format!("{key}={value}\n"));
        rest.iter().for_each(|line| body.push_str(line));
    } else {
        let mut replaced = false;
        for line in rest {
            if !is_key(line, key) {
                body.push_str(line);
            } else if !replaced {
                let eol = &line[line.trim_end_matches(['\r', '\n']).len()..];
                body.push_str(&format!("{key}={value}{eol}"));
                replaced = true;
            }
        }
    }

    Some(format!(
        "{}{body}{}",
        &content[..section.start],
        &content[section.end..]
    ))
}
