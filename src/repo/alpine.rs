use std::{fs, path::PathBuf};

use tracing::info;

use crate::fl;

use super::{
    ensure_dir, fetch_to_temp, lines_inclusive, read_file, uncomment, write_atomic,
    EnabledState, Outcome, RepoBackend, RepoContext, RepoEntry, RepoError, RepositoryFamily,
    Result,
};

const COMMENT: &str = RepositoryFamily::Alpine.config().comment;
const KEYS_DIR: &str = "/etc/apk/keys";

/// apk: a single flat `repositories` file, one URL per line.
pub struct Alpine;

impl Alpine {
    fn repositories(ctx: &RepoContext) -> PathBuf {
        ctx.path(RepositoryFamily::Alpine.config().base_dir)
            .join("repositories")
    }
}

impl RepoBackend for Alpine {
    fn family(&self) -> RepositoryFamily {
        RepositoryFamily::Alpine
    }

    fn add_repo(&self, ctx: &RepoContext, name: Option<&str>, url: &str) -> Result<Outcome> {
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| RepoError::Usage(fl!("name-required")))?;
        let path = Self::repositories(ctx);
        let mut content = read_file("repositories file", &path)?;

        if content.contains(url) {
            return Ok(Outcome::Unchanged(path));
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&format!("\n{COMMENT} {name}\n{url}\n"));

        write_atomic(&path, content.as_bytes())?;

        Ok(Outcome::Changed(path))
    }

    fn set_enabled(&self, ctx: &RepoContext, name: &str, enable: bool) -> Result<Outcome> {
        let path = Self::repositories(ctx);
        let content = read_file("repositories file", &path)?;

        let edited = if enable {
            enable_named(&content, name)?
        } else {
            match disable_matching(&content, name) {
                Toggle::Edited(edited) => Some(edited),
                Toggle::Already => None,
                Toggle::Missing => {
                    return Err(RepoError::EntryNotFound {
                        id: name.to_string(),
                        path,
                    })
                }
            }
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
        let dir = ctx.path(KEYS_DIR);
        ensure_dir(&dir)?;

        info!("{}", fl!("downloading", url = url));
        let (tmp, download) = fetch_to_temp(ctx, url)?;

        let name = name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or(download.filename)
            .or_else(|| {
                url.rsplit('/')
                    .next()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .ok_or_else(|| RepoError::Usage(fl!("name-required")))?;

        let key = fs::read(tmp.path()).map_err(|e| RepoError::io("read", tmp.path(), e))?;

        ctx.write_new_file(&dir.join(name), &key)
    }

    fn list(&self, ctx: &RepoContext) -> Result<Vec<RepoEntry>> {
        let path = Self::repositories(ctx);
        let content = read_file("repositories file", &path)?;
        let source = path.display().to_string();

        let entries = content
            .lines()
            .map(str::trim)
            .filter_map(|line| {
                if line.is_empty() {
                    None
                } else if line.starts_with('#') {
                    line.contains("://").then(|| {
                        RepoEntry::new(&source, uncomment(line), EnabledState::Disabled)
                    })
                } else {
                    Some(RepoEntry::new(&source, line, EnabledState::Enabled))
                }
            })
            .collect();

        Ok(entries)
    }
}

enum Toggle {
    Edited(String),
    Already,
    Missing,
}

fn is_active(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with(COMMENT)
}

/// Index of the `# <name>` line written by `add_repo`.
fn name_marker(lines: &[&str], name: &str) -> Option<usize> {
    let marker = format!("{COMMENT} {name}");
    lines.iter().position(|line| line.trim() == marker)
}

/// Uncomments the URL line that follows the `# <name>` marker. Only the layout produced by
/// `add_repo` is understood; anything else is an error rather than a guess.
fn enable_named(content: &str, name: &str) -> Result<Option<String>> {
    let mut lines = lines_inclusive(content);
    let layout_error = || RepoError::Layout(fl!("alpine-layout", name = name));

    let marker = name_marker(&lines, name).ok_or_else(layout_error)?;
    let target = lines
        .get(marker + 1)
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(layout_error)?;

    if is_active(target) {
        return Ok(None);
    }

    let enabled = uncomment(target);
    lines[marker + 1] = &enabled;

    Ok(Some(lines.concat()))
}

/// Comments out every active line containing `/<name>` and the line after `# <name>`.
fn disable_matching(content: &str, name: &str) -> Toggle {
    let lines = lines_inclusive(content);
    let needle = format!("/{name}");
    let after_marker = name_marker(&lines, name).map(|i| i + 1);

    let matches = |i: usize, line: &str| {
        let body = line.trim_start_matches(|c: char| c == '#' || c.is_whitespace());
        !body.is_empty() && (body.contains(&needle) || Some(i) == after_marker)
    };

    let mut out = String::with_capacity(content.len() + 16);
    let mut changed = false;
    let mut seen = false;

    for (i, line) in lines.iter().enumerate() {
        if !matches(i, line) {
            out.push_str(line);
            continue;
        }

        seen = true;
        if is_active(line) {
            out.push_str(COMMENT);
            out.push(' ');
            changed = true;
        }
        out.push_str(line);
    }

    match (changed, seen) {
        (true, _) => Toggle::Edited(out),
        (false, true) => Toggle::Already,
        (false, false) => Toggle::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakeFetch, Sandbox};
    use super::*;

    const REPOS: &str = "/etc/apk/repositories";

    #[test]
    fn test_add_appends_named_block() {
        let sandbox = Sandbox::new();
        sandbox.write(REPOS, "http://example/repo1\n");
        let ctx = sandbox.ctx();

        let outcome = RepositoryFamily::Alpine
            .add_repo(&ctx, Some("extra"), "http://example/repo2")
            .unwrap();
        assert_eq!(outcome, Outcome::Changed(ctx.path(REPOS)));
        assert_eq!(
            sandbox.read(REPOS),
            "http://example/repo1\n\n# extra\nhttp://example/repo2\n"
        );
    }

    #[test]
    fn test_add_existing_url_is_noop() {
        let sandbox = Sandbox::new();
        sandbox.write(REPOS, "http://example/repo1\n");

        let outcome = RepositoryFamily::Alpine
            .add_repo(&sandbox.ctx(), Some("one"), "http://example/repo1")
            .unwrap();
        assert!(matches!(outcome, Outcome::Unchanged(_)));
        assert_eq!(sandbox.read(REPOS), "http://example/repo1\n");
    }

    #[test]
    fn test_add_without_trailing_newline() {
        let sandbox = Sandbox::new();
        sandbox.write(REPOS, "http://example/repo1");

        RepositoryFamily::Alpine
            .add_repo(&sandbox.ctx(), Some("extra"), "http://example/repo2")
            .unwrap();
        assert_eq!(
            sandbox.read(REPOS),
            "http://example/repo1\n\n# extra\nhttp://example/repo2\n"
        );
    }

    #[test]
    fn test_add_missing_file() {
        let sandbox = Sandbox::new();
        let err = RepositoryFamily::Alpine
            .add_repo(&sandbox.ctx(), Some("extra"), "http://example/repo2")
            .unwrap_err();
        assert!(matches!(err, RepoError::FileNotFound { .. }));
    }

    #[test]
    fn test_disable_then_enable_named() {
        let sandbox = Sandbox::new();
        sandbox.write(REPOS, "http://example/repo1\n");
        let ctx = sandbox.ctx();
        RepositoryFamily::Alpine
            .add_repo(&ctx, Some("extra"), "http://example/repo2")
            .unwrap();
        let added = sandbox.read(REPOS);

        RepositoryFamily::Alpine.disable_repo(&ctx, "extra").unwrap();
        assert_eq!(
            sandbox.read(REPOS),
            "http://example/repo1\n\n# extra\n# http://example/repo2\n"
        );
        assert!(matches!(
            RepositoryFamily::Alpine.disable_repo(&ctx, "extra").unwrap(),
            Outcome::Unchanged(_)
        ));

        RepositoryFamily::Alpine.enable_repo(&ctx, "extra").unwrap();
        assert_eq!(sandbox.read(REPOS), added);
        assert!(matches!(
            RepositoryFamily::Alpine.enable_repo(&ctx, "extra").unwrap(),
            Outcome::Unchanged(_)
        ));
    }

    #[test]
    fn test_disable_by_path_segment() {
        let sandbox = Sandbox::new();
        sandbox.write(
            REPOS,
            "https://dl-cdn.alpinelinux.org/alpine/v3.20/main\nhttps://dl-cdn.alpinelinux.org/alpine/edge/testing\n",
        );

        RepositoryFamily::Alpine
            .disable_repo(&sandbox.ctx(), "testing")
            .unwrap();
        assert_eq!(
            sandbox.read(REPOS),
            "https://dl-cdn.alpinelinux.org/alpine/v3.20/main\n# https://dl-cdn.alpinelinux.org/alpine/edge/testing\n"
        );
    }

    #[test]
    fn test_disable_unknown() {
        let sandbox = Sandbox::new();
        sandbox.write(REPOS, "http://example/repo1\n");

        let err = RepositoryFamily::Alpine
            .disable_repo(&sandbox.ctx(), "community")
            .unwrap_err();
        assert!(matches!(err, RepoError::EntryNotFound { .. }));
    }

    #[test]
    fn test_enable_hand_written_entry_is_layout_error() {
        let sandbox = Sandbox::new();
        sandbox.write(REPOS, "#https://dl-cdn.alpinelinux.org/alpine/edge/testing\n");

        let err = RepositoryFamily::Alpine
            .enable_repo(&sandbox.ctx(), "testing")
            .unwrap_err();
        assert!(matches!(err, RepoError::Layout(_)));
        assert_eq!(
            sandbox.read(REPOS),
            "#https://dl-cdn.alpinelinux.org/alpine/edge/testing\n"
        );
    }

    #[test]
    fn test_enable_marker_without_url() {
        let sandbox = Sandbox::new();
        sandbox.write(REPOS, "http://example/repo1\n# extra\n");

        let err = RepositoryFamily::Alpine
            .enable_repo(&sandbox.ctx(), "extra")
            .unwrap_err();
        assert!(matches!(err, RepoError::Layout(_)));
    }

    #[test]
    fn test_add_key_uses_server_filename() {
        let url = "https://alpine-keys.example.com/download?id=7";
        let mut sandbox = Sandbox::new();
        sandbox.fetch = FakeFetch::serving(url, "PUBKEY");
        sandbox.fetch.filename = Some("dev@example-5f3a.rsa.pub".to_string());
        let ctx = sandbox.ctx();

        let outcome = RepositoryFamily::Alpine.add_key(&ctx, None, url).unwrap();
        assert_eq!(
            outcome,
            Outcome::Changed(ctx.path("/etc/apk/keys/dev@example-5f3a.rsa.pub"))
        );
        assert_eq!(sandbox.read("/etc/apk/keys/dev@example-5f3a.rsa.pub"), "PUBKEY");
    }

    #[test]
    fn test_add_key_falls_back_to_url_name() {
        let url = "https://alpine-keys.example.com/key.rsa.pub";
        let mut sandbox = Sandbox::new();
        sandbox.fetch = FakeFetch::serving(url, "PUBKEY");

        RepositoryFamily::Alpine
            .add_key(&sandbox.ctx(), None, url)
            .unwrap();
        assert_eq!(sandbox.read("/etc/apk/keys/key.rsa.pub"), "PUBKEY");
    }

    #[test]
    fn test_list() {
        let sandbox = Sandbox::new();
        sandbox.write(
            REPOS,
            "http://example/repo1\n\n# extra\n# http://example/repo2\n",
        );

        let entries = RepositoryFamily::Alpine
            .list_repos(&sandbox.ctx())
            .unwrap();
        assert_eq!(
            entries
                .iter()
                .map(|e| (e.name.as_str(), e.state))
                .collect::<Vec<_>>(),
            vec![
                ("http://example/repo1", EnabledState::Enabled),
                ("http://example/repo2", EnabledState::Disabled),
            ]
        );
    }
}
