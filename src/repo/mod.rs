//! Repository and signing-key management on top of the native package manager's own
//! configuration files.

use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::fl;

mod alpine;
mod arch;
mod debian;
pub mod error;
mod homebrew;
pub mod locate;
mod redhat;
pub mod section;

pub use error::{RepoError, Result};

/// Class of native package manager, and with it the repository file conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryFamily {
    Debian,
    RedHat,
    Alpine,
    Arch,
    Homebrew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyConfig {
    /// Absolute path of the directory holding repository definitions.
    pub base_dir: &'static str,
    pub suffix: &'static str,
    /// Empty where the family's files are not toggled by commenting.
    pub comment: &'static str,
    pub enable_key: &'static str,
}

impl RepositoryFamily {
    pub const fn config(self) -> FamilyConfig {
        match self {
            RepositoryFamily::Debian => FamilyConfig {
                base_dir: "/etc/apt/sources.list.d",
                suffix: ".list",
                comment: "#",
                enable_key: "",
            },
            RepositoryFamily::RedHat => FamilyConfig {
                base_dir: "/etc/yum.repos.d",
                suffix: ".repo",
                comment: "",
                enable_key: "enabled",
            },
            RepositoryFamily::Alpine => FamilyConfig {
                base_dir: "/etc/apk",
                suffix: "",
                comment: "#",
                enable_key: "",
            },
            RepositoryFamily::Arch => FamilyConfig {
                base_dir: "/etc",
                suffix: ".conf",
                comment: "",
                enable_key: "",
            },
            RepositoryFamily::Homebrew => FamilyConfig {
                base_dir: "",
                suffix: "",
                comment: "",
                enable_key: "",
            },
        }
    }

    fn backend(self) -> &'static dyn RepoBackend {
        match self {
            RepositoryFamily::Debian => &debian::Debian,
            RepositoryFamily::RedHat => &redhat::RedHat,
            RepositoryFamily::Alpine => &alpine::Alpine,
            RepositoryFamily::Arch => &arch::Arch,
            RepositoryFamily::Homebrew => &homebrew::Homebrew,
        }
    }

    pub fn add_repo(self, ctx: &RepoContext, name: Option<&str>, url: &str) -> Result<Outcome> {
        self.backend().add_repo(ctx, name, url)
    }

    pub fn enable_repo(self, ctx: &RepoContext, id: &str) -> Result<Outcome> {
        self.backend().set_enabled(ctx, id, true)
    }

    pub fn disable_repo(self, ctx: &RepoContext, id: &str) -> Result<Outcome> {
        self.backend().set_enabled(ctx, id, false)
    }

    pub fn add_key(self, ctx: &RepoContext, name: Option<&str>, url: &str) -> Result<Outcome> {
        self.backend().add_key(ctx, name, url)
    }

    pub fn list_repos(self, ctx: &RepoContext) -> Result<Vec<RepoEntry>> {
        self.backend().list(ctx)
    }
}

impl fmt::Display for RepositoryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepositoryFamily::Debian => "debian",
            RepositoryFamily::RedHat => "redhat",
            RepositoryFamily::Alpine => "alpine",
            RepositoryFamily::Arch => "arch",
            RepositoryFamily::Homebrew => "homebrew",
        };

        f.write_str(s)
    }
}

/// Per-family repository operations. Every family answers each one, if only with
/// [`RepoError::Unsupported`] and a hint for doing it by hand.
trait RepoBackend {
    fn family(&self) -> RepositoryFamily;

    fn add_repo(&self, ctx: &RepoContext, name: Option<&str>, url: &str) -> Result<Outcome>;

    fn set_enabled(&self, ctx: &RepoContext, id: &str, enable: bool) -> Result<Outcome>;

    fn add_key(&self, ctx: &RepoContext, name: Option<&str>, url: &str) -> Result<Outcome>;

    fn list(&self, ctx: &RepoContext) -> Result<Vec<RepoEntry>>;
}

/// Result of a mutating operation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file at this path was written.
    Changed(PathBuf),
    /// The file at this path was already in the requested state and was not touched.
    Unchanged(PathBuf),
    /// Work was handed to the native tool.
    Delegated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnabledState {
    Enabled,
    Disabled,
    /// No explicit state recorded; the package manager treats it as enabled.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    pub source: String,
    pub name: String,
    pub state: EnabledState,
}

impl RepoEntry {
    fn new(source: impl Into<String>, name: impl Into<String>, state: EnabledState) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            state,
        }
    }
}

/// Asks the operator a yes/no question.
pub trait Prompt {
    fn confirm(&self, question: &str) -> bool;
}

pub struct Download {
    /// File name suggested by the server through `Content-Disposition`.
    pub filename: Option<String>,
}

pub trait Fetch {
    fn download(&self, url: &str, dest: &Path) -> Result<Download>;
}

pub trait Runner {
    fn run(&self, program: &str, args: &[&str]) -> Result<()>;

    fn output(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// Everything a repository operation needs from the outside world.
pub struct RepoContext<'a> {
    /// Answer every confirmation with yes.
    pub assume_yes: bool,
    /// Filesystem root; family paths are resolved below it.
    pub root: PathBuf,
    pub prompt: &'a dyn Prompt,
    pub fetch: &'a dyn Fetch,
    pub runner: &'a dyn Runner,
}

impl RepoContext<'_> {
    /// Resolves an absolute system path below the configured root.
    pub fn path(&self, abs: &str) -> PathBuf {
        self.root.join(abs.trim_start_matches('/'))
    }

    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            debug!("Assuming yes: {question}");
            return true;
        }

        self.prompt.confirm(question)
    }

    /// Writes `content` to `path` unless it already holds exactly that. A differing file
    /// is only replaced after confirmation.
    fn write_new_file(&self, path: &Path, content: &[u8]) -> Result<Outcome> {
        match fs::read(path) {
            Ok(existing) if existing == content => return Ok(Outcome::Unchanged(path.into())),
            Ok(_) => {
                let question = fl!("confirm-overwrite", path = path.display().to_string());
                if !self.confirm(&question) {
                    return Err(RepoError::Conflict { path: path.into() });
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(RepoError::io("read", path, e)),
        }

        write_atomic(path, content)?;

        Ok(Outcome::Changed(path.into()))
    }
}

fn read_file(what: &'static str, path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            RepoError::FileNotFound {
                what,
                path: path.into(),
            }
        } else {
            RepoError::io("read", path, e)
        }
    })
}

/// Downloads `url` into a temp file that is removed when the returned handle drops.
fn fetch_to_temp(ctx: &RepoContext, url: &str) -> Result<(NamedTempFile, Download)> {
    let tmp = tempfile::Builder::new()
        .prefix("pkgs-")
        .tempfile()
        .map_err(|e| RepoError::io("create", std::env::temp_dir(), e))?;

    let download = ctx.fetch.download(url, tmp.path())?;

    Ok((tmp, download))
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| RepoError::io("create directory", path, e))
}

/// Replaces `path` with `content` through a sibling temp file, so readers see either the
/// old or the new file.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| RepoError::io("create temp file in", dir, e))?;

    tmp.write_all(content)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| RepoError::io("write", tmp.path().to_path_buf(), e))?;

    match fs::metadata(path) {
        Ok(meta) => fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| RepoError::io("chmod", path, e))?,
        Err(_) => set_default_permissions(tmp.path())?,
    }

    tmp.persist(path)
        .map_err(|e| RepoError::io("replace", path, e.error))?;

    debug!("Wrote {}", path.display());

    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
        .map_err(|e| RepoError::io("chmod", path, e))
}

#[cfg(not(unix))]
fn set_default_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Lines of `content` with their terminators, so edits can be re-joined byte-exact.
fn lines_inclusive(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

/// Drops a leading `# ` or `#` from a line, keeping anything before the marker.
fn uncomment(line: &str) -> String {
    let indent = line.len() - line.trim_start().len();
    let rest = &line[indent..];
    let rest = rest
        .strip_prefix("# ")
        .or_else(|| rest.strip_prefix('#'))
        .unwrap_or(rest);

    format!("{}{rest}", &line[..indent])
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        cell::{Cell, RefCell},
        fs,
        path::Path,
    };

    use tempfile::TempDir;

    use super::*;

    pub struct FakePrompt {
        pub answer: bool,
        pub asked: Cell<usize>,
    }

    impl FakePrompt {
        pub fn answering(answer: bool) -> Self {
            Self {
                answer,
                asked: Cell::new(0),
            }
        }
    }

    impl Prompt for FakePrompt {
        fn confirm(&self, _question: &str) -> bool {
            self.asked.set(self.asked.get() + 1);
            self.answer
        }
    }

    /// Serves fixed bodies by URL; unknown URLs fail like a 404.
    #[derive(Default)]
    pub struct FakeFetch {
        pub bodies: Vec<(String, String)>,
        pub filename: Option<String>,
        /// Write part of the body, then fail as if the connection dropped.
        pub cut_off: bool,
        /// Every destination handed to `download`.
        pub dests: RefCell<Vec<PathBuf>>,
    }

    impl FakeFetch {
        pub fn serving(url: &str, body: &str) -> Self {
            Self {
                bodies: vec![(url.to_string(), body.to_string())],
                ..Default::default()
            }
        }
    }

    impl Fetch for FakeFetch {
        fn download(&self, url: &str, dest: &Path) -> Result<Download> {
            self.dests.borrow_mut().push(dest.to_path_buf());

            if self.cut_off {
                fs::write(dest, "partial").unwrap();
                return Err(RepoError::Network {
                    url: url.to_string(),
                    reason: "connection reset by peer".to_string(),
                });
            }

            let body = self
                .bodies
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, b)| b)
                .ok_or_else(|| RepoError::Network {
                    url: url.to_string(),
                    reason: "HTTP status client error (404 Not Found)".to_string(),
                })?;
            fs::write(dest, body).unwrap();

            Ok(Download {
                filename: self.filename.clone(),
            })
        }
    }

    #[derive(Default)]
    pub struct FakeRunner {
        pub calls: RefCell<Vec<String>>,
        pub stdout: String,
    }

    impl Runner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("{program} {}", args.join(" ")));
            Ok(())
        }

        fn output(&self, program: &str, args: &[&str]) -> Result<String> {
            self.run(program, args)?;
            Ok(self.stdout.clone())
        }
    }

    /// A sysroot plus the fakes a [`RepoContext`] borrows.
    pub struct Sandbox {
        pub root: TempDir,
        pub prompt: FakePrompt,
        pub fetch: FakeFetch,
        pub runner: FakeRunner,
        pub assume_yes: bool,
    }

    impl Sandbox {
        pub fn new() -> Self {
            Self {
                root: TempDir::new().unwrap(),
                prompt: FakePrompt::answering(false),
                fetch: FakeFetch::default(),
                runner: FakeRunner::default(),
                assume_yes: false,
            }
        }

        pub fn ctx(&self) -> RepoContext<'_> {
            RepoContext {
                assume_yes: self.assume_yes,
                root: self.root.path().to_path_buf(),
                prompt: &self.prompt,
                fetch: &self.fetch,
                runner: &self.runner,
            }
        }

        /// Creates `abs` (an absolute system path) below the sandbox root.
        pub fn write(&self, abs: &str, content: &str) -> PathBuf {
            let path = self.ctx().path(abs);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        pub fn read(&self, abs: &str) -> String {
            fs::read_to_string(self.ctx().path(abs)).unwrap()
        }
    }
}
