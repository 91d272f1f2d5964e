use std::fmt;

use indexmap::{indexmap, IndexMap};
use serde::Serialize;
use tracing::debug;

use crate::repo::RepositoryFamily;

/// The unified verbs every backend translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verb {
    Install,
    Reinstall,
    Remove,
    Update,
    Upgrade,
    Search,
    Info,
    Autoremove,
    Clean,
}

impl Verb {
    pub fn needs_root(self) -> bool {
        !matches!(self, Verb::Search | Verb::Info)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Install => "install",
            Verb::Reinstall => "reinstall",
            Verb::Remove => "remove",
            Verb::Update => "update",
            Verb::Upgrade => "upgrade",
            Verb::Search => "search",
            Verb::Info => "info",
            Verb::Autoremove => "autoremove",
            Verb::Clean => "clean",
        };

        f.write_str(s)
    }
}

/// How a verb maps onto the native tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Native {
    /// Arguments placed after the binary, followed by the user's arguments.
    Args(&'static [&'static str]),
    /// A `sh -c` script; `{yes}` is replaced by the non-interactive flag or nothing.
    Shell(&'static str),
    /// Several invocations of the binary, run in order.
    Sequence(&'static [&'static [&'static str]]),
    Unsupported,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageManager {
    pub name: &'static str,
    pub bin: &'static str,
    pub family: RepositoryFamily,
    /// Flag that suppresses the native tool's own prompts, if it has any.
    pub yes_flag: Option<&'static str>,
    pub commands: IndexMap<Verb, Native>,
}

impl PackageManager {
    pub fn command(&self, verb: Verb) -> &Native {
        self.commands.get(&verb).unwrap_or(&Native::Unsupported)
    }

    #[cfg(test)]
    pub fn by_name(name: &str) -> Option<Self> {
        known().into_iter().find(|pm| pm.name == name)
    }
}

/// Returns the first supported package manager found in `PATH`.
pub fn detect() -> Option<PackageManager> {
    known().into_iter().find(|pm| match which::which(pm.bin) {
        Ok(path) => {
            debug!("Found {} at {}", pm.name, path.display());
            true
        }
        Err(_) => false,
    })
}

fn apt(name: &'static str) -> PackageManager {
    PackageManager {
        name,
        bin: name,
        family: RepositoryFamily::Debian,
        yes_flag: Some("-y"),
        commands: indexmap! {
            Verb::Install => Native::Args(&["install"]),
            Verb::Reinstall => Native::Args(&["install", "--reinstall"]),
            Verb::Remove => Native::Args(&["remove"]),
            Verb::Update => Native::Args(&["update"]),
            Verb::Upgrade => Native::Args(&["upgrade"]),
            Verb::Search => Native::Args(&["search"]),
            Verb::Info => Native::Args(&["show"]),
            Verb::Autoremove => Native::Args(&["autoremove"]),
            Verb::Clean => Native::Args(&["clean"]),
        },
    }
}

fn dnf(name: &'static str) -> PackageManager {
    PackageManager {
        name,
        bin: name,
        family: RepositoryFamily::RedHat,
        yes_flag: Some("-y"),
        commands: indexmap! {
            Verb::Install => Native::Args(&["install"]),
            Verb::Reinstall => Native::Args(&["reinstall"]),
            Verb::Remove => Native::Args(&["remove"]),
            Verb::Update => Native::Args(&["check-update"]),
            Verb::Upgrade => Native::Args(&["upgrade"]),
            Verb::Search => Native::Args(&["search"]),
            Verb::Info => Native::Args(&["info"]),
            Verb::Autoremove => Native::Args(&["autoremove"]),
            Verb::Clean => Native::Args(&["clean", "all"]),
        },
    }
}

/// Probe order matters: Homebrew can be installed on Linux next to the system tool and
/// wins there too.
fn known() -> Vec<PackageManager> {
    vec![
        PackageManager {
            name: "brew",
            bin: "brew",
            family: RepositoryFamily::Homebrew,
            yes_flag: None,
            commands: indexmap! {
                Verb::Install => Native::Args(&["install"]),
                Verb::Reinstall => Native::Args(&["reinstall"]),
                Verb::Remove => Native::Args(&["uninstall"]),
                Verb::Update => Native::Args(&["update"]),
                Verb::Upgrade => Native::Args(&["upgrade"]),
                Verb::Search => Native::Args(&["search"]),
                Verb::Info => Native::Args(&["info"]),
                Verb::Autoremove => Native::Sequence(&[&["autoremove"] as &[&str], &["cleanup"]]),
                Verb::Clean => Native::Args(&["cleanup"]),
            },
        },
        apt("apt"),
        apt("apt-get"),
        dnf("dnf"),
        dnf("yum"),
        PackageManager {
            name: "apk",
            bin: "apk",
            family: RepositoryFamily::Alpine,
            yes_flag: None,
            commands: indexmap! {
                Verb::Install => Native::Args(&["add"]),
                Verb::Reinstall => Native::Args(&["add", "--force-overwrite"]),
                Verb::Remove => Native::Args(&["del"]),
                Verb::Update => Native::Args(&["update"]),
                Verb::Upgrade => Native::Args(&["upgrade"]),
                Verb::Search => Native::Args(&["search"]),
                Verb::Info => Native::Args(&["info"]),
                Verb::Autoremove => Native::Unsupported,
                Verb::Clean => Native::Args(&["cache", "clean"]),
            },
        },
        PackageManager {
            name: "pacman",
            bin: "pacman",
            family: RepositoryFamily::Arch,
            yes_flag: Some("--noconfirm"),
            commands: indexmap! {
                Verb::Install => Native::Args(&["-S"]),
                Verb::Reinstall => Native::Args(&["-S", "--needed"]),
                Verb::Remove => Native::Args(&["-R"]),
                Verb::Update => Native::Args(&["-Sy"]),
                Verb::Upgrade => Native::Args(&["-Syu"]),
                Verb::Search => Native::Args(&["-Ss"]),
                Verb::Info => Native::Args(&["-Qi"]),
                Verb::Autoremove => Native::Shell(
                    "pacman{yes} -Rns $(pacman -Qdtq) 2>/dev/null || echo 'No orphaned packages to remove'"
                ),
                Verb::Clean => Native::Args(&["-Sc"]),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_manager_maps_every_verb() {
        let verbs = [
            Verb::Install,
            Verb::Reinstall,
            Verb::Remove,
            Verb::Update,
            Verb::Upgrade,
            Verb::Search,
            Verb::Info,
            Verb::Autoremove,
            Verb::Clean,
        ];

        for pm in known() {
            for verb in verbs {
                assert!(pm.commands.contains_key(&verb), "{} lacks {verb}", pm.name);
            }
        }
    }

    #[test]
    fn test_by_name() {
        let yum = PackageManager::by_name("yum").unwrap();
        assert_eq!(yum.family, RepositoryFamily::RedHat);
        assert_eq!(yum.command(Verb::Update), &Native::Args(&["check-update"]));
        assert!(PackageManager::by_name("zypper").is_none());
    }

    #[test]
    fn test_serialize() {
        let apk = PackageManager::by_name("apk").unwrap();
        let json = serde_json::to_value(&apk).unwrap();
        assert_eq!(json["family"], "alpine");
        assert_eq!(json["commands"]["install"][0], "add");
        assert!(json["commands"]["autoremove"].is_null());
    }
}
