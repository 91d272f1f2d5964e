use std::{io, path::Path, process::exit};

use args::{Args, PkgsCommand};
use clap::{CommandFactory, Parser};
use detect::{detect, Verb};
use dialoguer::console::Term;
use eyre::{eyre, Result};
use repo::{RepoContext, RepositoryFamily};
use tracing::{debug, error, Subscriber};
use tracing_subscriber::{fmt, fmt::MakeWriter, util::SubscriberInitExt, EnvFilter};
use utils::{elevate, HttpFetcher, SystemRunner, TermPrompt};

mod args;
mod detect;
mod exec;
mod i18n;
mod repo;
mod subcmd;
mod utils;

fn main() {
    let args = Args::parse();
    setup_logging(args.debug);

    if let Err(e) = try_main(args) {
        error!("{e:#}");
        exit(1);
    }
}

/// Logs go to stderr; stdout carries command output such as `which --json`.
fn setup_logging(debug: bool) {
    log_subscriber(debug, io::stderr).init();
}

fn log_subscriber<W>(debug: bool, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    // i18n-embed reports the detected locale at info level on every start.
    let filter = if debug {
        EnvFilter::new("debug,i18n_embed=warn")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,i18n_embed=warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(writer)
        .finish()
}

fn try_main(args: Args) -> Result<()> {
    i18n::init()?;

    let Some(subcommand) = args.subcommand else {
        Args::command().print_help()?;
        return Ok(());
    };

    let pm = detect().ok_or_else(|| eyre!(fl!("no-package-manager")))?;
    debug!("Using {} ({} family)", pm.name, pm.family);

    if needs_root(&subcommand)
        && pm.family != RepositoryFamily::Homebrew
        && args.root == Path::new("/")
    {
        elevate()?;
    }

    ctrlc::set_handler(|| {
        Term::stdout().show_cursor().ok();
        exit(130);
    })?;

    let fetcher = HttpFetcher::new()?;
    let ctx = RepoContext {
        assume_yes: args.yes,
        root: args.root,
        prompt: &TermPrompt,
        fetch: &fetcher,
        runner: &SystemRunner,
    };

    match subcommand {
        PkgsCommand::Which(which) => subcmd::which::execute(which, &pm),
        PkgsCommand::AddRepo(add) => subcmd::add_repo::execute(add, &pm, &ctx),
        PkgsCommand::AddKey(add) => subcmd::add_key::execute(add, &pm, &ctx),
        PkgsCommand::EnableRepo(repo) => subcmd::toggle_repo::execute(&repo.name, true, &pm, &ctx),
        PkgsCommand::DisableRepo(repo) => {
            subcmd::toggle_repo::execute(&repo.name, false, &pm, &ctx)
        }
        PkgsCommand::ListRepos => subcmd::list_repos::execute(&pm, &ctx),
        native => {
            let (verb, extra) =
                native_verb(&native).ok_or_else(|| eyre!("{native:?} is not a package verb"))?;
            exec::run(&pm, verb, args.yes, extra, &SystemRunner)
        }
    }
}

fn native_verb(cmd: &PkgsCommand) -> Option<(Verb, &[String])> {
    let mapped = match cmd {
        PkgsCommand::Install(p) => (Verb::Install, p.packages.as_slice()),
        PkgsCommand::Reinstall(p) => (Verb::Reinstall, p.packages.as_slice()),
        PkgsCommand::Remove(p) => (Verb::Remove, p.packages.as_slice()),
        PkgsCommand::Search(q) => (Verb::Search, q.query.as_slice()),
        PkgsCommand::Info(p) => (Verb::Info, p.packages.as_slice()),
        PkgsCommand::Update => (Verb::Update, &[][..]),
        PkgsCommand::Upgrade => (Verb::Upgrade, &[][..]),
        PkgsCommand::Autoremove => (Verb::Autoremove, &[][..]),
        PkgsCommand::Clean => (Verb::Clean, &[][..]),
        _ => return None,
    };

    Some(mapped)
}

fn needs_root(cmd: &PkgsCommand) -> bool {
    match cmd {
        PkgsCommand::Which(_) | PkgsCommand::ListRepos => false,
        PkgsCommand::AddRepo(_)
        | PkgsCommand::AddKey(_)
        | PkgsCommand::EnableRepo(_)
        | PkgsCommand::DisableRepo(_) => true,
        other => native_verb(other).is_some_and(|(verb, _)| verb.needs_root()),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };

    use tracing::info;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn parse(argv: &[&str]) -> PkgsCommand {
        Args::try_parse_from(argv).unwrap().subcommand.unwrap()
    }

    #[test]
    fn test_locale_chatter_is_filtered() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = log_subscriber(true, move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!(target: "i18n_embed::requester", "Current Locale: [en-US]");
            info!("Executing: apk update");
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Executing: apk update"));
        assert!(!logs.contains("Current Locale"));
    }

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_native_verb_mapping() {
        let cmd = parse(&["pkgs", "in", "curl", "git"]);
        let (verb, extra) = native_verb(&cmd).unwrap();
        assert_eq!(verb, Verb::Install);
        assert_eq!(extra, ["curl", "git"]);

        assert!(native_verb(&parse(&["pkgs", "list-repos"])).is_none());
    }

    #[test]
    fn test_needs_root() {
        assert!(needs_root(&parse(&["pkgs", "upgrade"])));
        assert!(needs_root(&parse(&["pkgs", "disable-repo", "docker-ce-stable"])));
        assert!(!needs_root(&parse(&["pkgs", "search", "ripgrep"])));
        assert!(!needs_root(&parse(&["pkgs", "which", "--simple"])));
        assert!(!needs_root(&parse(&["pkgs", "list-repos"])));
    }

    #[test]
    fn test_add_repo_arity() {
        assert!(Args::try_parse_from(["pkgs", "add-repo"]).is_err());
        assert!(Args::try_parse_from(["pkgs", "add-repo", "a", "b", "c"]).is_err());
        assert!(Args::try_parse_from(["pkgs", "add-repo", "https://x/docker-ce.repo"]).is_ok());
    }
}
