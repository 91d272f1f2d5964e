use std::{
    env,
    fs::File,
    io::{self, BufRead, IsTerminal},
    path::Path,
    process::{exit, Command, Stdio},
    time::Duration,
};

use dialoguer::{console::Term, theme::ColorfulTheme, Confirm};
use eyre::{bail, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{blocking::Client, header::CONTENT_DISPOSITION};
use tracing::{debug, info};

use crate::{
    fl,
    repo::{self, Download, Fetch, Prompt, RepoError, Runner},
};

pub fn is_root() -> bool {
    rustix::process::geteuid().is_root()
}

/// Re-runs the current command line through `sudo` and exits with its status. Returns
/// immediately when already root or not on Linux.
pub fn elevate() -> Result<()> {
    if is_root() || !cfg!(target_os = "linux") {
        return Ok(());
    }

    if which::which("sudo").is_err() {
        bail!(fl!("sudo-missing"));
    }

    info!("{}", fl!("elevating"));
    let exe = env::current_exe().wrap_err("Failed to locate the running executable")?;
    let status = Command::new("sudo")
        .arg("--preserve-env=PKGS_YES,PKGS_ROOT,RUST_LOG")
        .arg(exe)
        .args(env::args_os().skip(1))
        .status()
        .wrap_err("Failed to run sudo")?;

    exit(status.code().unwrap_or(1));
}

/// y/N question. Interactive on a terminal; otherwise one line is read from stdin, so
/// `echo y | pkgs ...` works. Anything but an explicit yes, including a closed stdin, is a
/// no.
pub struct TermPrompt;

impl Prompt for TermPrompt {
    fn confirm(&self, question: &str) -> bool {
        if Term::stderr().is_term() && io::stdin().is_terminal() {
            return Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(question)
                .default(false)
                .wait_for_newline(true)
                .interact()
                .unwrap_or(false);
        }

        eprint!("{question} (y/N): ");
        read_answer(&mut io::stdin().lock())
    }
}

fn read_answer(input: &mut impl BufRead) -> bool {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(_) => line.trim().eq_ignore_ascii_case("y"),
        Err(e) => {
            debug!("Failed to read an answer: {e}");
            false
        }
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pkgs/", env!("CARGO_PKG_VERSION")))
            .timeout(Option::<Duration>::None)
            .build()?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn download(&self, url: &str, dest: &Path) -> repo::Result<Download> {
        let network = |e: reqwest::Error| RepoError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let mut resp = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(network)?;

        let filename = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename);

        let pb = match resp.content_length() {
            Some(len) => {
                let pb = ProgressBar::new(len);
                if let Ok(style) =
                    ProgressStyle::with_template("[{wide_bar:.cyan/blue}] {bytes}/{total_bytes}")
                {
                    pb.set_style(style.progress_chars("=>-"));
                }
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_message(url.to_string());
                pb.enable_steady_tick(Duration::from_millis(80));
                pb
            }
        };

        let file = File::create(dest).map_err(|e| RepoError::io("create", dest, e))?;
        let mut writer = pb.wrap_write(file);
        let res = resp.copy_to(&mut writer).map_err(network);
        pb.finish_and_clear();

        debug!("Downloaded {} bytes from {url}", res?);

        Ok(Download { filename })
    }
}

/// `attachment; filename="key.rsa.pub"` -> `key.rsa.pub`
fn disposition_filename(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let name = rest.split(';').next()?.trim().trim_matches(|c| c == '"' || c == '\'');
    let name = Path::new(name).file_name()?.to_str()?;

    (!name.is_empty()).then(|| name.to_string())
}

/// Runs child processes with the terminal attached.
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> repo::Result<()> {
        debug!("Running {program} {}", args.join(" "));

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| RepoError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(RepoError::Command {
                program: program.to_string(),
                status: status.to_string(),
            });
        }

        Ok(())
    }

    fn output(&self, program: &str, args: &[&str]) -> repo::Result<String> {
        debug!("Capturing {program} {}", args.join(" "));

        let out = Command::new(program)
            .args(args)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| RepoError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !out.status.success() {
            return Err(RepoError::Command {
                program: program.to_string(),
                status: out.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename("attachment; filename=\"alpine@example.rsa.pub\""),
            Some("alpine@example.rsa.pub".to_string())
        );
        assert_eq!(
            disposition_filename("attachment; filename=key.pub; size=42"),
            Some("key.pub".to_string())
        );
        assert_eq!(
            disposition_filename("attachment; filename=\"../../etc/passwd\""),
            Some("passwd".to_string())
        );
        assert_eq!(disposition_filename("inline"), None);
        assert_eq!(disposition_filename("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_piped_answer() {
        assert!(read_answer(&mut "y\n".as_bytes()));
        assert!(read_answer(&mut "Y\r\n".as_bytes()));
        assert!(read_answer(&mut "  y".as_bytes()));
        assert!(!read_answer(&mut "yes\n".as_bytes()));
        assert!(!read_answer(&mut "n\n".as_bytes()));
        assert!(!read_answer(&mut "\n".as_bytes()));
        assert!(!read_answer(&mut "".as_bytes()));
    }

    #[test]
    fn test_system_runner_reports_failure() {
        let err = SystemRunner.run("false", &[]).unwrap_err();
        assert!(matches!(err, RepoError::Command { .. }));

        let err = SystemRunner
            .run("pkgs-test-no-such-binary", &[])
            .unwrap_err();
        assert!(matches!(err, RepoError::Spawn { .. }));
    }

    #[test]
    fn test_system_runner_output() {
        assert_eq!(SystemRunner.output("echo", &["hello"]).unwrap(), "hello\n");
    }
}
