use clap::CommandFactory;
use clap_complete::{generate_to, Shell};
use std::{env, fs, io};

include!("src/args.rs");

const GENERATED_COMPLETIONS: &[Shell] = &[Shell::Bash, Shell::Zsh, Shell::Fish];
const COMPLETIONS_DIR: &str = "completions";

fn generate_completions() -> io::Result<()> {
    fs::create_dir_all(COMPLETIONS_DIR)?;

    let mut cmd = Args::command();
    for shell in GENERATED_COMPLETIONS {
        generate_to(*shell, &mut cmd, "pkgs", COMPLETIONS_DIR)?;
    }

    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=src/args.rs");
    println!("cargo:rerun-if-env-changed=PKGS_GEN_COMPLETIONS");
    if env::var("PKGS_GEN_COMPLETIONS").is_ok() {
        if let Err(e) = generate_completions() {
            println!("cargo:warning=failed to generate shell completions: {e}");
        }
    }
}
