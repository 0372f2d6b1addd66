// Packaging assets for netatmo-ws, written to OUT_DIR:
//   man/         one page per command, e.g. netatmo-ws-config-set-secret.1
//   completions/ bash, zsh and fish scripts
// plus NETATMO_WS_LONG_VERSION for `--version`.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

#[path = "src/cli.rs"]
mod cli;

const BIN: &str = "netatmo-ws";

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::other("OUT_DIR not set"))?;

    let mut cmd = cli::Cli::command();
    write_man_pages(&cmd, &out_dir.join("man"))?;
    write_completions(&mut cmd, &out_dir.join("completions"))?;

    println!("cargo::rustc-env=NETATMO_WS_LONG_VERSION={}", long_version());
    Ok(())
}

/// Pages are named after the full command path; `help` gets none.
fn write_man_pages(root: &clap::Command, dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut pending = vec![root.clone()];
    while let Some(cmd) = pending.pop() {
        let name = cmd.get_name().to_owned();
        let mut page = Vec::new();
        clap_mangen::Man::new(cmd.clone()).render(&mut page)?;
        std::fs::write(dir.join(format!("{name}.1")), page)?;

        pending.extend(
            cmd.get_subcommands()
                .filter(|sub| !sub.is_hide_set() && sub.get_name() != "help")
                .map(|sub| sub.clone().name(format!("{name}-{}", sub.get_name()))),
        );
    }
    Ok(())
}

fn write_completions(cmd: &mut clap::Command, dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, cmd, BIN, dir)?;
    }
    Ok(())
}

/// `0.1.0 (x86_64-unknown-linux-gnu, release; kinds: main indoor outdoor wind rain)`
fn long_version() -> String {
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".into());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".into());
    format!("{version} ({target}, {profile}; kinds: main indoor outdoor wind rain)")
}
