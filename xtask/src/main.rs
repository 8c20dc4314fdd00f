use anyhow::Context;
use clap::{Parser, Subcommand};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Repo automation for passgate")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// (Re)generate JSON Schemas for the compare receipt and config file.
    Schema {
        /// Output directory
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,

        /// Fail if the files on disk differ instead of rewriting them
        #[arg(long, default_value_t = false)]
        check: bool,
    },

    /// Run the "usual" repo checks (fmt, clippy, test, schema).
    Ci,

    /// Run mutation testing via cargo-mutants (must be installed).
    Mutants {
        /// Extra args forwarded to cargo-mutants
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Schema { out_dir, check } => cmd_schema(&out_dir, check),
        Command::Ci => cmd_ci(),
        Command::Mutants { args } => cmd_mutants(args),
    }
}

fn cmd_ci() -> anyhow::Result<()> {
    run("cargo", ["fmt", "--all", "--", "--check"])?;
    run(
        "cargo",
        ["clippy", "--all-targets", "--all-features", "--", "-D", "warnings"],
    )?;
    run("cargo", ["test", "--all"])?;
    run("cargo", ["run", "-p", "xtask", "--", "schema"])?;
    Ok(())
}

fn cmd_mutants(args: Vec<String>) -> anyhow::Result<()> {
    // Domain is where the arithmetic lives; default to it when no args are given.
    let mut cmd = std::process::Command::new("cargo");
    cmd.arg("mutants");
    if args.is_empty() {
        cmd.args(["-p", "passgate-domain"]);
    }
    for a in args {
        cmd.arg(a);
    }
    let status = cmd.status().context("running cargo mutants")?;
    if !status.success() {
        anyhow::bail!("cargo mutants failed: {status}");
    }
    Ok(())
}

fn run<const N: usize>(bin: &str, args: [&str; N]) -> anyhow::Result<()> {
    let status = std::process::Command::new(bin)
        .args(args)
        .status()
        .with_context(|| format!("running {bin}"))?;
    if !status.success() {
        anyhow::bail!("{bin} failed: {status}");
    }
    Ok(())
}

fn cmd_schema(out_dir: &Path, check: bool) -> anyhow::Result<()> {
    if !check {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("create dir {}", out_dir.display()))?;
    }

    let schemas = [
        (
            format!("{}.schema.json", passgate_types::COMPARE_SCHEMA_V1),
            serde_json::to_vec_pretty(&schema_for!(passgate_types::PassRateReceipt))?,
        ),
        (
            "passgate.config.v1.schema.json".to_string(),
            serde_json::to_vec_pretty(&schema_for!(passgate_types::ConfigFile))?,
        ),
    ];

    let mut stale = Vec::new();
    for (name, json) in &schemas {
        let path = out_dir.join(name);
        if check {
            let on_disk = fs::read(&path).unwrap_or_default();
            if on_disk != *json {
                stale.push(path.display().to_string());
            }
        } else {
            fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        }
    }

    if !stale.is_empty() {
        anyhow::bail!(
            "schemas out of date, run `cargo run -p xtask -- schema`: {}",
            stale.join(", ")
        );
    }
    Ok(())
}
