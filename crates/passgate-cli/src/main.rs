use anyhow::Context;
use clap::{Parser, Subcommand};
use passgate_app::{
    classify_keys, github_annotations, render_markdown, render_text, CompareRequest,
    CompareUseCase, JunitDirSource,
};
use passgate_config::{discover, load_config_file, resolve, EffectiveConfig, Overrides};
use passgate_ingest::JunitOptions;
use passgate_types::{ConfigFile, PassRateReceipt, ToolInfo, VerdictStatus};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "passgate",
    version,
    about = "Pass-rate comparison of two test-suite runs for CI / PR bots"
)]
struct Cli {
    /// Log filter used when PASSGATE_LOG is unset (e.g. "debug")
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, clap::Args)]
struct FilterArgs {
    /// Config file (default: ./passgate.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Excluded file prefix, e.g. "inductor/". Repeatable; replaces the configured list.
    #[arg(long = "exclude-prefix")]
    exclude_prefix: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare two directories of JUnit XML reports and emit a compare receipt (JSON).
    Compare {
        /// Reports from the baseline (reference) run
        #[arg(long)]
        baseline: PathBuf,

        /// Reports from the transformed run being evaluated
        #[arg(long)]
        transformed: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Substring of a skip message that marks a test as deliberately excluded
        #[arg(long)]
        exclusion_marker: Option<String>,

        /// Minimum acceptable pass rate (0.95 = 95%); below it the verdict is fail
        #[arg(long)]
        min_rate: Option<f64>,

        /// Treat "no comparable baseline data" as a failing exit code
        #[arg(long, default_value_t = false)]
        fail_on_no_data: bool,

        /// Output compare receipt
        #[arg(long, default_value = "passgate-compare.json")]
        out: PathBuf,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Do not print the text report to stdout
        #[arg(long, default_value_t = false)]
        quiet: bool,
    },

    /// Render a Markdown summary from a compare receipt.
    Md {
        #[arg(long)]
        receipt: PathBuf,

        /// Output markdown path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Emit GitHub Actions annotations from a compare receipt.
    GithubAnnotations {
        #[arg(long)]
        receipt: PathBuf,
    },

    /// Show whether test identifiers are excluded by the effective filter.
    Filter {
        #[command(flatten)]
        filter: FilterArgs,

        /// Test identifiers, e.g. "test_nn.py::TestNN::test_linear"
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.cmd {
        Command::Compare {
            baseline,
            transformed,
            filter,
            exclusion_marker,
            min_rate,
            fail_on_no_data,
            out,
            pretty,
            quiet,
        } => {
            let cfg = effective_config(
                &filter,
                Overrides {
                    excluded_prefixes: filter.exclude_prefix.clone(),
                    exclusion_marker,
                    min_rate,
                    fail_on_no_data,
                },
            )?;

            let source = JunitDirSource::new(JunitOptions {
                exclusion_marker: cfg.exclusion_marker.clone(),
            });
            let outcome = CompareUseCase::new(source).execute(CompareRequest {
                baseline,
                transformed,
                filter: cfg.filter.clone(),
                min_rate: cfg.min_rate,
                tool: tool_info(),
            })?;

            write_json(&out, &outcome.receipt, pretty)?;

            if !quiet {
                print!("{}", render_text(&outcome.receipt));
            }

            Ok(match outcome.receipt.verdict.status {
                VerdictStatus::Pass => ExitCode::SUCCESS,
                VerdictStatus::Fail => ExitCode::from(2),
                VerdictStatus::NoData if cfg.fail_on_no_data => ExitCode::from(3),
                VerdictStatus::NoData => ExitCode::SUCCESS,
            })
        }

        Command::Md { receipt, out } => {
            let receipt: PassRateReceipt = read_json(&receipt)?;
            let md = render_markdown(&receipt);

            match out {
                Some(path) => {
                    fs::write(&path, md).with_context(|| format!("write {}", path.display()))?;
                }
                None => {
                    print!("{md}");
                }
            }

            Ok(ExitCode::SUCCESS)
        }

        Command::GithubAnnotations { receipt } => {
            let receipt: PassRateReceipt = read_json(&receipt)?;
            for line in github_annotations(&receipt) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Filter { filter, keys } => {
            let cfg = effective_config(
                &filter,
                Overrides {
                    excluded_prefixes: filter.exclude_prefix.clone(),
                    ..Overrides::default()
                },
            )?;

            for (key, excluded) in classify_keys(&cfg.filter, keys.iter().map(String::as_str)) {
                let verdict = if excluded { "exclude" } else { "keep" };
                println!("{verdict}\t{key}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("PASSGATE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn effective_config(filter: &FilterArgs, overrides: Overrides) -> anyhow::Result<EffectiveConfig> {
    let path = match &filter.config {
        Some(path) => Some(path.clone()),
        None => {
            let cwd = std::env::current_dir().context("resolve working directory")?;
            discover(&cwd)
        }
    };

    let file = match path {
        Some(path) => {
            tracing::debug!("using config {}", path.display());
            load_config_file(&path)?
        }
        None => ConfigFile::default(),
    };

    Ok(resolve(&file, overrides)?)
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "passgate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }

    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    atomic_write(path, &bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
