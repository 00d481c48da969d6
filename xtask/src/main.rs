use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

type TaskResult = Result<(), Box<dyn Error>>;

const CORE_PACKAGE: &str = "invocation_envelope_core";
const LAMBDA_PACKAGE: &str = "invocation_envelope_lambda";
const LAMBDA_BINARY: &str = "envelope_echo";
const DIST_DIR: &str = "dist";

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the invocation envelope workspace"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks
    Ci {
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Run the envelope Criterion benchmarks
    Bench,
    /// Build the echo function and zip it as a custom-runtime `bootstrap`
    LambdaPackage {
        /// Compilation target triple
        #[arg(long, env = "LAMBDA_TARGET", default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    Bench,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn target_subdir(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> TaskResult {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        return Err(format!("`cargo {}` exited with {status}", args.join(" ")).into());
    }
    Ok(())
}

fn ci_check() -> TaskResult {
    step("Check formatting");
    cargo(&["fmt", "--all", "--", "--check"])?;

    step("Clippy");
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?;

    for package in [CORE_PACKAGE, LAMBDA_PACKAGE] {
        step(&format!("Test {package}"));
        cargo(&["test", "-p", package])?;
    }
    Ok(())
}

fn bench() -> TaskResult {
    step("Run envelope benchmarks");
    cargo(&["bench", "-p", CORE_PACKAGE, "--bench", "envelope"])
}

fn lambda_package(target: &str, profile: BuildProfile) -> TaskResult {
    require_target(target)?;

    step(&format!("Build {LAMBDA_BINARY} for {target}"));
    let mut args = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--bin",
        LAMBDA_BINARY,
        "--target",
        target,
    ];
    if matches!(profile, BuildProfile::Release) {
        args.push("--release");
    }
    cargo(&args)?;

    step("Zip bootstrap");
    let binary = Path::new("target")
        .join(target)
        .join(profile.target_subdir())
        .join(LAMBDA_BINARY);
    let archive = PathBuf::from(DIST_DIR).join(format!("{LAMBDA_BINARY}.zip"));
    fs::create_dir_all(DIST_DIR)?;
    write_bootstrap_zip(&binary, &archive)?;

    eprintln!("\nPackaged {}", archive.display());
    Ok(())
}

/// Fails early when rustup reports the target as missing. A missing rustup is
/// only a warning since the build step will surface the real problem.
fn require_target(target: &str) -> TaskResult {
    let output = match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(_) | Err(_) => {
            eprintln!("warning: could not list installed rust targets, skipping preflight");
            return Ok(());
        }
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if installed.lines().any(|line| line.trim() == target) {
        return Ok(());
    }
    Err(format!("rust target `{target}` is not installed; run `rustup target add {target}`").into())
}

fn write_bootstrap_zip(binary: &Path, archive: &Path) -> TaskResult {
    if !binary.exists() {
        return Err(format!("expected lambda binary at '{}'", binary.display()).into());
    }

    let bytes = fs::read(binary)?;
    let mut zip = ZipWriter::new(fs::File::create(archive)?);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)?;
    zip.write_all(&bytes)?;
    zip.finish()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ci { job } => match job {
            CiJob::Check => ci_check(),
            CiJob::Bench => bench(),
            CiJob::All => ci_check().and_then(|()| bench()),
        },
        Commands::Bench => bench(),
        Commands::LambdaPackage { target, profile } => lambda_package(&target, profile),
    };

    if let Err(error) = result {
        eprintln!("\nxtask failed: {error}");
        exit(1);
    }
}
