use std::ffi::OsString;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{self, Command};

use clap::{Args, Parser, Subcommand};
use envkit::{
    EnvLoader, Error, ErrorPolicy, MissingVarPolicy, ParseOptions, ProcessEnv, SubstitutionMode,
    TargetEnv, parse_env,
};
use tracing_subscriber::EnvFilter;

/// Load env files, JSON config and Vault secrets, then run commands or inspect values.
#[derive(Debug, Parser)]
#[command(name = "envkit", version, about)]
struct Cli {
    /// Print loader diagnostics to stderr (repeat for more detail).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Load files and execute a command with the resulting environment.
    Run(RunArgs),
    /// Parse env files and print the merged mapping as JSON.
    Parse(ParseArgs),
    /// Load files and print one value, coerced to its native type.
    Get(GetArgs),
}

#[derive(Debug, Clone, Args)]
struct LoadArgs {
    /// File path(s). Repeat or pass comma-separated paths. Defaults to
    /// .env, config/.env, env and config/env.
    #[arg(short, long = "file", value_delimiter = ',')]
    files: Vec<PathBuf>,

    /// Base directory for relative file paths.
    #[arg(short = 'C', long)]
    dir: Option<PathBuf>,

    /// Override existing environment variables.
    #[arg(short, long = "override")]
    override_existing: bool,

    /// Keep `$VAR` references literally instead of expanding them.
    #[arg(long)]
    no_expand: bool,

    /// Leave unresolved references in place instead of replacing them.
    #[arg(long, conflicts_with = "default")]
    keep_missing: bool,

    /// Replacement for unresolved references.
    #[arg(long, default_value = "")]
    default: String,

    /// Fail when a configured file cannot be loaded.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    load: LoadArgs,

    /// Command to execute, followed by its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Env files to parse, merged in order (later files win).
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Keep `$VAR` references literally instead of expanding them.
    #[arg(long)]
    no_expand: bool,

    /// Leave unresolved references in place instead of replacing them.
    #[arg(long)]
    keep_missing: bool,
}

#[derive(Debug, Args)]
struct GetArgs {
    #[command(flatten)]
    load: LoadArgs,

    /// Variable to print.
    key: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        CliCommand::Run(args) => execute_run(args),
        CliCommand::Parse(args) => execute_parse(args).map(|()| 0),
        CliCommand::Get(args) => execute_get(args),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("envkit: {err}");
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_loader(args: &LoadArgs) -> EnvLoader {
    let mut loader = EnvLoader::new()
        .paths(&args.files)
        .override_existing(args.override_existing)
        .substitution_mode(substitution_mode(args.no_expand))
        .missing(missing_policy(args.keep_missing, &args.default))
        .error_policy(if args.strict {
            ErrorPolicy::Throw
        } else {
            ErrorPolicy::Warn
        })
        .target(TargetEnv::snapshot());
    if let Some(dir) = &args.dir {
        loader = loader.dir(dir);
    }
    loader
}

fn execute_run(args: RunArgs) -> Result<i32, String> {
    let mut loader = build_loader(&args.load);
    loader.resolve().map_err(format_loader_error)?;

    let Some((program, program_args)) = args.command.split_first() else {
        return Err("missing command after `run`".to_owned());
    };

    let mut command = Command::new(program);
    command.args(program_args);
    if let Some(vars) = loader.target_env().as_memory() {
        command.envs(vars);
    }

    execute_command(command, program)
}

fn execute_parse(args: ParseArgs) -> Result<(), String> {
    let options = ParseOptions::new()
        .substitution_mode(substitution_mode(args.no_expand))
        .missing(missing_policy(args.keep_missing, ""));

    let mut merged = envkit::EnvMapping::new();
    for path in &args.files {
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
        merged.extend(parse_env(&text, &options, &ProcessEnv));
    }

    let json = serde_json::to_string_pretty(&merged)
        .map_err(|err| format!("failed to encode output: {err}"))?;
    println!("{json}");
    Ok(())
}

fn execute_get(args: GetArgs) -> Result<i32, String> {
    let mut loader = build_loader(&args.load);
    loader.resolve().map_err(format_loader_error)?;

    let value = loader.get(&args.key);
    if value.is_undefined() {
        return Ok(1);
    }
    println!("{value}");
    Ok(0)
}

fn substitution_mode(no_expand: bool) -> SubstitutionMode {
    if no_expand {
        SubstitutionMode::Disabled
    } else {
        SubstitutionMode::Expand
    }
}

fn missing_policy(keep_missing: bool, default: &str) -> MissingVarPolicy {
    if keep_missing {
        MissingVarPolicy::Keep
    } else {
        MissingVarPolicy::Replace(default.to_owned())
    }
}

#[cfg(unix)]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let err = command.exec();
    Err(format!(
        "failed to execute `{}`: {err}",
        program.to_string_lossy()
    ))
}

#[cfg(not(unix))]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let status = command
        .status()
        .map_err(|err| format!("failed to execute `{}`: {err}", program.to_string_lossy()))?;
    Ok(status.code().unwrap_or(1))
}

fn format_loader_error(err: Error) -> String {
    match err {
        Error::FileNotFound { .. } | Error::UnsupportedFileType { .. } => {
            format!("{err} (drop --strict to skip it)")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_uses_defaults() {
        let cli = Cli::try_parse_from(["envkit", "run", "printenv", "FOO"])
            .expect("parse should succeed");
        let CliCommand::Run(args) = cli.command else {
            panic!("expected run");
        };

        assert!(args.load.files.is_empty());
        assert!(!args.load.override_existing);
        assert!(!args.load.no_expand);
        assert!(!args.load.keep_missing);
        assert_eq!(args.load.default, "");
        assert_eq!(args.command, vec![OsString::from("printenv"), OsString::from("FOO")]);
    }

    #[test]
    fn run_supports_repeated_and_comma_separated_files() {
        let cli = Cli::try_parse_from([
            "envkit",
            "run",
            "-f",
            ".env.local,.env",
            "--file",
            "custom.env",
            "--",
            "printenv",
            "-0",
        ])
        .expect("parse should succeed");
        let CliCommand::Run(args) = cli.command else {
            panic!("expected run");
        };

        assert_eq!(
            args.load.files,
            vec![
                PathBuf::from(".env.local"),
                PathBuf::from(".env"),
                PathBuf::from("custom.env"),
            ]
        );
        assert_eq!(args.command, vec![OsString::from("printenv"), OsString::from("-0")]);
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["envkit", "run", "-o"]).is_err());
    }

    #[test]
    fn keep_missing_conflicts_with_default() {
        let parsed = Cli::try_parse_from([
            "envkit",
            "get",
            "--keep-missing",
            "--default",
            "x",
            "KEY",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_policy_follows_flags() {
        assert_eq!(missing_policy(true, "x"), MissingVarPolicy::Keep);
        assert_eq!(
            missing_policy(false, "x"),
            MissingVarPolicy::Replace("x".to_string())
        );
    }
}
