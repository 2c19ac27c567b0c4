//! replbridge CLI
//!
//! Submits one command body to a REPL session and prints the captured output.
//! The body comes from the positional argument or stdin.

use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process;

use tracing::{debug, error, warn};

use replbridge::config::{Config, ConfigLoader};
use replbridge::error::{Error, Result};
use replbridge::{ExecParams, Executor};

/// Parsed command line arguments
#[derive(Debug, Default)]
struct AppArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Target session name
    session: Option<String>,
    /// REPL executable override
    command: Option<String>,
    /// Text prepended to the body
    prologue: Option<String>,
    /// Text appended to the body
    epilogue: Option<String>,
    /// `$name` substitution values
    variables: Vec<(String, String)>,
    /// Capture timeout override in seconds
    timeout_secs: Option<u64>,
    /// Enable debug logging
    debug: bool,
    /// Command body (read from stdin when absent)
    body: Option<String>,
}

impl AppArgs {
    /// Parse command line arguments
    fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        let mut app_args = AppArgs::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    app_args.config_path = Some(PathBuf::from(Self::value(&args, &mut i)?));
                }
                "--session" | "-s" => {
                    app_args.session = Some(Self::value(&args, &mut i)?);
                }
                "--command" => {
                    app_args.command = Some(Self::value(&args, &mut i)?);
                }
                "--prologue" => {
                    app_args.prologue = Some(Self::value(&args, &mut i)?);
                }
                "--epilogue" => {
                    app_args.epilogue = Some(Self::value(&args, &mut i)?);
                }
                "--var" => {
                    let pair = Self::value(&args, &mut i)?;
                    match pair.split_once('=') {
                        Some((name, value)) if !name.is_empty() => {
                            app_args
                                .variables
                                .push((name.to_string(), value.to_string()));
                        }
                        _ => {
                            return Err(format!("--var expects NAME=VALUE, got '{}'", pair).into())
                        }
                    }
                }
                "--timeout" => {
                    let raw = Self::value(&args, &mut i)?;
                    app_args.timeout_secs = Some(
                        raw.parse()
                            .map_err(|_| format!("invalid --timeout value '{}'", raw))?,
                    );
                }
                "--debug" | "-d" => {
                    app_args.debug = true;
                }
                "--help" | "-?" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-v" => {
                    println!("replbridge v{}", env!("CARGO_PKG_VERSION"));
                    process::exit(0);
                }
                arg if arg.starts_with('-') && arg.len() > 1 => {
                    return Err(format!("Unknown option: {}", arg).into());
                }
                _ => {
                    if app_args.body.is_some() {
                        warn!("Ignoring extra positional argument: {}", args[i]);
                    } else {
                        app_args.body = Some(args[i].clone());
                    }
                }
            }
            i += 1;
        }

        Ok(app_args)
    }

    fn value(args: &[String], i: &mut usize) -> Result<String> {
        if *i + 1 < args.len() {
            *i += 1;
            Ok(args[*i].clone())
        } else {
            Err(format!("Missing value for {}", args[*i]).into())
        }
    }
}

/// Print help information
fn print_help() {
    println!("replbridge - synchronous command execution over prompt-driven REPLs");
    println!();
    println!("USAGE:");
    println!("    replbridge [OPTIONS] [BODY]");
    println!();
    println!("    BODY is the command text to submit. When omitted (or given as");
    println!("    '-') the body is read from stdin.");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>      Path to configuration file");
    println!("    -s, --session <NAME>     Target session name ('none' = default)");
    println!("        --command <EXE>      REPL executable override");
    println!("        --prologue <TEXT>    Text prepended to the body");
    println!("        --epilogue <TEXT>    Text appended to the body");
    println!("        --var <NAME=VALUE>   Substitute $NAME in the body (repeatable)");
    println!("        --timeout <SECS>     Capture timeout (0 = wait forever)");
    println!("    -d, --debug              Enable debug logging");
    println!("    -?, --help               Print this help message");
    println!("    -v, --version            Print version information");
    println!();
    println!("CONFIGURATION:");
    println!("    replbridge looks for configuration in the following order:");
    println!("    1. Path specified with --config");
    println!("    2. $REPLBRIDGE_CONFIG");
    println!("    3. <user config dir>/replbridge/config.toml");
    println!("    4. ./replbridge.toml");
    println!("    5. Built-in defaults");
    println!();
    println!("ENVIRONMENT:");
    println!("    REPLBRIDGE_CONFIG     Path to configuration file");
    println!("    RUST_LOG              Logging level (error, warn, info, debug, trace)");
}

#[tokio::main]
async fn main() {
    let args = AppArgs::parse().unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        print_help();
        process::exit(1);
    });

    let log_level = if args.debug { "debug" } else { "warn" };
    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(args).await {
        Ok(result) => println!("{}", result),
        Err(e) => {
            error!("execution failed: {}", e);
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

async fn run(args: AppArgs) -> Result<String> {
    let mut config = load_configuration(&args)?;

    if let Some(command) = &args.command {
        config.repl.command = command.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        config.capture.timeout_secs = timeout;
    }

    let body = match args.body.as_deref() {
        Some("-") | None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        Some(body) => body.to_string(),
    };
    if body.trim().is_empty() {
        return Err("empty command body".into());
    }

    let executor = Executor::new(config)?;
    let params = ExecParams {
        session: args.session,
        prologue: args.prologue,
        epilogue: args.epilogue,
        variables: args.variables,
    };

    tokio::select! {
        result = executor.execute(&body, &params) => result,
        _ = tokio::signal::ctrl_c() => Err(Error::CaptureCancelled),
    }
}

/// Load configuration from an explicit path or the search paths.
fn load_configuration(args: &AppArgs) -> Result<Config> {
    match &args.config_path {
        Some(path) => {
            debug!("loading config from: {}", path.display());
            ConfigLoader::load_from_file(path)
        }
        None => ConfigLoader::load(),
    }
}
