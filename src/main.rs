//! Purpose: `screenbrew` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (JSON by default).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All screen loads go through `api::ScreenRepository`.
use std::io::{self, IsTerminal, Read};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};

mod command_dispatch;
mod screen_json;
mod screen_paths;
mod serve;

use screen_json::elements_json;
use screen_paths::default_screens_dir;
use screenbrew::api::{
    DirStore, DocumentStore, Error, ErrorKind, RemoteStore, ScreenElement, ScreenRepository,
    decode, document_from_str, node_json, render, to_exit_code, to_view, unknown_count,
};
use screenbrew::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return handle_clap_error(err),
    };

    let screens_dir = cli.dir.unwrap_or_else(default_screens_dir);
    if cli.token.is_some() && cli.remote.is_none() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--token requires --remote")
            .with_hint("Provide --remote <url> or drop --token."));
    }
    let remote = cli.remote.map(|base_url| RemoteTarget {
        base_url,
        token: cli.token,
    });

    command_dispatch::dispatch_command(cli.command, screens_dir, remote)
}

/// Help and version print through clap; everything else becomes a Usage
/// error envelope like any other failure.
fn handle_clap_error(err: clap::Error) -> Result<RunOutcome, Error> {
    match err.kind() {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
            print_clap_message(&err)?;
            Ok(RunOutcome::ok())
        }
        ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            print_clap_message(&err)?;
            Ok(RunOutcome::with_code(2))
        }
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message(usage_summary(&err))
            .with_hint("See `screenbrew --help`.")),
    }
}

fn print_clap_message(err: &clap::Error) -> Result<(), Error> {
    err.print().map_err(|io_err| {
        Error::new(ErrorKind::Io)
            .with_message("could not print help")
            .with_source(io_err)
    })
}

fn usage_summary(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    rendered
        .lines()
        .next()
        .unwrap_or("invalid arguments")
        .trim_start_matches("error: ")
        .to_string()
}

#[derive(Parser, Debug)]
#[command(
    name = "screenbrew",
    version,
    about = "Server-driven screens for the brew-log apps",
    long_about = None,
    before_help = r#"Screens are JSON documents of typed elements, fetched by key.

Mental model:
  - `fetch` loads and decodes a screen's elements
  - `render` projects a screen all the way to UI nodes
  - `serve` publishes a screens directory over HTTP
"#,
    after_help = r#"EXAMPLES
  $ screenbrew publish home home.json
  $ screenbrew fetch home
  $ screenbrew render home
  $ screenbrew serve --bind 127.0.0.1:7414     # Terminal 1
  $ screenbrew --remote http://127.0.0.1:7414 fetch home   # Terminal 2

LEARN MORE
  $ screenbrew <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        help = "Screens directory for local documents (default: ~/.screenbrew/screens)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Base URL of a screenbrew server to use instead of --dir")]
    remote: Option<String>,
    #[arg(long, help = "Bearer token for --remote requests")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Fetch a screen and print its decoded elements")]
    Fetch { key: String },
    #[command(about = "Fetch a screen and print its rendered UI nodes")]
    Render { key: String },
    #[command(about = "Decode a screen and report unknown or malformed elements")]
    Check { key: String },
    #[command(about = "List available screen keys")]
    List,
    #[command(about = "Publish a screen document from a file or stdin")]
    Publish {
        key: String,
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
    #[command(about = "Delete a screen document")]
    Delete { key: String },
    #[command(about = "Serve the screens directory over HTTP")]
    Serve(ServeArgs),
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:7414", help = "Address to bind")]
    bind: String,
    #[arg(long, help = "Require this bearer token on every request")]
    token: Option<String>,
    #[arg(
        long,
        default_value = "read-write",
        value_enum,
        help = "Allowed operations: read|write|read-write"
    )]
    access: AccessArg,
    #[arg(long, help = "Allow binding to a non-loopback address")]
    allow_non_loopback: bool,
    #[arg(long, help = "Allow this CORS origin (repeatable)")]
    cors_origin: Vec<String>,
    #[arg(
        long,
        default_value_t = 1024 * 1024,
        help = "Maximum request body size in bytes"
    )]
    max_body_bytes: u64,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AccessArg {
    Read,
    Write,
    #[value(name = "read-write")]
    ReadWrite,
}

impl From<AccessArg> for serve::AccessMode {
    fn from(access: AccessArg) -> Self {
        match access {
            AccessArg::Read => serve::AccessMode::ReadOnly,
            AccessArg::Write => serve::AccessMode::WriteOnly,
            AccessArg::ReadWrite => serve::AccessMode::ReadWrite,
        }
    }
}

#[derive(Clone, Debug)]
struct RemoteTarget {
    base_url: String,
    token: Option<String>,
}

impl RemoteTarget {
    fn store(&self) -> Result<RemoteStore, Error> {
        let mut store = RemoteStore::new(self.base_url.clone())?;
        if let Some(token) = &self.token {
            store = store.with_token(token.clone());
        }
        Ok(store)
    }
}

fn emit_json(value: Value) {
    let json = serde_json::to_string(&value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {}", error_message(err));
        if let Some(key) = err.key() {
            eprintln!("  screen: {key}");
        }
        if let Some(path) = err.path() {
            eprintln!("  path: {}", path.display());
        }
        for cause in error_causes(err) {
            eprintln!("  cause: {cause}");
        }
        if let Some(hint) = err.hint() {
            eprintln!("hint: {hint}");
        }
    } else {
        let fallback = || "{\"error\":{\"kind\":\"Internal\"}}".to_string();
        let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| fallback());
        eprintln!("{json}");
    }
}

fn error_json(err: &Error) -> Value {
    let mut body = Map::new();
    body.insert("kind".to_string(), json!(err.kind().name()));
    body.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        body.insert("hint".to_string(), json!(hint));
    }
    if let Some(key) = err.key() {
        body.insert("key".to_string(), json!(key));
    }
    if let Some(path) = err.path() {
        body.insert("path".to_string(), json!(path.to_string_lossy()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        body.insert("causes".to_string(), json!(causes));
    }
    json!({ "error": Value::Object(body) })
}

fn error_message(err: &Error) -> String {
    match err.message() {
        Some(message) => message.to_string(),
        None => match err.kind() {
            ErrorKind::Internal => "unexpected internal failure".to_string(),
            ErrorKind::Usage => "invalid usage".to_string(),
            ErrorKind::NotFound => "not found".to_string(),
            ErrorKind::Permission => "permission denied".to_string(),
            ErrorKind::Corrupt => "corrupt document".to_string(),
            ErrorKind::Io => "i/o failure".to_string(),
        },
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cursor = std::error::Error::source(err);
    while let Some(source) = cursor {
        causes.push(source.to_string());
        cursor = source.source();
    }
    causes
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    time::OffsetDateTime::from_unix_timestamp_nanos(elapsed.as_nanos() as i128)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

fn emit_unknown_notice(cmd: &str, screen: &str, count: usize) {
    let notice = Notice::new("unknown-elements", cmd, screen)
        .with_time(notice_time_now().unwrap_or_default())
        .with_message(format!("{count} element(s) will render as empty"))
        .with_detail("unknown_count", count as u64);
    emit_notice(&notice);
}

fn emit_notice(notice: &Notice) {
    if io::stderr().is_terminal() {
        eprintln!("notice: {} (screen: {})", notice.message, notice.screen);
    } else if let Ok(json) = serde_json::to_string(&notice_json(notice)) {
        eprintln!("{json}");
    }
}
