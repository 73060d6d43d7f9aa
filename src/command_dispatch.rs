//! Purpose: Hold top-level CLI command dispatch for `screenbrew`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Command behavior, output envelopes, and exit code semantics stay unchanged.
//! Invariants: Helpers in `main.rs` remain the source of command business logic.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    screens_dir: PathBuf,
    remote: Option<RemoteTarget>,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "screenbrew", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Serve(args) => {
            if remote.is_some() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("serve runs against the local screens directory")
                    .with_hint("Drop --remote when starting a server."));
            }
            let config = serve_config(args, screens_dir)?;
            let runtime = make_runtime()?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        Command::Fetch { key } => {
            let elements = load_screen(&key, &screens_dir, remote.as_ref())?;
            emit_json(json!({
                "screen": key,
                "elements": elements_json(&elements),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Render { key } => {
            let elements = load_screen(&key, &screens_dir, remote.as_ref())?;
            let views = to_view(&elements);
            let nodes: Vec<Value> = render(&views).iter().map(node_json).collect();
            emit_json(json!({
                "screen": key,
                "nodes": nodes,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Check { key } => {
            let elements = load_screen(&key, &screens_dir, remote.as_ref())?;
            let unknown = unknown_count(&elements);
            if unknown > 0 {
                emit_unknown_notice("check", &key, unknown);
            }
            emit_json(json!({
                "screen": key,
                "element_count": elements.len(),
                "unknown_count": unknown,
            }));
            Ok(RunOutcome::ok())
        }
        Command::List => {
            let keys = match remote {
                Some(remote) => remote.store()?.list_screens()?,
                None => DirStore::new()
                    .with_screens_dir(&screens_dir)
                    .screen_keys()?,
            };
            let screens: Vec<Value> = keys.iter().map(|key| json!({ "key": key })).collect();
            emit_json(json!({ "screens": screens }));
            Ok(RunOutcome::ok())
        }
        Command::Publish { key, file } => {
            let text = read_document_input(file.as_deref())?;
            let document = document_from_str(&text)?;
            let decoded = decode(&document);
            let unknown = unknown_count(&decoded);
            if unknown > 0 {
                emit_unknown_notice("publish", &key, unknown);
            }
            match remote {
                Some(remote) => remote.store()?.publish_screen(&key, &document)?,
                None => DirStore::new()
                    .with_screens_dir(&screens_dir)
                    .write_document(&key, &document)?,
            }
            emit_json(json!({
                "published": { "key": key, "element_count": decoded.len() },
            }));
            Ok(RunOutcome::ok())
        }
        Command::Delete { key } => {
            match remote {
                Some(remote) => remote.store()?.delete_screen(&key)?,
                None => DirStore::new()
                    .with_screens_dir(&screens_dir)
                    .remove_document(&key)?,
            }
            emit_json(json!({ "deleted": { "key": key } }));
            Ok(RunOutcome::ok())
        }
    }
}

fn load_screen(
    key: &str,
    screens_dir: &Path,
    remote: Option<&RemoteTarget>,
) -> Result<std::sync::Arc<[ScreenElement]>, Error> {
    match remote {
        Some(remote) => block_on_repository(remote.store()?, key),
        None => block_on_repository(
            DirStore::new().with_screens_dir(screens_dir),
            key,
        ),
    }
}

fn block_on_repository<S: DocumentStore>(
    store: S,
    key: &str,
) -> Result<std::sync::Arc<[ScreenElement]>, Error> {
    let runtime = make_runtime()?;
    let repository = ScreenRepository::new(store);
    runtime.block_on(repository.load(key))
}

fn read_document_input(file: Option<&Path>) -> Result<String, Error> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read document file")
                .with_path(path)
                .with_source(err)
        }),
        None => {
            if io::stdin().is_terminal() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("publish requires a document file or piped stdin")
                    .with_hint("Pass a file path or pipe a JSON document."));
            }
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read document from stdin")
                    .with_source(err)
            })?;
            Ok(text)
        }
    }
}

fn serve_config(args: ServeArgs, screens_dir: PathBuf) -> Result<serve::ServeConfig, Error> {
    let bind: SocketAddr = args.bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid --bind address")
            .with_hint("Use host:port, e.g. 127.0.0.1:7414.")
    })?;
    Ok(serve::ServeConfig {
        bind,
        screens_dir,
        token: args.token,
        access_mode: args.access.into(),
        allow_non_loopback: args.allow_non_loopback,
        cors_origins: args.cors_origin,
        max_body_bytes: args.max_body_bytes,
    })
}

fn make_runtime() -> Result<tokio::runtime::Runtime, Error> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start async runtime")
                .with_source(err)
        })
}
