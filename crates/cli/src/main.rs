// prefkit CLI - inspect and edit persisted settings stores

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use prefkit_store::bridge::value_to_json;
use prefkit_store::{Backend, BackendKind, SettingsError, SettingsStore, StoreConfig, Value, ValueKind};

use exit_codes::{settings_exit_code, EXIT_NOT_FOUND, EXIT_PERSIST, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "prefkit")]
#[command(about = "Inspect and edit persisted application settings")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/prefkit/<name>.json)
    #[arg(long, global = true, env = "PREFKIT_STORE")]
    store: Option<PathBuf>,

    /// Storage backend (default: from --config, else inferred from the file extension)
    #[arg(long, global = true)]
    backend: Option<BackendArg>,

    /// Store configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store name, used to derive the default file name
    #[arg(long, global = true)]
    name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under KEY
    #[command(after_help = "\
Examples:
  prefkit get ui.darkMode
  prefkit get editor.fontSize --type number --default 13
  prefkit get profile.name --json")]
    Get {
        key: String,

        /// Only accept a value of this type
        #[arg(long = "type", short = 't')]
        r#type: Option<KindArg>,

        /// Printed when the key is absent (parsed as --type when given)
        #[arg(long)]
        default: Option<String>,

        /// Emit {"key", "type", "value"} as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store VALUE under KEY and flush
    #[command(after_help = "\
Examples:
  prefkit set ui.darkMode true --type boolean
  prefkit set editor.fontSize 13.5 --type number
  prefkit set profile.name 'Ada' --type string")]
    Set {
        key: String,

        value: String,

        /// Type of VALUE; nothing is coerced
        #[arg(long = "type", short = 't')]
        r#type: KindArg,
    },

    /// Print whether KEY exists (true/false)
    Has { key: String },

    /// Delete KEY and flush (no error if absent)
    Remove { key: String },

    /// Delete every entry and flush
    Clear,

    /// List stored keys
    Keys {
        #[arg(long)]
        json: bool,
    },

    /// Print every entry with its type
    Dump {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Json,
    Sqlite,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Json => BackendKind::Json,
            BackendArg::Sqlite => BackendKind::Sqlite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    #[value(alias = "bool")]
    Boolean,
    #[value(alias = "num")]
    Number,
    #[value(alias = "str")]
    String,
}

impl From<KindArg> for ValueKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Boolean => ValueKind::Boolean,
            KindArg::Number => ValueKind::Number,
            KindArg::String => ValueKind::String,
        }
    }
}

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn not_found(key: &str) -> Self {
        Self {
            code: EXIT_NOT_FOUND,
            message: format!("key not found: {}", key),
            hint: Some("pass --default to print a fallback value".to_string()),
        }
    }

    /// Create error from a store error with the matching exit code.
    pub fn settings(err: SettingsError) -> Self {
        let code = settings_exit_code(&err);
        let hint = match &err {
            SettingsError::Format(_) => Some("the settings file is damaged or from a newer version".to_string()),
            SettingsError::TypeMismatch { expected: ValueKind::Boolean, .. } => {
                Some("booleans are written as true or false".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::settings(err)
    }
}

type Store = SettingsStore<Box<dyn Backend + Send>>;

fn infer_backend(path: &Path) -> Option<BackendKind> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("db") | Some("sqlite") | Some("sqlite3") => Some(BackendKind::Sqlite),
        Some("json") => Some(BackendKind::Json),
        _ => None,
    }
}

/// Build the store configuration: config file first, then flags on top.
fn resolve_config(cli: &Cli) -> Result<StoreConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };

    if let Some(name) = &cli.name {
        config.name = name.clone();
    }
    if let Some(path) = &cli.store {
        config.path = Some(path.clone());
    }
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    } else if let Some(inferred) = cli.store.as_deref().and_then(infer_backend) {
        config.backend = inferred;
    }
    if config.backend == BackendKind::Memory {
        return Err(CliError {
            code: EXIT_USAGE,
            message: "the memory backend cannot be used from the command line".to_string(),
            hint: Some("choose json or sqlite in the config file".to_string()),
        });
    }

    config.validate()?;
    Ok(config)
}

fn open_store(config: &StoreConfig) -> Result<Store, CliError> {
    let store = config.open()?;
    log::debug!("Opened {:?}", store);
    Ok(store)
}

/// Flush after a mutation; the CLI exits as soon as it returns, so an
/// unflushed change would be lost.
fn commit(store: &mut Store) -> Result<(), CliError> {
    if let Err(e) = store.try_flush() {
        return Err(CliError {
            code: EXIT_PERSIST,
            message: format!("failed to persist settings to {}: {}", store.backend().describe(), e),
            hint: None,
        });
    }
    Ok(())
}

fn value_json(key: &str, value: &Value) -> serde_json::Value {
    serde_json::json!({
        "key": key,
        "type": value.kind().as_str(),
        "value": value_to_json(value),
    })
}

fn cmd_get(
    store: &Store,
    key: &str,
    kind: Option<KindArg>,
    default: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    prefkit_store::value::validate_key(key)?;
    let kind: Option<ValueKind> = kind.map(Into::into);

    let stored = store
        .get(key)
        .filter(|v| kind.map_or(true, |k| v.kind() == k))
        .cloned();

    let value = match (stored, default) {
        (Some(v), _) => v,
        (None, Some(text)) => match kind {
            Some(kind) => Value::parse(key, kind, &text)?,
            None => Value::String(text),
        },
        (None, None) => return Err(CliError::not_found(key)),
    };

    if json {
        println!("{}", value_json(key, &value));
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn cmd_set(store: &mut Store, key: &str, text: &str, kind: KindArg) -> Result<(), CliError> {
    let kind: ValueKind = kind.into();
    let value = Value::parse(key, kind, text)?;
    store.set_as(kind, key, value)?;
    commit(store)
}

fn cmd_has(store: &Store, key: &str) -> Result<(), CliError> {
    println!("{}", store.has_key(key)?);
    Ok(())
}

fn cmd_remove(store: &mut Store, key: &str) -> Result<(), CliError> {
    store.remove(key)?;
    commit(store)
}

fn cmd_clear(store: &mut Store) -> Result<(), CliError> {
    let count = store.len();
    store.clear();
    commit(store)?;
    eprintln!("Removed {} setting(s)", count);
    Ok(())
}

fn cmd_keys(store: &Store, json: bool) -> Result<(), CliError> {
    if json {
        let keys = serde_json::to_string(&store.get_all_keys())
            .map_err(|e| CliError::args(e.to_string()))?;
        println!("{}", keys);
    } else {
        for key in store.keys() {
            println!("{}", key);
        }
    }
    Ok(())
}

fn cmd_dump(store: &Store, json: bool) -> Result<(), CliError> {
    if json {
        let output = serde_json::to_string_pretty(store.entries())
            .map_err(|e| CliError::args(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    if store.is_empty() {
        eprintln!("No settings stored in {}", store.backend().describe());
        return Ok(());
    }

    let width = store.keys().map(|k| k.chars().count()).max().unwrap_or(3).max(3);
    println!("{:<width$}  {:<7}  {}", "KEY", "TYPE", "VALUE", width = width);
    for (key, value) in store.entries() {
        let shown = match value {
            Value::String(s) => format!("{:?}", s),
            other => other.to_string(),
        };
        println!("{:<width$}  {:<7}  {}", key, value.kind(), shown, width = width);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(&cli)?;
    let mut store = open_store(&config)?;

    match cli.command {
        Commands::Get { key, r#type, default, json } => cmd_get(&store, &key, r#type, default, json),
        Commands::Set { key, value, r#type } => cmd_set(&mut store, &key, &value, r#type),
        Commands::Has { key } => cmd_has(&store, &key),
        Commands::Remove { key } => cmd_remove(&mut store, &key),
        Commands::Clear => cmd_clear(&mut store),
        Commands::Keys { json } => cmd_keys(&store, json),
        Commands::Dump { json } => cmd_dump(&store, json),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
