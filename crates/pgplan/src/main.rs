//! pgplan CLI
//!
//! Command-line tool for declarative schema migrations: diffs a declared
//! schema against the persisted snapshot to generate SQL, and imports
//! existing SQL migration history back into declarative form.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pgplan_core::prelude::*;

mod config;

use config::Config;

/// Declarative schema migrations for PostgreSQL and Supabase.
#[derive(Parser)]
#[command(name = "pgplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project configuration file.
    #[arg(short, long, env = "PGPLAN_CONFIG", default_value = "pgplan.json")]
    config: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new project: config file, starter schema, migrations
    /// directory.
    Init,

    /// Generate a migration from schema changes and persist the new
    /// snapshot.
    Generate {
        /// Migration name used in the generated file name.
        #[arg(short, long, default_value = "migration")]
        name: String,

        /// Print the SQL without writing any files.
        #[arg(long)]
        dry_run: bool,

        /// Apply destructive type changes anyway.
        #[arg(long)]
        force: bool,
    },

    /// Reconstruct a declarative schema from SQL migration history.
    Import {
        /// A .sql file, or a directory of .sql files processed in
        /// filename order.
        path: PathBuf,

        /// Write the declarative schema here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the schema file without generating anything.
    Validate,
}

/// Top-level failure modes, split by exit code: schema problems the user
/// must fix exit with [`EXIT_INVALID_SCHEMA`], everything else with 1.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Syntax(#[from] DslError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("destructive type changes detected; re-run with --force to apply them")]
    Destructive,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

const EXIT_INVALID_SCHEMA: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to initialize logging");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ (AppError::Syntax(_) | AppError::Structural(_) | AppError::Destructive)) => {
            error!("{err}");
            ExitCode::from(EXIT_INVALID_SCHEMA)
        }
        Err(AppError::Other(err)) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    match &cli.command {
        Commands::Init => init(&cli.config),
        Commands::Generate {
            name,
            dry_run,
            force,
        } => generate(&cli.config, name, *dry_run, *force),
        Commands::Import { path, output } => import(path, output.as_deref()),
        Commands::Validate => validate(&cli.config),
    }
}

const STARTER_SCHEMA: &str = "\
# Declarative schema. One table per block:
#
# table users {
#   id uuid pk
#   email varchar(255) unique not null
#   created_at timestamptz not null default now()
# }
";

fn init(config_path: &Path) -> Result<(), AppError> {
    if config_path.exists() {
        return Err(anyhow::anyhow!(
            "config file '{}' already exists",
            config_path.display()
        )
        .into());
    }
    let config = Config::default();
    fs::write(config_path, config.to_json()?)
        .with_context(|| format!("failed to write '{}'", config_path.display()))?;
    info!("created config: {}", config_path.display());

    if config.schema_path.exists() {
        info!("schema file already exists, leaving it untouched");
    } else {
        fs::write(&config.schema_path, STARTER_SCHEMA)
            .with_context(|| format!("failed to write '{}'", config.schema_path.display()))?;
        info!("created schema: {}", config.schema_path.display());
    }

    fs::create_dir_all(&config.migrations_dir)
        .with_context(|| format!("failed to create '{}'", config.migrations_dir.display()))?;
    info!("created migrations directory: {}", config.migrations_dir.display());
    Ok(())
}

fn load_schema(config: &Config) -> Result<Schema, AppError> {
    let text = fs::read_to_string(&config.schema_path).with_context(|| {
        format!("failed to read schema file '{}'", config.schema_path.display())
    })?;
    let schema = parse_schema(&text)?;
    validate_schema(&schema)?;
    Ok(schema)
}

fn load_state(path: &Path) -> Result<PersistedState, AppError> {
    if !path.exists() {
        return Ok(PersistedState::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file '{}'", path.display()))?;
    let state = PersistedState::from_json(&text)
        .with_context(|| format!("failed to parse state file '{}'", path.display()))?;
    Ok(state)
}

fn generate(config_path: &Path, name: &str, dry_run: bool, force: bool) -> Result<(), AppError> {
    let config = Config::load(config_path)?;
    let schema = load_schema(&config)?;
    let state = load_state(&config.state_path)?;

    let ops = diff(&state, &schema);
    if ops.is_empty() {
        info!("no changes");
        return Ok(());
    }
    for op in &ops {
        info!("{}", op.description());
    }

    let mut destructive = false;
    for change in classify_type_changes(&ops) {
        match change.severity {
            TypeChangeSeverity::Widened | TypeChangeSeverity::Unchecked => warn!("{change}"),
            TypeChangeSeverity::Narrowed | TypeChangeSeverity::MayTruncate => {
                error!("{change}");
                destructive = true;
            }
        }
    }
    if destructive && !force {
        return Err(AppError::Destructive);
    }

    let provider: Provider = config
        .provider
        .parse()
        .context("invalid provider in config")?;
    let sql = SqlGenerator::new(provider, config.sql.clone()).generate(&ops);

    if dry_run {
        println!("{sql}");
        return Ok(());
    }

    fs::create_dir_all(&config.migrations_dir)
        .with_context(|| format!("failed to create '{}'", config.migrations_dir.display()))?;
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let file = config
        .migrations_dir
        .join(format!("{stamp}_{}.sql", sanitize_name(name)));
    fs::write(&file, &sql)
        .with_context(|| format!("failed to write '{}'", file.display()))?;
    info!("wrote migration: {}", file.display());

    let new_state = PersistedState::from_schema(&schema);
    let json = new_state.to_json().context("failed to serialize state")?;
    fs::write(&config.state_path, json)
        .with_context(|| format!("failed to write '{}'", config.state_path.display()))?;
    info!("updated state: {}", config.state_path.display());
    Ok(())
}

fn import(path: &Path, output: Option<&Path>) -> Result<(), AppError> {
    let files = collect_sql_files(path)?;
    if files.is_empty() {
        return Err(anyhow::anyhow!("no .sql files found in '{}'", path.display()).into());
    }

    let mut ops = Vec::new();
    let mut warnings = Vec::new();
    for file in &files {
        let text = fs::read_to_string(file)
            .with_context(|| format!("failed to read '{}'", file.display()))?;
        let (mut file_ops, mut file_warnings) = parse_sql(&text);
        ops.append(&mut file_ops);
        warnings.append(&mut file_warnings);
    }

    let (schema, mut replay_warnings) = replay(&ops);
    warnings.append(&mut replay_warnings);

    for warning in &warnings {
        warn!("{warning}");
    }

    let text = render_schema(&schema);
    match output {
        Some(out) => {
            fs::write(out, &text)
                .with_context(|| format!("failed to write '{}'", out.display()))?;
            info!("wrote schema: {}", out.display());
        }
        None => print!("{text}"),
    }
    info!(
        "imported {} table(s) from {} file(s), {} warning(s)",
        schema.tables.len(),
        files.len(),
        warnings.len()
    );
    Ok(())
}

fn validate(config_path: &Path) -> Result<(), AppError> {
    let config = Config::load(config_path)?;
    let schema = load_schema(&config)?;
    info!("schema OK ({} tables)", schema.tables.len());
    Ok(())
}

/// Collects the `.sql` files to import: the file itself, or a directory's
/// `.sql` entries in filename-sorted order.
fn collect_sql_files(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("'{}' is neither a file nor a directory", path.display());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(path)
        .with_context(|| format!("failed to read directory '{}'", path.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    files.sort_by_key(|p| p.file_name().map(std::ffi::OsStr::to_os_string));
    Ok(files)
}

/// Restricts a migration name to filename-safe characters.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_').to_string();
    if cleaned.is_empty() {
        "migration".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_keeps_alphanumerics() {
        assert_eq!(sanitize_name("add users"), "add_users");
        assert_eq!(sanitize_name("Add-Email!"), "add_email");
        assert_eq!(sanitize_name("---"), "migration");
    }

    #[test]
    fn collect_sql_files_sorts_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("002_b.sql"), "").unwrap();
        fs::write(dir.path().join("001_a.sql"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_sql_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["001_a.sql", "002_b.sql"]);
    }

    #[test]
    fn collect_sql_files_accepts_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.sql");
        fs::write(&file, "DROP TABLE t;").unwrap();
        assert_eq!(collect_sql_files(&file).unwrap(), vec![file]);
    }

    #[test]
    fn load_state_defaults_to_empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_state(&dir.path().join("absent.json")).unwrap();
        assert!(state.tables.is_empty());
    }

    #[test]
    fn generate_writes_migration_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("pgplan.json");
        let config = Config {
            schema_path: dir.path().join("schema.pgplan"),
            migrations_dir: dir.path().join("migrations"),
            state_path: dir.path().join("pgplan.state.json"),
            ..Config::default()
        };
        fs::write(&config_path, config.to_json().unwrap()).unwrap();
        fs::write(&config.schema_path, "table users {\n  id uuid pk\n}\n").unwrap();

        generate(&config_path, "initial", false, false).unwrap();

        let migrations: Vec<_> = fs::read_dir(&config.migrations_dir)
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(migrations.len(), 1);
        let sql = fs::read_to_string(migrations[0].path()).unwrap();
        assert!(sql.contains("CREATE TABLE users"));

        let state = load_state(&config.state_path).unwrap();
        assert!(state.tables.contains_key("users"));

        // Second run is a no-op: the snapshot now matches the schema.
        generate(&config_path, "again", false, false).unwrap();
        let migrations_after: Vec<_> = fs::read_dir(&config.migrations_dir)
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(migrations_after.len(), 1);
    }

    #[test]
    fn generate_blocks_destructive_changes_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("pgplan.json");
        let config = Config {
            schema_path: dir.path().join("schema.pgplan"),
            migrations_dir: dir.path().join("migrations"),
            state_path: dir.path().join("pgplan.state.json"),
            ..Config::default()
        };
        fs::write(&config_path, config.to_json().unwrap()).unwrap();

        fs::write(&config.schema_path, "table t {\n  age bigint\n}\n").unwrap();
        generate(&config_path, "initial", false, false).unwrap();

        // Narrow bigint to int: refused without --force.
        fs::write(&config.schema_path, "table t {\n  age int\n}\n").unwrap();
        let err = generate(&config_path, "narrow", false, false).unwrap_err();
        assert!(matches!(err, AppError::Destructive));

        generate(&config_path, "narrow", false, true).unwrap();
    }

    #[test]
    fn import_reconstructs_schema_text() {
        let dir = tempfile::tempdir().unwrap();
        let sql_dir = dir.path().join("migrations");
        fs::create_dir_all(&sql_dir).unwrap();
        fs::write(
            sql_dir.join("001_init.sql"),
            "CREATE TABLE users (id uuid PRIMARY KEY);",
        )
        .unwrap();
        fs::write(
            sql_dir.join("002_email.sql"),
            "ALTER TABLE users ADD COLUMN email varchar(255) UNIQUE;",
        )
        .unwrap();

        let out = dir.path().join("schema.pgplan");
        import(&sql_dir, Some(&out)).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert!(text.contains("table users {"));
        assert!(text.contains("id uuid pk"));
        assert!(text.contains("email varchar(255) unique"));
    }
}
