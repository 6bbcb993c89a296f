//! FinderDrive CLI - column-view navigator for Google Drive
//!
//! Usage:
//!   finderdrive-cli login-url                 Print the consent URL
//!   finderdrive-cli login <redirect-url>      Store the token from the redirect
//!   finderdrive-cli ls [folder-id]            Show the column stack down to a folder
//!   finderdrive-cli reveal <file-id>          Open every column on the path to a file
//!   finderdrive-cli search <query>            Search by name
//!   finderdrive-cli mkdir|rename|rm|mv|cp|upload ...
//!
//! `--offline` runs every command against a built-in sample drive.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use finderdrive_lib::auth::{authorization_url, parse_token_fragment, StoredToken, TokenStore};
use finderdrive_lib::config::{load_config, load_config_from};
use finderdrive_lib::preview::{format_size, FileKind};
use finderdrive_lib::providers::{GoogleDriveConfig, GoogleDriveProvider, MemoryProvider};
use finderdrive_lib::{
    open_folder_cache, ColumnStack, ColumnState, EngineConfig, FileRecord, FinderDrive, FolderCache,
    MemoryFolderCache, RemoteStore, UploadSource,
};

#[derive(Parser)]
#[command(
    name = "finderdrive-cli",
    about = "FinderDrive CLI - column-view navigator for Google Drive",
    version
)]
struct Cli {
    /// Use the built-in sample drive instead of Google Drive
    #[arg(long, global = true)]
    offline: bool,

    /// Config file (default: <config dir>/finderdrive/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Google consent URL
    LoginUrl,
    /// Store the access token from the redirect URL (or its fragment)
    Login { redirect: String },
    /// Forget the stored access token
    Logout,
    /// Show the column stack from the root down to a folder
    Ls { folder_id: Option<String> },
    /// Open every column on the path to a file and select it
    Reveal { file_id: String },
    /// Search files by name
    Search { query: String },
    /// Create a folder
    Mkdir {
        name: String,
        #[arg(long, default_value = "root")]
        parent: String,
    },
    /// Rename a file or folder
    Rename { file_id: String, name: String },
    /// Move a file or folder to the trash
    Rm { file_id: String },
    /// Move a file or folder into another folder
    Mv {
        file_id: String,
        target: String,
        /// Folder to remove it from (default: its primary parent)
        #[arg(long)]
        from: Option<String>,
    },
    /// Copy a file into a folder
    Cp {
        file_id: String,
        parent: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Upload local files into a folder
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, default_value = "root")]
        to: String,
    },
    /// Show build and dependency versions
    About,
}

fn token_store() -> TokenStore {
    TokenStore::new(TokenStore::default_path())
}

fn connect(cli: &Cli, config: &EngineConfig) -> Result<FinderDrive> {
    if cli.offline {
        let remote: Arc<dyn RemoteStore> = Arc::new(MemoryProvider::demo());
        let cache: Arc<dyn FolderCache> = Arc::new(MemoryFolderCache::new(config.cache_ttl()));
        return Ok(FinderDrive::new(remote, cache, config));
    }

    let token = match std::env::var("FINDERDRIVE_TOKEN") {
        Ok(token) if !token.is_empty() => SecretString::from(token),
        _ => token_store()
            .load()
            .map(|stored| stored.secret())
            .ok_or_else(|| anyhow!("Not signed in. Run `finderdrive-cli login-url` first, or use --offline"))?,
    };

    let remote: Arc<dyn RemoteStore> = Arc::new(GoogleDriveProvider::new(GoogleDriveConfig::new(token, config)));
    Ok(FinderDrive::new(remote, open_folder_cache(config), config))
}

fn render_stack(stack: &ColumnStack) {
    for (index, column) in stack.columns.iter().enumerate() {
        let marker = if index == stack.active_index { "*" } else { " " };
        let state = match column.state() {
            ColumnState::Loaded => String::new(),
            ColumnState::LoadedStale => " (cached)".to_string(),
            ColumnState::Loading => " (loading)".to_string(),
            ColumnState::Empty => " (empty)".to_string(),
            ColumnState::Errored => format!(
                " (error: {})",
                column.error.as_ref().map(|e| e.message.as_str()).unwrap_or("unknown")
            ),
        };
        let timing = column
            .last_load_duration_ms
            .map(|ms| format!(" {}ms", ms))
            .unwrap_or_default();
        println!("{}[{}] {} ({} items){}{}", marker, index, column.folder_name, column.items.len(), timing, state);

        for item in &column.items {
            let selected = column.selected_item_id.as_deref() == Some(item.id.as_str());
            print_record(item, if selected { "  > " } else { "    " });
        }
    }
}

fn print_record(record: &FileRecord, prefix: &str) {
    let name = if record.is_folder() {
        format!("{}/", record.name)
    } else {
        record.name.clone()
    };
    let size = if record.is_folder() { String::new() } else { format_size(record.size) };
    println!(
        "{}{:<40} {:>10}  {:<12} {}",
        prefix,
        name,
        size,
        FileKind::of(record).label(),
        record.id
    );
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };

    match &cli.command {
        Commands::LoginUrl => {
            let client_id = config
                .oauth_client_id
                .as_deref()
                .context("Set oauth_client_id in the config file first")?;
            println!("{}", authorization_url(client_id, &config.oauth_redirect_uri)?);
        }
        Commands::Login { redirect } => {
            let token = parse_token_fragment(redirect).context("No access_token found in the redirect")?;
            let store = token_store();
            store.save(&StoredToken::from_auth(&token))?;
            println!("Signed in, token valid for {} minutes", token.expires_in / 60);
        }
        Commands::Logout => {
            token_store().clear()?;
            println!("Signed out");
        }
        Commands::Ls { folder_id } => {
            let drive = connect(&cli, &config)?;
            drive.navigator.init_root().await;
            if let Some(folder_id) = folder_id {
                let folder = drive.navigator.remote().get(folder_id).await?;
                if !folder.is_folder() {
                    bail!("{} is not a folder", folder.name);
                }
                drive.navigator.open_path(&folder).await;
            }
            render_stack(&drive.store().snapshot());
        }
        Commands::Reveal { file_id } => {
            let drive = connect(&cli, &config)?;
            let target = drive.navigator.remote().get(file_id).await?;
            if drive.navigator.open_path(&target).await.is_empty() {
                bail!("Could not resolve any folder above {}", target.name);
            }
            render_stack(&drive.store().snapshot());
        }
        Commands::Search { query } => {
            let drive = connect(&cli, &config)?;
            let results = drive.navigator.search_drive(query).await?;
            if results.is_empty() {
                println!("No matches");
            }
            for record in &results {
                print_record(record, "");
            }
        }
        Commands::Mkdir { name, parent } => {
            let drive = connect(&cli, &config)?;
            let folder = drive.mutations.create_folder(name, parent).await?;
            println!("Created {} ({})", folder.name, folder.id);
        }
        Commands::Rename { file_id, name } => {
            let drive = connect(&cli, &config)?;
            drive.mutations.rename_file(file_id, name).await?;
            println!("Renamed {} to {}", file_id, name.trim());
        }
        Commands::Rm { file_id } => {
            let drive = connect(&cli, &config)?;
            drive.mutations.delete_file(file_id).await?;
            println!("Moved {} to the trash", file_id);
        }
        Commands::Mv { file_id, target, from } => {
            let drive = connect(&cli, &config)?;
            let source = match from {
                Some(source) => source.clone(),
                None => drive
                    .navigator
                    .remote()
                    .get(file_id)
                    .await?
                    .primary_parent()
                    .map(str::to_string)
                    .context("Record has no parent folder; pass --from")?,
            };
            drive.mutations.move_file(file_id, target, &source).await?;
            println!("Moved {} from {} to {}", file_id, source, target);
        }
        Commands::Cp { file_id, parent, name } => {
            let drive = connect(&cli, &config)?;
            let copy = drive.mutations.copy_file(file_id, parent, name.as_deref()).await?;
            println!("Copied to {} ({})", copy.name, copy.id);
        }
        Commands::Upload { paths, to } => {
            let drive = connect(&cli, &config)?;
            let mut sources = Vec::with_capacity(paths.len());
            for path in paths {
                let source = UploadSource::from_path(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                sources.push(source);
            }

            let mut progress = drive.uploads().subscribe();
            let uploads = drive.uploads().clone();
            let reporter = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let summary = uploads.summary();
                    if summary.is_finished {
                        break;
                    }
                    eprint!("\rUploading {} file(s)... {:>3.0}%", summary.active, summary.total_progress);
                }
            });

            let results = drive.mutations.upload_files(sources, to).await;
            // Give the reporter a moment to see the final state
            let _ = tokio::time::timeout(Duration::from_millis(200), reporter).await;
            eprintln!();

            let mut failed = 0;
            for (path, result) in paths.iter().zip(&results) {
                match result {
                    Ok(record) => println!("Uploaded {} ({})", record.name, record.id),
                    Err(e) => {
                        failed += 1;
                        println!("Failed {}: {}", path.display(), e);
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} uploads failed", failed, results.len());
            }
        }
        Commands::About => {
            println!("finderdrive {} (rustc {})", env!("CARGO_PKG_VERSION"), finderdrive_lib::rustc_version());
            for dep in finderdrive_lib::dependencies() {
                println!("  {:<12} {}", dep.name, dep.version);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    finderdrive_lib::init_logging("info");
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
