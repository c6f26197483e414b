use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vk_photo_saver::config::{self, Config};
use vk_photo_saver::security::InputValidator;
use vk_photo_saver::{Credentials, ImageSaver, OperationResult};

/// Back up VK photos to Yandex Disk
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(long, env = "VK_TOKEN", hide_env_values = true)]
    vk_token: Option<String>,

    #[clap(long, env = "YADISK_TOKEN", hide_env_values = true)]
    yadisk_token: Option<String>,

    /// VK user whose photos are copied (defaults to the token owner)
    #[clap(short, long)]
    user_id: Option<String>,

    /// Album to copy: profile, wall, saved or a numeric album id
    #[clap(short, long)]
    album: Option<String>,

    /// Maximum number of photos to copy
    #[clap(short = 'n', long)]
    max_qty: Option<usize>,

    /// Destination folder on Yandex Disk
    #[clap(short, long)]
    folder: Option<String>,

    /// Local path of the JSON manifest
    #[clap(short, long)]
    manifest: Option<PathBuf>,

    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy photos and upload the manifest (default)
    Backup,
    /// Print the VK OAuth link for obtaining a token
    AuthLink {
        #[clap(long)]
        app_id: String,
        #[clap(long, default_value = "status")]
        scope: String,
    },
    /// Store the effective settings in the configuration file
    SaveConfig,
    /// Print a VK user's status
    Status,
    /// List files on Yandex Disk
    List,
    /// Show a file or folder on Yandex Disk
    Info { path: String },
    /// Delete a file or folder on Yandex Disk
    Delete { path: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = config::load_config().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}. Using defaults.", e);
        Config::default()
    });
    apply_overrides(&mut config, &args);

    // Initialize logging
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        config.log_level_filter()
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Some(Command::AuthLink { app_id, scope }) = &args.command {
        println!("{}", ImageSaver::get_auth_link(app_id, scope));
        return Ok(());
    }

    if let Some(Command::SaveConfig) = &args.command {
        config::save_config(&config).context("Failed to save configuration")?;
        println!("Configuration saved");
        return Ok(());
    }

    config::validate_config(&config).context("Invalid configuration")?;

    let mut credentials = Credentials::new(
        &config.vk_token,
        &config.yadisk_token,
        config.vk_user_id.as_deref(),
    );
    credentials.request_interval = config.request_interval();
    credentials.retry_config = config.retry_config();
    let saver = ImageSaver::connect(&credentials).await;
    if !saver.is_initialized() {
        bail!(
            "Not initialized (VK client: {}, Yandex Disk client: {})",
            saver.is_client_initialized(),
            saver.is_uploader_initialized()
        );
    }

    match args.command.unwrap_or(Command::Backup) {
        Command::Backup => backup(&saver, &config).await,
        Command::AuthLink { .. } | Command::SaveConfig => Ok(()),
        Command::Status => {
            println!("{}", saver.get_user_vk_status(config.vk_user_id.as_deref()).await);
            Ok(())
        }
        Command::List => report(saver.list_disk().await),
        Command::Info { path } => report(saver.get_file_info(&path).await),
        Command::Delete { path } => report(saver.delete_file(&path).await),
    }
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(token) = &args.vk_token {
        config.vk_token = token.clone();
    }
    if let Some(token) = &args.yadisk_token {
        config.yadisk_token = token.clone();
    }
    if let Some(user_id) = &args.user_id {
        config.vk_user_id = Some(user_id.clone());
    }
    if let Some(album) = &args.album {
        config.album_id = album.clone();
    }
    if let Some(max_qty) = args.max_qty {
        config.max_qty = max_qty;
    }
    if let Some(folder) = &args.folder {
        config.folder = folder.clone();
    }
    if let Some(manifest) = &args.manifest {
        config.manifest_path = manifest.to_string_lossy().to_string();
    }
}

async fn backup(saver: &ImageSaver, config: &Config) -> Result<()> {
    let folder = config.folder_or_default();
    InputValidator::validate_folder_name(&folder)?;

    let created = saver.create_folder(&folder).await;
    if !created.success {
        // An existing folder is fine, anything else will fail the uploads too
        log::warn!("Folder {} not created: {}", folder, created.message);
    }

    let images = saver
        .get_images_links(config.vk_user_id.as_deref(), &config.album_id, config.max_qty)
        .await;
    if images.is_empty() {
        println!("No photos found in album {}", config.album_id);
        return Ok(());
    }
    println!("Copying {} photos to {}...", images.len(), folder);

    let manifest_path = PathBuf::from(&config.manifest_path);
    let result = saver
        .upload_remote_files(&folder, &images, Some(manifest_path.as_path()))
        .await;
    if !result.success {
        bail!(result.message);
    }

    println!("Done. Manifest saved to {}", manifest_path.display());
    Ok(())
}

fn report(result: OperationResult) -> Result<()> {
    if !result.success {
        bail!(result.message);
    }
    if let Some(object) = result.object {
        println!("{}", serde_json::to_string_pretty(&object)?);
    }
    Ok(())
}
