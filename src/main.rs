mod cli;

use vidstream::{config, server};
use vidstream_av::{check_encoder, check_tool, resolve_encoder, HlsTranscoder};
use vidstream_common::VideoId;
use vidstream_db::pool::init_pool;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tokio_util::sync::CancellationToken;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting vidstream server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        "Originals in {:?}, HLS output in {:?}",
        config.storage.video_dir,
        config.storage.hls_dir
    );

    match resolve_encoder(config.transcode.ffmpeg_path.as_deref()) {
        Ok(path) => {
            let encoder = check_tool(&path, "-version");
            tracing::info!(
                "Encoder: {} ({})",
                path.display(),
                encoder.version.as_deref().unwrap_or("unknown version")
            );
        }
        Err(e) => tracing::warn!("{}; uploads will be stored but not transcoded", e),
    }

    let db_path = config.storage.database.to_string_lossy().into_owned();
    tracing::info!("Initializing database at {}", db_path);
    let db_pool = init_pool(&db_path)?;

    server::start_server(config, db_pool).await
}

async fn transcode_file(input: &Path, id: Option<String>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let mut settings = config.transcode.hls_settings();
    settings.encoder = resolve_encoder(config.transcode.ffmpeg_path.as_deref())?;

    let id = id.unwrap_or_else(|| VideoId::new().to_string());
    let transcoder = HlsTranscoder::new(&config.storage.hls_dir, settings);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        trigger.cancel();
    });

    println!("Transcoding {} as {}", input.display(), id);
    let dir = transcoder
        .transcode(&id, input, &cancel)
        .await
        .with_context(|| format!("Failed to transcode {:?}", input))?;

    println!("Manifest: {}", dir.join(vidstream_av::MANIFEST_NAME).display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidstream=trace,vidstream_av=trace,vidstream_db=debug,vidstream_common=debug,tower_http=debug".to_string()
        } else {
            "vidstream=debug,vidstream_av=debug,vidstream_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Transcode { input, id } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(transcode_file(&input, id, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidstream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tool = check_encoder(config.transcode.ffmpeg_path.as_deref());

    let status = if tool.available { "✓" } else { "✗" };
    print!("{} {}", status, tool.name);
    if let Some(ref version) = tool.version {
        print!(" ({})", version);
    }
    if let Some(ref path) = tool.path {
        print!(" - {}", path.display());
    }
    println!();

    println!();
    if tool.available {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Install it to enable HLS transcoding.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_summary(&config);
        }
    }

    Ok(())
}

fn print_summary(config: &config::Config) {
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Video dir: {}", config.storage.video_dir.display());
    println!("  HLS dir: {}", config.storage.hls_dir.display());
    println!("  Database: {}", config.storage.database.display());
    println!("  Max upload: {} MiB", config.storage.max_upload_mb);
    println!(
        "  Transcode: {} / {}, {}s segments",
        config.transcode.video_codec, config.transcode.audio_codec, config.transcode.segment_seconds
    );
}
