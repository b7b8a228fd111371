//! panocube - panorama to cubemap pipeline.
//!
//! This binary starts the HTTP server or slices a single panorama offline.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use panocube::{
    access::{MagicCodeAllocator, MemoryCodeRegistry, ViewThrottle},
    config::{Cli, Command, ServeConfig, SliceConfig},
    create_s3_client,
    pipeline::{AdmissionPool, MemoryRepository, Orchestrator, Workspace},
    server::{create_router, RouterConfig},
    slicer::Slicer,
    storage::{ObjectStore, S3ObjectStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Slice(config) => run_slice(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    info!("  Upload root: {}", config.upload_root.display());
    info!("  Slice concurrency: {}", config.slice_concurrency);
    info!(
        "  JPEG quality: {}, thumbnail: {}px",
        config.jpeg_quality, config.thumbnail_size
    );
    info!(
        "  Magic codes: {} chars, view cooldown: {}s",
        config.magic_code_length, config.view_cooldown
    );
    match config.upload_timeout() {
        Some(timeout) => info!("  Upload timeout: {}s", timeout.as_secs()),
        None => info!("  Upload timeout: disabled"),
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.upload_root).await {
        error!(
            "Failed to create upload root {}: {}",
            config.upload_root.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let store = connect_store(&config).await;

    let slicer = Slicer::new()
        .with_jpeg_quality(config.jpeg_quality)
        .with_thumbnail_size(config.thumbnail_size);
    let allocator = MagicCodeAllocator::new(
        Arc::new(MemoryCodeRegistry::new()),
        config.magic_code_length,
    );
    let throttle = ViewThrottle::with_settings(config.view_cooldown(), config.view_cache_capacity);

    let mut orchestrator = Orchestrator::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(AdmissionPool::new(config.slice_concurrency)),
        Workspace::new(config.upload_root.clone()),
    )
    .with_slicer(slicer)
    .with_allocator(Arc::new(allocator))
    .with_throttle(Arc::new(throttle))
    .with_upload_timeout(config.upload_timeout());

    if let Some(store) = store {
        orchestrator = orchestrator.with_store(store);
    }

    let router = create_router(orchestrator, build_router_config(&config));
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -F owner=me -F name=Lobby -F 'panos[]=@pano.jpg' http://{}/aggregates",
        addr
    );
    info!("    curl http://{}/aggregates/<id>", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build the object store, or `None` for local-only mode.
///
/// An unreachable bucket downgrades to local-only mode instead of aborting.
async fn connect_store(config: &ServeConfig) -> Option<Arc<dyn ObjectStore>> {
    let Some(bucket) = config.s3_bucket.clone() else {
        warn!("  Storage: local only (no --s3-bucket configured)");
        return None;
    };

    info!("  S3 bucket: {}", bucket);
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.s3_region);

    let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    let store = S3ObjectStore::new(client, bucket);

    info!("");
    info!("Connecting to S3...");
    match store.probe().await {
        Ok(()) => {
            info!("  Connected successfully");
            let store: Arc<dyn ObjectStore> = Arc::new(store);
            Some(store)
        }
        Err(e) => {
            warn!("  Failed to reach bucket '{}': {}", store.bucket(), e);
            warn!("  Continuing in local-only mode; artifacts stay on disk");
            None
        }
    }
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("██████╗  █████╗ ███╗   ██╗ ██████╗  ██████╗██╗   ██╗██████╗ ███████╗");
    info!("██╔══██╗██╔══██╗████╗  ██║██╔═══██╗██╔════╝██║   ██║██╔══██╗██╔════╝");
    info!("██████╔╝███████║██╔██╗ ██║██║   ██║██║     ██║   ██║██████╔╝█████╗  ");
    info!("██╔═══╝ ██╔══██║██║╚██╗██║██║   ██║██║     ██║   ██║██╔══██╗██╔══╝  ");
    info!("██║     ██║  ██║██║ ╚████║╚██████╔╝╚██████╗╚██████╔╝██████╔╝███████╗");
    info!("╚═╝     ╚═╝  ╚═╝╚═╝  ╚═══╝ ╚═════╝  ╚═════╝ ╚═════╝ ╚═════╝ ╚══════╝");
    info!("");
    info!("                              v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "panocube=debug,tower_http=debug"
    } else {
        "panocube=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_max_upload_size(config.max_upload_size)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Slice Command
// =============================================================================

async fn run_slice(config: SliceConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let slicer = Slicer::new().with_jpeg_quality(config.jpeg_quality);
    let input = config.input.clone();
    let output = config.output.clone();

    let result = tokio::task::spawn_blocking(move || slicer.slice(&input, &output)).await;

    match result {
        Ok(Ok(sliced)) => {
            println!("Sliced {} ({}px faces)", config.input.display(), sliced.face_size);
            for face in &sliced.faces {
                println!("  {}", face.display());
            }
            match &sliced.thumbnail {
                Some(thumbnail) => println!("  {}", thumbnail.display()),
                None => println!("  (thumbnail skipped)"),
            }
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: slice job failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
