//! Configuration management for panocube.
//!
//! Options come from command-line arguments or environment variables with
//! the `PANO_` prefix, with defaults for everything optional.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use panocube::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Slice(config) => println!("Slicing {}", config.input.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `PANO_HOST` - Server bind address (default: 0.0.0.0)
//! - `PANO_PORT` - Server port (default: 8080)
//! - `PANO_UPLOAD_ROOT` - Local working directory (default: ./uploads)
//! - `PANO_S3_BUCKET` - Bucket for artifacts; unset means local-only mode
//! - `PANO_S3_ENDPOINT` - Custom endpoint for S3-compatible services (R2, MinIO)
//! - `PANO_S3_REGION` - Region (default: auto)
//! - `PANO_SLICE_CONCURRENCY` - Items processed at once (default: 2)
//! - `PANO_JPEG_QUALITY` - Face and thumbnail JPEG quality (default: 90)
//! - `PANO_THUMBNAIL_SIZE` - Thumbnail edge in pixels (default: 512)
//! - `PANO_MAGIC_CODE_LENGTH` - Public code length (default: 4)
//! - `PANO_VIEW_COOLDOWN` - Seconds between counted views (default: 300)
//! - `PANO_VIEW_CACHE_CAPACITY` - Tracked viewers (default: 10000)
//! - `PANO_UPLOAD_TIMEOUT` - Per-upload timeout in seconds, 0 disables (default: 0)
//! - `PANO_MAX_UPLOAD_SIZE` - Request body limit in bytes (default: 1 GiB)
//! - `PANO_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::access::{
    DEFAULT_MAGIC_CODE_LENGTH, DEFAULT_VIEW_CACHE_CAPACITY, MAX_MAGIC_CODE_LENGTH,
};
use crate::pipeline::DEFAULT_SLICE_CONCURRENCY;
use crate::slicer::{DEFAULT_JPEG_QUALITY, DEFAULT_THUMBNAIL_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default local working directory.
pub const DEFAULT_UPLOAD_ROOT: &str = "./uploads";

/// Default region. R2 expects `auto`.
pub const DEFAULT_REGION: &str = "auto";

/// Default seconds between two counted views of the same viewer.
pub const DEFAULT_VIEW_COOLDOWN_SECS: u64 = 300;

/// Default request body limit (1 GiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 1024 * 1024 * 1024;

// =============================================================================
// CLI
// =============================================================================

/// panocube - equirectangular panorama to cubemap pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "panocube")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Slice one panorama into cubemap faces on local disk.
    Slice(SliceConfig),
}

// =============================================================================
// Serve
// =============================================================================

/// Server configuration.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PANO_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PANO_PORT")]
    pub port: u16,

    /// Directory where uploads are staged and sliced.
    #[arg(long, default_value = DEFAULT_UPLOAD_ROOT, env = "PANO_UPLOAD_ROOT")]
    pub upload_root: PathBuf,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE, env = "PANO_MAX_UPLOAD_SIZE")]
    pub max_upload_size: usize,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// Bucket receiving originals, faces and thumbnails.
    ///
    /// If not specified, artifacts stay on local disk.
    #[arg(long, env = "PANO_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (R2, MinIO).
    #[arg(long, env = "PANO_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "PANO_S3_REGION")]
    pub s3_region: String,

    /// Per-upload timeout in seconds. 0 disables the timeout.
    #[arg(long, default_value_t = 0, env = "PANO_UPLOAD_TIMEOUT")]
    pub upload_timeout: u64,

    // =========================================================================
    // Processing Configuration
    // =========================================================================
    /// Number of panoramas processed at the same time, across all tours.
    #[arg(long, default_value_t = DEFAULT_SLICE_CONCURRENCY, env = "PANO_SLICE_CONCURRENCY")]
    pub slice_concurrency: usize,

    /// JPEG quality for faces and thumbnails (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "PANO_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Thumbnail edge length in pixels.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_SIZE, env = "PANO_THUMBNAIL_SIZE")]
    pub thumbnail_size: u32,

    // =========================================================================
    // Public Access Configuration
    // =========================================================================
    /// Length of magic codes for public tours.
    #[arg(long, default_value_t = DEFAULT_MAGIC_CODE_LENGTH, env = "PANO_MAGIC_CODE_LENGTH")]
    pub magic_code_length: usize,

    /// Seconds before the same viewer is counted again.
    #[arg(long, default_value_t = DEFAULT_VIEW_COOLDOWN_SECS, env = "PANO_VIEW_COOLDOWN")]
    pub view_cooldown: u64,

    /// Maximum number of tracked (viewer, tour) pairs.
    #[arg(long, default_value_t = DEFAULT_VIEW_CACHE_CAPACITY, env = "PANO_VIEW_CACHE_CAPACITY")]
    pub view_cache_capacity: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "PANO_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(bucket) = &self.s3_bucket {
            if bucket.trim().is_empty() {
                return Err(
                    "S3 bucket name must not be empty. Unset --s3-bucket for local-only mode"
                        .to_string(),
                );
            }
        }

        if self.slice_concurrency == 0 {
            return Err("slice_concurrency must be greater than 0".to_string());
        }
        if self.view_cache_capacity == 0 {
            return Err("view_cache_capacity must be greater than 0".to_string());
        }

        validate_quality(self.jpeg_quality)?;

        if self.thumbnail_size == 0 {
            return Err("thumbnail_size must be greater than 0".to_string());
        }

        if self.magic_code_length == 0 || self.magic_code_length > MAX_MAGIC_CODE_LENGTH {
            return Err(format!(
                "magic_code_length must be between 1 and {}",
                MAX_MAGIC_CODE_LENGTH
            ));
        }

        if self.max_upload_size == 0 {
            return Err("max_upload_size must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Upload timeout, `None` when disabled.
    pub fn upload_timeout(&self) -> Option<Duration> {
        (self.upload_timeout > 0).then(|| Duration::from_secs(self.upload_timeout))
    }

    pub fn view_cooldown(&self) -> Duration {
        Duration::from_secs(self.view_cooldown)
    }
}

// =============================================================================
// Slice
// =============================================================================

/// Offline slicing of a single panorama.
#[derive(Args, Debug, Clone)]
pub struct SliceConfig {
    /// Equirectangular source image.
    pub input: PathBuf,

    /// Directory receiving the six faces. The thumbnail goes to its parent.
    #[arg(short, long, default_value = "cubemap")]
    pub output: PathBuf,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "PANO_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SliceConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_quality(self.jpeg_quality)
    }
}

fn validate_quality(quality: u8) -> Result<(), String> {
    if quality == 0 || quality > 100 {
        return Err("jpeg_quality must be between 1 and 100".to_string());
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
