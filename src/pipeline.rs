use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::ai::{self, ContentModel, Generated, GeminiService, ImageData, Mode};
use crate::config::Config;
use crate::executor::{self, ExecuteError};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "heic", "heif"];

/// MIME type for the image, sniffed from its leading bytes.
///
/// Formats the sniffer does not know (HEIC/HEIF) fall back to the extension.
///
/// # Example
///
/// ```rust
/// use stock_meta_ai::pipeline::mime_type;
/// use std::path::Path;
///
/// let png_magic = b"\x89PNG\r\n\x1a\n";
/// assert_eq!(mime_type(Path::new("no_extension"), png_magic), "image/png");
/// assert_eq!(mime_type(Path::new("photo.heic"), b"...."), "image/heic");
/// ```
pub fn mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type();
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "image/jpeg",
    }
}

/// The result of processing a single image.
#[derive(Debug)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub mode: Mode,
    pub result: Option<Generated>,
    pub error: Option<String>,
    /// Number of retries reported while processing this image.
    pub retries: usize,
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with supported image extensions
/// are included.
///
/// # Example
///
/// ```rust,no_run
/// use stock_meta_ai::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("photo.jpg"),       // single file
///     PathBuf::from("./uploads/"),      // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_supported_image(p))
                .collect();
            found.sort();
            images.extend(found);
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read an image file and encode it for the model.
pub fn load_image(path: &Path) -> Result<ImageData> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let mime = mime_type(path, &bytes);
    Ok(ImageData::from_bytes(&bytes, mime))
}

/// Build the Gemini backend from configuration.
///
/// Fails when no API key is configured.
pub fn build_model(config: &Config) -> Result<GeminiService> {
    if config.gemini.api_key.is_empty() {
        anyhow::bail!(
            "No Gemini API key configured. Set gemini.api_key in the config file or {}.",
            crate::config::API_KEY_ENV
        );
    }
    Ok(GeminiService::with_base_url(
        config.gemini.api_key.clone(),
        config.gemini.base_url.clone(),
    ))
}

/// Generate metadata or a caption for one image file.
///
/// Reads and encodes the file, builds the prompt from `config.settings` and
/// runs the request executor with the configured retry policy. `on_retry`
/// receives each backoff delay. Errors are recorded in the returned
/// [`ProcessResult`] rather than propagated.
///
/// # Example
///
/// ```rust,no_run
/// use stock_meta_ai::ai::Mode;
/// use stock_meta_ai::config::Config;
/// use stock_meta_ai::pipeline::{build_model, process_image};
/// use tokio_util::sync::CancellationToken;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(Some("config.json".as_ref()))?;
/// let model = build_model(&config)?;
///
/// let result = process_image(
///     Path::new("bike.jpg"),
///     &model,
///     &config,
///     Mode::Metadata,
///     &CancellationToken::new(),
///     |delay| println!("retrying in {delay:?}"),
/// )
/// .await;
/// if let Some(ref generated) = result.result {
///     println!("Description: {}", generated.description());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn process_image<F>(
    path: &Path,
    model: &dyn ContentModel,
    config: &Config,
    mode: Mode,
    cancel: &CancellationToken,
    mut on_retry: F,
) -> ProcessResult
where
    F: FnMut(Duration),
{
    let mut result = ProcessResult {
        path: path.to_path_buf(),
        mode,
        result: None,
        error: None,
        retries: 0,
    };

    let image = match load_image(path) {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!("{e:#}");
            None
        }
    };

    let prompt = ai::build_prompt(&config.settings, mode);
    log::debug!("Prompt for {}:\n{prompt}", path.display());

    let mut retries = 0;
    let outcome = executor::execute_with(
        model,
        &config.gemini.model,
        &prompt,
        image.as_ref(),
        &config.settings,
        mode,
        &config.retry.policy(),
        cancel,
        |delay| {
            retries += 1;
            on_retry(delay);
        },
    )
    .await;
    result.retries = retries;

    match outcome {
        Ok(generated) => result.result = Some(generated),
        Err(ExecuteError::MissingInput) => {
            result.error = Some(format!("Failed to read image: {}", path.display()));
        }
        Err(e) => result.error = Some(e.to_string()),
    }

    result
}
