//! Locates the face model on disk, downloading it on first use.
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

const APP_DIR: &str = "SpeakerTrack";
const CHUNK_SIZE: usize = 1024 * 1024;

/// Resolve a model file by name: user cache, then `bundled_dir`, then a
/// download from `url` into the cache.
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, bundled_dir, progress)
}

/// Same as [`resolve`] with an explicit cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached = cache_dir.join(name);
    if cached.exists() {
        log::debug!("using cached model {}", cached.display());
        return Ok(cached);
    }

    if let Some(bundled) = bundled_dir.map(|d| d.join(name)).filter(|p| p.exists()) {
        log::debug!("using bundled model {}", bundled.display());
        return Ok(bundled);
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("downloading {name} from {url}");
    download(url, &cached, progress)?;
    Ok(cached)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/SpeakerTrack/models/`
/// - Linux: `$XDG_CACHE_HOME/SpeakerTrack/models/` or `~/.cache/SpeakerTrack/models/`
/// - Windows: `%LOCALAPPDATA%/SpeakerTrack/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` into `<dest>.part` and renames it into place, so `dest`
/// either holds the full model or does not exist.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = fetch_to(url, &temp_path, progress).and_then(|()| {
        fs::rename(&temp_path, dest).map_err(|e| write_error(dest, e))
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn fetch_to(url: &str, path: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(path).map_err(|e| write_error(path, e))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut downloaded: u64 = 0;
    loop {
        let n = response.read(&mut buf).map_err(|e| write_error(path, e))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(|e| write_error(path, e))?;
        downloaded += n as u64;
        if let Some(cb) = &progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(|e| write_error(path, e))
}

fn write_error(path: &Path, source: std::io::Error) -> ModelResolveError {
    ModelResolveError::Write {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BAD_URL: &str = "http://invalid.nonexistent.example.com/model.onnx";

    #[test]
    fn test_resolve_prefers_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("face.onnx"), b"cached").unwrap();
        fs::write(bundled.join("face.onnx"), b"bundled").unwrap();

        let path = resolve_in(&cache, "face.onnx", BAD_URL, Some(&bundled), None).unwrap();

        assert_eq!(path, cache.join("face.onnx"));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("face.onnx"), b"bundled").unwrap();

        let path = resolve_in(&cache, "face.onnx", BAD_URL, Some(&bundled), None).unwrap();

        assert_eq!(path, bundled.join("face.onnx"));
        assert!(!cache.exists());
    }

    #[test]
    fn test_resolve_failed_download_leaves_nothing() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");

        let result = resolve_in(&cache, "face.onnx", BAD_URL, None, None);

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!cache.join("face.onnx").exists());
        assert!(!cache.join("face.part").exists());
    }

    #[test]
    fn test_model_cache_dir_is_app_scoped() {
        let path = model_cache_dir().unwrap();
        assert!(path.ends_with(Path::new(APP_DIR).join("models")));
    }
}
