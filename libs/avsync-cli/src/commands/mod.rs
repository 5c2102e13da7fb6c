// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod probe;
pub mod push;
pub mod remux;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use avsync::MediaBackend;
use serde::de::DeserializeOwned;

/// The backend every command runs on.
#[cfg(feature = "ffmpeg")]
pub fn backend() -> Result<Arc<dyn MediaBackend>> {
    let backend = avsync::FfmpegBackend::new().context("Failed to initialize FFmpeg")?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "ffmpeg"))]
pub fn backend() -> Result<Arc<dyn MediaBackend>> {
    anyhow::bail!("avsync was built without ffmpeg support; rebuild with `--features ffmpeg`")
}

/// Load a session config from TOML, or use its defaults.
pub fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use avsync::{EndPolicy, RemuxConfig};
    use std::io::Write;

    #[test]
    fn test_missing_path_gives_defaults() {
        let config: RemuxConfig = load_config(None).unwrap();
        assert_eq!(config, RemuxConfig::default());
    }

    #[test]
    fn test_loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "end_policy = \"shortest\"\nrepair_dts = false").unwrap();
        let config: RemuxConfig = load_config(Some(file.path())).unwrap();
        assert_eq!(config.end_policy, EndPolicy::Shortest);
        assert!(!config.repair_dts);
    }

    #[test]
    fn test_bad_toml_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "end_policy = 7").unwrap();
        let err = load_config::<RemuxConfig>(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn test_backend_requires_ffmpeg_feature() {
        let err = backend().err().unwrap();
        assert!(err.to_string().contains("without ffmpeg support"));
    }
}
