//! Build-manifest tag loading.
//!
//! The build tag is the version corral was released with; images the
//! project publishes are tagged with it. Read once per invocation.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Tag used when no manifest is readable.
pub const FALLBACK_TAG: &str = "latest";

#[derive(Debug, Deserialize)]
struct BuildManifest {
    version: String,
}

/// Read the build tag from a JSON manifest, falling back to `latest`.
///
/// An unreadable or malformed manifest is not an error; the fallback chain
/// in the image resolver handles a missing tagged image anyway.
pub fn build_tag(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<BuildManifest>(&raw) {
            Ok(manifest) if !manifest.version.trim().is_empty() => {
                manifest.version.trim().to_string()
            }
            Ok(_) => FALLBACK_TAG.to_string(),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Malformed build manifest");
                FALLBACK_TAG.to_string()
            }
        },
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No build manifest");
            FALLBACK_TAG.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_version_from_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"version": "0.4.2"}}"#).unwrap();
        assert_eq!(build_tag(file.path()), "0.4.2");
    }

    #[test]
    fn missing_manifest_falls_back_to_latest() {
        assert_eq!(build_tag(Path::new("/nonexistent/manifest.json")), "latest");
    }

    #[test]
    fn malformed_manifest_falls_back_to_latest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert_eq!(build_tag(file.path()), "latest");
    }

    #[test]
    fn empty_version_falls_back_to_latest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"version": "  "}}"#).unwrap();
        assert_eq!(build_tag(file.path()), "latest");
    }
}
