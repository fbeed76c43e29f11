//! Loads [`super::DeviceDescriptor`]s from an opaque on-disk source (§4.3).
//!
//! The disk format itself isn't prescribed; only the parsed shape is
//! authoritative. `DescriptorSource` is the seam: swap the implementation to
//! change format without touching anything downstream of
//! [`super::DescriptorStore`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

use super::DeviceDescriptor;

pub trait DescriptorSource {
    fn load(&self) -> Result<Vec<DeviceDescriptor>, CoreError>;
}

/// Reads every `*.yaml`/`*.yml` file in a directory as one [`DeviceDescriptor`],
/// mirroring how device hardware definitions ship one-file-per-model in the
/// domain this crate targets.
pub struct YamlDescriptorSource {
    dir: PathBuf,
}

impl YamlDescriptorSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        YamlDescriptorSource { dir: dir.into() }
    }
}

impl DescriptorSource for YamlDescriptorSource {
    fn load(&self) -> Result<Vec<DeviceDescriptor>, CoreError> {
        load_dir(&self.dir)
    }
}

fn load_dir(dir: &Path) -> Result<Vec<DeviceDescriptor>, CoreError> {
    let mut out = Vec::new();
    let entries = fs::read_dir(dir)
        .map_err(|e| CoreError::Config(format!("reading descriptor dir {}: {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::Config(e.to_string()))?;
        let path = entry.path();
        let is_yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"));
        if !is_yaml {
            continue;
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| CoreError::Config(format!("reading {}: {e}", path.display())))?;
        let descriptor: DeviceDescriptor = serde_yaml::from_str(&text)
            .map_err(|e| CoreError::Config(format!("parsing {}: {e}", path.display())))?;
        out.push(descriptor);
    }
    Ok(out)
}

/// A fixed, in-memory source used by tests and by callers who already have
/// descriptors parsed (e.g. compiled-in defaults).
pub struct StaticDescriptorSource(pub Vec<DeviceDescriptor>);

impl DescriptorSource for StaticDescriptorSource {
    fn load(&self) -> Result<Vec<DeviceDescriptor>, CoreError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_every_yaml_file_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("blackwidow.yaml")).unwrap();
        write!(
            f,
            r#"
name: "BlackWidow V4"
kind: keyboard
vendor_id: 0x1532
product_id: 0x0293
dimensions: {{ rows: 6, cols: 22 }}
supported_leds: [5]
supported_effects: ["static", "wave"]
capabilities: [key_input]
protocol_profile: legacy
"#
        )
        .unwrap();

        let source = YamlDescriptorSource::new(dir.path());
        let descriptors = source.load().unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].vendor_id, 0x1532);
    }

    #[test]
    fn ignores_non_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "not a descriptor").unwrap();
        let source = YamlDescriptorSource::new(dir.path());
        assert!(source.load().unwrap().is_empty());
    }
}
