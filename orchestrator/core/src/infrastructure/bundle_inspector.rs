// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Bundle Inspector
//!
//! Validates autoloader bundles, packages bundle folders into zip archives
//! and reads the commands a bundle's `PackageContents.xml` declares.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Local filesystem, zip and XML handling for app packages
//! - **Integration:** Bundle folder → scratch archive → ResourceCatalog upload
//!
//! # Scratch files
//!
//! Archives are written to `<scratch_dir>/<bundle name>.zip` and manifests are
//! extracted under `<scratch_dir>/manifests/`. Both are overwritten on every
//! run and carry no durability guarantee.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::domain::bundle::{BundleCommands, BundleHandle, BundleLayout, MANIFEST_FILE_NAME};
use crate::domain::error::OrchestrationError;

#[derive(Debug, Clone)]
pub struct BundleInspector {
    scratch_dir: PathBuf,
}

impl Default for BundleInspector {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl BundleInspector {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Check that `path` is a bundle folder or bundle archive.
    ///
    /// A folder qualifies when `PackageContents.xml` sits at its root; an
    /// archive qualifies when any entry ends with that name.
    pub fn validate_bundle(&self, path: &Path) -> Result<BundleHandle, OrchestrationError> {
        if path.is_dir() {
            if path.join(MANIFEST_FILE_NAME).is_file() {
                return Ok(BundleHandle::new(path.to_path_buf(), BundleLayout::Directory));
            }
        } else if path.is_file() {
            if let Ok(Some(_)) = find_manifest_entry(path) {
                return Ok(BundleHandle::new(path.to_path_buf(), BundleLayout::Archive));
            }
        }

        debug!(path = %path.display(), "Rejected bundle without manifest");
        Err(OrchestrationError::NotABundle(path.to_path_buf()))
    }

    /// Produce an uploadable archive for a validated bundle.
    ///
    /// Folders are zipped to `<scratch_dir>/<folder name>.zip`, replacing any
    /// archive left there by a previous run. The folder itself is the top
    /// level entry of the archive. Archives are returned as they are.
    pub fn package(&self, bundle: &BundleHandle) -> Result<PathBuf, OrchestrationError> {
        match bundle.layout() {
            BundleLayout::Archive => Ok(bundle.path().to_path_buf()),
            BundleLayout::Directory => self
                .zip_directory(bundle)
                .map_err(|e| OrchestrationError::PackagingFailed(format!("{}: {}", bundle.path().display(), e))),
        }
    }

    fn zip_directory(&self, bundle: &BundleHandle) -> Result<PathBuf, PackagingError> {
        fs::create_dir_all(&self.scratch_dir)?;

        let base_name = bundle.name();
        let archive_path = self.scratch_dir.join(format!("{}.zip", base_name));
        if archive_path.exists() {
            fs::remove_file(&archive_path)?;
        }

        let mut writer = ZipWriter::new(File::create(&archive_path)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut file_count = 0usize;

        for entry in WalkDir::new(bundle.path()).sort_by_file_name() {
            let entry = entry?;
            if entry.path() == archive_path {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(bundle.path())
                .map_err(|e| PackagingError::Layout(e.to_string()))?;
            let name = archive_entry_name(&base_name, relative);

            if entry.file_type().is_dir() {
                writer.add_directory(format!("{}/", name), options)?;
            } else if entry.file_type().is_file() {
                writer.start_file(name, options)?;
                let mut source = File::open(entry.path())?;
                io::copy(&mut source, &mut writer)?;
                file_count += 1;
            }
        }

        writer.finish()?;

        info!(
            bundle = %bundle.path().display(),
            archive = %archive_path.display(),
            file_count,
            "Packaged bundle"
        );

        Ok(archive_path)
    }

    /// Read the command names declared in a bundle archive's manifest.
    ///
    /// The manifest is extracted to the scratch directory first.
    pub fn extract_commands(&self, archive_path: &Path) -> Result<BundleCommands, OrchestrationError> {
        if !archive_path.is_file() {
            return Err(OrchestrationError::NotABundle(archive_path.to_path_buf()));
        }

        let manifest_path = self
            .extract_manifest(archive_path)?
            .ok_or_else(|| OrchestrationError::NotABundle(archive_path.to_path_buf()))?;

        let xml = fs::read_to_string(&manifest_path)?;
        let commands = parse_manifest_commands(&xml)?;

        debug!(
            archive = %archive_path.display(),
            local = commands.local_commands.len(),
            global = commands.global_commands.len(),
            "Extracted bundle commands"
        );

        Ok(commands)
    }

    /// Validate, package and read commands in one pass
    pub fn inspect(&self, path: &Path) -> Result<(PathBuf, BundleCommands), OrchestrationError> {
        let handle = self.validate_bundle(path)?;
        let archive = self.package(&handle)?;
        let commands = self.extract_commands(&archive)?;
        Ok((archive, commands))
    }

    fn extract_manifest(&self, archive_path: &Path) -> Result<Option<PathBuf>, OrchestrationError> {
        let packaging = |e: zip::result::ZipError| {
            OrchestrationError::PackagingFailed(format!("{}: {}", archive_path.display(), e))
        };

        let mut archive = ZipArchive::new(File::open(archive_path)?).map_err(packaging)?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(packaging)?;
            if !is_manifest_entry(entry.name()) {
                continue;
            }

            // enclosed_name rejects entries that would escape the scratch dir
            let relative = entry.enclosed_name().ok_or_else(|| {
                OrchestrationError::PackagingFailed(format!("unsafe entry name '{}'", entry.name()))
            })?;
            let destination = self.scratch_dir.join("manifests").join(relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            if destination.exists() {
                fs::remove_file(&destination)?;
            }

            let mut out = File::create(&destination)?;
            io::copy(&mut entry, &mut out)?;
            return Ok(Some(destination));
        }

        Ok(None)
    }
}

/// Collect `Local` and `Global` attributes of every `Command` element, in
/// document order.
pub fn parse_manifest_commands(xml: &str) -> Result<BundleCommands, OrchestrationError> {
    let invalid = |e: String| OrchestrationError::PackagingFailed(format!("invalid {}: {}", MANIFEST_FILE_NAME, e));

    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    let mut commands = BundleCommands::default();

    loop {
        match reader.read_event().map_err(|e| invalid(e.to_string()))? {
            Event::Start(element) | Event::Empty(element) if element.name().as_ref() == b"Command" => {
                for attribute in element.attributes() {
                    let attribute = attribute.map_err(|e| invalid(e.to_string()))?;
                    let target = match attribute.key.as_ref() {
                        b"Local" => &mut commands.local_commands,
                        b"Global" => &mut commands.global_commands,
                        _ => continue,
                    };
                    let value = attribute.unescape_value().map_err(|e| invalid(e.to_string()))?;
                    target.push(value.into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(commands)
}

fn is_manifest_entry(name: &str) -> bool {
    name.rsplit('/')
        .next()
        .is_some_and(|file_name| file_name.eq_ignore_ascii_case(MANIFEST_FILE_NAME))
}

fn find_manifest_entry(archive_path: &Path) -> Result<Option<String>, PackagingError> {
    let archive = ZipArchive::new(File::open(archive_path)?)?;
    let found = archive.file_names().find(|name| is_manifest_entry(name)).map(str::to_string);
    Ok(found)
}

/// Zip entry names always use '/' regardless of platform
fn archive_entry_name(base_name: &str, relative: &Path) -> String {
    let mut name = base_name.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}

#[derive(Debug, thiserror::Error)]
enum PackagingError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error("unexpected layout: {0}")]
    Layout(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ApplicationPackage SchemaVersion="1.0" Name="PlotHelper">
  <Components>
    <ComponentEntry ModuleName="./Contents/PlotHelper.dll">
      <Commands GroupName="PlotHelperGroup">
        <Command Local="CMD1" />
        <Command Global="GCMD1" />
      </Commands>
    </ComponentEntry>
  </Components>
</ApplicationPackage>
"#;

    fn make_bundle(root: &Path, name: &str, manifest: Option<&str>) -> PathBuf {
        let bundle = root.join(name);
        fs::create_dir_all(bundle.join("Contents")).unwrap();
        fs::write(bundle.join("Contents").join("PlotHelper.dll"), b"binary").unwrap();
        if let Some(manifest) = manifest {
            fs::write(bundle.join(MANIFEST_FILE_NAME), manifest).unwrap();
        }
        bundle
    }

    #[test]
    fn test_validate_directory_bundle() {
        let temp = TempDir::new().unwrap();
        let bundle = make_bundle(temp.path(), "PlotHelper.bundle", Some(MANIFEST));
        let inspector = BundleInspector::new(temp.path().join("scratch"));

        let handle = inspector.validate_bundle(&bundle).unwrap();
        assert_eq!(handle.layout(), &BundleLayout::Directory);
        assert_eq!(handle.name(), "PlotHelper.bundle");
    }

    #[test]
    fn test_directory_without_manifest_is_not_a_bundle() {
        let temp = TempDir::new().unwrap();
        let folder = make_bundle(temp.path(), "Plain", None);
        let inspector = BundleInspector::new(temp.path().join("scratch"));

        assert!(matches!(
            inspector.validate_bundle(&folder),
            Err(OrchestrationError::NotABundle(_))
        ));
        assert!(matches!(
            inspector.validate_bundle(&temp.path().join("missing")),
            Err(OrchestrationError::NotABundle(_))
        ));
    }

    #[test]
    fn test_package_includes_base_directory() {
        let temp = TempDir::new().unwrap();
        let bundle = make_bundle(temp.path(), "PlotHelper.bundle", Some(MANIFEST));
        let inspector = BundleInspector::new(temp.path().join("scratch"));

        let handle = inspector.validate_bundle(&bundle).unwrap();
        let archive_path = inspector.package(&handle).unwrap();
        assert_eq!(archive_path, temp.path().join("scratch").join("PlotHelper.bundle.zip"));

        let mut archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut manifest = String::new();
        archive
            .by_name("PlotHelper.bundle/PackageContents.xml")
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        assert_eq!(manifest, MANIFEST);
        assert!(archive.by_name("PlotHelper.bundle/Contents/PlotHelper.dll").is_ok());
    }

    #[test]
    fn test_package_replaces_existing_archive() {
        let temp = TempDir::new().unwrap();
        let bundle = make_bundle(temp.path(), "PlotHelper.bundle", Some(MANIFEST));
        let scratch = temp.path().join("scratch");
        fs::create_dir_all(&scratch).unwrap();
        fs::write(scratch.join("PlotHelper.bundle.zip"), b"stale, not a zip").unwrap();

        let inspector = BundleInspector::new(&scratch);
        let handle = inspector.validate_bundle(&bundle).unwrap();
        let first = inspector.package(&handle).unwrap();
        let second = inspector.package(&handle).unwrap();
        assert_eq!(first, second);

        let archive = ZipArchive::new(File::open(&second).unwrap()).unwrap();
        assert!(archive.file_names().any(|n| n == "PlotHelper.bundle/PackageContents.xml"));
    }

    #[test]
    fn test_archive_bundle_validates_and_packages_to_itself() {
        let temp = TempDir::new().unwrap();
        let bundle = make_bundle(temp.path(), "PlotHelper.bundle", Some(MANIFEST));
        let inspector = BundleInspector::new(temp.path().join("scratch"));
        let archive = inspector.package(&inspector.validate_bundle(&bundle).unwrap()).unwrap();

        let handle = inspector.validate_bundle(&archive).unwrap();
        assert_eq!(handle.layout(), &BundleLayout::Archive);
        assert_eq!(handle.name(), "PlotHelper.bundle");
        assert_eq!(inspector.package(&handle).unwrap(), archive);
    }

    #[test]
    fn test_extract_commands_from_packaged_bundle() {
        let temp = TempDir::new().unwrap();
        let bundle = make_bundle(temp.path(), "PlotHelper.bundle", Some(MANIFEST));
        let inspector = BundleInspector::new(temp.path().join("scratch"));

        let (archive, commands) = inspector.inspect(&bundle).unwrap();
        assert!(archive.exists());
        assert_eq!(commands.local_commands, vec!["CMD1"]);
        assert_eq!(commands.global_commands, vec!["GCMD1"]);
        assert!(temp
            .path()
            .join("scratch/manifests/PlotHelper.bundle/PackageContents.xml")
            .exists());
    }

    #[test]
    fn test_extract_commands_without_manifest() {
        let temp = TempDir::new().unwrap();
        let archive_path = temp.path().join("empty.zip");
        let mut writer = ZipWriter::new(File::create(&archive_path).unwrap());
        writer.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
        io::Write::write_all(&mut writer, b"no manifest here").unwrap();
        writer.finish().unwrap();

        let inspector = BundleInspector::new(temp.path().join("scratch"));
        assert!(matches!(
            inspector.extract_commands(&archive_path),
            Err(OrchestrationError::NotABundle(_))
        ));
        assert!(matches!(
            inspector.validate_bundle(&archive_path),
            Err(OrchestrationError::NotABundle(_))
        ));
    }

    #[test]
    fn test_parse_keeps_order_and_duplicates() {
        let xml = r#"<Commands>
            <Command Global="ZOOMX" Local="zoomx" />
            <Command Local="PLOTALL" Global="PLOTALL" Local2="ignored" />
            <Command Local="zoomx"></Command>
            <Commands Local="NOT_A_COMMAND" />
        </Commands>"#;

        let commands = parse_manifest_commands(xml).unwrap();
        assert_eq!(commands.local_commands, vec!["zoomx", "PLOTALL", "zoomx"]);
        assert_eq!(commands.global_commands, vec!["ZOOMX", "PLOTALL"]);
    }

    #[test]
    fn test_manifest_entry_matches_whole_file_name() {
        assert!(is_manifest_entry("PackageContents.xml"));
        assert!(is_manifest_entry("Helper.bundle/packagecontents.XML"));
        assert!(!is_manifest_entry("NotPackageContents.xml"));
        assert!(!is_manifest_entry("Helper.bundle/MyPackageContents.xml"));
        assert!(!is_manifest_entry("PackageContents.xml/"));
    }

    #[test]
    fn test_parse_rejects_malformed_manifest() {
        let result = parse_manifest_commands("<Commands><Command Local=\"A\"></Commands>");
        assert!(matches!(result, Err(OrchestrationError::PackagingFailed(_))));
    }
}
