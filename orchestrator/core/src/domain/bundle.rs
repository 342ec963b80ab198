// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::path::{Path, PathBuf};

/// Manifest file every bundle must carry
pub const MANIFEST_FILE_NAME: &str = "PackageContents.xml";

/// How a validated bundle is laid out on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleLayout {
    /// A bundle folder with the manifest at its root
    Directory,
    /// A zip archive with the manifest somewhere inside
    Archive,
}

/// A path that passed bundle validation.
///
/// Only `BundleInspector::validate_bundle` constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleHandle {
    path: PathBuf,
    layout: BundleLayout,
}

impl BundleHandle {
    pub(crate) fn new(path: PathBuf, layout: BundleLayout) -> Self {
        Self { path, layout }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &BundleLayout {
        &self.layout
    }

    /// Bundle name: the folder name, or the archive name without extension
    pub fn name(&self) -> String {
        let name = match self.layout {
            BundleLayout::Directory => self.path.file_name(),
            BundleLayout::Archive => self.path.file_stem(),
        };
        name.map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle".to_string())
    }
}

/// Commands a bundle's manifest declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleCommands {
    pub local_commands: Vec<String>,
    pub global_commands: Vec<String>,
}
