//! Immutable, versioned view of the configuration tree.
//!
//! Name and version are read from the tree itself (see
//! [`NAME_OPTION`](crate::constants::NAME_OPTION) and
//! [`VERSION_OPTION`](crate::constants::VERSION_OPTION)), which keeps
//! compressed buffers and backups self-describing.

use crate::compress::compress;
use crate::compress::decompress_to_string;
use crate::constants::NAME_OPTION;
use crate::constants::UNINITIALIZED_VERSION;
use crate::constants::VERSION_OPTION;
use crate::tree::ConfigTree;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    tree: ConfigTree,
    version: String,
    name: String,
}

impl ConfigSnapshot {
    pub fn new(tree: ConfigTree) -> Self {
        let version = tree.get_option(VERSION_OPTION).unwrap_or(UNINITIALIZED_VERSION).to_string();
        let name = tree.get_option(NAME_OPTION).unwrap_or_default().to_string();
        Self { tree, version, name }
    }

    /// Uninitialized snapshot carrying only the configuration name
    pub fn empty(name: &str) -> Result<Self> {
        let mut tree = ConfigTree::new();
        tree.set_option(NAME_OPTION, name)?;
        Ok(Self::new(tree))
    }

    /// Rewrites the version option of `tree`.
    pub fn with_version(
        mut tree: ConfigTree,
        version: &str,
    ) -> Result<Self> {
        tree.set_option(VERSION_OPTION, version)?;
        Ok(Self::new(tree))
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn into_tree(self) -> ConfigTree {
        self.tree
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.version != UNINITIALIZED_VERSION
    }

    pub fn compressed(&self) -> Result<Vec<u8>> {
        compress(self.tree.serialize().as_bytes())
    }

    /// Inflates and parses a buffer produced by [`ConfigSnapshot::compressed`].
    pub fn from_compressed(buf: &[u8]) -> Result<Self> {
        let text = decompress_to_string(buf)?;
        Ok(Self::new(ConfigTree::parse(&text)?))
    }
}
