//! Hotplug ignore list
//!
//! Plain text, one `vendor:product` id per line. Blank lines and `#`
//! comments are skipped.

use common::Result;
use hostdev::UsbId;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    ids: HashSet<UsbId>,
}

impl IgnoreList {
    /// Read the list at `path`; a missing file is an empty list
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No ignore list at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let list = Self::parse(&content);
        debug!("Loaded {} ignored id(s) from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn parse(content: &str) -> Self {
        let mut ids = HashSet::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.parse::<UsbId>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => warn!("Ignore list line {}: {}", number + 1, e),
            }
        }

        Self { ids }
    }

    pub fn contains(&self, id: &UsbId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
