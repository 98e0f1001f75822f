//! Version epoch and partition naming.
//!
//! Every partition name embeds the epoch token:
//! `{prefix}-{role}-v{epoch}` for entries and `{prefix}-{role}-v{epoch}-meta`
//! for the freshness ledger of cache-first roles. Activation keeps only the
//! names owned by the current epoch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffix of the parallel partition holding freshness timestamps.
pub const META_SUFFIX: &str = "-meta";

/// Process-wide token naming the active generation of partitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Epoch(String);

impl Epoch {
    /// Use an explicit token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Resolve the epoch for this run.
    ///
    /// Precedence: configured token, then `FOLIO_BUILD_VERSION` captured at
    /// compile time, then the current UTC timestamp in milliseconds.
    pub fn resolve(configured: Option<&str>) -> Self {
        if let Some(token) = configured.filter(|t| !t.is_empty()) {
            return Self::new(token);
        }
        if let Some(token) = option_env!("FOLIO_BUILD_VERSION").filter(|t| !t.is_empty()) {
            return Self::new(token);
        }
        Self(chrono::Utc::now().timestamp_millis().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic role of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    /// Application shell and same-origin assets.
    Static,
    /// Cross-origin resources (CDN stylesheets, vendor scripts).
    Runtime,
    Images,
    Fonts,
}

impl PartitionRole {
    pub const ALL: [PartitionRole; 4] =
        [PartitionRole::Static, PartitionRole::Runtime, PartitionRole::Images, PartitionRole::Fonts];

    pub fn slug(self) -> &'static str {
        match self {
            PartitionRole::Static => "static",
            PartitionRole::Runtime => "runtime",
            PartitionRole::Images => "images",
            PartitionRole::Fonts => "fonts",
        }
    }

    /// Roles served cache-first keep a freshness ledger.
    pub fn tracks_freshness(self) -> bool {
        matches!(self, PartitionRole::Images | PartitionRole::Fonts)
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Partition names for one prefix and epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    prefix: String,
    epoch: Epoch,
}

impl PartitionNames {
    pub fn new(prefix: impl Into<String>, epoch: Epoch) -> Self {
        Self { prefix: prefix.into(), epoch }
    }

    pub fn epoch(&self) -> &Epoch {
        &self.epoch
    }

    /// Name of the entry partition for `role`.
    pub fn partition(&self, role: PartitionRole) -> String {
        format!("{}-{}-v{}", self.prefix, role.slug(), self.epoch)
    }

    /// Name of the freshness partition paired with `role`.
    pub fn meta(&self, role: PartitionRole) -> String {
        format!("{}{META_SUFFIX}", self.partition(role))
    }

    /// Every partition name the current epoch writes to.
    pub fn all(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(6);
        for role in PartitionRole::ALL {
            names.push(self.partition(role));
            if role.tracks_freshness() {
                names.push(self.meta(role));
            }
        }
        names
    }

    /// Whether `name` belongs to the current epoch.
    ///
    /// The token must close the name (optionally followed by the meta suffix),
    /// so epoch `1` does not claim partitions of epoch `12`.
    pub fn owns(&self, name: &str) -> bool {
        let base = name.strip_suffix(META_SUFFIX).unwrap_or(name);
        base.strip_suffix(self.epoch.as_str())
            .is_some_and(|rest| rest.ends_with("-v"))
    }
}
