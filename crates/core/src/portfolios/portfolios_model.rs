//! Uploaded portfolio wire format.
//!
//! Exported portfolio files use capitalized field names and carry share
//! counts as strings; these types mirror that format exactly so an
//! exported file round-trips untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `Asset` block of one uploaded holding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedAsset {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// One uploaded holding entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedHolding {
    #[serde(rename = "Asset")]
    pub asset: UploadedAsset,
    /// Share count as exported: a decimal string.
    #[serde(rename = "Total Shares")]
    pub total_shares: String,
}

/// One uploaded portfolio file.
///
/// `Holdings` is keyed by an export-internal id; only the values matter
/// here. A `BTreeMap` keeps iteration order deterministic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedPortfolio {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Holdings")]
    pub holdings: BTreeMap<String, UploadedHolding>,
}
