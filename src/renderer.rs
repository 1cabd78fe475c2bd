//! # Report Renderer Seam
//!
//! The engine treats artifact production as an opaque external call that
//! may be slow and may fail transiently. Implementations receive the work
//! item plus a [`RenderLayout`] describing the page geometry and content
//! range, and return the rendered bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::WorkItem;

/// Page size for the rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    A4,
    Letter,
    Legal,
}

/// Page orientation for the rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Rectangular content range within the source view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRange {
    pub start_row: u32,
    pub end_row: u32,
    pub start_col: u32,
    pub end_col: u32,
}

/// Layout parameters handed to the renderer for every item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderLayout {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margin_inches: f32,
    pub fit_width: bool,
    pub fit_height: bool,
    pub range: ContentRange,
    /// Identifier of the sheet or view the range is read from.
    pub sheet_id: String,
}

impl Default for RenderLayout {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_inches: 0.5,
            fit_width: true,
            fit_height: false,
            range: ContentRange {
                start_row: 1,
                end_row: 40,
                start_col: 1,
                end_col: 8,
            },
            sheet_id: String::new(),
        }
    }
}

impl RenderLayout {
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_margin_inches(mut self, margin_inches: f32) -> Self {
        self.margin_inches = margin_inches;
        self
    }

    pub fn with_range(mut self, range: ContentRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_sheet_id(mut self, sheet_id: impl Into<String>) -> Self {
        self.sheet_id = sheet_id.into();
        self
    }
}

/// Errors surfaced by a renderer implementation.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer rejected this item outright.
    #[error("renderer rejected item {item_id}: {reason}")]
    Rejected { item_id: String, reason: String },

    /// Transient failure (quota, timeout); a later re-run may succeed.
    #[error("transient render failure: {0}")]
    Transient(String),
}

/// External collaborator producing the binary artifact for one item.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(
        &self,
        item: &WorkItem,
        layout: &RenderLayout,
    ) -> std::result::Result<Vec<u8>, RenderError>;
}
