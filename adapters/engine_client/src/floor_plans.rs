//! Shared floor-plan library API.

use async_trait::async_trait;
use evacsim_core::Grid;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Floor plan as listed or fetched from the library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlanRecord {
    /// Library identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Small preview as a data URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Name of the uploader.
    #[serde(default)]
    pub uploader_name: String,
    /// Visible to everyone.
    #[serde(default)]
    pub is_public: bool,
    /// Owner.
    #[serde(default)]
    pub user_id: u64,
    /// Source plan when this one is a clone.
    #[serde(default)]
    pub cloned_from_id: Option<u64>,
    /// Grid columns.
    #[serde(default)]
    pub grid_width: u32,
    /// Grid rows.
    #[serde(default)]
    pub grid_height: u32,
    /// Exits saved with the plan.
    #[serde(default)]
    pub exit_count: u32,
    /// How the grid was produced.
    #[serde(default)]
    pub processing_method: String,
    /// Creation timestamp as sent by the server.
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: String,
    /// Whether the caller owns the plan.
    #[serde(default)]
    pub is_owner: bool,
    /// Whether the caller may edit the plan.
    #[serde(default)]
    pub can_edit: bool,
    /// Grid payload; only returned when fetching a single plan.
    #[serde(default)]
    pub grid_data: Option<serde_json::Value>,
    /// Number of clones; only returned when fetching a single plan.
    #[serde(default)]
    pub clone_count: Option<u32>,
}

impl FloorPlanRecord {
    /// Parses the stored grid, if any.
    pub fn grid(&self) -> Result<Option<Grid>, ServiceError> {
        self.grid_data
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|error| ServiceError::InvalidResponse(format!("invalid grid data: {error}")))
    }
}

/// Short description returned by create and clone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlanSummary {
    /// Library identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Source plan when this one is a clone.
    #[serde(default)]
    pub cloned_from_id: Option<u64>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: String,
}

/// Which plans to list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListFilter {
    /// Public plans and the caller's own.
    #[default]
    All,
    /// Only the caller's plans.
    Mine,
    /// Only public plans.
    Public,
}

impl ListFilter {
    /// Query string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Mine => "mine",
            Self::Public => "public",
        }
    }
}

/// Parameters of a library listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    /// Ownership filter.
    pub filter: ListFilter,
    /// Case-insensitive search over name, description and uploader.
    pub search: Option<String>,
    /// 1-based page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: ListFilter::All,
            search: None,
            page: 1,
            limit: 20,
        }
    }
}

impl ListQuery {
    /// Query string pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("filter", self.filter.as_str().to_owned()),
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|search| !search.is_empty()) {
            pairs.push(("search", search.to_owned()));
        }
        pairs
    }
}

/// Paging information of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Matching plans.
    pub total: u32,
    /// Pages available.
    pub total_pages: u32,
}

/// One page of a listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlanPage {
    /// Plans on this page, newest first.
    pub floor_plans: Vec<FloorPlanRecord>,
    /// Paging information.
    pub pagination: Pagination,
}

/// Body of a create request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFloorPlan {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Processed grid.
    pub grid_data: Grid,
    /// Small preview as a data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Source image as a data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    /// Visible to everyone.
    pub is_public: bool,
    /// Exits placed when saving.
    pub exit_count: u32,
    /// How the grid was produced, such as `unet` or `builder`.
    pub processing_method: String,
}

/// Partial update; absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlanUpdate {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_data: Option<Grid>,
    /// New preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// New source image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    /// New visibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// New exit count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_count: Option<u32>,
}

/// Floor-plan library operations. Authorization is enforced by the server.
#[async_trait]
pub trait FloorPlanRepository: Send + Sync {
    /// Lists plans matching the query.
    async fn list(&self, query: &ListQuery) -> Result<FloorPlanPage, ServiceError>;

    /// Fetches one plan including its grid.
    async fn get(&self, id: u64) -> Result<FloorPlanRecord, ServiceError>;

    /// Saves a new plan owned by the caller.
    async fn create(&self, plan: &NewFloorPlan) -> Result<FloorPlanSummary, ServiceError>;

    /// Updates a plan owned by the caller.
    async fn update(
        &self,
        id: u64,
        update: &FloorPlanUpdate,
    ) -> Result<FloorPlanRecord, ServiceError>;

    /// Deletes a plan owned by the caller.
    async fn delete(&self, id: u64) -> Result<(), ServiceError>;

    /// Copies a public or owned plan; the server picks a name when `None`.
    async fn clone_plan(
        &self,
        id: u64,
        name: Option<&str>,
    ) -> Result<FloorPlanSummary, ServiceError>;
}
