use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub display_order: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub display_order: i64,
}

#[derive(Debug, Deserialize)]
pub struct CategoryUpdateAll {
    pub updates: Vec<CategoryUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub description: String,
    pub tags: String,
    pub group_id: Option<i64>,
    pub visit_count: i64,
    pub display_order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Body of site create and replace requests
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInput {
    #[serde(default)]
    pub category_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub group_id: Option<i64>,
}

impl SiteInput {
    pub fn is_complete(&self) -> bool {
        self.category_id > 0 && !self.name.trim().is_empty() && !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SiteGroup {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub display_order: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewSiteGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub ordered_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteOrderRequest {
    #[serde(default)]
    pub category_id: i64,
    pub ordered_ids: Vec<i64>,
}
