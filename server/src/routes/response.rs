use serde::Serialize;

use crate::db::{CategoryCount, MunicipalityCount, Stats};
use crate::item::FoundItem;

/// The envelope returned by the OData-compatible listing endpoint.
#[derive(Debug, Serialize)]
pub struct ODataEnvelope {
    #[serde(rename = "odata.context")]
    pub context: String,

    pub value: Vec<FoundItem>,

    /// Only present when the client asked for a count.
    #[serde(rename = "odata.count", skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// A category as returned by the categories listing, shaped for dropdown
/// widgets.
#[derive(Debug, Serialize)]
pub struct CategoryEntry {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(rename = "foundItems")]
    pub found_items: StatusCounts,

    #[serde(rename = "topCategories")]
    pub top_categories: Vec<CategoryCount>,

    #[serde(rename = "topMunicipalities")]
    pub top_municipalities: Vec<MunicipalityCount>,
}

#[derive(Debug, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub available: i64,
    pub claimed: i64,
}

impl From<Stats> for StatsResponse {
    fn from(stats: Stats) -> Self {
        StatsResponse {
            found_items: StatusCounts {
                total: stats.total,
                available: stats.available,
                claimed: stats.claimed,
            },
            top_categories: stats.top_categories,
            top_municipalities: stats.top_municipalities,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Banner {
        message: &'a str,
        version: &'a str,
        status: &'a str,
    },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
}
