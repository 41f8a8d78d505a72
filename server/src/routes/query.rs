use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters accepted by the JSON listing endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub skip: Option<i64>,

    #[serde(default)]
    pub limit: Option<i64>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub municipality: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub search: Option<String>,
}

impl ListingQuery {
    pub fn page(&self) -> (i64, i64) {
        page(self.skip, self.limit)
    }
}

/// Query parameters accepted by the OData-compatible endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ODataQuery {
    #[serde(default, rename = "$skip")]
    pub skip: Option<i64>,

    #[serde(default, rename = "$top")]
    pub top: Option<i64>,

    #[serde(default, rename = "$filter")]
    pub filter: Option<String>,

    /// Accepted for compatibility; field projection is not applied.
    #[serde(default, rename = "$select")]
    pub select: Option<String>,

    #[serde(default, rename = "$orderby")]
    pub orderby: Option<String>,

    #[serde(default, rename = "$count")]
    pub count: bool,
}

impl ODataQuery {
    pub fn page(&self) -> (i64, i64) {
        page(self.skip, self.top)
    }
}

/// Resolves pagination parameters into an offset and a bounded page size.
fn page(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let skip = skip.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1).min(MAX_PAGE_SIZE);

    (skip, limit)
}
