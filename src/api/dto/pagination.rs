//! Pagination query parameters.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::application::services::ListParams;
use crate::application::services::link_service::{DEFAULT_ITEMS_PER_PAGE, DEFAULT_PAGE};
use crate::domain::repositories::SortOrder;

/// Query string for `GET /urls`: `?page=2&itemsPerPage=20&order=ASC`.
///
/// Uses `serde_with` to parse numbers from query strings as integers.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub items_per_page: Option<u32>,

    #[serde(default)]
    pub order: Option<SortOrder>,
}

impl PaginationParams {
    /// Applies defaults: page 1, 10 items, newest first.
    ///
    /// Range checks happen in [`ListParams::to_query`].
    pub fn into_list_params(self) -> ListParams {
        ListParams {
            page: self.page.unwrap_or(DEFAULT_PAGE),
            items_per_page: self.items_per_page.unwrap_or(DEFAULT_ITEMS_PER_PAGE),
            order: self.order.unwrap_or_default(),
        }
    }
}
