use crate::constants::pagination::MAX_PAGES;
use crate::errors::{AccessError, AccessResult};
use crate::services::executor::RequestExecutor;
use crate::services::logger::Logger;
use crate::services::request::RequestDescriptor;
use crate::utils::query::{page_size, QueryParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body shape shared by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub total: i64,
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_min: Option<bool>,
}

impl ListResponse {
    /// Validates one page. `total` and `items` are mandatory; a page without
    /// them is garbage, not an empty result.
    pub fn from_page(path: &str, page: &Value) -> AccessResult<Self> {
        let total = page
            .get("total")
            .and_then(Value::as_i64)
            .ok_or_else(|| AccessError::response_shape(path, "total"))?;
        let items = page
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| AccessError::response_shape(path, "items"))?;
        Ok(Self {
            total,
            items,
            search_id: page
                .get("searchId")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_min: page.get("isMin").and_then(Value::as_bool),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// Items per request; `None` means the platform maximum.
    pub size: Option<u32>,
    pub offset: u64,
    /// Overrides the client-wide item cap.
    pub max_items: Option<usize>,
    /// Overrides the request-count cap (`MAX_PAGES`).
    pub max_pages: Option<usize>,
}

#[derive(Clone)]
pub struct Paginator {
    logger: Logger,
    executor: RequestExecutor,
    max_items: usize,
}

impl Paginator {
    pub fn new(executor: RequestExecutor, logger: &Logger, max_items: usize) -> Self {
        Self {
            logger: logger.child("paginate"),
            executor,
            max_items,
        }
    }

    /// Fetches a single page as-is.
    pub async fn list_page(&self, path: &str, params: &QueryParams) -> AccessResult<ListResponse> {
        let descriptor = RequestDescriptor::get(path).query_params(params.clone());
        let page = self.executor.execute(&descriptor).await?;
        ListResponse::from_page(path, &page)
    }

    /// Walks a list endpoint page by page and returns every item in server
    /// order. `total` is the value the first page reported.
    ///
    /// Pages are requested one at a time. The walk ends on an empty page or
    /// once the collected items reach `total`; the offset advances by the
    /// number of items actually returned, so short pages are fine. Any failed
    /// page fails the whole call.
    pub async fn list_all(
        &self,
        path: &str,
        base: &QueryParams,
        options: PageOptions,
    ) -> AccessResult<ListResponse> {
        let size = page_size(options.size);
        let cap = options.max_items.unwrap_or(self.max_items);
        let page_cap = options.max_pages.unwrap_or(MAX_PAGES);
        let mut offset = options.offset;
        let mut first: Option<ListResponse> = None;
        let mut items: Vec<Value> = Vec::new();
        let mut pages = 0usize;

        loop {
            if pages >= page_cap {
                self.logger.warn(
                    "Page cap reached",
                    Some(&serde_json::json!({"path": path, "pages": pages, "limit": page_cap})),
                );
                return Err(AccessError::PageLimit {
                    path: path.to_string(),
                    pages,
                    fetched: items.len(),
                    limit: page_cap,
                });
            }
            let mut params = base.clone();
            params.set("size", size).set("offset", offset);
            let page = self.list_page(path, &params).await?;
            pages += 1;

            let returned = page.items.len();
            self.logger.debug(
                "Fetched page",
                Some(&serde_json::json!({
                    "path": path,
                    "offset": offset,
                    "size": size,
                    "returned": returned,
                    "total": page.total,
                })),
            );

            let ListResponse {
                items: page_items,
                total,
                search_id,
                is_min,
            } = page;
            let expected = first
                .get_or_insert_with(|| ListResponse {
                    total,
                    items: Vec::new(),
                    search_id,
                    is_min,
                })
                .total;

            if returned == 0 {
                break;
            }
            items.extend(page_items);
            if items.len() > cap {
                self.logger.warn(
                    "Pagination cap exceeded",
                    Some(&serde_json::json!({"path": path, "fetched": items.len(), "limit": cap})),
                );
                return Err(AccessError::PaginationLimit {
                    path: path.to_string(),
                    fetched: items.len(),
                    limit: cap,
                });
            }
            offset += returned as u64;
            if items.len() as i64 >= expected {
                break;
            }
        }

        let mut result = first.unwrap_or(ListResponse {
            total: 0,
            items: Vec::new(),
            search_id: None,
            is_min: None,
        });
        result.items = items;
        Ok(result)
    }
}
