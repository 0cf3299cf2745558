use crate::errors::AccessResult;
use crate::services::config::ClientConfig;
use crate::services::deep_link::{ApiEntityFetcher, DeepLink, DeepLinkResolver, EntityFamily};
use crate::services::executor::RequestExecutor;
use crate::services::logger::Logger;
use crate::services::observer::{LoggingObserver, ObserverSet, RequestObserver};
use crate::services::paginator::{ListResponse, PageOptions, Paginator};
use crate::services::rate_limit::{RateLimitInfo, RateLimitTracker};
use crate::services::request::RequestDescriptor;
use crate::utils::query::ListQuery;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entry point for callers: one tenant, one token, one quota view.
#[derive(Clone)]
pub struct LmClient {
    logger: Logger,
    executor: RequestExecutor,
    paginator: Paginator,
    links: DeepLinkResolver,
    fetcher: ApiEntityFetcher,
    page_size: u32,
}

pub struct LmClientBuilder {
    config: ClientConfig,
    logger: Logger,
    observers: ObserverSet,
    log_requests: bool,
    rate_limits: Option<Arc<RateLimitTracker>>,
}

impl LmClientBuilder {
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Skips the default observer that logs every request.
    pub fn without_request_logging(mut self) -> Self {
        self.log_requests = false;
        self
    }

    /// Shares a tracker between clients that spend the same quota.
    pub fn rate_limits(mut self, tracker: Arc<RateLimitTracker>) -> Self {
        self.rate_limits = Some(tracker);
        self
    }

    pub fn build(self) -> AccessResult<LmClient> {
        let mut observers = self.observers;
        if self.log_requests {
            observers.push(Arc::new(LoggingObserver::new(&self.logger)));
        }
        let rate_limits = self
            .rate_limits
            .unwrap_or_else(|| Arc::new(RateLimitTracker::new()));
        let executor = RequestExecutor::new(&self.config, &self.logger, rate_limits, observers)?;
        let paginator = Paginator::new(executor.clone(), &self.logger, self.config.max_items);
        let links = DeepLinkResolver::new(self.config.ui_base_url()?, &self.logger);
        Ok(LmClient {
            logger: self.logger,
            fetcher: ApiEntityFetcher::new(executor.clone()),
            executor,
            paginator,
            links,
            page_size: self.config.page_size,
        })
    }
}

impl LmClient {
    pub fn builder(config: ClientConfig) -> LmClientBuilder {
        LmClientBuilder {
            config,
            logger: Logger::new("lm-access"),
            observers: ObserverSet::new(),
            log_requests: true,
            rate_limits: None,
        }
    }

    pub fn new(config: ClientConfig) -> AccessResult<Self> {
        Self::builder(config).build()
    }

    pub fn from_env() -> AccessResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub async fn request(&self, descriptor: &RequestDescriptor) -> AccessResult<Value> {
        self.executor.execute(descriptor).await
    }

    pub async fn get(&self, path: &str, query: &ListQuery) -> AccessResult<Value> {
        let descriptor = RequestDescriptor::get(path).query_params(query.base_params());
        self.executor.execute(&descriptor).await
    }

    /// One page, honoring the query's `size` and `offset`. Without a `size`
    /// the configured page size is used.
    pub async fn list_page(&self, path: &str, query: &ListQuery) -> AccessResult<ListResponse> {
        self.paginator
            .list_page(path, &query.page_params(self.page_size))
            .await
    }

    /// Every page, starting at the query's offset.
    pub async fn list_all(&self, path: &str, query: &ListQuery) -> AccessResult<ListResponse> {
        let options = PageOptions {
            size: query.size,
            offset: query.offset.unwrap_or(0),
            max_items: None,
            max_pages: None,
        };
        self.paginator
            .list_all(path, &query.base_params(), options)
            .await
    }

    pub async fn deep_link(&self, family: EntityFamily, id: &str) -> AccessResult<DeepLink> {
        self.links.resolve(family, id, &self.fetcher).await
    }

    pub fn rate_limit(&self, bucket: &str) -> Option<RateLimitInfo> {
        self.executor.rate_limits().get(bucket)
    }

    pub fn rate_limits(&self) -> BTreeMap<String, RateLimitInfo> {
        self.executor.rate_limits().snapshot()
    }
}
