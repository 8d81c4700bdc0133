//! Bounded concurrent execution of request descriptors.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use tracing::warn;

use wfs_common::{FeatureBatch, LoadResult, RequestDescriptor};

use crate::service::FeatureService;

/// Requests in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Runs GetFeature requests with at most `concurrency` in flight.
///
/// Streams end after the first error. Requests still in flight at that point
/// are dropped with the stream.
#[derive(Clone)]
pub struct Fetcher {
    service: Arc<dyn FeatureService>,
    concurrency: usize,
}

impl Fetcher {
    pub fn new(service: Arc<dyn FeatureService>, concurrency: usize) -> Self {
        Self {
            service,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Batches in completion order.
    pub fn fetch(
        &self,
        requests: Vec<RequestDescriptor>,
    ) -> BoxStream<'static, LoadResult<FeatureBatch>> {
        let service = self.service.clone();
        let batches = stream::iter(requests)
            .map(move |request| fetch_one(service.clone(), request))
            .buffer_unordered(self.concurrency);
        stop_on_error(batches).boxed()
    }

    /// Batches in request order, still fetching up to `concurrency` ahead.
    pub fn fetch_ordered(
        &self,
        requests: Vec<RequestDescriptor>,
    ) -> BoxStream<'static, LoadResult<FeatureBatch>> {
        let service = self.service.clone();
        let batches = stream::iter(requests)
            .map(move |request| fetch_one(service.clone(), request))
            .buffered(self.concurrency);
        stop_on_error(batches).boxed()
    }

    /// All batches in request order, or the first error.
    pub async fn fetch_all(&self, requests: Vec<RequestDescriptor>) -> LoadResult<Vec<FeatureBatch>> {
        self.fetch_ordered(requests).try_collect().await
    }
}

async fn fetch_one(
    service: Arc<dyn FeatureService>,
    request: RequestDescriptor,
) -> LoadResult<FeatureBatch> {
    service.get_features(&request).await.map_err(|e| {
        warn!(request = %request, error = %e, "Request failed");
        e
    })
}

// Yield items up to and including the first error, then end.
fn stop_on_error<S>(batches: S) -> impl Stream<Item = LoadResult<FeatureBatch>>
where
    S: Stream<Item = LoadResult<FeatureBatch>>,
{
    batches.scan(false, |failed, item| {
        if *failed {
            return future::ready(None);
        }
        *failed = item.is_err();
        future::ready(Some(item))
    })
}
