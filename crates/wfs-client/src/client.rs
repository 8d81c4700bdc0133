//! HTTP implementation of [`FeatureService`] against a GeoServer WFS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument};

use wfs_common::{
    DatasetIdentifier, FeatureBatch, FeatureTypeSchema, LoadError, LoadResult, RequestDescriptor,
};

use crate::parse::{
    parse_feature_collection, parse_feature_type_names, parse_feature_type_schema,
    parse_number_matched,
};
use crate::service::FeatureService;

/// DataBC's public WFS endpoint.
pub const DEFAULT_WFS_URL: &str = "https://openmaps.gov.bc.ca/geo/pub/wfs";

/// Configuration for the WFS client.
#[derive(Debug, Clone)]
pub struct WfsConfig {
    /// Base URL requests are sent to
    pub base_url: String,
    /// Whole-request timeout, covering a full page download
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for WfsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WFS_URL.to_string(),
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// WFS 2.0.0 client.
pub struct WfsClient {
    client: Client,
    config: WfsConfig,
}

impl WfsClient {
    pub fn new(config: WfsConfig) -> LoadResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| LoadError::upstream(config.base_url.clone(), None, e))?;

        Ok(Self { client, config })
    }

    /// GET the base URL with `params`, returning the body of a 2xx response.
    ///
    /// Transport failures and timeouts become `Upstream` errors labelled with
    /// `request`, as do non-success statuses.
    async fn get_text(&self, params: &[(&str, String)], request: &str) -> LoadResult<String> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| LoadError::upstream(request, e.status().map(|s| s.as_u16()), e))?;

        debug!(url = %response.url(), "WFS request sent");

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::upstream(
                request,
                Some(status.as_u16()),
                format!("HTTP error: {}", status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| LoadError::upstream(request, Some(status.as_u16()), e))
    }
}

#[async_trait]
impl FeatureService for WfsClient {
    #[instrument(skip(self), fields(url = %self.config.base_url))]
    async fn list_feature_types(&self) -> LoadResult<Vec<String>> {
        let params = [
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "GetCapabilities".to_string()),
        ];
        let body = self.get_text(&params, "GetCapabilities").await?;
        let names = parse_feature_type_names(&body)?;
        info!(count = names.len(), "Listed feature types");
        Ok(names)
    }

    #[instrument(skip(self), fields(dataset = %dataset))]
    async fn hits(&self, dataset: &DatasetIdentifier, filter: Option<&str>) -> LoadResult<u64> {
        let mut params = vec![
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", dataset.type_name()),
            ("resultType", "hits".to_string()),
            ("outputFormat", "json".to_string()),
        ];
        if let Some(filter) = filter {
            params.push(("CQL_FILTER", filter.to_string()));
        }

        let label = format!("{} resultType=hits", dataset);
        let body = self.get_text(&params, &label).await?;
        parse_number_matched(&body, &label)
    }

    #[instrument(skip(self), fields(dataset = %dataset))]
    async fn describe(&self, dataset: &DatasetIdentifier) -> LoadResult<FeatureTypeSchema> {
        let params = [
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "DescribeFeatureType".to_string()),
            ("typeName", dataset.type_name()),
            ("outputFormat", "application/json".to_string()),
        ];
        let label = format!("{} DescribeFeatureType", dataset);
        let body = self.get_text(&params, &label).await?;
        parse_feature_type_schema(&body, &label)
    }

    #[instrument(skip(self), fields(request = %request))]
    async fn get_features(&self, request: &RequestDescriptor) -> LoadResult<FeatureBatch> {
        let label = request.to_string();
        let body = self.get_text(&request.query_params(), &label).await?;
        let features = parse_feature_collection(&body, &label)?;
        info!(features = features.len(), "Fetched page");
        Ok(FeatureBatch::new(request.clone(), features))
    }
}
