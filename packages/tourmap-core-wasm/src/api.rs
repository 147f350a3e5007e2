//! Client for the dashboard REST API.

use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::features::{CollectionOrigin, FeatureCollection};
use crate::http::{with_query, HttpTransport};
use crate::models::{DailyRecap, GeoStory, Page, RecapStats};

/// Filters accepted by `/geostories/`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoryQuery {
    pub page: u32,
    pub search: String,
    pub location_name: String,
    pub author_email: String,
}

impl StoryQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("search", self.search.trim().to_string()),
            ("location_name", self.location_name.clone()),
            ("author_email", self.author_email.clone()),
        ]
    }
}

pub struct ApiClient<T> {
    base_url: String,
    transport: T,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self.transport.get(url).await?.error_for_status()?;
        Ok(response.body)
    }

    async fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Point-of-interest layer.
    pub async fn places_geojson(&self) -> Result<FeatureCollection> {
        let body = self
            .get_text(&self.endpoint("rest_places_coordinates/geojson/"))
            .await?;
        let collection = FeatureCollection::parse(&body, CollectionOrigin::Remote)?;
        info!("GeoJSON data loaded: {} features", collection.len());
        Ok(collection)
    }

    pub async fn daily_recaps(&self) -> Result<Vec<DailyRecap>> {
        let page: Page<serde_json::Value> = self.get_json(&self.endpoint("daily-recaps/")).await?;
        let total = page.results.len();
        let recaps: Vec<DailyRecap> = page
            .results
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value(raw) {
                Ok(recap) => Some(recap),
                Err(e) => {
                    warn!("Skipping daily recap {}: {}", index, e);
                    None
                }
            })
            .collect();
        debug!("Decoded {} of {} daily recaps", recaps.len(), total);
        Ok(recaps)
    }

    pub async fn recap_stats(&self) -> Result<RecapStats> {
        self.get_json(&self.endpoint("daily-recaps/stats/")).await
    }

    pub async fn geostories(&self, query: &StoryQuery) -> Result<Page<GeoStory>> {
        let url = with_query(&self.endpoint("geostories/"), &query.params());
        self.get_json(&url).await
    }
}
