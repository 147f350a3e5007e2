//! Geostory browser: search, filters, pagination and the story grid.

use chrono::{DateTime, NaiveDate};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, StoryQuery};
use crate::config::StoryBrowserConfig;
use crate::debounce::Debouncer;
use crate::error::{DashboardError, Result};
use crate::http::HttpTransport;
use crate::models::{GeoStory, Page};
use crate::pagination::{page_numbers, PageItem, Pagination};
use crate::remote::{LoadState, RemoteResource, RequestTicket};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    Location,
    Author,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StoryFilters {
    pub location: String,
    pub author: String,
}

impl StoryFilters {
    fn is_empty(&self) -> bool {
        self.location.is_empty() && self.author.is_empty()
    }
}

/// What one story card shows.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryCard {
    pub id: serde_json::Value,
    pub title: String,
    pub author_email: String,
    pub location_name: Option<String>,
    pub date: String,
    pub thumbnail_url: Option<String>,
    pub pdf_url: Option<String>,
}

impl From<&GeoStory> for StoryCard {
    fn from(story: &GeoStory) -> Self {
        Self {
            id: story.id.clone(),
            title: story.title.clone(),
            author_email: story.author_email.clone(),
            location_name: story.location_name.clone().filter(|s| !s.is_empty()),
            date: format_story_date(story.created_at.as_deref()),
            thumbnail_url: story.thumbnail_url.clone().filter(|s| !s.is_empty()),
            pdf_url: story.pdf_url.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Main area of the page.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum StoryOutcome {
    Loading,
    #[serde(rename_all = "camelCase")]
    Error { title: &'static str, message: String },
    #[serde(rename_all = "camelCase")]
    Empty {
        title: &'static str,
        message: &'static str,
        can_clear: bool,
    },
    #[serde(rename_all = "camelCase")]
    Stories {
        view_mode: ViewMode,
        cards: Vec<StoryCard>,
        pages: Vec<PageItem>,
        current_page: u32,
        has_prev: bool,
        has_next: bool,
    },
}

/// Full page state handed to JS.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryBrowserView {
    pub search_term: String,
    pub filters: StoryFilters,
    pub filter_open: bool,
    pub view_mode: ViewMode,
    pub loading: bool,
    pub summary: String,
    pub outcome: StoryOutcome,
}

/// `Mon D, YYYY`, or "Invalid date".
pub fn format_story_date(value: Option<&str>) -> String {
    const OUT: &str = "%b %-d, %Y";
    let Some(s) = value else {
        return "Invalid date".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.format(OUT).to_string();
    }
    match NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d") {
        Ok(d) => d.format(OUT).to_string(),
        Err(_) => "Invalid date".to_string(),
    }
}

/// Message for a failed story fetch.
pub fn fetch_error_message(err: &DashboardError, api_base_url: &str) -> String {
    let mut message = String::from("Failed to fetch stories.");
    match err {
        e if e.is_network() => {
            let server = api_base_url.trim_end_matches('/').trim_end_matches("/api");
            message.push_str(&format!(
                " Please check if the Django server is running on {}",
                server
            ));
        }
        DashboardError::HttpStatus(500) => message.push_str(" Server error occurred."),
        DashboardError::HttpStatus(404) => message.push_str(" API endpoint not found."),
        _ => {}
    }
    message
}

pub struct StoryBrowser {
    config: StoryBrowserConfig,
    search_term: String,
    debounced_term: String,
    filters: StoryFilters,
    page: u32,
    pagination: Pagination,
    view_mode: ViewMode,
    filter_open: bool,
    stories: RemoteResource<Vec<GeoStory>>,
    debouncer: Debouncer<String>,
}

impl StoryBrowser {
    pub fn new(config: StoryBrowserConfig) -> Self {
        let debouncer = Debouncer::new(config.debounce_ms);
        Self {
            config,
            search_term: String::new(),
            debounced_term: String::new(),
            filters: StoryFilters::default(),
            page: 1,
            pagination: Pagination::default(),
            view_mode: ViewMode::default(),
            filter_open: false,
            stories: RemoteResource::new(),
            debouncer,
        }
    }

    pub fn config(&self) -> &StoryBrowserConfig {
        &self.config
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn filters(&self) -> &StoryFilters {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn filter_open(&self) -> bool {
        self.filter_open
    }

    pub fn toggle_filter_panel(&mut self) -> bool {
        self.filter_open = !self.filter_open;
        self.filter_open
    }

    pub fn is_loading(&self) -> bool {
        self.stories.is_loading()
    }

    pub fn stories(&self) -> &[GeoStory] {
        self.stories.value().map(Vec::as_slice).unwrap_or_default()
    }

    /// Stories are requested only once typing has settled.
    pub fn should_fetch(&self) -> bool {
        self.debounced_term == self.search_term
    }

    fn has_criteria(&self) -> bool {
        !self.search_term.is_empty() || !self.filters.is_empty()
    }

    /// Typing in the search box. Returns the delay to wait before calling
    /// [`debounce_elapsed`](Self::debounce_elapsed).
    pub fn set_search(&mut self, term: &str, now: f64) -> u32 {
        self.search_term = term.to_string();
        self.page = 1;
        self.debouncer.schedule(self.search_term.clone(), now);
        self.debouncer.delay_ms()
    }

    /// Timer callback. Returns `true` when a fetch should run.
    pub fn debounce_elapsed(&mut self, now: f64) -> bool {
        match self.debouncer.poll(now) {
            Some(term) => {
                self.debounced_term = term;
                self.should_fetch()
            }
            None => false,
        }
    }

    /// Returns `true` when a fetch should run.
    pub fn set_filter(&mut self, field: FilterField, value: &str) -> bool {
        match field {
            FilterField::Location => self.filters.location = value.to_string(),
            FilterField::Author => self.filters.author = value.to_string(),
        }
        self.page = 1;
        self.should_fetch()
    }

    /// Search, filters and page go back to their initial values together;
    /// the caller fetches right away.
    pub fn clear_filters(&mut self) {
        self.debouncer.cancel();
        self.search_term.clear();
        self.debounced_term.clear();
        self.filters = StoryFilters::default();
        self.page = 1;
    }

    /// Returns `true` when the page changed and a fetch should run.
    pub fn set_page(&mut self, page: u32) -> bool {
        let page = page.clamp(1, self.pagination.total_pages.max(1));
        if page == self.page {
            return false;
        }
        self.page = page;
        self.should_fetch()
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.pagination.prev_page(self.page))
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.pagination.next_page(self.page))
    }

    pub fn query(&self) -> StoryQuery {
        StoryQuery {
            page: self.page,
            search: self.debounced_term.trim().to_string(),
            location_name: self.filters.location.clone(),
            author_email: self.filters.author.clone(),
        }
    }

    pub fn begin_fetch(&mut self) -> (RequestTicket, StoryQuery) {
        (self.stories.begin(), self.query())
    }

    /// Apply a response. Responses to superseded requests are ignored.
    pub fn finish_fetch(&mut self, ticket: RequestTicket, result: Result<Page<GeoStory>>) -> bool {
        match result {
            Ok(page) => {
                let total_pages = page.total_pages(self.config.page_size);
                let Page {
                    results,
                    count,
                    next,
                    previous,
                } = page;
                if !self.stories.finish(ticket, Ok(results)) {
                    return false;
                }
                debug!("Loaded {} stories ({} total)", self.stories().len(), count);
                self.pagination = Pagination {
                    count,
                    next,
                    previous,
                    total_pages,
                };
                true
            }
            Err(e) => {
                let base = self.config.api_base_url.clone();
                let applied = self
                    .stories
                    .finish_with(ticket, Err(e), |e| fetch_error_message(e, &base));
                if applied {
                    error!("Error fetching stories: {}", self.stories.error().unwrap_or_default());
                    self.pagination = Pagination::default();
                }
                applied
            }
        }
    }

    /// Run one fetch to completion.
    pub async fn fetch<T: HttpTransport>(&mut self, client: &ApiClient<T>) -> bool {
        let (ticket, query) = self.begin_fetch();
        let result = client.geostories(&query).await;
        self.finish_fetch(ticket, result)
    }

    pub fn outcome(&self) -> StoryOutcome {
        match self.stories.state() {
            LoadState::Idle | LoadState::Loading => StoryOutcome::Loading,
            LoadState::Error(message) => StoryOutcome::Error {
                title: "No Stories found",
                message: message.clone(),
            },
            LoadState::Loaded(stories) if stories.is_empty() => {
                let can_clear = self.has_criteria();
                StoryOutcome::Empty {
                    title: "No stories found",
                    message: if can_clear {
                        "Try adjusting your search criteria or filters"
                    } else {
                        "No stories have been uploaded yet"
                    },
                    can_clear,
                }
            }
            LoadState::Loaded(stories) => StoryOutcome::Stories {
                view_mode: self.view_mode,
                cards: stories.iter().map(StoryCard::from).collect(),
                pages: if self.pagination.is_visible() {
                    page_numbers(self.page, self.pagination.total_pages)
                } else {
                    Vec::new()
                },
                current_page: self.page,
                has_prev: self.pagination.has_prev(self.page),
                has_next: self.pagination.has_next(self.page),
            },
        }
    }

    pub fn view(&self) -> StoryBrowserView {
        StoryBrowserView {
            search_term: self.search_term.clone(),
            filters: self.filters.clone(),
            filter_open: self.filter_open,
            view_mode: self.view_mode,
            loading: self.is_loading(),
            summary: self.summary(),
            outcome: self.outcome(),
        }
    }

    /// "N Resources found" above the grid.
    pub fn summary(&self) -> String {
        if self.pagination.count > 0 {
            format!("{} Resources found", self.pagination.count)
        } else {
            "No resources found".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockTransport;
    use futures::executor::block_on;

    const BASE: &str = "http://localhost:8000/api";

    fn browser() -> StoryBrowser {
        StoryBrowser::new(StoryBrowserConfig::default())
    }

    fn story(id: u32, title: &str) -> GeoStory {
        GeoStory {
            id: id.into(),
            title: title.to_string(),
            author_email: "rider@wheelsforclimate.org".to_string(),
            created_at: Some("2025-07-14T08:30:00Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_response_is_empty_state() {
        let client = ApiClient::new(
            BASE,
            MockTransport::default().with(
                "http://localhost:8000/api/geostories/?page=1",
                200,
                r#"{"results": [], "count": 0}"#,
            ),
        );
        let mut b = browser();
        assert!(block_on(b.fetch(&client)));
        assert_eq!(
            b.outcome(),
            StoryOutcome::Empty {
                title: "No stories found",
                message: "No stories have been uploaded yet",
                can_clear: false,
            }
        );
        assert_eq!(b.summary(), "No resources found");
        assert!(b.stories().is_empty());
        assert_eq!(b.pagination().total_pages, 1);
        assert!(!b.pagination().is_visible());
    }

    #[test]
    fn test_empty_with_search_offers_clear() {
        let mut b = browser();
        b.set_search("kajiado", 0.0);
        assert!(!b.should_fetch());
        assert!(b.debounce_elapsed(500.0));
        let (ticket, query) = b.begin_fetch();
        assert_eq!(query.search, "kajiado");
        b.finish_fetch(ticket, Ok(Page::default()));
        match b.outcome() {
            StoryOutcome::Empty { message, can_clear, .. } => {
                assert_eq!(message, "Try adjusting your search criteria or filters");
                assert!(can_clear);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_pagination_from_count() {
        let mut b = browser();
        let (ticket, _) = b.begin_fetch();
        let page = Page {
            results: (0..12).map(|i| story(i, "Ride")).collect(),
            count: 30,
            next: Some(format!("{}/geostories/?page=2", BASE)),
            previous: None,
        };
        assert!(b.finish_fetch(ticket, Ok(page)));
        assert_eq!(b.pagination().total_pages, 3);
        assert_eq!(b.summary(), "30 Resources found");

        assert!(b.next_page());
        assert!(b.next_page());
        assert!(!b.next_page());
        assert_eq!(b.page(), 3);
        assert_eq!(b.query().page, 3);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            fetch_error_message(&DashboardError::Network("Failed to fetch".into()), BASE),
            "Failed to fetch stories. Please check if the Django server is running on http://localhost:8000"
        );
        assert_eq!(
            fetch_error_message(&DashboardError::HttpStatus(500), BASE),
            "Failed to fetch stories. Server error occurred."
        );
        assert_eq!(
            fetch_error_message(&DashboardError::HttpStatus(404), BASE),
            "Failed to fetch stories. API endpoint not found."
        );
        assert_eq!(
            fetch_error_message(&DashboardError::HttpStatus(403), BASE),
            "Failed to fetch stories."
        );
    }

    #[test]
    fn test_error_resets_pagination() {
        let mut b = browser();
        let (ticket, _) = b.begin_fetch();
        b.finish_fetch(
            ticket,
            Ok(Page {
                results: vec![story(1, "Ride")],
                count: 40,
                ..Default::default()
            }),
        );
        let (ticket, _) = b.begin_fetch();
        assert!(b.finish_fetch(ticket, Err(DashboardError::HttpStatus(500))));
        assert_eq!(b.pagination(), &Pagination::default());
        assert!(b.stories().is_empty());
        assert!(matches!(b.outcome(), StoryOutcome::Error { title: "No Stories found", .. }));
    }

    #[test]
    fn test_stale_response_dropped() {
        let mut b = browser();
        let (first, _) = b.begin_fetch();
        let (second, _) = b.begin_fetch();
        assert!(b.finish_fetch(
            second,
            Ok(Page {
                results: vec![story(2, "Newer")],
                count: 1,
                ..Default::default()
            })
        ));
        assert!(!b.finish_fetch(first, Err(DashboardError::HttpStatus(500))));
        assert_eq!(b.stories()[0].title, "Newer");
    }

    #[test]
    fn test_filter_and_clear() {
        let mut b = browser();
        let (ticket, _) = b.begin_fetch();
        b.finish_fetch(
            ticket,
            Ok(Page {
                results: vec![story(1, "Ride")],
                count: 40,
                ..Default::default()
            }),
        );
        b.set_page(3);
        assert!(b.set_filter(FilterField::Location, "Nairobi"));
        assert_eq!(b.page(), 1);
        assert_eq!(b.query().location_name, "Nairobi");

        b.set_search("ride", 0.0);
        b.clear_filters();
        assert!(b.should_fetch());
        assert_eq!(b.query(), StoryQuery {
            page: 1,
            ..Default::default()
        });
        // The pending keystroke was dropped with the rest
        assert!(!b.debounce_elapsed(10_000.0));
    }

    #[test]
    fn test_view_before_first_response() {
        let mut b = browser();
        b.toggle_filter_panel();
        b.set_view_mode(ViewMode::List);
        let view = b.view();
        assert_eq!(view.outcome, StoryOutcome::Loading);
        assert!(view.filter_open);
        assert_eq!(view.view_mode, ViewMode::List);
        assert_eq!(view.summary, "No resources found");
    }

    #[test]
    fn test_cards() {
        let card = StoryCard::from(&story(7, "Ngong Hills"));
        assert_eq!(card.date, "Jul 14, 2025");
        assert_eq!(format_story_date(Some("2025-03-02")), "Mar 2, 2025");
        assert_eq!(format_story_date(Some("whenever")), "Invalid date");
        assert_eq!(format_story_date(None), "Invalid date");
    }
}
