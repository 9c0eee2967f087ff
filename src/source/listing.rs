//! Listing providers: which avatars belong to a collection.

use crate::core::config::Config;
use crate::core::error::{FetchError, ListingError};
use crate::core::types::ImageSource;
use crate::source::fetcher::HttpFetcher;
use serde::Deserialize;
use std::collections::HashMap;

/// GitHub caps `per_page` at this value.
const GITHUB_MAX_PAGE: usize = 100;

/// Supplies the ordered avatar list for a named collection.
pub trait ListingProvider: Send + Sync {
    /// Return at most `limit` sources for `collection`, in display order.
    fn list(&self, collection: &str, limit: usize) -> Result<Vec<ImageSource>, ListingError>;
}

#[derive(Debug, Deserialize)]
struct UserAvatar {
    avatar_url: String,
}

/// Lists `stargazers`, `contributors` and similar endpoints of one repository.
#[derive(Debug, Clone)]
pub struct GithubListing {
    client: HttpFetcher,
    api_base: String,
    owner: String,
    repo: String,
}

impl GithubListing {
    /// Create a listing for `owner/repo` against `api_base`.
    pub fn new(
        client: HttpFetcher,
        api_base: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Create a listing from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            HttpFetcher::from_config(config),
            config.api_base.clone(),
            config.repository.owner.clone(),
            config.repository.name.clone(),
        )
    }

    fn page_url(&self, collection: &str, per_page: usize, page: usize) -> String {
        format!(
            "{}/repos/{}/{}/{}?per_page={}&page={}",
            self.api_base, self.owner, self.repo, collection, per_page, page
        )
    }

    fn fetch_page(&self, url: &str) -> Result<Vec<UserAvatar>, ListingError> {
        let response = self.client.get(url).map_err(|error| match error {
            FetchError::HttpStatus { code: 404, .. } => {
                ListingError::UnknownCollection(url.to_string())
            }
            other => ListingError::Request(other),
        })?;

        response
            .into_json::<Vec<UserAvatar>>()
            .map_err(|error| ListingError::Malformed {
                url: url.to_string(),
                reason: error.to_string(),
            })
    }
}

impl ListingProvider for GithubListing {
    fn list(&self, collection: &str, limit: usize) -> Result<Vec<ImageSource>, ListingError> {
        let per_page = limit.clamp(1, GITHUB_MAX_PAGE);
        let mut sources = Vec::with_capacity(limit);
        let mut page = 1;

        while sources.len() < limit {
            let url = self.page_url(collection, per_page, page);
            let avatars = self.fetch_page(&url)?;
            let exhausted = avatars.len() < per_page;

            sources.extend(
                avatars
                    .into_iter()
                    .filter(|a| !a.avatar_url.is_empty())
                    .map(|a| ImageSource::new(a.avatar_url)),
            );

            if exhausted {
                break;
            }
            page += 1;
        }

        sources.truncate(limit);
        log::debug!(
            "listed {} avatar(s) for {}/{}/{}",
            sources.len(),
            self.owner,
            self.repo,
            collection
        );
        Ok(sources)
    }
}

/// Fixed in-memory listing, for offline rendering and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticListing {
    collections: HashMap<String, Vec<ImageSource>>,
}

impl StaticListing {
    /// Create an empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a collection.
    pub fn with_collection<I, S>(mut self, name: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections.insert(
            name.into(),
            urls.into_iter().map(ImageSource::new).collect(),
        );
        self
    }
}

impl ListingProvider for StaticListing {
    fn list(&self, collection: &str, limit: usize) -> Result<Vec<ImageSource>, ListingError> {
        self.collections
            .get(collection)
            .map(|sources| sources.iter().take(limit).cloned().collect())
            .ok_or_else(|| ListingError::UnknownCollection(collection.to_string()))
    }
}
