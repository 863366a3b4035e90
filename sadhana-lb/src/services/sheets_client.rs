//! Spreadsheet export client
//!
//! Fetches the four delimited exports over HTTP. A missing URL, a
//! transport failure, or a non-2xx status degrades that source to
//! empty text so the sync proceeds with partial data; the fetch layer
//! never fails a sync on its own.

use std::time::Duration;

use sadhana_common::config::SheetSources;

use crate::sync::FetchedSources;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client over the configured export URLs
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    urls: SheetSources,
}

impl SheetsClient {
    pub fn new(urls: SheetSources) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self { http, urls }
    }

    /// Fetch all four sources concurrently
    pub async fn fetch_all(&self) -> FetchedSources {
        let (meditation, practice, class, form) = tokio::join!(
            self.fetch_one(self.urls.meditation_url.as_deref(), "meditation"),
            self.fetch_one(self.urls.practice_url.as_deref(), "practice"),
            self.fetch_one(self.urls.class_url.as_deref(), "class"),
            self.fetch_one(self.urls.form_url.as_deref(), "form"),
        );

        FetchedSources {
            meditation,
            practice,
            class,
            form,
        }
    }

    async fn fetch_one(&self, url: Option<&str>, label: &str) -> String {
        let Some(url) = url else {
            tracing::debug!(source = label, "No export URL configured, using empty source");
            return String::new();
        };

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(source = label, error = %e, "Source fetch failed, degrading to empty");
                return String::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                source = label,
                status = %response.status(),
                "Source fetch returned non-success status, degrading to empty"
            );
            return String::new();
        }

        match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(source = label, error = %e, "Source body read failed, degrading to empty");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_sources_degrade_to_empty() {
        let client = SheetsClient::new(SheetSources::default());
        let sources = client.fetch_all().await;

        assert!(sources.meditation.is_empty());
        assert!(sources.practice.is_empty());
        assert!(sources.class.is_empty());
        assert!(sources.form.is_empty());
    }
}
