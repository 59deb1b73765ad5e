use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::models::content_store::check_status;
use crate::models::records::CatalogRecord;
use crate::Result;

pub const IMAGE_FALLBACK: Duration = Duration::from_secs(3);
pub const PRELOAD_CONCURRENCY: usize = 4;

#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch_image(&self, url: &str) -> Result<()>;
}

impl ImageFetcher for Client {
    async fn fetch_image(&self, url: &str) -> Result<()> {
        let res = self.get(url).send().await?;
        check_status(res).await?.bytes().await?;

        Ok(())
    }
}

pub fn image_urls<R: CatalogRecord>(records: &[R]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.image_urls())
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Warms every image, at most [`PRELOAD_CONCURRENCY`] at a time. An image that
/// fails or takes longer than [`IMAGE_FALLBACK`] counts as loaded anyway, so
/// the returned count always equals `urls.len()`.
pub async fn preload_images<F: ImageFetcher>(fetcher: &F, urls: &[String]) -> usize {
    // Owned items, so the returned future can be spawned.
    stream::iter(urls.iter().cloned())
        .map(|url| async move {
            match tokio::time::timeout(IMAGE_FALLBACK, fetcher.fetch_image(&url)).await {
                Ok(Ok(())) => debug!("Preloaded {}", url),
                Ok(Err(e)) => debug!("Failed to preload {}: {}", url, e),
                Err(_) => debug!("Gave up waiting for {}", url),
            }
        })
        .buffer_unordered(PRELOAD_CONCURRENCY)
        .count()
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::errors::CatalogError;
    use crate::models::records::hero::{Hero, HeroRole};

    #[derive(Default)]
    struct SlowFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl ImageFetcher for SlowFetcher {
        async fn fetch_image(&self, url: &str) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _in_flight = InFlight(&self.in_flight);

            if url.ends_with("broken.png") {
                return Err(CatalogError::from_status(404, "Not Found"));
            }

            // Never answers; only the fallback timer settles it.
            std::future::pending::<()>().await;

            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_image_settles_through_fallback() {
        let fetcher = SlowFetcher::default();
        let urls = (0..10)
            .map(|i| format!("https://cdn/{}.png", i))
            .chain(["https://cdn/broken.png".to_owned()])
            .collect::<Vec<_>>();

        let settled = preload_images(&fetcher, &urls).await;

        assert_eq!(settled, urls.len());
        assert!(fetcher.peak.load(Ordering::SeqCst) <= PRELOAD_CONCURRENCY);
    }

    #[tokio::test(start_paused = true)]
    async fn preloading_runs_inside_a_spawned_task() {
        let urls = vec!["https://cdn/a.png".to_owned(), "https://cdn/b.png".to_owned()];

        let handle = tokio::spawn(async move {
            let fetcher = SlowFetcher::default();
            preload_images(&fetcher, &urls).await
        });

        assert_eq!(handle.await.unwrap(), 2);
    }

    #[test]
    fn blank_image_urls_are_skipped() {
        let heroes = vec![
            Hero::new("1", "Layla", HeroRole::Marksman, "https://cdn/layla.png"),
            Hero::new("2", "Draft", HeroRole::Mage, ""),
        ];

        assert_eq!(image_urls(&heroes), vec!["https://cdn/layla.png"]);
    }
}
