use std::sync::Arc;

use crate::error::Result;
use crate::providers::{DigestProvider, ImageProvider};
use crate::review::{LOAD_FAILED_MESSAGE, PageState, ReviewPage};

/// Loads the page: digest first, then the caricature for its caption.
pub struct ReviewOrchestrator {
    digest: Arc<dyn DigestProvider>,
    image: Arc<dyn ImageProvider>,
}

impl ReviewOrchestrator {
    pub fn new(digest: Arc<dyn DigestProvider>, image: Arc<dyn ImageProvider>) -> Self {
        Self { digest, image }
    }

    pub async fn fetch(&self, date_label: &str) -> Result<ReviewPage> {
        let review = self.digest.fetch_daily_review(date_label).await?;
        let caricature_url = self
            .image
            .generate_caricature(&review.caricature_caption)
            .await;
        Ok(ReviewPage {
            review,
            caricature_url,
        })
    }

    /// One full load cycle mapped to page state. Retry is another call.
    pub async fn load(&self, date_label: &str) -> PageState {
        match self.fetch(date_label).await {
            Ok(page) => PageState::Ready(page),
            Err(e) => {
                log::error!("Failed to load review: {}", e);
                PageState::Failed(LOAD_FAILED_MESSAGE.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::review::StructuredReview;
    use crate::review::tests::sample_review;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl Calls {
        fn push(&self, s: String) {
            self.0.lock().unwrap().push(s);
        }
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    struct FakeDigest {
        calls: Arc<Calls>,
        failures_left: Mutex<u32>,
    }

    #[async_trait]
    impl DigestProvider for FakeDigest {
        async fn fetch_daily_review(&self, date_label: &str) -> Result<StructuredReview> {
            self.calls.push(format!("digest:{}", date_label));
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(Error::upstream("boom"));
            }
            Ok(sample_review())
        }
    }

    struct FakeImage {
        calls: Arc<Calls>,
        url: &'static str,
    }

    #[async_trait]
    impl ImageProvider for FakeImage {
        async fn generate_caricature(&self, caption: &str) -> String {
            self.calls.push(format!("image:{}", caption));
            self.url.to_string()
        }
    }

    fn orchestrator(failures: u32, url: &'static str) -> (ReviewOrchestrator, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let digest = FakeDigest {
            calls: calls.clone(),
            failures_left: Mutex::new(failures),
        };
        let image = FakeImage {
            calls: calls.clone(),
            url,
        };
        (
            ReviewOrchestrator::new(Arc::new(digest), Arc::new(image)),
            calls,
        )
    }

    #[tokio::test]
    async fn digest_then_image() {
        let (orch, calls) = orchestrator(0, "data:image/png;base64,AA==");
        let state = orch.load("lundi").await;

        let PageState::Ready(page) = state else {
            panic!("expected ready page");
        };
        assert_eq!(page.caricature_url, "data:image/png;base64,AA==");
        assert_eq!(
            calls.take(),
            vec!["digest:lundi", "image:Le ministre et le baobab"]
        );
    }

    #[tokio::test]
    async fn digest_failure_then_retry_runs_sequence_once_more() {
        let (orch, calls) = orchestrator(1, "u");

        assert_eq!(
            orch.load("lundi").await,
            PageState::Failed(LOAD_FAILED_MESSAGE.to_string())
        );
        assert_eq!(calls.take(), vec!["digest:lundi"]);

        assert!(matches!(orch.load("lundi").await, PageState::Ready(_)));
        assert_eq!(
            calls.take(),
            vec!["digest:lundi", "image:Le ministre et le baobab"]
        );
    }

    #[tokio::test]
    async fn placeholder_image_still_renders_page() {
        let (orch, _calls) =
            orchestrator(0, crate::providers::huggingface::ERROR_PLACEHOLDER);
        match orch.load("lundi").await {
            PageState::Ready(page) => assert_eq!(
                page.caricature_url,
                "https://picsum.photos/800/600?text=Erreur+HF"
            ),
            other => panic!("unexpected state {:?}", other),
        }
    }
}
