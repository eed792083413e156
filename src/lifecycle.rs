//! Concurrent lifecycle check over a set of images

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info};

use crate::catalog::RegistryCatalog;
use crate::image::ImageReference;
use crate::version::checker::{LifecycleStatus, check_lifecycle};
use crate::version::registry::TagLister;

/// Default number of images checked at once
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Outcome of checking one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLifecycleReport {
    #[serde(flatten)]
    pub image: ImageReference,
    /// Name of the registry that was queried
    pub registry: String,
    pub latest_version: Option<String>,
    pub status: LifecycleStatus,
}

impl ImageLifecycleReport {
    fn failure(image: ImageReference, registry: String) -> Self {
        Self {
            image,
            registry,
            latest_version: None,
            status: LifecycleStatus::Failure,
        }
    }
}

/// Resolve, list and classify a single image.
///
/// Registry errors never escape: they are logged and reported as `Failure`.
pub async fn check_image(
    catalog: &RegistryCatalog,
    lister: &dyn TagLister,
    image: ImageReference,
) -> ImageLifecycleReport {
    let resolution = catalog.resolve(&image.repository_path, &image.registry_url);
    let repository = catalog.repository_for(&resolution, &image.repository_path);
    let registry = resolution.registry.name.clone();

    let tags = match lister.list_tags(&resolution.registry, &repository).await {
        Ok(tags) => tags,
        Err(e) => {
            error!(
                "Failed to fetch versions for {}/{}: {}",
                registry, repository, e
            );
            return ImageLifecycleReport::failure(image, registry);
        }
    };

    let check = check_lifecycle(
        image.current_version.as_deref(),
        &tags,
        resolution.allow_all_releases,
    );
    info!(
        "{} {} -> {} ({})",
        image.full_path,
        image.version_label(),
        check.latest_version.as_deref().unwrap_or("-"),
        check.status
    );

    ImageLifecycleReport {
        image,
        registry,
        latest_version: check.latest_version,
        status: check.status,
    }
}

/// Fans one check per image out over a bounded set of tokio tasks
pub struct LifecycleAggregator {
    catalog: Arc<RegistryCatalog>,
    lister: Arc<dyn TagLister>,
    concurrency: usize,
}

impl LifecycleAggregator {
    pub fn new(catalog: Arc<RegistryCatalog>, lister: Arc<dyn TagLister>) -> Self {
        Self {
            catalog,
            lister,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit the number of images checked at once (at least one)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Check every image and return one report per image, sorted by repository path.
    ///
    /// The order in which checks complete never shows in the result.
    pub async fn run(&self, images: Vec<ImageReference>) -> Vec<ImageLifecycleReport> {
        debug!(
            "Checking {} images with up to {} at once",
            images.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let (images, handles): (Vec<_>, Vec<_>) = images
            .into_iter()
            .map(|image| {
                let catalog = Arc::clone(&self.catalog);
                let lister = Arc::clone(&self.lister);
                let semaphore = Arc::clone(&semaphore);
                let tx = tx.clone();
                let task_image = image.clone();

                let handle = tokio::spawn(async move {
                    // The semaphore is never closed, so a permit is always granted
                    let _permit = semaphore.acquire_owned().await.ok();
                    let report = check_image(&catalog, lister.as_ref(), task_image).await;
                    let _ = tx.send(report);
                });
                (image, handle)
            })
            .unzip();
        drop(tx);

        let outcomes = join_all(handles).await;

        let mut reports = Vec::with_capacity(images.len());
        while let Some(report) = rx.recv().await {
            reports.push(report);
        }

        for (image, outcome) in images.into_iter().zip(outcomes) {
            if let Err(e) = outcome {
                error!("Lifecycle check for {} aborted: {}", image.full_path, e);
                let registry = self
                    .catalog
                    .resolve(&image.repository_path, &image.registry_url)
                    .registry
                    .name
                    .clone();
                reports.push(ImageLifecycleReport::failure(image, registry));
            }
        }

        sort_reports(&mut reports);
        reports
    }
}

/// Order reports by repository path, breaking ties on every other field
pub fn sort_reports(reports: &mut [ImageLifecycleReport]) {
    reports.sort_by(|a, b| {
        a.image
            .repository_path
            .cmp(&b.image.repository_path)
            .then_with(|| a.image.full_path.cmp(&b.image.full_path))
            .then_with(|| a.registry.cmp(&b.registry))
            .then_with(|| a.status.as_str().cmp(b.status.as_str()))
            .then_with(|| a.latest_version.cmp(&b.latest_version))
    });
}
