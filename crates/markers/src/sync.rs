// Viewport marker reconciliation

use shared::Marker;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bbox::BoundingBox;
use crate::client::MarkerSource;

/// Changes to apply to the on-screen marker set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDiff {
    pub added: Vec<Marker>,
    /// Ids of markers no longer visible
    pub removed: Vec<String>,
    /// Visible markers whose data changed
    pub updated: Vec<Marker>,
}

impl MarkerDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Markers currently shown, keyed by id
#[derive(Debug, Default)]
pub struct VisibleMarkers {
    markers: HashMap<String, Marker>,
}

impl VisibleMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// Replace the visible set with the markers of `all` inside `viewport`
    /// and return what changed. The first marker wins on duplicate ids.
    pub fn reconcile(&mut self, all: &[Marker], viewport: &BoundingBox) -> MarkerDiff {
        let mut next: HashMap<String, Marker> = HashMap::new();
        for marker in all.iter().filter(|m| viewport.contains_marker(m)) {
            next.entry(marker.id.clone()).or_insert_with(|| marker.clone());
        }

        let mut diff = MarkerDiff::default();
        for (id, marker) in &next {
            match self.markers.get(id) {
                None => diff.added.push(marker.clone()),
                Some(existing) if existing != marker => diff.updated.push(marker.clone()),
                Some(_) => {}
            }
        }

        let kept: HashSet<&String> = next.keys().collect();
        diff.removed = self
            .markers
            .keys()
            .filter(|id| !kept.contains(id))
            .cloned()
            .collect();

        // Stable output order for consumers
        diff.added.sort_by(|a, b| a.id.cmp(&b.id));
        diff.updated.sort_by(|a, b| a.id.cmp(&b.id));
        diff.removed.sort();

        self.markers = next;
        diff
    }
}

/// Polls the marker source and keeps the visible set in step with the
/// viewport.
///
/// A viewport change is reconciled against the last fetched list without a
/// new request. A failed poll keeps the current visible set.
pub struct MarkerSyncLoop {
    source: Arc<dyn MarkerSource>,
    visible: VisibleMarkers,
    last_fetched: Option<Vec<Marker>>,
}

impl MarkerSyncLoop {
    pub fn new(source: Arc<dyn MarkerSource>) -> Self {
        Self {
            source,
            visible: VisibleMarkers::new(),
            last_fetched: None,
        }
    }

    pub fn visible(&self) -> &VisibleMarkers {
        &self.visible
    }

    /// Fetch once and reconcile; `None` when the fetch failed
    pub async fn poll_once(&mut self, viewport: &BoundingBox) -> Option<MarkerDiff> {
        let markers = self.source.fetch_markers().await?;
        debug!("Fetched {} markers", markers.len());
        let diff = self.visible.reconcile(&markers, viewport);
        self.last_fetched = Some(markers);
        Some(diff)
    }

    fn on_viewport_change(&mut self, viewport: &BoundingBox) -> Option<MarkerDiff> {
        let markers = self.last_fetched.as_ref()?;
        Some(self.visible.reconcile(markers, viewport))
    }

    /// Run until cancelled or until the diff receiver is dropped
    pub async fn run(
        mut self,
        interval: Duration,
        mut viewport: watch::Receiver<BoundingBox>,
        diffs: mpsc::Sender<MarkerDiff>,
        shutdown: CancellationToken,
    ) {
        info!("Marker sync every {:?}", interval);
        let mut ticker = tokio::time::interval(interval);
        let mut viewport_open = true;

        loop {
            let diff = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Marker sync stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let bbox = *viewport.borrow();
                    match self.poll_once(&bbox).await {
                        Some(diff) => diff,
                        None => {
                            warn!("Keeping {} visible markers after failed poll", self.visible.len());
                            continue;
                        }
                    }
                }
                changed = viewport.changed(), if viewport_open => {
                    if changed.is_err() {
                        debug!("Viewport sender dropped, keeping last viewport");
                        viewport_open = false;
                        continue;
                    }
                    let bbox = *viewport.borrow_and_update();
                    match self.on_viewport_change(&bbox) {
                        Some(diff) => diff,
                        None => continue,
                    }
                }
            };

            if diff.is_empty() {
                continue;
            }
            debug!(
                "Marker diff: +{} -{} ~{}",
                diff.added.len(),
                diff.removed.len(),
                diff.updated.len()
            );
            if diffs.send(diff).await.is_err() {
                info!("Marker diff receiver closed, stopping sync");
                return;
            }
        }
    }
}
