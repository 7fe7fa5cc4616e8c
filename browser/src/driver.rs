use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::BrowserConfig;
use crate::controller::BrowserController;
use crate::controller::BrowserEvent;
use crate::controller::BrowserIntent;
use crate::controller::BrowserSnapshot;
use crate::controller::Effect;
use crate::facets::CompositeFacet;
use crate::query::FilterQuery;
use crate::query::RawQuery;
use crate::selection::KeyInput;
use crate::service::SearchService;

/// Front door to a running browser loop.
///
/// Dropping every handle closes the event channel and stops the loop, so
/// fetches resolving after teardown have nowhere to apply themselves.
#[derive(Clone)]
pub struct BrowserHandle<F: FilterQuery> {
    events: mpsc::UnboundedSender<BrowserEvent<F>>,
    snapshots: watch::Receiver<BrowserSnapshot<F>>,
}

impl<F: FilterQuery> BrowserHandle<F> {
    pub fn url_changed(&self, raw: RawQuery) {
        let _ = self.events.send(BrowserEvent::UrlChanged(raw));
    }

    pub fn key(&self, input: KeyInput) {
        let _ = self.events.send(BrowserEvent::Key(input));
    }

    pub fn intent(&self, intent: BrowserIntent<F>) {
        let _ = self.events.send(BrowserEvent::Intent(intent));
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> BrowserSnapshot<F> {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot updates; the receiver starts at the latest
    /// published value.
    pub fn snapshots(&self) -> watch::Receiver<BrowserSnapshot<F>> {
        self.snapshots.clone()
    }
}

/// A spawned browser loop plus the channels the embedder consumes.
pub struct SpawnedBrowser<F: FilterQuery> {
    pub handle: BrowserHandle<F>,
    /// URL pushes the embedder applies to the address bar and echoes back
    /// through [`BrowserHandle::url_changed`].
    pub url_pushes: mpsc::UnboundedReceiver<RawQuery>,
    pub task: JoinHandle<()>,
}

/// Start a browser loop on the current runtime.
pub fn spawn_browser<F: FilterQuery>(
    config: BrowserConfig,
    facet_names: Vec<String>,
    composites: Vec<CompositeFacet>,
    service: Arc<dyn SearchService>,
) -> SpawnedBrowser<F> {
    let controller = BrowserController::new(config, facet_names, composites);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (snapshots_tx, snapshots_rx) = watch::channel(controller.snapshot());
    let (url_tx, url_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_loop(controller, service, events_rx, snapshots_tx, url_tx));
    SpawnedBrowser {
        handle: BrowserHandle {
            events: events_tx,
            snapshots: snapshots_rx,
        },
        url_pushes: url_rx,
        task,
    }
}

async fn run_loop<F: FilterQuery>(
    mut controller: BrowserController<F>,
    service: Arc<dyn SearchService>,
    mut events: mpsc::UnboundedReceiver<BrowserEvent<F>>,
    snapshots: watch::Sender<BrowserSnapshot<F>>,
    url_pushes: mpsc::UnboundedSender<RawQuery>,
) {
    // Fetch resolutions come back on their own channel so the loop exits
    // as soon as the last handle drops, even with fetches still in flight.
    let (resolved_tx, mut resolved_rx) = mpsc::unbounded_channel();
    loop {
        let event = tokio::select! {
            maybe = events.recv() => {
                let Some(event) = maybe else { break; };
                event
            }
            maybe = resolved_rx.recv() => {
                let Some(event) = maybe else { break; };
                event
            }
        };
        let effects = controller.handle(event);
        dispatch_effects(effects, &service, &resolved_tx, &url_pushes);
        let _ = snapshots.send(controller.snapshot());
    }
    debug!("browser loop stopped");
}

fn dispatch_effects<F: FilterQuery>(
    effects: Vec<Effect>,
    service: &Arc<dyn SearchService>,
    resolved: &mpsc::UnboundedSender<BrowserEvent<F>>,
    url_pushes: &mpsc::UnboundedSender<RawQuery>,
) {
    for effect in effects {
        match effect {
            Effect::FetchMain { token, request } => {
                let service = Arc::clone(service);
                let resolved = resolved.clone();
                tokio::spawn(async move {
                    let result = service.search(request).await;
                    let _ = resolved.send(BrowserEvent::MainResolved { token, result });
                });
            }
            Effect::FetchFacet {
                facet,
                token,
                request,
            } => {
                let service = Arc::clone(service);
                let resolved = resolved.clone();
                tokio::spawn(async move {
                    let result = service.search(request).await;
                    let _ = resolved.send(BrowserEvent::FacetResolved {
                        facet,
                        token,
                        result,
                    });
                });
            }
            Effect::PushUrl(raw) => {
                let _ = url_pushes.send(raw);
            }
        }
    }
}
