use arc_swap::ArcSwap;
use axum::{
    extract::{Request, State},
    response::Response,
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::artifacts::{find_shots, DiscoveryError};
use crate::models::WatchConfig;
use crate::routes::RouteTable;

/// Serves the shots found under a base directory and keeps the route table in
/// sync with the filesystem.
///
/// The current table is a single swappable pointer. Requests load it once and
/// keep their snapshot for the whole response; scans build a complete new
/// table before storing it.
pub struct Server {
    base_dir: PathBuf,
    fallback: Router,
    watch: WatchConfig,
    table: ArcSwap<RouteTable>,
}

impl Server {
    /// Scan `base_dir` once and publish the first table.
    pub fn new(
        base_dir: PathBuf,
        fallback: Router,
        watch: WatchConfig,
    ) -> Result<Self, DiscoveryError> {
        let shots = find_shots(&base_dir)?;
        info!("Found {} shots in {}", shots.len(), base_dir.display());
        let table = RouteTable::build(shots, fallback.clone());

        Ok(Self {
            base_dir,
            fallback,
            watch,
            table: ArcSwap::from_pointee(table),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Snapshot of the table requests are currently served from.
    pub fn current(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    fn publish(&self, table: RouteTable) {
        self.table.store(Arc::new(table));
    }

    /// Run one scan cycle. On failure the previous table stays in place.
    pub async fn rescan(&self) -> Result<usize, DiscoveryError> {
        let base_dir = self.base_dir.clone();
        let shots = tokio::task::spawn_blocking(move || find_shots(&base_dir)).await??;

        let count = shots.len();
        if self.current().shots() != shots.as_slice() {
            info!("Shot list changed, now serving {} shots", count);
        }
        self.publish(RouteTable::build(shots, self.fallback.clone()));
        Ok(count)
    }

    /// Start the periodic rescan loop. The task ends once `cancel` fires.
    pub fn spawn_watcher(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let server = Arc::clone(self);
        tokio::spawn(async move { server.watch(cancel).await })
    }

    async fn watch(&self, cancel: CancellationToken) {
        loop {
            let delay = self.watch.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => break,
            }

            match self.rescan().await {
                Ok(count) => debug!("Rescan found {} shots", count),
                Err(e) => error!(
                    "Unable to find mapshots at {}: {}",
                    self.base_dir.display(),
                    e
                ),
            }
        }
        info!("Shot watcher stopped");
    }
}

/// HTTP entry point: every request is dispatched to the current table.
pub fn router(server: Arc<Server>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn dispatch(State(server): State<Arc<Server>>, request: Request) -> Response {
    let table = server.current();
    table.serve(request).await
}
