//! Gate that holds capture until every image of a subtree has settled.

use std::time::Instant;

use futures::future::join_all;
use tracing::debug;

use super::surface::RenderNode;

/// Wait until every image inside `root` has loaded or failed.
///
/// Images already settled when the subtree is enumerated contribute nothing.
/// A failed image counts as settled; this future never errors. There is no
/// timeout: an image that never settles blocks the caller.
pub async fn await_images_settled(root: &dyn RenderNode) {
    let started_at = Instant::now();
    let images = root.images();
    let total = images.len();
    let pending: Vec<_> = images
        .iter()
        .filter(|image| !image.state().is_settled())
        .map(|image| image.settled())
        .collect();

    if pending.is_empty() {
        debug!(
            target = "application::barrier",
            op = "await_images_settled",
            node = %root.node_id(),
            images = total,
            pending = 0,
            "All images already settled"
        );
        return;
    }

    let waited = pending.len();
    join_all(pending).await;

    debug!(
        target = "application::barrier",
        op = "await_images_settled",
        node = %root.node_id(),
        images = total,
        pending = waited,
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        "Images settled"
    );
}
