//! Scoped offscreen rendering context.

use std::{future::Future, sync::Arc};

use tracing::debug;

use super::{
    error::ExportError,
    snapshot::DocumentSnapshot,
    surface::{LiveTree, NodeId, RenderNode},
};

/// Wrap a snapshot into a single document carrying its stylesheet inline.
pub fn inline_document(snapshot: &DocumentSnapshot) -> String {
    format!(
        "<html><head><style>{}</style></head><body>{}</body></html>",
        snapshot.stylesheet(),
        snapshot.markup()
    )
}

/// Unmounts the container when dropped.
struct MountGuard<'a> {
    tree: &'a dyn LiveTree,
    id: NodeId,
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        let removed = self.tree.unmount(self.id);
        debug!(
            target = "application::offscreen",
            op = "offscreen::dispose",
            node = %self.id,
            removed,
            "Offscreen container disposed"
        );
    }
}

/// Render `snapshot` inside an invisible container attached to `tree`.
///
/// The container is detached exactly once before this returns, whether
/// `render` succeeds, fails or panics. Dropping the returned future mid-render
/// detaches it as well.
pub async fn with_offscreen_copy<T, F, Fut>(
    tree: &dyn LiveTree,
    snapshot: &DocumentSnapshot,
    render: F,
) -> Result<T, ExportError>
where
    F: FnOnce(Arc<dyn RenderNode>) -> Fut,
    Fut: Future<Output = Result<T, ExportError>>,
{
    let node = tree.mount_hidden(&inline_document(snapshot))?;
    let guard = MountGuard {
        tree,
        id: node.node_id(),
    };
    debug!(
        target = "application::offscreen",
        op = "offscreen::mount",
        node = %guard.id,
        images = node.images().len(),
        "Offscreen container mounted"
    );

    let result = render(node).await;
    drop(guard);
    result
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        panic::AssertUnwindSafe,
        sync::{Arc, Mutex},
    };

    use futures::FutureExt;

    use super::*;
    use crate::application::error::RenderCapabilityError;
    use crate::application::surface::ImageElement;

    struct Container {
        id: NodeId,
        html: String,
    }

    impl RenderNode for Container {
        fn node_id(&self) -> NodeId {
            self.id
        }

        fn markup(&self) -> String {
            self.html.clone()
        }

        fn images(&self) -> Vec<ImageElement> {
            Vec::new()
        }
    }

    #[derive(Default)]
    struct RecordingTree {
        attached: Mutex<HashSet<NodeId>>,
        unmounts: Mutex<Vec<NodeId>>,
    }

    impl LiveTree for RecordingTree {
        fn mount_hidden(&self, html: &str) -> Result<Arc<dyn RenderNode>, ExportError> {
            let id = NodeId::next();
            self.attached.lock().expect("attached").insert(id);
            Ok(Arc::new(Container {
                id,
                html: html.to_string(),
            }))
        }

        fn unmount(&self, id: NodeId) -> bool {
            self.unmounts.lock().expect("unmounts").push(id);
            self.attached.lock().expect("attached").remove(&id)
        }

        fn contains(&self, id: NodeId) -> bool {
            self.attached.lock().expect("attached").contains(&id)
        }
    }

    impl RecordingTree {
        fn is_empty(&self) -> bool {
            self.attached.lock().expect("attached").is_empty()
        }

        fn unmount_count(&self) -> usize {
            self.unmounts.lock().expect("unmounts").len()
        }
    }

    fn snapshot() -> DocumentSnapshot {
        DocumentSnapshot::new("<p>hi</p>", "p{color:red}")
    }

    #[test]
    fn inline_document_embeds_stylesheet() {
        assert_eq!(
            inline_document(&snapshot()),
            "<html><head><style>p{color:red}</style></head><body><p>hi</p></body></html>"
        );
    }

    #[tokio::test]
    async fn container_is_attached_during_render_and_removed_after() {
        let tree = RecordingTree::default();

        let markup = with_offscreen_copy(&tree, &snapshot(), |node| {
            let present = tree.contains(node.node_id());
            async move {
                assert!(present);
                Ok(node.markup())
            }
        })
        .await
        .expect("render succeeds");

        assert!(markup.contains("<body><p>hi</p></body>"));
        assert!(tree.is_empty());
        assert_eq!(tree.unmount_count(), 1);
    }

    #[tokio::test]
    async fn container_is_removed_when_render_fails() {
        let tree = RecordingTree::default();

        let result: Result<(), _> = with_offscreen_copy(&tree, &snapshot(), |_node| async {
            Err(ExportError::from(RenderCapabilityError::convert("boom")))
        })
        .await;

        assert!(matches!(result, Err(ExportError::Render(_))));
        assert!(tree.is_empty());
        assert_eq!(tree.unmount_count(), 1);
    }

    #[tokio::test]
    async fn container_is_removed_when_render_panics() {
        let tree = RecordingTree::default();

        let outcome = AssertUnwindSafe(with_offscreen_copy(
            &tree,
            &snapshot(),
            |node| async move {
                if node.markup().contains("<p>hi</p>") {
                    panic!("renderer crashed");
                }
                Ok::<(), ExportError>(())
            },
        ))
        .catch_unwind()
        .await;

        assert!(outcome.is_err());
        assert!(tree.is_empty());
        assert_eq!(tree.unmount_count(), 1);
    }

    #[tokio::test]
    async fn container_is_removed_when_export_is_dropped() {
        let tree = RecordingTree::default();
        let snapshot = snapshot();

        {
            let render = with_offscreen_copy(&tree, &snapshot, |_node| {
                futures::future::pending::<Result<(), ExportError>>()
            });
            let mut render = Box::pin(render);
            assert!(futures::poll!(&mut render).is_pending());
            assert!(!tree.is_empty());
        }

        assert!(tree.is_empty());
        assert_eq!(tree.unmount_count(), 1);
    }
}
