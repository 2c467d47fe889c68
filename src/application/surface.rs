//! Boundary types for the editor surface and the live document tree.

use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::watch;

use super::error::ExportError;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a node attached to the live tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate a process-unique node id.
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Load state of one image element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Pending,
    Loaded { width: u32, height: u32 },
    Failed,
}

impl ImageState {
    /// Loaded with a zero intrinsic size renders nothing, so it is treated as failed.
    pub fn loaded(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            ImageState::Failed
        } else {
            ImageState::Loaded { width, height }
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ImageState::Pending)
    }
}

/// An image element inside a rendered subtree.
///
/// Clones share the same load state. The state leaves `Pending` at most once;
/// later settle attempts are ignored.
#[derive(Clone)]
pub struct ImageElement {
    src: Option<Arc<str>>,
    state: Arc<watch::Sender<ImageState>>,
}

impl ImageElement {
    pub fn new(src: Option<&str>) -> Self {
        let (state, _) = watch::channel(ImageState::Pending);
        Self {
            src: src.map(Arc::from),
            state: Arc::new(state),
        }
    }

    pub fn with_state(src: Option<&str>, initial: ImageState) -> Self {
        let image = Self::new(src);
        image.settle(initial);
        image
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn state(&self) -> ImageState {
        *self.state.borrow()
    }

    /// Record the terminal state. Returns whether this call settled the image.
    pub fn settle(&self, outcome: ImageState) -> bool {
        if !outcome.is_settled() {
            return false;
        }
        self.state.send_if_modified(|current| {
            if current.is_settled() {
                return false;
            }
            *current = outcome;
            true
        })
    }

    pub fn mark_loaded(&self, width: u32, height: u32) -> bool {
        self.settle(ImageState::loaded(width, height))
    }

    pub fn mark_failed(&self) -> bool {
        self.settle(ImageState::Failed)
    }

    /// Future completing once the image reaches a terminal state.
    ///
    /// Success and failure resolve it identically; so does the state source
    /// going away.
    pub fn settled(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut receiver = self.state.subscribe();
        async move {
            let _ = receiver.wait_for(ImageState::is_settled).await;
        }
    }
}

impl fmt::Debug for ImageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageElement")
            .field("src", &self.src)
            .field("state", &self.state())
            .finish()
    }
}

/// A rendered subtree a capability can capture.
pub trait RenderNode: Send + Sync {
    fn node_id(&self) -> NodeId;

    /// Serialized markup of the whole subtree.
    fn markup(&self) -> String;

    /// Every image element inside the subtree, in document order.
    fn images(&self) -> Vec<ImageElement>;
}

/// The live document tree hosting rendered nodes.
pub trait LiveTree: Send + Sync {
    /// Attach an invisible container holding `html` to the tree.
    fn mount_hidden(&self, html: &str) -> Result<Arc<dyn RenderNode>, ExportError>;

    /// Detach a node. Returns whether the node was attached.
    fn unmount(&self, id: NodeId) -> bool;

    fn contains(&self, id: NodeId) -> bool;
}

/// Query surface of the external visual editor.
pub trait EditorSurface: Send + Sync {
    /// Current serialized markup of the edited document.
    fn html(&self) -> String;

    /// Current stylesheet text of the edited document.
    fn css(&self) -> String;

    /// Markup and stylesheet read in one query, so both reflect the same edit.
    fn document(&self) -> (String, String);

    /// Root of the editor's live rendered canvas.
    fn canvas_root(&self) -> Arc<dyn RenderNode>;
}
