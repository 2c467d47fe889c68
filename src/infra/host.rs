//! In-process live document tree.

use std::{cell::RefCell, rc::Rc, sync::Arc};

use dashmap::DashMap;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use tokio::{runtime::Handle, task::AbortHandle};
use tracing::debug;

use crate::application::{
    error::ExportError,
    surface::{ImageElement, ImageState, LiveTree, NodeId, RenderNode},
};

use super::images::ImageLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// A node attached to a [`MemoryLiveTree`].
#[derive(Debug)]
pub struct MountedNode {
    id: NodeId,
    html: String,
    visibility: Visibility,
    images: Vec<ImageElement>,
    loads: Vec<AbortHandle>,
}

impl RenderNode for MountedNode {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn markup(&self) -> String {
        self.html.clone()
    }

    fn images(&self) -> Vec<ImageElement> {
        self.images.clone()
    }
}

/// Registry of mounted nodes. Mounting discovers `<img>` elements and, when a
/// loader is configured, starts loading each of them in the background.
#[derive(Default)]
pub struct MemoryLiveTree {
    nodes: DashMap<NodeId, Arc<MountedNode>>,
    loader: Option<Arc<dyn ImageLoader>>,
}

impl MemoryLiveTree {
    /// A tree whose images stay pending until settled by hand.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            nodes: DashMap::new(),
            loader: Some(loader),
        }
    }

    pub fn mount(&self, html: &str, visibility: Visibility) -> Result<Arc<MountedNode>, ExportError> {
        let sources = scan_image_sources(html)?;
        let images: Vec<_> = sources
            .iter()
            .map(|src| match src.as_deref().map(str::trim) {
                Some(src) if !src.is_empty() => ImageElement::new(Some(src)),
                _ => ImageElement::with_state(None, ImageState::Failed),
            })
            .collect();
        let loads = self.spawn_loads(&images)?;

        let node = Arc::new(MountedNode {
            id: NodeId::next(),
            html: html.to_string(),
            visibility,
            images,
            loads,
        });
        self.nodes.insert(node.id, Arc::clone(&node));

        debug!(
            target = "infra::host",
            op = "host::mount",
            node = %node.id,
            visible = visibility == Visibility::Visible,
            images = node.images.len(),
            "Node mounted"
        );
        Ok(node)
    }

    pub fn mounted_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn hidden_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|entry| entry.value().visibility == Visibility::Hidden)
            .count()
    }

    fn spawn_loads(&self, images: &[ImageElement]) -> Result<Vec<AbortHandle>, ExportError> {
        let Some(loader) = self.loader.as_ref() else {
            return Ok(Vec::new());
        };
        let pending: Vec<_> = images
            .iter()
            .filter(|image| !image.state().is_settled())
            .collect();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let runtime = Handle::try_current()
            .map_err(|err| ExportError::mount(format!("image loading needs a runtime: {err}")))?;
        Ok(pending
            .into_iter()
            .map(|image| {
                let image = image.clone();
                let loader = Arc::clone(loader);
                runtime
                    .spawn(async move {
                        let src = image.src().unwrap_or_default().to_string();
                        let state = loader.load(&src).await;
                        image.settle(state);
                    })
                    .abort_handle()
            })
            .collect())
    }
}

impl LiveTree for MemoryLiveTree {
    fn mount_hidden(&self, html: &str) -> Result<Arc<dyn RenderNode>, ExportError> {
        let node: Arc<dyn RenderNode> = self.mount(html, Visibility::Hidden)?;
        Ok(node)
    }

    fn unmount(&self, id: NodeId) -> bool {
        let Some((_, node)) = self.nodes.remove(&id) else {
            return false;
        };
        for load in &node.loads {
            load.abort();
        }
        // Aborted loads never settle on their own; release anyone still waiting.
        let released = node
            .images
            .iter()
            .filter(|image| image.mark_failed())
            .count();
        debug!(
            target = "infra::host",
            op = "host::unmount",
            node = %id,
            released,
            "Node unmounted"
        );
        true
    }

    fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}

/// Collect the `src` attribute of every `<img>` in document order.
fn scan_image_sources(html: &str) -> Result<Vec<Option<String>>, ExportError> {
    let sources = Rc::new(RefCell::new(Vec::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", {
                let sources = Rc::clone(&sources);
                move |el| {
                    sources.borrow_mut().push(el.get_attribute("src"));
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| ExportError::mount(format!("failed to scan markup: {err}")))?;

    Ok(sources.take())
}
