//! Editor surface backed by in-memory markup and stylesheet.

use std::sync::{Arc, PoisonError, RwLock};

use crate::application::{
    error::ExportError,
    offscreen::inline_document,
    snapshot::DocumentSnapshot,
    surface::{EditorSurface, LiveTree, RenderNode},
};

use super::host::{MemoryLiveTree, MountedNode, Visibility};

struct Content {
    markup: String,
    stylesheet: String,
    canvas: Arc<MountedNode>,
}

/// A non-interactive editor whose canvas is mounted visibly on a
/// [`MemoryLiveTree`].
pub struct StaticEditor {
    tree: Arc<MemoryLiveTree>,
    content: RwLock<Content>,
}

impl StaticEditor {
    pub fn new(
        tree: Arc<MemoryLiveTree>,
        markup: impl Into<String>,
        stylesheet: impl Into<String>,
    ) -> Result<Self, ExportError> {
        let markup = markup.into();
        let stylesheet = stylesheet.into();
        let canvas = mount_canvas(&tree, &markup, &stylesheet)?;
        Ok(Self {
            tree,
            content: RwLock::new(Content {
                markup,
                stylesheet,
                canvas,
            }),
        })
    }

    /// Replace the document, re-rendering the canvas.
    pub fn replace(
        &self,
        markup: impl Into<String>,
        stylesheet: impl Into<String>,
    ) -> Result<(), ExportError> {
        let markup = markup.into();
        let stylesheet = stylesheet.into();
        let canvas = mount_canvas(&self.tree, &markup, &stylesheet)?;

        let previous = {
            let mut content = self.content.write().unwrap_or_else(PoisonError::into_inner);
            let previous = content.canvas.node_id();
            *content = Content {
                markup,
                stylesheet,
                canvas,
            };
            previous
        };
        self.tree.unmount(previous);
        Ok(())
    }
}

fn mount_canvas(
    tree: &MemoryLiveTree,
    markup: &str,
    stylesheet: &str,
) -> Result<Arc<MountedNode>, ExportError> {
    let document = inline_document(&DocumentSnapshot::new(markup, stylesheet));
    tree.mount(&document, Visibility::Visible)
}

impl EditorSurface for StaticEditor {
    fn html(&self) -> String {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .markup
            .clone()
    }

    fn css(&self) -> String {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .stylesheet
            .clone()
    }

    fn document(&self) -> (String, String) {
        let content = self.content.read().unwrap_or_else(PoisonError::into_inner);
        (content.markup.clone(), content.stylesheet.clone())
    }

    fn canvas_root(&self) -> Arc<dyn RenderNode> {
        let content = self.content.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&content.canvas) as Arc<dyn RenderNode>
    }
}
