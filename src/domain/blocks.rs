//! Editor building blocks and the catalog customization applied on editor load.

use serde::{Deserialize, Serialize};

/// Block removed from the stock catalog once the editor finished loading.
pub const REMOVED_BLOCK_ID: &str = "icon";
pub const SYMBOLS_CATEGORY: &str = "Symbols";

const SYMBOL_BLOCKS: [(&str, &str, &str); 4] = [
    ("symbol-heart", "\u{2665} Heart", "\u{2665}"),
    ("symbol-arrow", "\u{279c} Arrow", "\u{279c}"),
    ("symbol-star", "\u{2605} Star", "\u{2605}"),
    ("symbol-check", "\u{2714} Check", "\u{2714}"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub id: String,
    pub label: String,
    pub category: String,
    pub content: String,
}

/// Ordered set of blocks keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockCatalog {
    blocks: Vec<BlockDefinition>,
}

impl BlockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: impl IntoIterator<Item = BlockDefinition>) -> Self {
        let mut catalog = Self::new();
        for block in blocks {
            catalog.add(block);
        }
        catalog
    }

    /// Insert a block, replacing an existing block with the same id in place.
    pub fn add(&mut self, block: BlockDefinition) {
        match self.blocks.iter_mut().find(|existing| existing.id == block.id) {
            Some(existing) => *existing = block,
            None => self.blocks.push(block),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<BlockDefinition> {
        let index = self.blocks.iter().position(|block| block.id == id)?;
        Some(self.blocks.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&BlockDefinition> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The glyph blocks offered under the `Symbols` category.
pub fn symbol_blocks() -> Vec<BlockDefinition> {
    SYMBOL_BLOCKS
        .iter()
        .map(|(id, label, glyph)| BlockDefinition {
            id: (*id).to_string(),
            label: (*label).to_string(),
            category: SYMBOLS_CATEGORY.to_string(),
            content: format!(r#"<div style="font-size:32px;">{glyph}</div>"#),
        })
        .collect()
}

/// Apply the load-time customization to the stock catalog.
pub fn customize_catalog(catalog: &mut BlockCatalog) {
    catalog.remove(REMOVED_BLOCK_ID);
    for block in symbol_blocks() {
        catalog.add(block);
    }
}
