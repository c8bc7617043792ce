//! Block Kit trees and text extraction.
//!
//! Messages posted by apps and every draft carry their content as nested
//! blocks rather than a flat `text` field. Only the parts needed for matching
//! are modelled: the node type, its text and its child lists.

use crate::models::de::nullable;
use serde::{Deserialize, Serialize};

/// Node types whose `text` is user-visible content.
const TEXT_KINDS: [&str; 4] = ["text", "link", "mrkdwn", "plain_text"];

/// One node of a block tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockNode {
    /// Node type, e.g. `rich_text`, `section`, `text`
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,

    /// Inline text, or a nested text object for `section`-style blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<BlockText>,

    /// Child nodes
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub elements: Vec<BlockNode>,

    /// Secondary text objects of a `section` block
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub fields: Vec<BlockNode>,
}

/// The `text` member of a block node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockText {
    /// Literal text of a leaf
    Inline(String),
    /// A text object (`{"type": "mrkdwn", "text": "..."}`)
    Object(Box<BlockNode>),
}

impl BlockNode {
    /// Build a leaf node.
    #[must_use]
    pub fn leaf(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: Some(BlockText::Inline(text.to_string())),
            ..Self::default()
        }
    }

    /// Build a container node.
    #[must_use]
    pub fn container(kind: &str, elements: Vec<BlockNode>) -> Self {
        Self {
            kind: kind.to_string(),
            elements,
            ..Self::default()
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.text {
            Some(BlockText::Inline(text)) if TEXT_KINDS.contains(&self.kind.as_str()) => {
                out.push(text);
            }
            Some(BlockText::Object(node)) => node.collect(out),
            _ => {}
        }
        for child in self.elements.iter().chain(&self.fields) {
            child.collect(out);
        }
    }
}

/// Text of every text-bearing leaf in `blocks`, in document order.
#[must_use]
pub fn text_leaves(blocks: &[BlockNode]) -> Vec<&str> {
    let mut out = Vec::new();
    for block in blocks {
        block.collect(&mut out);
    }
    out
}
