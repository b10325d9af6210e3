//! Blocks and documents.
//!
//! A [`Document`] is what ends up in one `.tf` file. It is built once by a
//! generator, validated, formatted with `hcl::format` and then dropped.

use std::collections::HashSet;

use hcl::{Attribute, Block, BlockLabel, Body, Expression, Identifier, Structure};

use crate::error::{HclError, HclResult};
use crate::reference::{collect_roots, Reference};

/// Builder helpers for [`hcl::Block`].
pub trait BlockExt {
    /// Set an attribute. Writing the same name twice keeps its original
    /// position and the last value. Attributes stay ahead of nested blocks.
    fn set(&mut self, name: &str, value: impl Into<Expression>) -> &mut Self;

    /// Set an attribute only when a value is present.
    fn set_opt<V: Into<Expression>>(&mut self, name: &str, value: Option<V>) -> &mut Self;

    /// Set a string attribute only when it is not empty.
    fn set_non_empty(&mut self, name: &str, value: &str) -> &mut Self;

    /// Append a nested block populated by `build`.
    fn add_child(&mut self, kind: &str, build: impl FnOnce(&mut Block)) -> &mut Self;

    fn get(&self, name: &str) -> Option<&Expression>;

    /// Nested blocks of the given kind.
    fn children<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a;

    /// `kind "label1" "label2"`, used for diagnostics and uniqueness checks.
    fn label_path(&self) -> String;
}

impl BlockExt for Block {
    fn set(&mut self, name: &str, value: impl Into<Expression>) -> &mut Self {
        let attr = Structure::Attribute(Attribute::new(Identifier::unchecked(name), value));
        let structures = &mut self.body.0;
        let existing = structures
            .iter()
            .position(|s| matches!(s, Structure::Attribute(a) if a.key.as_str() == name));
        match existing {
            Some(at) => structures[at] = attr,
            None => {
                let at = structures
                    .iter()
                    .position(Structure::is_block)
                    .unwrap_or(structures.len());
                structures.insert(at, attr);
            }
        }
        self
    }

    fn set_opt<V: Into<Expression>>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    fn set_non_empty(&mut self, name: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.set(name, value);
        }
        self
    }

    fn add_child(&mut self, kind: &str, build: impl FnOnce(&mut Block)) -> &mut Self {
        let mut child = Block::new(Identifier::unchecked(kind));
        build(&mut child);
        self.body.0.push(Structure::Block(child));
        self
    }

    fn get(&self, name: &str) -> Option<&Expression> {
        self.body
            .attributes()
            .find(|attr| attr.key.as_str() == name)
            .map(|attr| &attr.expr)
    }

    fn children<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.body.blocks().filter(move |b| b.identifier.as_str() == kind)
    }

    fn label_path(&self) -> String {
        let mut path = self.identifier.as_str().to_string();
        for label in &self.labels {
            path.push_str(&format!(" {:?}", label.as_str()));
        }
        path
    }
}

fn check_identifier(name: &str) -> HclResult<()> {
    Identifier::new(name)
        .map(|_| ())
        .map_err(|_| HclError::InvalidIdentifier(name.to_string()))
}

fn validate_block(block: &Block) -> HclResult<()> {
    check_identifier(block.identifier.as_str())?;
    for attr in block.body.attributes() {
        check_identifier(attr.key.as_str())?;
    }
    block.body.blocks().try_for_each(validate_block)
}

fn block_roots(block: &Block, roots: &mut Vec<Reference>) {
    for attr in block.body.attributes() {
        collect_roots(&attr.expr, roots);
    }
    for child in block.body.blocks() {
        block_roots(child, roots);
    }
}

/// An ordered sequence of top-level blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level block and return it for population.
    ///
    /// Labels are taken as given; keeping them unique is up to the caller.
    pub fn add_block<I, S>(&mut self, kind: &str, labels: I) -> &mut Block
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut block = Block::new(Identifier::unchecked(kind));
        block.labels = labels
            .into_iter()
            .map(|label| BlockLabel::String(label.into()))
            .collect();
        self.blocks.push(block);
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    /// Append an already built block.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Find a top-level block by kind and labels.
    pub fn find(&self, kind: &str, labels: &[&str]) -> Option<&Block> {
        self.blocks.iter().find(|b| {
            b.identifier.as_str() == kind
                && b.labels.len() == labels.len()
                && b.labels.iter().zip(labels).all(|(a, b)| a.as_str() == *b)
        })
    }

    /// Every reference used anywhere in the document, in order of appearance.
    pub fn references(&self) -> Vec<Reference> {
        let mut roots = Vec::new();
        for block in &self.blocks {
            block_roots(block, &mut roots);
        }
        roots
    }

    /// Check identifiers and that no two top-level blocks share a label path.
    pub fn validate(&self) -> HclResult<()> {
        let mut seen = HashSet::new();
        for block in &self.blocks {
            validate_block(block)?;
            if !block.labels.is_empty() && !seen.insert(block.label_path()) {
                return Err(HclError::DuplicateBlock(block.label_path()));
            }
        }
        Ok(())
    }

    pub fn to_body(&self) -> Body {
        Body(self.blocks.iter().cloned().map(Structure::Block).collect())
    }

    /// Serialize to HCL bytes.
    pub fn to_bytes(&self) -> HclResult<Vec<u8>> {
        Ok(hcl::format::to_vec(&self.to_body())?)
    }
}

/// Format a document as HCL text. The same document always yields the same text.
pub fn to_string(doc: &Document) -> HclResult<String> {
    Ok(hcl::format::to_string(&doc.to_body())?)
}
