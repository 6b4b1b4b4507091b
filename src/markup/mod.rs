//! Decoder for the small tag/attribute/text markup dialect spoken by the status API.
//!
//! The document is tokenized and then folded into a [`Tree`] by a recursive-descent
//! builder. Repeated sibling tags collapse into a [`Slot::Sequence`] in document order;
//! a tag seen once stays a [`Slot::Single`]. No entity decoding, namespaces or escaping
//! are performed. Anything outside that grammar is a [`DecodeError`], never a partial tree.
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use thiserror::Error;

mod tokenizer;

use tokenizer::{Token, Tokenizer};

const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("document contains no elements")]
    Empty,
    #[error("malformed tag at byte {at}")]
    InvalidTag { at: usize },
    #[error("malformed attribute at byte {at}")]
    InvalidAttribute { at: usize },
    #[error("unterminated markup starting at byte {at}")]
    Unterminated { at: usize },
    #[error("self-closing tag <{tag}/> at byte {at} is not supported")]
    SelfClosingTag { tag: String, at: usize },
    #[error("expected </{expected}> but found </{found}> at byte {at}")]
    MismatchedClose {
        expected: String,
        found: String,
        at: usize,
    },
    #[error("unexpected </{tag}> at byte {at}")]
    UnexpectedClose { tag: String, at: usize },
    #[error("element <{tag}> opened at byte {at} is never closed")]
    Unclosed { tag: String, at: usize },
    #[error("text outside of any element at byte {at}")]
    StrayText { at: usize },
    #[error("elements nested deeper than 64 levels")]
    TooDeep,
}

/// An ordered mapping from tag name to the element(s) found under that name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<(String, Slot)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Single(Element),
    Sequence(Vec<Element>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub attributes: HashMap<String, String>,
    pub content: Content,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Content {
    #[default]
    Empty,
    /// Trimmed inner text of an element without child elements.
    Text(String),
    Children(Tree),
}

impl Tree {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, slot)| slot)
    }

    /// The first element recorded under `name`.
    pub fn first(&self, name: &str) -> Option<&Element> {
        self.get(name).and_then(Slot::first)
    }

    /// Text of the first element recorded under `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.first(name).and_then(Element::text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.entries.iter().map(|(key, slot)| (key.as_str(), slot))
    }

    fn insert(&mut self, name: &str, element: Element) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => slot.push(element),
            None => self.entries.push((name.to_string(), Slot::Single(element))),
        }
    }
}

impl Slot {
    pub fn first(&self) -> Option<&Element> {
        self.elements().first()
    }

    pub fn elements(&self) -> &[Element] {
        match self {
            Slot::Single(element) => std::slice::from_ref(element),
            Slot::Sequence(elements) => elements,
        }
    }

    fn push(&mut self, element: Element) {
        match self {
            Slot::Sequence(elements) => elements.push(element),
            Slot::Single(_) => {
                if let Slot::Single(first) = std::mem::replace(self, Slot::Sequence(Vec::new())) {
                    *self = Slot::Sequence(vec![first, element]);
                }
            }
        }
    }
}

impl Element {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&Tree> {
        match &self.content {
            Content::Children(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Decodes `document` into a keyed tree of its top-level elements.
pub fn decode(document: &str) -> Result<Tree, DecodeError> {
    let mut builder = Builder {
        tokens: Tokenizer::new(document),
    };
    let tree = builder.top_level()?;
    if tree.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(tree)
}

struct Builder<'a> {
    tokens: Tokenizer<'a>,
}

impl<'a> Builder<'a> {
    fn top_level(&mut self) -> Result<Tree, DecodeError> {
        let mut tree = Tree::default();
        while let Some(token) = self.tokens.next() {
            match token? {
                Token::Open {
                    name,
                    attributes,
                    at,
                } => {
                    let element = self.element(name, attributes, at, 1)?;
                    tree.insert(name, element);
                }
                Token::Close { name, at } => {
                    return Err(DecodeError::UnexpectedClose {
                        tag: name.to_string(),
                        at,
                    });
                }
                Token::Text { text, at } => {
                    if !text.trim().is_empty() {
                        return Err(DecodeError::StrayText { at });
                    }
                }
            }
        }
        Ok(tree)
    }

    fn element(
        &mut self,
        tag: &str,
        attributes: HashMap<String, String>,
        opened_at: usize,
        depth: usize,
    ) -> Result<Element, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep);
        }

        let mut children = Tree::default();
        let mut text = String::new();

        loop {
            let Some(token) = self.tokens.next() else {
                return Err(DecodeError::Unclosed {
                    tag: tag.to_string(),
                    at: opened_at,
                });
            };
            match token? {
                Token::Open {
                    name,
                    attributes: child_attributes,
                    at,
                } => {
                    let child = self.element(name, child_attributes, at, depth + 1)?;
                    children.insert(name, child);
                }
                Token::Text { text: run, .. } => text.push_str(run),
                Token::Close { name, at } => {
                    if name != tag {
                        return Err(DecodeError::MismatchedClose {
                            expected: tag.to_string(),
                            found: name.to_string(),
                            at,
                        });
                    }
                    break;
                }
            }
        }

        // Mixed content keeps the child elements and drops the loose text.
        let content = if !children.is_empty() {
            Content::Children(children)
        } else {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Content::Empty
            } else {
                Content::Text(trimmed.to_string())
            }
        };

        Ok(Element {
            attributes,
            content,
        })
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, slot) in &self.entries {
            match slot {
                Slot::Single(element) => map.serialize_entry(key, element)?,
                Slot::Sequence(elements) => map.serialize_entry(key, elements)?,
            }
        }
        map.end()
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut attribute_names: Vec<&String> = self.attributes.keys().collect();
        attribute_names.sort();

        let mut map = serializer.serialize_map(None)?;
        for name in attribute_names {
            map.serialize_entry(name, &self.attributes[name])?;
        }
        match &self.content {
            Content::Empty => {}
            Content::Text(text) => map.serialize_entry("text", text)?,
            Content::Children(tree) => map.serialize_entry("children", tree)?,
        }
        map.end()
    }
}
