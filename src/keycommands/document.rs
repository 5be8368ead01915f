//! Loader and document model for Key Commands files
//!
//! Wraps a roxmltree document and builds a one-time index of named lists and
//! named items during load, so that extraction, resolution and merge never
//! rescan sibling lists.
//!
//! The dialect nests `list` → `item` → scalar fields:
//!
//! ```text
//! <KeyCommands>
//!    <list name="Categories" type="list">
//!       <item>
//!          <string name="Name" value="Macro"/>
//!          <list name="Commands" type="list">
//!             <item>
//!                <string name="Name" value="Bounce Selection"/>
//!                <string name="Key" value="Ctrl+Alt+B"/>
//!             </item>
//!          </list>
//!       </item>
//!    </list>
//!    <list name="Macros" type="list"> ... </list>
//! </KeyCommands>
//! ```

use std::collections::HashMap;

use roxmltree::{Document, Node, NodeId, ParsingOptions};

use super::errors::{KeyCommandsError, Result};

pub const ROOT_TAG: &str = "KeyCommands";
pub const CATEGORIES_LIST: &str = "Categories";
pub const MACROS_LIST: &str = "Macros";
pub const COMMANDS_LIST: &str = "Commands";
pub const MACRO_CATEGORY: &str = "Macro";
pub const NAME_FIELD: &str = "Name";
pub const DESCRIPTION_FIELD: &str = "Description";
pub const KEY_FIELD: &str = "Key";

/// Direct children of one parent, keyed by name (first occurrence wins)
type NamedChildren = HashMap<NodeId, HashMap<String, NodeId>>;

/// Parsed Key Commands document with its lookup index
pub struct KeyCommandsDocument<'input> {
    text: &'input str,
    tree: Document<'input>,
    lists: NamedChildren,
    items: NamedChildren,
}

impl<'input> KeyCommandsDocument<'input> {
    /// Parse a Key Commands file, requiring a <KeyCommands> root
    pub fn parse(text: &'input str) -> Result<Self> {
        let doc = Self::load(text)?;

        let root_tag = doc.root().tag_name().name();
        if root_tag != ROOT_TAG {
            return Err(KeyCommandsError::Schema {
                found: root_tag.to_string(),
            });
        }

        Ok(doc)
    }

    /// Parse any well-formed document of the dialect, whatever its root tag
    pub fn load(text: &'input str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut options = ParsingOptions::default();
        options.allow_dtd = true;

        let tree = Document::parse_with_options(text, options)
            .map_err(|e| KeyCommandsError::MalformedXml(e.to_string()))?;

        let (lists, items) = build_index(&tree);

        Ok(Self {
            text,
            tree,
            lists,
            items,
        })
    }

    /// Source text the document was parsed from (BOM stripped)
    pub fn text(&self) -> &'input str {
        self.text
    }

    pub fn root(&self) -> Node<'_, 'input> {
        self.tree.root_element()
    }

    /// Direct child `<list name=…>` of `parent`
    pub fn find_named_list(&self, parent: Node<'_, 'input>, name: &str) -> Option<Node<'_, 'input>> {
        self.lookup(&self.lists, parent, name)
    }

    /// Direct child `<list name=…>` of the root element
    pub fn root_list(&self, name: &str) -> Option<Node<'_, 'input>> {
        self.find_named_list(self.root(), name)
    }

    /// Direct child `<item>` of `list` whose `Name` field equals `name`
    pub fn find_named_item(&self, list: Node<'_, 'input>, name: &str) -> Option<Node<'_, 'input>> {
        self.lookup(&self.items, list, name)
    }

    /// Exact source text of a node
    pub fn snippet(&self, node: Node<'_, 'input>) -> &'input str {
        &self.text[node.range()]
    }

    /// Names of all categories under the root Categories list
    pub fn category_names(&self) -> Vec<&str> {
        self.root_list(CATEGORIES_LIST)
            .map(|list| {
                element_children(list)
                    .filter(|n| n.has_tag_name("item"))
                    .filter_map(|item| field_value(item, NAME_FIELD))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Category with the given name and its command entries
    pub fn category(&self, name: &str) -> Option<CategoryNode> {
        let categories = self.root_list(CATEGORIES_LIST)?;
        let item = self.find_named_item(categories, name)?;

        let entries = match self.find_named_list(item, COMMANDS_LIST) {
            Some(commands) => element_children(commands)
                .filter(|n| n.has_tag_name("item"))
                .filter_map(|entry| {
                    let entry_name = field_value(entry, NAME_FIELD)?;
                    Some(CategoryEntry {
                        name: entry_name.to_string(),
                        key_bindings: key_bindings(entry),
                        snippet: self.snippet(entry).to_string(),
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        Some(CategoryNode {
            name: name.to_string(),
            entries,
        })
    }

    fn lookup(&self, index: &NamedChildren, parent: Node<'_, 'input>, name: &str) -> Option<Node<'_, 'input>> {
        let id = index.get(&parent.id())?.get(name)?;
        self.tree.get_node(*id)
    }
}

/// A category under the Categories list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub name: String,
    pub entries: Vec<CategoryEntry>,
}

/// One command entry of a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEntry {
    pub name: String,
    pub key_bindings: Vec<String>,
    /// Verbatim source text of the entry's <item>
    pub snippet: String,
}

fn build_index(tree: &Document<'_>) -> (NamedChildren, NamedChildren) {
    let mut lists = NamedChildren::new();
    let mut items = NamedChildren::new();

    for node in tree.descendants().filter(Node::is_element) {
        let Some(parent) = node.parent_element() else {
            continue;
        };

        if node.has_tag_name("list") {
            if let Some(name) = node.attribute("name") {
                lists
                    .entry(parent.id())
                    .or_default()
                    .entry(name.to_string())
                    .or_insert(node.id());
            }
        } else if node.has_tag_name("item") && parent.has_tag_name("list") {
            if let Some(name) = field_value(node, NAME_FIELD) {
                items
                    .entry(parent.id())
                    .or_default()
                    .entry(name.to_string())
                    .or_insert(node.id());
            }
        }
    }

    (lists, items)
}

// ============================================================================
// NODE HELPERS
// ============================================================================

pub fn element_children<'a, 'input: 'a>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// True for `<string>`, `<int>`, `<float>`... fields carrying a value attribute
pub fn is_scalar_field(node: Node) -> bool {
    node.is_element()
        && !node.has_tag_name("list")
        && !node.has_tag_name("item")
        && node.attribute("name").is_some()
        && node.attribute("value").is_some()
}

/// Value of the direct scalar child whose `name` attribute equals `field`
pub fn field_value<'a>(node: Node<'a, '_>, field: &str) -> Option<&'a str> {
    node.children()
        .find(|n| is_scalar_field(*n) && n.attribute("name") == Some(field))
        .and_then(|n| n.attribute("value"))
}

/// Key bindings of a reference item, in document order
///
/// Accepts both `<string name="Key" value=…/>` fields and a
/// `<list name="Key">` of `<item value=…/>`.
pub fn key_bindings(item: Node) -> Vec<String> {
    let mut bindings = Vec::new();

    for child in element_children(item) {
        if child.attribute("name") != Some(KEY_FIELD) {
            continue;
        }

        if child.has_tag_name("list") {
            bindings.extend(
                element_children(child)
                    .filter_map(|entry| entry.attribute("value"))
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
            );
        } else if let Some(value) = child.attribute("value").filter(|v| !v.is_empty()) {
            bindings.push(value.to_string());
        }
    }

    bindings
}
