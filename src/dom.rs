//! A small retained element tree.
//!
//! Renderers describe markup with [`El`] and mount it into a [`Document`];
//! patchers then mutate individual nodes through [`NodeId`] handles. Every
//! setter compares before writing and only counts a mutation when the value
//! actually changes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Markup description used by renderers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct El {
    tag: String,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    text: Option<String>,
    children: Vec<El>,
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    /// Sets the `id` attribute, which also makes the node findable.
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id.into())
    }

    pub fn attr(mut self, name: &str, value: impl ToString) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn attr_if(self, cond: bool, name: &str, value: impl ToString) -> Self {
        if cond { self.attr(name, value) } else { self }
    }

    pub fn style(mut self, name: &str, value: impl ToString) -> Self {
        self.styles.insert(name.to_string(), value.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        for c in class.split_whitespace() {
            self.classes.insert(c.to_string());
        }
        self
    }

    pub fn class_if(self, cond: bool, class: &str) -> Self {
        if cond { self.class(class) } else { self }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: El) -> Self {
        self.children.push(child);
        self
    }

    pub fn child_if(self, cond: bool, child: impl FnOnce() -> El) -> Self {
        if cond { self.child(child()) } else { self }
    }

    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    live: bool,
}

/// The card's visual root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    ids: HashMap<String, NodeId>,
    root: NodeId,
    mutations: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "root".to_string(),
                attrs: BTreeMap::new(),
                styles: BTreeMap::new(),
                classes: BTreeSet::new(),
                text: None,
                children: Vec::new(),
                parent: None,
                live: true,
            }],
            ids: HashMap::new(),
            root: NodeId(0),
            mutations: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of effective writes since creation.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Drops everything and mounts `content` as the only child of the root.
    pub fn replace_root(&mut self, content: El) -> NodeId {
        self.clear_children(self.root);
        self.mount(self.root, content)
    }

    /// Replaces the children of `parent` with `content`.
    pub fn replace_children(&mut self, parent: NodeId, content: Vec<El>) -> Vec<NodeId> {
        self.clear_children(parent);
        content.into_iter().map(|el| self.mount(parent, el)).collect()
    }

    pub fn mount(&mut self, parent: NodeId, el: El) -> NodeId {
        let id = NodeId(self.nodes.len());
        if let Some(key) = el.attrs.get("id") {
            self.ids.insert(key.clone(), id);
        }
        self.nodes.push(Node {
            tag: el.tag,
            attrs: el.attrs,
            styles: el.styles,
            classes: el.classes,
            text: el.text,
            children: Vec::new(),
            parent: Some(parent),
            live: true,
        });
        self.nodes[parent.0].children.push(id);
        self.mutations += 1;
        for child in el.children {
            self.mount(id, child);
        }
        id
    }

    fn clear_children(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        if !children.is_empty() {
            self.mutations += 1;
        }
        let mut stack = children;
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.live = false;
            stack.append(&mut node.children);
            if let Some(key) = node.attrs.get("id") {
                if self.ids.get(key) == Some(&id) {
                    self.ids.remove(key);
                }
            }
        }
    }

    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Live descendants of `scope` carrying attribute `name`, in document order.
    pub fn find_all_with(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(scope, &mut |id, node| {
            if node.attrs.contains_key(name) {
                found.push(id);
            }
        });
        found
    }

    fn walk(&self, id: NodeId, f: &mut impl FnMut(NodeId, &Node)) {
        let node = &self.nodes[id.0];
        if !node.live {
            return;
        }
        f(id, node);
        for child in &node.children {
            self.walk(*child, f);
        }
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attrs.get(name).map(String::as_str)
    }

    pub fn style_of(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].styles.get(name).map(String::as_str)
    }

    pub fn text_of(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes[id.0].classes.contains(class)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl ToString) -> bool {
        let value = value.to_string();
        let attrs = &mut self.nodes[id.0].attrs;
        if attrs.get(name) == Some(&value) {
            return false;
        }
        attrs.insert(name.to_string(), value);
        self.mutations += 1;
        true
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> bool {
        let text = text.into();
        let node = &mut self.nodes[id.0];
        if node.text.as_deref() == Some(text.as_str()) {
            return false;
        }
        node.text = Some(text);
        self.mutations += 1;
        true
    }

    /// Sets an inline style; an empty value removes it.
    pub fn set_style(&mut self, id: NodeId, name: &str, value: impl ToString) -> bool {
        let value = value.to_string();
        let styles = &mut self.nodes[id.0].styles;
        let changed = if value.is_empty() {
            styles.remove(name).is_some()
        } else if styles.get(name) == Some(&value) {
            false
        } else {
            styles.insert(name.to_string(), value);
            true
        };
        if changed {
            self.mutations += 1;
        }
        changed
    }

    pub fn set_class(&mut self, id: NodeId, class: &str, on: bool) -> bool {
        let classes = &mut self.nodes[id.0].classes;
        let changed = if on {
            classes.insert(class.to_string())
        } else {
            classes.remove(class)
        };
        if changed {
            self.mutations += 1;
        }
        changed
    }

    /// Serializes the live tree as markup.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for child in &self.nodes[self.root.0].children {
            self.write_node(*child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        let _ = write!(out, "<{}", node.tag);
        for (name, value) in &node.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        if !node.classes.is_empty() {
            let classes: Vec<&str> = node.classes.iter().map(String::as_str).collect();
            let _ = write!(out, " class=\"{}\"", escape(&classes.join(" ")));
        }
        if !node.styles.is_empty() {
            let styles: Vec<String> = node
                .styles
                .iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect();
            let _ = write!(out, " style=\"{}\"", escape(&styles.join(";")));
        }
        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &node.text {
            out.push_str(&escape(text));
        }
        for child in &node.children {
            self.write_node(*child, out);
        }
        let _ = write!(out, "</{}>", node.tag);
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> El {
        El::new("div")
            .id("card")
            .class("card glow")
            .child(El::new("span").id("value").text("--"))
            .child(El::new("rect").attr("data-ci", 0).attr("fill", "#000"))
            .child(El::new("rect").attr("data-ci", 1).attr("fill", "#000"))
    }

    #[test]
    fn setters_only_count_real_changes() {
        let mut doc = Document::new();
        doc.replace_root(sample());
        let value = doc.find("value").unwrap();
        let before = doc.mutations();

        assert!(doc.set_text(value, "21.5"));
        assert!(!doc.set_text(value, "21.5"));
        assert_eq!(doc.mutations(), before + 1);
    }

    #[test]
    fn rebuild_drops_stale_ids() {
        let mut doc = Document::new();
        doc.replace_root(sample());
        doc.replace_root(El::new("div").id("other"));
        assert!(doc.find("value").is_none());
        assert!(doc.find("other").is_some());
        assert!(doc.find_all_with(doc.root(), "data-ci").is_empty());
    }

    #[test]
    fn markup_is_deterministic() {
        let mut doc = Document::new();
        doc.replace_root(El::new("p").attr("b", 1).attr("a", "x&y").text("<hi>"));
        assert_eq!(doc.to_markup(), "<p a=\"x&amp;y\" b=\"1\">&lt;hi&gt;</p>");
    }

    #[test]
    fn classes_and_styles_toggle() {
        let mut doc = Document::new();
        let card = doc.replace_root(sample());
        assert!(doc.has_class(card, "glow"));
        assert!(doc.set_class(card, "glow", false));
        assert!(!doc.set_class(card, "glow", false));
        assert!(doc.set_style(card, "opacity", "0.5"));
        assert!(doc.set_style(card, "opacity", ""));
        assert_eq!(doc.style_of(card, "opacity"), None);
    }
}
