use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use smartstring::alias::String as SmartString;

use crate::parser::QName;

use super::Document;

static NEXT_DOCUMENT_SERIAL: AtomicU32 = AtomicU32::new(1);

pub(crate) fn next_document_serial() -> u32 {
	NEXT_DOCUMENT_SERIAL.fetch_add(1, Ordering::Relaxed)
}

/**
# Node handle

Identifies a node inside the arena of its [`Document`]. Handles are unique
within the process: they combine the document's serial number with the
node's slot, so a handle can never be mistaken for a node of another
document.

Handles are never reused; detached nodes stay allocated until the document
is dropped.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
	pub(crate) doc: u32,
	pub(crate) index: u32,
}

impl NodeId {
	pub(crate) fn slot(self) -> usize {
		self.index as usize
	}
}

impl fmt::Debug for NodeId {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "NodeId({}#{})", self.doc, self.index)
	}
}

/// The nine node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Element,
	Attribute,
	Text,
	CDataSection,
	ProcessingInstruction,
	Comment,
	Document,
	DocumentType,
	DocumentFragment,
}

impl NodeKind {
	/// The numeric node type used by DOM level 1.
	pub fn code(self) -> u16 {
		match self {
			NodeKind::Element => 1,
			NodeKind::Attribute => 2,
			NodeKind::Text => 3,
			NodeKind::CDataSection => 4,
			NodeKind::ProcessingInstruction => 7,
			NodeKind::Comment => 8,
			NodeKind::Document => 9,
			NodeKind::DocumentType => 10,
			NodeKind::DocumentFragment => 11,
		}
	}

	/// Whether nodes of this kind can have children.
	pub fn has_child_nodes_capability(self) -> bool {
		match self {
			NodeKind::Element | NodeKind::Document | NodeKind::DocumentFragment => true,
			_ => false,
		}
	}

	/// Whether nodes of this kind carry character data.
	pub fn is_character_data(self) -> bool {
		match self {
			NodeKind::Text | NodeKind::CDataSection | NodeKind::Comment => true,
			_ => false,
		}
	}

	/// Text or CDATA section.
	pub fn is_text(self) -> bool {
		match self {
			NodeKind::Text | NodeKind::CDataSection => true,
			_ => false,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeData {
	Document,
	DocumentFragment,
	DocumentType { name: SmartString, text: String },
	Element { name: QName, attributes: Vec<NodeId> },
	Attribute { name: QName, value: String, owner: Option<NodeId> },
	Text(String),
	CData(String),
	Comment(String),
	ProcessingInstruction { target: SmartString, data: String },
}

impl NodeData {
	pub(crate) fn kind(&self) -> NodeKind {
		match self {
			NodeData::Document => NodeKind::Document,
			NodeData::DocumentFragment => NodeKind::DocumentFragment,
			NodeData::DocumentType { .. } => NodeKind::DocumentType,
			NodeData::Element { .. } => NodeKind::Element,
			NodeData::Attribute { .. } => NodeKind::Attribute,
			NodeData::Text(_) => NodeKind::Text,
			NodeData::CData(_) => NodeKind::CDataSection,
			NodeData::Comment(_) => NodeKind::Comment,
			NodeData::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
		}
	}
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
	pub(crate) data: NodeData,
	pub(crate) parent: Option<NodeId>,
	pub(crate) children: Vec<NodeId>,
}

impl Node {
	pub(crate) fn new(data: NodeData) -> Node {
		Node {
			data,
			parent: None,
			children: Vec::new(),
		}
	}
}

/// Extract the name of a DOCTYPE declaration (`<!DOCTYPE name ...>`).
pub(crate) fn doctype_name(text: &str) -> SmartString {
	let body = text.trim_start_matches("<!").trim_start();
	let body = match body.get(..7) {
		Some(head) if head.eq_ignore_ascii_case("DOCTYPE") => &body[7..],
		_ => body,
	};
	body.trim_start()
		.split(|c: char| c.is_whitespace() || c == '[' || c == '>')
		.next()
		.unwrap_or("")
		.into()
}

/**
Read access to nodes.

All accessors panic if the [`NodeId`] belongs to a different document; use
[`Document::contains`] to check handles of unknown origin.
*/
impl Document {
	pub(crate) fn node(&self, id: NodeId) -> &Node {
		if id.doc != self.serial {
			panic!("{:?} does not belong to document {}", id, self.serial);
		}
		&self.nodes[id.slot()]
	}

	pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
		if id.doc != self.serial {
			panic!("{:?} does not belong to document {}", id, self.serial);
		}
		&mut self.nodes[id.slot()]
	}

	/// Whether `id` is a node of this document.
	pub fn contains(&self, id: NodeId) -> bool {
		id.doc == self.serial && id.slot() < self.nodes.len()
	}

	/// Kind of the node.
	pub fn kind(&self, id: NodeId) -> NodeKind {
		self.node(id).data.kind()
	}

	/**
	Name of the node.

	Elements and attributes return their qualified name, processing
	instructions their target and document types their root element name.
	The other kinds return a fixed `#...` name.
	*/
	pub fn node_name(&self, id: NodeId) -> &str {
		match &self.node(id).data {
			NodeData::Document => "#document",
			NodeData::DocumentFragment => "#document-fragment",
			NodeData::DocumentType { name, .. } => name.as_str(),
			NodeData::Element { name, .. } | NodeData::Attribute { name, .. } => name.name.as_str(),
			NodeData::Text(_) => "#text",
			NodeData::CData(_) => "#cdata-section",
			NodeData::Comment(_) => "#comment",
			NodeData::ProcessingInstruction { target, .. } => target.as_str(),
		}
	}

	/// Textual payload of character data, attributes and processing
	/// instructions.
	pub fn node_value(&self, id: NodeId) -> Option<&str> {
		match &self.node(id).data {
			NodeData::Attribute { value, .. } => Some(value.as_str()),
			NodeData::Text(v) | NodeData::CData(v) | NodeData::Comment(v) => Some(v.as_str()),
			NodeData::ProcessingInstruction { data, .. } => Some(data.as_str()),
			_ => None,
		}
	}

	pub(crate) fn qname(&self, id: NodeId) -> Option<&QName> {
		match &self.node(id).data {
			NodeData::Element { name, .. } | NodeData::Attribute { name, .. } => Some(name),
			_ => None,
		}
	}

	/// Namespace URI of an element or attribute, or the empty string.
	pub fn namespace_uri(&self, id: NodeId) -> &str {
		self.qname(id).map(|q| q.uri()).unwrap_or("")
	}

	/// Namespace prefix of an element or attribute, or the empty string.
	pub fn prefix(&self, id: NodeId) -> &str {
		self.qname(id).map(|q| q.prefix.as_str()).unwrap_or("")
	}

	/// Local name of an element or attribute, or the empty string.
	pub fn local_name(&self, id: NodeId) -> &str {
		self.qname(id).map(|q| q.local_name.as_str()).unwrap_or("")
	}

	/// Parent node.
	///
	/// Attributes have no parent, see [`Document::owner_element`].
	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.node(id).parent
	}

	/// Children in document order.
	pub fn children(&self, id: NodeId) -> &[NodeId] {
		&self.node(id).children
	}

	pub fn child_count(&self, id: NodeId) -> usize {
		self.node(id).children.len()
	}

	pub fn has_child_nodes(&self, id: NodeId) -> bool {
		!self.node(id).children.is_empty()
	}

	pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
		self.node(id).children.first().copied()
	}

	pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
		self.node(id).children.last().copied()
	}

	/// Position of `id` in the child list of its parent.
	pub(crate) fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
		let parent = self.node(id).parent?;
		let index = self.node(parent).children.iter().position(|c| *c == id)?;
		Some((parent, index))
	}

	pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
		let (parent, index) = self.index_in_parent(id)?;
		if index == 0 {
			return None;
		}
		self.node(parent).children.get(index - 1).copied()
	}

	pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
		let (parent, index) = self.index_in_parent(id)?;
		self.node(parent).children.get(index + 1).copied()
	}

	/// The document node owning `id`, or `None` for the document node
	/// itself.
	pub fn owner_document(&self, id: NodeId) -> Option<NodeId> {
		match self.node(id).data {
			NodeData::Document => None,
			_ => Some(self.document_node()),
		}
	}

	/// Attribute nodes of an element in document order.
	///
	/// Empty for other node kinds.
	pub fn attributes(&self, id: NodeId) -> &[NodeId] {
		match &self.node(id).data {
			NodeData::Element { attributes, .. } => attributes,
			_ => &[],
		}
	}

	/// Element an attribute node is attached to.
	pub fn owner_element(&self, id: NodeId) -> Option<NodeId> {
		match &self.node(id).data {
			NodeData::Attribute { owner, .. } => *owner,
			_ => None,
		}
	}

	/// Whether `ancestor` is `id` or one of its ancestors.
	pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
		let mut current = Some(id);
		while let Some(node) = current {
			if node == ancestor {
				return true;
			}
			current = self.node(node).parent;
		}
		false
	}

	/**
	Concatenated character data.

	For elements, documents and fragments this is the text of all Text and
	CDATA descendants in document order. Other kinds return their value.
	*/
	pub fn text(&self, id: NodeId) -> String {
		match &self.node(id).data {
			NodeData::Element { .. } | NodeData::Document | NodeData::DocumentFragment => {
				let mut out = String::new();
				self.collect_text(id, &mut out);
				out
			}
			NodeData::DocumentType { text, .. } => text.clone(),
			_ => self.node_value(id).unwrap_or("").to_string(),
		}
	}

	fn collect_text(&self, id: NodeId, out: &mut String) {
		for child in self.node(id).children.iter() {
			match &self.node(*child).data {
				NodeData::Text(v) | NodeData::CData(v) => out.push_str(v),
				NodeData::Element { .. } => self.collect_text(*child, out),
				_ => (),
			}
		}
	}

	/// Verbatim text of a document type declaration.
	pub fn doctype_text(&self, id: NodeId) -> Option<&str> {
		match &self.node(id).data {
			NodeData::DocumentType { text, .. } => Some(text.as_str()),
			_ => None,
		}
	}
}
