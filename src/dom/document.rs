use std::fmt;

use smartstring::alias::String as SmartString;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::parser::{split_name, NamespaceName, QName, RcPtr};

use super::node::{doctype_name, next_document_serial, Node, NodeData, NodeId};
use super::NodeKind;

/**
# Document

Owns the arena holding every node created through its factories. Nodes
stay allocated for the lifetime of the document, whether they are attached
to the tree or not; handles to detached nodes remain valid and the nodes can
be reattached later.

The document node itself is created with the document and can have at most
one element child (the document element) and at most one document type
child.
*/
pub struct Document {
	pub(crate) serial: u32,
	pub(crate) nodes: Vec<Node>,
	ctx: RcPtr<Context>,
	expand_empty_tags: bool,
	empty_tag_exceptions: Vec<SmartString>,
}

/// Owned copy of a subtree, used to move nodes between arenas.
struct Snapshot {
	data: NodeData,
	attributes: Vec<Snapshot>,
	children: Vec<Snapshot>,
}

impl Document {
	/// Create an empty document with its own [`Context`].
	pub fn new() -> Document {
		Self::with_context(RcPtr::new(Context::new()))
	}

	/// Create an empty document sharing the given [`Context`].
	pub fn with_context(ctx: RcPtr<Context>) -> Document {
		let serial = next_document_serial();
		Document {
			serial,
			nodes: vec![Node::new(NodeData::Document)],
			ctx,
			expand_empty_tags: false,
			empty_tag_exceptions: Vec::new(),
		}
	}

	/// The shared context, holding the entity table.
	pub fn context(&self) -> &RcPtr<Context> {
		&self.ctx
	}

	/// The document node.
	pub fn document_node(&self) -> NodeId {
		NodeId {
			doc: self.serial,
			index: 0,
		}
	}

	/// Number of allocated nodes, attached or not.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.len() == 1
	}

	/// The element child of the document node.
	pub fn document_element(&self) -> Option<NodeId> {
		self.find_top_level(NodeKind::Element)
	}

	/// The document type child of the document node.
	pub fn doctype(&self) -> Option<NodeId> {
		self.find_top_level(NodeKind::DocumentType)
	}

	/// The top-level `xml` processing instruction, if present.
	pub fn xml_declaration(&self) -> Option<NodeId> {
		self.children(self.document_node())
			.iter()
			.copied()
			.find(|c| match &self.node(*c).data {
				NodeData::ProcessingInstruction { target, .. } => target.as_str() == "xml",
				_ => false,
			})
	}

	fn find_top_level(&self, kind: NodeKind) -> Option<NodeId> {
		self.children(self.document_node())
			.iter()
			.copied()
			.find(|c| self.kind(*c) == kind)
	}

	/**
	Configure how childless elements are serialized.

	By default, childless elements are written as self-closed tags, except
	for the names in `exceptions`, which get an explicit end tag. If
	`expand` is true, the roles are swapped: childless elements get an
	explicit end tag, except for the names in `exceptions`.
	*/
	pub fn set_expand_empty_tags<I, T>(&mut self, expand: bool, exceptions: I)
	where
		I: IntoIterator<Item = T>,
		T: Into<SmartString>,
	{
		self.expand_empty_tags = expand;
		self.empty_tag_exceptions = exceptions.into_iter().map(|x| x.into()).collect();
	}

	pub fn expand_empty_tags(&self) -> bool {
		self.expand_empty_tags
	}

	pub fn empty_tag_exceptions(&self) -> &[SmartString] {
		&self.empty_tag_exceptions
	}

	pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
		let id = NodeId {
			doc: self.serial,
			index: self.nodes.len() as u32,
		};
		self.nodes.push(Node::new(data));
		id
	}

	fn intern(&self, uri: &str) -> Option<NamespaceName> {
		if uri.is_empty() {
			None
		} else {
			Some(self.ctx.intern_uri(uri))
		}
	}

	pub(crate) fn alloc_element(&mut self, name: QName) -> NodeId {
		self.alloc(NodeData::Element {
			name,
			attributes: Vec::new(),
		})
	}

	pub(crate) fn alloc_attribute(&mut self, name: QName, value: String) -> NodeId {
		self.alloc(NodeData::Attribute {
			name,
			value,
			owner: None,
		})
	}

	/// Create an element without namespace information.
	pub fn create_element(&mut self, name: &str) -> NodeId {
		self.alloc_element(QName::plain(name))
	}

	/// Create an element in the namespace `uri` (none if empty).
	pub fn create_element_ns(&mut self, uri: &str, qualified_name: &str) -> NodeId {
		let uri = self.intern(uri);
		self.alloc_element(QName::namespaced(uri, qualified_name))
	}

	pub fn create_text_node(&mut self, data: &str) -> NodeId {
		self.alloc(NodeData::Text(data.to_string()))
	}

	pub fn create_cdata_section(&mut self, data: &str) -> NodeId {
		self.alloc(NodeData::CData(data.to_string()))
	}

	pub fn create_comment(&mut self, data: &str) -> NodeId {
		self.alloc(NodeData::Comment(data.to_string()))
	}

	pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
		self.alloc(NodeData::ProcessingInstruction {
			target: target.into(),
			data: data.to_string(),
		})
	}

	/// Create a detached attribute with an empty value.
	pub fn create_attribute(&mut self, name: &str) -> NodeId {
		self.alloc_attribute(QName::plain(name), String::new())
	}

	/// Create a detached attribute in the namespace `uri` (none if empty).
	pub fn create_attribute_ns(&mut self, uri: &str, qualified_name: &str) -> NodeId {
		let uri = self.intern(uri);
		self.alloc_attribute(QName::namespaced(uri, qualified_name), String::new())
	}

	pub fn create_document_fragment(&mut self) -> NodeId {
		self.alloc(NodeData::DocumentFragment)
	}

	/// Create a document type node from a verbatim declaration such as
	/// `<!DOCTYPE html>`.
	pub fn create_document_type(&mut self, declaration: &str) -> NodeId {
		self.alloc(NodeData::DocumentType {
			name: doctype_name(declaration),
			text: declaration.to_string(),
		})
	}

	fn snapshot(&self, id: NodeId, deep: bool) -> Snapshot {
		let node = self.node(id);
		let mut data = node.data.clone();
		let attributes = match &mut data {
			NodeData::Element { attributes, .. } => {
				attributes.drain(..).map(|a| self.snapshot(a, false)).collect()
			}
			NodeData::Attribute { owner, .. } => {
				*owner = None;
				Vec::new()
			}
			_ => Vec::new(),
		};
		let children = if deep {
			node.children.iter().map(|c| self.snapshot(*c, true)).collect()
		} else {
			Vec::new()
		};
		Snapshot {
			data,
			attributes,
			children,
		}
	}

	fn materialize(&mut self, snapshot: Snapshot) -> NodeId {
		let Snapshot {
			mut data,
			attributes,
			children,
		} = snapshot;
		// namespace URIs are re-interned in this document's context
		match &mut data {
			NodeData::Element { name, .. } | NodeData::Attribute { name, .. } => {
				if let Some(uri) = name.namespace_uri.take() {
					name.namespace_uri = Some(self.ctx.intern_uri(&uri));
				}
			}
			_ => (),
		}
		let id = self.alloc(data);
		for attr in attributes {
			let attr_id = self.materialize(attr);
			if let NodeData::Attribute { owner, .. } = &mut self.node_mut(attr_id).data {
				*owner = Some(id);
			}
			if let NodeData::Element { attributes, .. } = &mut self.node_mut(id).data {
				attributes.push(attr_id);
			}
		}
		for child in children {
			let child_id = self.materialize(child);
			self.node_mut(child_id).parent = Some(id);
			self.node_mut(id).children.push(child_id);
		}
		id
	}

	/**
	Copy a node of this document.

	Attributes of elements are always copied; children only if `deep` is
	set. The copy is detached. The document node cannot be cloned.
	*/
	pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Result<NodeId> {
		if self.kind(id) == NodeKind::Document {
			return Err(Error::AbstractOperation("the document node cannot be cloned"));
		}
		let snapshot = self.snapshot(id, deep);
		Ok(self.materialize(snapshot))
	}

	/**
	Copy a node of another document into this one.

	Works like [`Document::clone_node`]; the source document is left
	untouched.
	*/
	pub fn import_node(&mut self, source: &Document, id: NodeId, deep: bool) -> Result<NodeId> {
		if source.kind(id) == NodeKind::Document {
			return Err(Error::AbstractOperation("a document node cannot be imported"));
		}
		let snapshot = source.snapshot(id, deep);
		Ok(self.materialize(snapshot))
	}

	/// Find the namespace URI bound to `prefix` (empty for the default
	/// namespace) by the declaration attributes of `element` and its
	/// ancestors.
	pub fn lookup_namespace_uri(&self, element: NodeId, prefix: &str) -> Option<&str> {
		let mut current = Some(element);
		while let Some(node) = current {
			for attr in self.attributes(node) {
				if let NodeData::Attribute { name, value, .. } = &self.node(*attr).data {
					let (p, local) = split_name(&name.name);
					let declared = if p == "xmlns" {
						local == prefix
					} else {
						p.is_empty() && local == "xmlns" && prefix.is_empty()
					};
					if declared {
						return Some(value.as_str()).filter(|v| !v.is_empty());
					}
				}
			}
			current = self.parent(node);
		}
		None
	}
}

impl Default for Document {
	fn default() -> Document {
		Document::new()
	}
}

impl fmt::Debug for Document {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Document")
			.field("serial", &self.serial)
			.field("nodes", &self.nodes.len())
			.field("document_element", &self.document_element())
			.finish()
	}
}
