/*!
# Structural and value mutation

Every operation validates its arguments completely before touching the
arena; on error the document is exactly as it was before the call.
*/
use std::ops::Range;

use crate::error::{Error, Result};
use crate::parser::{split_name, QName};

use super::node::{NodeData, NodeId};
use super::{Document, NodeKind};

fn rejected(e: Error) -> Error {
	log::trace!(target: "rxdom::dom", "rejected mutation: {}", e);
	e
}

/// Byte range of `count` chars starting at the char `offset` of `data`.
fn char_range(data: &str, offset: usize, count: usize) -> Result<Range<usize>> {
	let length = data.chars().count();
	let end = match offset.checked_add(count) {
		Some(end) if end <= length => end,
		_ => {
			return Err(rejected(Error::IndexSize {
				offset,
				count,
				length,
			}))
		}
	};
	let byte_offset = |n: usize| {
		data.char_indices()
			.map(|(i, _)| i)
			.nth(n)
			.unwrap_or_else(|| data.len())
	};
	Ok(byte_offset(offset)..byte_offset(end))
}

impl Document {
	fn check_handle(&self, id: NodeId) -> Result<()> {
		if self.contains(id) {
			Ok(())
		} else {
			Err(rejected(Error::HierarchyViolation(
				"node belongs to another document",
			)))
		}
	}

	fn check_element(&self, id: NodeId) -> Result<()> {
		self.check_handle(id)?;
		if self.kind(id) != NodeKind::Element {
			return Err(rejected(Error::AbstractOperation(
				"only elements have attributes",
			)));
		}
		Ok(())
	}

	/// Nodes which would be inserted when inserting `new`.
	fn incoming(&self, new: NodeId) -> Vec<NodeId> {
		match self.kind(new) {
			NodeKind::DocumentFragment => self.children(new).to_vec(),
			_ => vec![new],
		}
	}

	/// Check that `new` may be inserted under `parent`, optionally in place
	/// of `replaced`, and return the nodes which will be inserted.
	fn validate_insertion(
		&self,
		parent: NodeId,
		new: NodeId,
		replaced: Option<NodeId>,
	) -> Result<Vec<NodeId>> {
		self.check_handle(parent)?;
		self.check_handle(new)?;
		let parent_kind = self.kind(parent);
		if !parent_kind.has_child_nodes_capability() {
			return Err(rejected(Error::AbstractOperation(
				"node kind cannot have children",
			)));
		}
		match self.kind(new) {
			NodeKind::Attribute => {
				return Err(rejected(Error::HierarchyViolation(
					"attributes cannot be inserted as children",
				)))
			}
			NodeKind::Document => {
				return Err(rejected(Error::HierarchyViolation(
					"the document node cannot be inserted",
				)))
			}
			_ => (),
		}
		let incoming = self.incoming(new);
		for node in incoming.iter().chain(std::iter::once(&new)) {
			if self.is_ancestor_or_self(*node, parent) {
				return Err(rejected(Error::HierarchyViolation(
					"node would become its own ancestor",
				)));
			}
		}

		let mut elements = 0usize;
		let mut doctypes = 0usize;
		for node in incoming.iter() {
			match (parent_kind, self.kind(*node)) {
				(NodeKind::Document, NodeKind::Text) | (NodeKind::Document, NodeKind::CDataSection) => {
					return Err(rejected(Error::HierarchyViolation(
						"character data cannot be a child of the document",
					)))
				}
				(NodeKind::Document, NodeKind::Element) => elements += 1,
				(NodeKind::Document, NodeKind::DocumentType) => doctypes += 1,
				(_, NodeKind::DocumentType) => {
					return Err(rejected(Error::HierarchyViolation(
						"a document type can only be a child of the document",
					)))
				}
				_ => (),
			}
		}
		if parent_kind == NodeKind::Document {
			for child in self.children(parent) {
				if Some(*child) == replaced || incoming.contains(child) {
					continue;
				}
				match self.kind(*child) {
					NodeKind::Element => elements += 1,
					NodeKind::DocumentType => doctypes += 1,
					_ => (),
				}
			}
			if elements > 1 {
				return Err(rejected(Error::HierarchyViolation(
					"the document already has a document element",
				)));
			}
			if doctypes > 1 {
				return Err(rejected(Error::HierarchyViolation(
					"the document already has a document type",
				)));
			}
		}
		Ok(incoming)
	}

	fn check_child(&self, parent: NodeId, child: NodeId, ctx: &'static str) -> Result<()> {
		self.check_handle(child)?;
		if self.parent(child) != Some(parent) {
			return Err(rejected(Error::NodeNotFound(ctx)));
		}
		Ok(())
	}

	/// Unlink `id` from its parent, if any.
	fn detach(&mut self, id: NodeId) {
		if let Some(parent) = self.node_mut(id).parent.take() {
			self.node_mut(parent).children.retain(|c| *c != id);
		}
	}

	fn splice(&mut self, parent: NodeId, index: usize, nodes: Vec<NodeId>) {
		for node in nodes.iter() {
			self.node_mut(*node).parent = Some(parent);
		}
		let children = &mut self.node_mut(parent).children;
		let tail = children.split_off(index);
		children.extend(nodes);
		children.extend(tail);
	}

	/**
	Append `new` as the last child of `parent`.

	An attached `new` is moved. A document fragment is emptied into
	`parent`. Returns `new`.
	*/
	pub fn append_child(&mut self, parent: NodeId, new: NodeId) -> Result<NodeId> {
		self.insert_before(parent, new, None)
	}

	/**
	Insert `new` before `reference`, or at the end if `reference` is `None`.

	Fails with [`Error::NodeNotFound`] if `reference` is not a child of
	`parent`. Inserting a node before itself does nothing. Returns `new`.
	*/
	pub fn insert_before(
		&mut self,
		parent: NodeId,
		new: NodeId,
		reference: Option<NodeId>,
	) -> Result<NodeId> {
		let incoming = self.validate_insertion(parent, new, None)?;
		if let Some(reference) = reference {
			self.check_child(parent, reference, "reference node is not a child of the parent")?;
			if reference == new {
				return Ok(new);
			}
		}
		for node in incoming.iter() {
			self.detach(*node);
		}
		let index = match reference {
			Some(reference) => self
				.children(parent)
				.iter()
				.position(|c| *c == reference)
				.unwrap_or_else(|| self.child_count(parent)),
			None => self.child_count(parent),
		};
		self.splice(parent, index, incoming);
		Ok(new)
	}

	/**
	Replace the child `old` of `parent` with `new`.

	Returns the detached `old`, whose subtree stays intact.
	*/
	pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> Result<NodeId> {
		self.check_handle(old)?;
		let incoming = self.validate_insertion(parent, new, Some(old))?;
		self.check_child(parent, old, "node to replace is not a child of the parent")?;
		if new == old {
			return Ok(old);
		}
		for node in incoming.iter() {
			self.detach(*node);
		}
		let index = self
			.children(parent)
			.iter()
			.position(|c| *c == old)
			.unwrap_or_else(|| self.child_count(parent));
		self.detach(old);
		self.splice(parent, index, incoming);
		Ok(old)
	}

	/**
	Detach the child `old` from `parent` and return it.

	The removed node keeps its own children and can be inserted again.
	*/
	pub fn remove_child(&mut self, parent: NodeId, old: NodeId) -> Result<NodeId> {
		self.check_handle(parent)?;
		if !self.kind(parent).has_child_nodes_capability() {
			return Err(rejected(Error::AbstractOperation(
				"node kind cannot have children",
			)));
		}
		self.check_child(parent, old, "node to remove is not a child of the parent")?;
		self.detach(old);
		Ok(old)
	}

	/// Detach `id` from wherever it is attached.
	pub fn detach_node(&mut self, id: NodeId) -> Result<()> {
		self.check_handle(id)?;
		match self.kind(id) {
			NodeKind::Attribute => {
				if let Some(owner) = self.owner_element(id) {
					self.remove_attribute_node(owner, id)?;
				}
			}
			_ => self.detach(id),
		}
		Ok(())
	}

	/// Find an attribute node of `element` by qualified name.
	pub fn get_attribute_node(&self, element: NodeId, name: &str) -> Option<NodeId> {
		self.attributes(element)
			.iter()
			.copied()
			.find(|a| self.node_name(*a) == name)
	}

	/// Find an attribute node of `element` by namespace URI and local name.
	pub fn get_attribute_node_ns(&self, element: NodeId, uri: &str, local_name: &str) -> Option<NodeId> {
		self.attributes(element).iter().copied().find(|a| {
			let q = match self.qname(*a) {
				Some(q) => q,
				None => return false,
			};
			q.uri() == uri && q.local_name.as_str() == local_name
		})
	}

	/// Value of the attribute `name` of `element`.
	pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
		self.get_attribute_node(element, name)
			.and_then(|a| self.node_value(a))
	}

	pub fn has_attribute(&self, element: NodeId, name: &str) -> bool {
		self.get_attribute_node(element, name).is_some()
	}

	pub fn get_attribute_ns(&self, element: NodeId, uri: &str, local_name: &str) -> Option<&str> {
		self.get_attribute_node_ns(element, uri, local_name)
			.and_then(|a| self.node_value(a))
	}

	pub fn has_attribute_ns(&self, element: NodeId, uri: &str, local_name: &str) -> bool {
		self.get_attribute_node_ns(element, uri, local_name).is_some()
	}

	fn set_value(&mut self, id: NodeId, new_value: &str) {
		match &mut self.node_mut(id).data {
			NodeData::Attribute { value, .. } => {
				value.clear();
				value.push_str(new_value);
			}
			NodeData::Text(v) | NodeData::CData(v) | NodeData::Comment(v) => {
				v.clear();
				v.push_str(new_value);
			}
			NodeData::ProcessingInstruction { data, .. } => {
				data.clear();
				data.push_str(new_value);
			}
			_ => (),
		}
	}

	fn push_attribute(&mut self, element: NodeId, attr: NodeId) {
		if let NodeData::Attribute { owner, .. } = &mut self.node_mut(attr).data {
			*owner = Some(element);
		}
		if let NodeData::Element { attributes, .. } = &mut self.node_mut(element).data {
			attributes.push(attr);
		}
	}

	fn unlink_attribute(&mut self, element: NodeId, attr: NodeId) {
		if let NodeData::Attribute { owner, .. } = &mut self.node_mut(attr).data {
			*owner = None;
		}
		if let NodeData::Element { attributes, .. } = &mut self.node_mut(element).data {
			attributes.retain(|a| *a != attr);
		}
	}

	/// Set the attribute `name` of `element`, creating it if necessary.
	pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<()> {
		self.check_element(element)?;
		match self.get_attribute_node(element, name) {
			Some(attr) => self.set_value(attr, value),
			None => {
				let attr = self.alloc_attribute(QName::plain(name), value.to_string());
				self.push_attribute(element, attr);
			}
		}
		Ok(())
	}

	/// Set a namespaced attribute of `element`, creating it if necessary.
	///
	/// An existing attribute with the same URI and local name gets the new
	/// qualified name and value.
	pub fn set_attribute_ns(
		&mut self,
		element: NodeId,
		uri: &str,
		qualified_name: &str,
		value: &str,
	) -> Result<()> {
		self.check_element(element)?;
		let (_, local_name) = split_name(qualified_name);
		match self.get_attribute_node_ns(element, uri, local_name) {
			Some(attr) => {
				if let NodeData::Attribute { name, .. } = &mut self.node_mut(attr).data {
					let ns = name.namespace_uri.take();
					*name = QName::namespaced(ns, qualified_name);
				}
				self.set_value(attr, value);
			}
			None => {
				let attr = self.create_attribute_ns(uri, qualified_name);
				self.set_value(attr, value);
				self.push_attribute(element, attr);
			}
		}
		Ok(())
	}

	/// Remove the attribute `name` of `element`; missing attributes are
	/// ignored.
	pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> Result<()> {
		self.check_element(element)?;
		if let Some(attr) = self.get_attribute_node(element, name) {
			self.unlink_attribute(element, attr);
		}
		Ok(())
	}

	pub fn remove_attribute_ns(&mut self, element: NodeId, uri: &str, local_name: &str) -> Result<()> {
		self.check_element(element)?;
		if let Some(attr) = self.get_attribute_node_ns(element, uri, local_name) {
			self.unlink_attribute(element, attr);
		}
		Ok(())
	}

	/**
	Attach the attribute node `attr` to `element`.

	An attribute with the same name (or the same URI and local name, for
	namespaced attributes) is replaced and returned. Fails if `attr` is
	attached to another element.
	*/
	pub fn set_attribute_node(&mut self, element: NodeId, attr: NodeId) -> Result<Option<NodeId>> {
		self.check_element(element)?;
		self.check_handle(attr)?;
		if self.kind(attr) != NodeKind::Attribute {
			return Err(rejected(Error::HierarchyViolation("node is not an attribute")));
		}
		match self.owner_element(attr) {
			Some(owner) if owner == element => return Ok(None),
			Some(_) => {
				return Err(rejected(Error::HierarchyViolation(
					"attribute is attached to another element",
				)))
			}
			None => (),
		}
		let existing = match self.qname(attr) {
			Some(q) if q.namespace_uri.is_some() => {
				let (uri, local) = (q.uri().to_string(), q.local_name.clone());
				self.get_attribute_node_ns(element, &uri, &local)
			}
			Some(q) => {
				let name = q.name.clone();
				self.get_attribute_node(element, &name)
			}
			None => None,
		};
		match existing {
			Some(old) => {
				let index = self
					.attributes(element)
					.iter()
					.position(|a| *a == old)
					.unwrap_or(0);
				self.unlink_attribute(element, old);
				if let NodeData::Attribute { owner, .. } = &mut self.node_mut(attr).data {
					*owner = Some(element);
				}
				if let NodeData::Element { attributes, .. } = &mut self.node_mut(element).data {
					attributes.insert(index, attr);
				}
				Ok(Some(old))
			}
			None => {
				self.push_attribute(element, attr);
				Ok(None)
			}
		}
	}

	/// Detach the attribute node `attr` from `element` and return it.
	pub fn remove_attribute_node(&mut self, element: NodeId, attr: NodeId) -> Result<NodeId> {
		self.check_element(element)?;
		self.check_handle(attr)?;
		if self.owner_element(attr) != Some(element) {
			return Err(rejected(Error::NodeNotFound(
				"attribute is not attached to the element",
			)));
		}
		self.unlink_attribute(element, attr);
		Ok(attr)
	}

	/// Replace the value of a character data, attribute or processing
	/// instruction node.
	pub fn set_node_value(&mut self, id: NodeId, value: &str) -> Result<()> {
		self.check_handle(id)?;
		if self.node_value(id).is_none() {
			return Err(rejected(Error::AbstractOperation("node kind has no value")));
		}
		self.set_value(id, value);
		Ok(())
	}

	fn character_data(&self, id: NodeId) -> Result<&str> {
		self.check_handle(id)?;
		match &self.node(id).data {
			NodeData::Text(v) | NodeData::CData(v) | NodeData::Comment(v) => Ok(v.as_str()),
			_ => Err(rejected(Error::AbstractOperation(
				"node kind has no character data",
			))),
		}
	}

	fn character_data_mut(&mut self, id: NodeId) -> Result<&mut String> {
		self.check_handle(id)?;
		match &mut self.node_mut(id).data {
			NodeData::Text(v) | NodeData::CData(v) | NodeData::Comment(v) => Ok(v),
			_ => Err(rejected(Error::AbstractOperation(
				"node kind has no character data",
			))),
		}
	}

	/// Length in chars of the data of a Text, CDATA section or Comment
	/// node.
	pub fn length(&self, id: NodeId) -> Result<usize> {
		Ok(self.character_data(id)?.chars().count())
	}

	/// Append to the data of a Text, CDATA section or Comment node.
	pub fn append_data(&mut self, id: NodeId, data: &str) -> Result<()> {
		self.character_data_mut(id)?.push_str(data);
		Ok(())
	}

	/// `count` chars of the data of `id`, starting at the char `offset`.
	///
	/// Fails with [`Error::IndexSize`] unless `offset + count` is within the
	/// data.
	pub fn substring_data(&self, id: NodeId, offset: usize, count: usize) -> Result<String> {
		let data = self.character_data(id)?;
		let range = char_range(data, offset, count)?;
		Ok(data[range].to_string())
	}

	/// Insert `data` before the char `offset`; `offset` may be the length of
	/// the data.
	pub fn insert_data(&mut self, id: NodeId, offset: usize, data: &str) -> Result<()> {
		self.replace_data(id, offset, 0, data)
	}

	/// Remove `count` chars starting at the char `offset`.
	pub fn delete_data(&mut self, id: NodeId, offset: usize, count: usize) -> Result<()> {
		self.replace_data(id, offset, count, "")
	}

	/**
	Replace `count` chars starting at the char `offset` with `data`.

	Fails with [`Error::IndexSize`] unless `offset + count` is within the
	data of the node; the node is left unchanged in that case.
	*/
	pub fn replace_data(&mut self, id: NodeId, offset: usize, count: usize, data: &str) -> Result<()> {
		let range = char_range(self.character_data(id)?, offset, count)?;
		self.character_data_mut(id)?.replace_range(range, data);
		Ok(())
	}

	/**
	Replace the text content of a node.

	Elements and fragments lose all children and get a single Text child
	(none if `text` is empty). Nodes with a value get `text` as value.
	*/
	pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
		self.check_handle(id)?;
		match self.kind(id) {
			NodeKind::Element | NodeKind::DocumentFragment => {
				let children = self.children(id).to_vec();
				for child in children {
					self.detach(child);
				}
				if !text.is_empty() {
					let t = self.create_text_node(text);
					self.splice(id, 0, vec![t]);
				}
				Ok(())
			}
			NodeKind::Document => Err(rejected(Error::HierarchyViolation(
				"character data cannot be a child of the document",
			))),
			_ => self.set_node_value(id, text),
		}
	}

	/**
	Split a Text or CDATA section node at the char `offset`.

	The node keeps the text before `offset`; a new node of the same kind
	with the remainder is returned and, if the node is attached, inserted
	right after it. Offsets past the end are clamped.
	*/
	pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId> {
		self.check_handle(id)?;
		let (head, tail) = match &self.node(id).data {
			NodeData::Text(v) | NodeData::CData(v) => {
				let at = v.char_indices().nth(offset).map(|(i, _)| i).unwrap_or(v.len());
				(v[..at].to_string(), v[at..].to_string())
			}
			_ => {
				return Err(rejected(Error::AbstractOperation(
					"only text nodes can be split",
				)))
			}
		};
		let new = if self.kind(id) == NodeKind::Text {
			self.create_text_node(&tail)
		} else {
			self.create_cdata_section(&tail)
		};
		self.set_value(id, &head);
		if let Some((parent, index)) = self.index_in_parent(id) {
			self.splice(parent, index + 1, vec![new]);
		}
		Ok(new)
	}

	/// Merge adjacent Text nodes and drop empty ones in the subtree of
	/// `id`.
	pub fn normalize(&mut self, id: NodeId) {
		let children = self.children(id).to_vec();
		let mut previous_text: Option<NodeId> = None;
		for child in children {
			match self.kind(child) {
				NodeKind::Text => {
					let data = self.node_value(child).unwrap_or("").to_string();
					if data.is_empty() {
						self.detach(child);
						continue;
					}
					match previous_text {
						Some(prev) => {
							if let NodeData::Text(v) = &mut self.node_mut(prev).data {
								v.push_str(&data);
							}
							self.detach(child);
						}
						None => previous_text = Some(child),
					}
				}
				NodeKind::Element => {
					self.normalize(child);
					previous_text = None;
				}
				_ => previous_text = None,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	/// Check that sibling walking agrees with the child list.
	fn assert_consistent(doc: &Document, parent: NodeId) {
		let children = doc.children(parent).to_vec();
		let mut forward = Vec::new();
		let mut cur = doc.first_child(parent);
		while let Some(c) = cur {
			assert_eq!(doc.parent(c), Some(parent));
			forward.push(c);
			cur = doc.next_sibling(c);
		}
		assert_eq!(forward, children);
		let mut backward = Vec::new();
		let mut cur = doc.last_child(parent);
		while let Some(c) = cur {
			backward.push(c);
			cur = doc.previous_sibling(c);
		}
		backward.reverse();
		assert_eq!(backward, children);
	}

	fn setup() -> (Document, NodeId) {
		let mut doc = Document::new();
		let root = doc.create_element("root");
		let docnode = doc.document_node();
		doc.append_child(docnode, root).unwrap();
		(doc, root)
	}

	#[test]
	fn append_child_moves_attached_node() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		let b = doc.create_element("b");
		let x = doc.create_text_node("x");
		doc.append_child(root, a).unwrap();
		doc.append_child(root, b).unwrap();
		doc.append_child(a, x).unwrap();
		doc.append_child(b, x).unwrap();
		assert!(doc.children(a).is_empty());
		assert_eq!(doc.children(b), &[x]);
		assert_eq!(doc.parent(x), Some(b));
		assert_consistent(&doc, a);
		assert_consistent(&doc, b);
	}

	#[test]
	fn insert_before_positions_node() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		let b = doc.create_element("b");
		let c = doc.create_element("c");
		doc.append_child(root, a).unwrap();
		doc.append_child(root, c).unwrap();
		doc.insert_before(root, b, Some(c)).unwrap();
		assert_eq!(doc.children(root), &[a, b, c]);
		// moving within the same parent
		doc.insert_before(root, c, Some(a)).unwrap();
		assert_eq!(doc.children(root), &[c, a, b]);
		// before itself is a no-op
		doc.insert_before(root, a, Some(a)).unwrap();
		assert_eq!(doc.children(root), &[c, a, b]);
		assert_consistent(&doc, root);
	}

	#[test]
	fn insert_before_rejects_foreign_reference() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		let stray = doc.create_element("stray");
		let err = doc.insert_before(root, a, Some(stray)).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NodeNotFound);
		assert!(doc.children(root).is_empty());
		assert_eq!(doc.parent(a), None);
	}

	#[test]
	fn fragment_is_spliced_and_emptied() {
		let (mut doc, root) = setup();
		let first = doc.create_element("first");
		let last = doc.create_element("last");
		doc.append_child(root, first).unwrap();
		doc.append_child(root, last).unwrap();
		let frag = doc.create_document_fragment();
		let m1 = doc.create_element("m1");
		let m2 = doc.create_text_node("m2");
		doc.append_child(frag, m1).unwrap();
		doc.append_child(frag, m2).unwrap();
		assert_eq!(doc.insert_before(root, frag, Some(last)).unwrap(), frag);
		assert_eq!(doc.children(root), &[first, m1, m2, last]);
		assert!(doc.children(frag).is_empty());
		assert_eq!(doc.parent(m1), Some(root));
		assert_eq!(doc.parent(frag), None);
		assert_consistent(&doc, root);
	}

	#[test]
	fn replace_child_swaps_in_place() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		let b = doc.create_element("b");
		let c = doc.create_element("c");
		let inner = doc.create_text_node("inner");
		doc.append_child(root, a).unwrap();
		doc.append_child(root, b).unwrap();
		doc.append_child(b, inner).unwrap();
		let old = doc.replace_child(root, c, b).unwrap();
		assert_eq!(old, b);
		assert_eq!(doc.children(root), &[a, c]);
		assert_eq!(doc.parent(b), None);
		assert_eq!(doc.children(b), &[inner]);
		assert_consistent(&doc, root);
	}

	#[test]
	fn replace_child_with_fragment() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		doc.append_child(root, a).unwrap();
		let frag = doc.create_document_fragment();
		let x = doc.create_element("x");
		let y = doc.create_element("y");
		doc.append_child(frag, x).unwrap();
		doc.append_child(frag, y).unwrap();
		doc.replace_child(root, frag, a).unwrap();
		assert_eq!(doc.children(root), &[x, y]);
	}

	#[test]
	fn replace_child_requires_child() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		let b = doc.create_element("b");
		let err = doc.replace_child(root, a, b).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NodeNotFound);
	}

	#[test]
	fn remove_child_detaches_subtree() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		let t = doc.create_text_node("t");
		doc.append_child(root, a).unwrap();
		doc.append_child(a, t).unwrap();
		assert_eq!(doc.remove_child(root, a).unwrap(), a);
		assert!(doc.children(root).is_empty());
		assert_eq!(doc.parent(a), None);
		assert_eq!(doc.next_sibling(a), None);
		assert_eq!(doc.children(a), &[t]);
		let err = doc.remove_child(root, a).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NodeNotFound);
	}

	#[test]
	fn document_accepts_only_one_element() {
		let (mut doc, root) = setup();
		let docnode = doc.document_node();
		let second = doc.create_element("second");
		let before = doc.children(docnode).to_vec();
		assert_eq!(
			doc.append_child(docnode, second).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
		assert_eq!(
			doc.insert_before(docnode, second, Some(root)).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
		assert_eq!(doc.children(docnode), &before[..]);
		// replacing the document element is fine
		doc.replace_child(docnode, second, root).unwrap();
		assert_eq!(doc.document_element(), Some(second));
		// moving the document element around at top level is fine
		let c = doc.create_comment("c");
		doc.append_child(docnode, c).unwrap();
		doc.append_child(docnode, second).unwrap();
		assert_eq!(doc.children(docnode), &[c, second]);
	}

	#[test]
	fn document_accepts_only_one_doctype() {
		let (mut doc, root) = setup();
		let docnode = doc.document_node();
		let dt1 = doc.create_document_type("<!DOCTYPE root>");
		let dt2 = doc.create_document_type("<!DOCTYPE root>");
		doc.insert_before(docnode, dt1, Some(root)).unwrap();
		assert_eq!(doc.doctype(), Some(dt1));
		assert_eq!(
			doc.append_child(docnode, dt2).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
	}

	#[test]
	fn document_rejects_text_and_fragment_with_text() {
		let mut doc = Document::new();
		let docnode = doc.document_node();
		let t = doc.create_text_node("x");
		assert_eq!(
			doc.append_child(docnode, t).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
		let frag = doc.create_document_fragment();
		let e = doc.create_element("e");
		let t2 = doc.create_text_node("y");
		doc.append_child(frag, e).unwrap();
		doc.append_child(frag, t2).unwrap();
		assert!(doc.append_child(docnode, frag).is_err());
		// nothing moved
		assert_eq!(doc.children(frag), &[e, t2]);
		assert!(doc.children(docnode).is_empty());
	}

	#[test]
	fn doctype_only_under_document() {
		let (mut doc, root) = setup();
		let dt = doc.create_document_type("<!DOCTYPE x>");
		assert_eq!(
			doc.append_child(root, dt).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
	}

	#[test]
	fn rejects_cycles_and_invalid_kinds() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		doc.append_child(root, a).unwrap();
		assert_eq!(
			doc.append_child(a, root).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
		assert_eq!(
			doc.append_child(a, a).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
		let attr = doc.create_attribute("x");
		assert_eq!(
			doc.append_child(a, attr).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
		let t = doc.create_text_node("t");
		let u = doc.create_text_node("u");
		assert_eq!(
			doc.append_child(t, u).unwrap_err().kind(),
			ErrorKind::AbstractOperationInvoked
		);
		let docnode = doc.document_node();
		assert_eq!(
			doc.append_child(a, docnode).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
	}

	#[test]
	fn rejects_nodes_of_other_documents() {
		let (mut doc, root) = setup();
		let mut other = Document::new();
		let foreign = other.create_element("f");
		assert_eq!(
			doc.append_child(root, foreign).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
	}

	#[test]
	fn attributes_keep_order_and_owner() {
		let (mut doc, root) = setup();
		doc.set_attribute(root, "b", "1").unwrap();
		doc.set_attribute(root, "a", "2").unwrap();
		doc.set_attribute(root, "b", "3").unwrap();
		let names: Vec<_> = doc.attributes(root).iter().map(|a| doc.node_name(*a)).collect();
		assert_eq!(names, vec!["b", "a"]);
		assert_eq!(doc.get_attribute(root, "b"), Some("3"));
		let b = doc.get_attribute_node(root, "b").unwrap();
		assert_eq!(doc.owner_element(b), Some(root));
		doc.remove_attribute(root, "b").unwrap();
		assert!(!doc.has_attribute(root, "b"));
		assert_eq!(doc.owner_element(b), None);
		doc.remove_attribute(root, "missing").unwrap();
	}

	#[test]
	fn attributes_on_non_elements_are_rejected() {
		let (mut doc, _) = setup();
		let t = doc.create_text_node("t");
		assert_eq!(
			doc.set_attribute(t, "a", "1").unwrap_err().kind(),
			ErrorKind::AbstractOperationInvoked
		);
		assert_eq!(doc.get_attribute(t, "a"), None);
	}

	#[test]
	fn namespaced_attributes() {
		let (mut doc, root) = setup();
		doc.set_attribute_ns(root, "urn:x", "p:a", "1").unwrap();
		doc.set_attribute_ns(root, "urn:x", "q:a", "2").unwrap();
		assert_eq!(doc.attributes(root).len(), 1);
		assert_eq!(doc.get_attribute_ns(root, "urn:x", "a"), Some("2"));
		assert_eq!(doc.get_attribute(root, "q:a"), Some("2"));
		assert!(doc.has_attribute_ns(root, "urn:x", "a"));
		doc.remove_attribute_ns(root, "urn:x", "a").unwrap();
		assert!(doc.attributes(root).is_empty());
	}

	#[test]
	fn set_attribute_node_replaces_and_guards_ownership() {
		let (mut doc, root) = setup();
		doc.set_attribute(root, "a", "old").unwrap();
		doc.set_attribute(root, "z", "z").unwrap();
		let old = doc.get_attribute_node(root, "a").unwrap();
		let new = doc.create_attribute("a");
		doc.set_node_value(new, "new").unwrap();
		assert_eq!(doc.set_attribute_node(root, new).unwrap(), Some(old));
		assert_eq!(doc.attributes(root)[0], new);
		assert_eq!(doc.get_attribute(root, "a"), Some("new"));
		assert_eq!(doc.owner_element(old), None);

		let other = doc.create_element("other");
		assert_eq!(
			doc.set_attribute_node(other, new).unwrap_err().kind(),
			ErrorKind::HierarchyViolation
		);
		assert_eq!(
			doc.remove_attribute_node(other, new).unwrap_err().kind(),
			ErrorKind::NodeNotFound
		);
		assert_eq!(doc.remove_attribute_node(root, new).unwrap(), new);
		assert_eq!(doc.set_attribute_node(other, new).unwrap(), None);
	}

	#[test]
	fn set_text_replaces_children() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		doc.append_child(root, a).unwrap();
		doc.set_text(root, "plain").unwrap();
		assert_eq!(doc.child_count(root), 1);
		assert_eq!(doc.text(root), "plain");
		assert_eq!(doc.parent(a), None);
		doc.set_text(root, "").unwrap();
		assert!(!doc.has_child_nodes(root));
		let c = doc.create_comment("c");
		doc.set_text(c, "d").unwrap();
		assert_eq!(doc.node_value(c), Some("d"));
		let docnode = doc.document_node();
		assert!(doc.set_text(docnode, "x").is_err());
	}

	#[test]
	fn character_data_operations() {
		let (mut doc, root) = setup();
		let t = doc.create_text_node("héllo");
		doc.append_child(root, t).unwrap();
		doc.append_data(t, " world").unwrap();
		let rest = doc.split_text(t, 2).unwrap();
		assert_eq!(doc.node_value(t), Some("hé"));
		assert_eq!(doc.node_value(rest), Some("llo world"));
		assert_eq!(doc.children(root), &[t, rest]);
		let end = doc.split_text(rest, 100).unwrap();
		assert_eq!(doc.node_value(end), Some(""));
		assert_eq!(
			doc.append_data(root, "x").unwrap_err().kind(),
			ErrorKind::AbstractOperationInvoked
		);
		assert_eq!(
			doc.set_node_value(root, "x").unwrap_err().kind(),
			ErrorKind::AbstractOperationInvoked
		);
	}

	#[test]
	fn character_data_ranges_count_chars() {
		let (mut doc, _) = setup();
		let t = doc.create_text_node("häßlich");
		assert_eq!(doc.length(t).unwrap(), 7);
		assert_eq!(doc.substring_data(t, 1, 3).unwrap(), "äßl");
		assert_eq!(doc.substring_data(t, 0, 7).unwrap(), "häßlich");
		assert_eq!(doc.substring_data(t, 7, 0).unwrap(), "");
		doc.insert_data(t, 7, "!").unwrap();
		doc.insert_data(t, 0, "¡").unwrap();
		assert_eq!(doc.node_value(t), Some("¡häßlich!"));
		doc.delete_data(t, 2, 2).unwrap();
		assert_eq!(doc.node_value(t), Some("¡hlich!"));
		doc.replace_data(t, 1, 1, "Ä").unwrap();
		assert_eq!(doc.node_value(t), Some("¡Älich!"));
		doc.delete_data(t, 0, 7).unwrap();
		assert_eq!(doc.length(t).unwrap(), 0);
	}

	#[test]
	fn character_data_ranges_reject_out_of_bounds() {
		let (mut doc, root) = setup();
		let t = doc.create_text_node("abc");
		match doc.substring_data(t, 2, 2) {
			Err(Error::IndexSize {
				offset,
				count,
				length,
			}) => {
				assert_eq!((offset, count, length), (2, 2, 3));
			}
			other => panic!("unexpected result: {:?}", other),
		}
		assert_eq!(
			doc.insert_data(t, 4, "x").unwrap_err().kind(),
			ErrorKind::IndexSize
		);
		assert_eq!(
			doc.delete_data(t, 3, 1).unwrap_err().kind(),
			ErrorKind::IndexSize
		);
		assert_eq!(
			doc.replace_data(t, 1, usize::MAX, "x").unwrap_err().kind(),
			ErrorKind::IndexSize
		);
		assert_eq!(doc.node_value(t), Some("abc"));
		assert_eq!(doc.length(root).unwrap_err().kind(), ErrorKind::AbstractOperationInvoked);
	}

	#[test]
	fn character_data_ranges_apply_to_cdata_and_comments() {
		let (mut doc, _) = setup();
		let c = doc.create_comment("note");
		let d = doc.create_cdata_section("a]]b");
		doc.replace_data(c, 0, 4, "memo").unwrap();
		doc.insert_data(d, 2, "x").unwrap();
		assert_eq!(doc.node_value(c), Some("memo"));
		assert_eq!(doc.node_value(d), Some("a]x]b"));
		let pi = doc.create_processing_instruction("t", "data");
		assert_eq!(
			doc.insert_data(pi, 0, "x").unwrap_err().kind(),
			ErrorKind::AbstractOperationInvoked
		);
	}

	#[test]
	fn normalize_merges_text_runs() {
		let (mut doc, root) = setup();
		let a = doc.create_text_node("a");
		let empty = doc.create_text_node("");
		let b = doc.create_text_node("b");
		let e = doc.create_element("e");
		let c = doc.create_text_node("c");
		let d = doc.create_text_node("d");
		for n in [a, empty, b, e, c].iter() {
			doc.append_child(root, *n).unwrap();
		}
		doc.append_child(e, d).unwrap();
		let d2 = doc.create_text_node("2");
		doc.append_child(e, d2).unwrap();
		doc.normalize(root);
		assert_eq!(doc.children(root), &[a, e, c]);
		assert_eq!(doc.node_value(a), Some("ab"));
		assert_eq!(doc.children(e), &[d]);
		assert_eq!(doc.node_value(d), Some("d2"));
		assert_consistent(&doc, root);
	}

	#[test]
	fn detach_node_handles_attributes_and_children() {
		let (mut doc, root) = setup();
		let a = doc.create_element("a");
		doc.append_child(root, a).unwrap();
		doc.set_attribute(a, "x", "1").unwrap();
		let x = doc.get_attribute_node(a, "x").unwrap();
		doc.detach_node(x).unwrap();
		assert!(doc.attributes(a).is_empty());
		doc.detach_node(a).unwrap();
		assert!(doc.children(root).is_empty());
	}
}
