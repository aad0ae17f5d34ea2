/*!
# Tree-wide queries

All queries walk the tree in document order (pre-order, depth first) and
return handles in that order.

Path patterns are a small subset of XPath location paths: segments are
element names (or `*`) separated by `/`.

* `/a/b` is absolute and matches from the document node, so `a` has to be
  the document element.
* `a/b` is relative to the node the query is run on.
* `//a/b` matches `a` anywhere in the document and continues relatively
  from there.
*/
use std::collections::HashSet;

use crate::parser::XMLNS_XML;

use super::node::NodeId;
use super::{Document, NodeKind};

/// Pre-order iterator over the descendants of a node, excluding the node
/// itself.
pub struct Descendants<'d> {
	doc: &'d Document,
	stack: Vec<NodeId>,
}

impl<'d> Iterator for Descendants<'d> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		let next = self.stack.pop()?;
		self.stack
			.extend(self.doc.children(next).iter().rev().copied());
		Some(next)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
	Absolute,
	Relative,
	Anywhere,
}

fn parse_pattern(pattern: &str) -> (Anchor, Vec<&str>) {
	let (anchor, rest) = if let Some(rest) = pattern.strip_prefix("//") {
		(Anchor::Anywhere, rest)
	} else if let Some(rest) = pattern.strip_prefix('/') {
		(Anchor::Absolute, rest)
	} else {
		(Anchor::Relative, pattern)
	};
	let segments = rest
		.split('/')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();
	(anchor, segments)
}

fn name_matches(pattern: &str, name: &str) -> bool {
	pattern == "*" || pattern == name
}

impl Document {
	/// Iterate the descendants of `id` in document order.
	pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
		Descendants {
			doc: self,
			stack: self.children(id).iter().rev().copied().collect(),
		}
	}

	fn descendant_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
		self.descendants(id)
			.filter(move |n| self.kind(*n) == NodeKind::Element)
	}

	/// Descendant elements of `id` with the qualified name `name`, or all
	/// of them if `name` is `*`.
	pub fn get_elements_by_tag_name(&self, id: NodeId, name: &str) -> Vec<NodeId> {
		self.descendant_elements(id)
			.filter(|e| name_matches(name, self.node_name(*e)))
			.collect()
	}

	/// Descendant elements of `id` by namespace URI and local name; either
	/// may be `*`.
	pub fn get_elements_by_tag_name_ns(&self, id: NodeId, uri: &str, local_name: &str) -> Vec<NodeId> {
		self.descendant_elements(id)
			.filter(|e| {
				name_matches(uri, self.namespace_uri(*e))
					&& name_matches(local_name, self.local_name(*e))
			})
			.collect()
	}

	fn attribute_search_root(&self, id: NodeId) -> Option<NodeId> {
		match self.kind(id) {
			NodeKind::Element => Some(id),
			NodeKind::Document => self.document_element(),
			_ => None,
		}
	}

	/**
	Elements carrying the attribute `name` with the value `value`.

	The search includes `id` itself; on the document node it starts at the
	document element. With `first_only`, the search stops at the first
	match.
	*/
	pub fn get_elements_by_attribute(
		&self,
		id: NodeId,
		name: &str,
		value: &str,
		first_only: bool,
	) -> Vec<NodeId> {
		let root = match self.attribute_search_root(id) {
			Some(root) => root,
			None => return Vec::new(),
		};
		let mut out = Vec::new();
		for e in std::iter::once(root).chain(self.descendant_elements(root)) {
			if self.get_attribute(e, name) == Some(value) {
				out.push(e);
				if first_only {
					break;
				}
			}
		}
		out
	}

	/**
	Element whose ID is `element_id`.

	An `xml:id` attribute is preferred; plain `id` attributes are honored
	too, as non-validating documents have no other way to declare IDs.
	*/
	pub fn get_element_by_id(&self, id: NodeId, element_id: &str) -> Option<NodeId> {
		let root = self.attribute_search_root(id)?;
		std::iter::once(root)
			.chain(self.descendant_elements(root))
			.find(|e| {
				let xml_id = self
					.get_attribute_ns(*e, XMLNS_XML, "id")
					.or_else(|| self.get_attribute(*e, "xml:id"));
				match xml_id {
					Some(v) => v == element_id,
					None => self.get_attribute(*e, "id") == Some(element_id),
				}
			})
	}

	/// All elements matching the path `pattern`, evaluated from `id`.
	pub fn get_elements_by_path(&self, id: NodeId, pattern: &str) -> Vec<NodeId> {
		let (anchor, segments) = parse_pattern(pattern);
		let mut segments = segments.into_iter();
		let mut current: Vec<NodeId> = match anchor {
			Anchor::Relative => vec![id],
			Anchor::Absolute => vec![self.document_node()],
			Anchor::Anywhere => match segments.next() {
				Some(first) => {
					let docnode = self.document_node();
					self.descendant_elements(docnode)
						.filter(|e| name_matches(first, self.node_name(*e)))
						.collect()
				}
				None => return Vec::new(),
			},
		};
		let mut stepped = anchor == Anchor::Anywhere;
		for segment in segments {
			stepped = true;
			current = current
				.iter()
				.flat_map(|n| self.children(*n).iter().copied())
				.filter(|c| {
					self.kind(*c) == NodeKind::Element && name_matches(segment, self.node_name(*c))
				})
				.collect();
			if current.is_empty() {
				break;
			}
		}
		if !stepped {
			return Vec::new();
		}
		if anchor == Anchor::Anywhere && current.len() > 1 {
			// nested start matches interleave their results
			let matched: HashSet<NodeId> = current.into_iter().collect();
			return self
				.descendant_elements(self.document_node())
				.filter(|e| matched.contains(e))
				.collect();
		}
		current
	}

	/// The `index`-th (1-based) element matching the path `pattern`.
	pub fn get_element_by_path(&self, id: NodeId, pattern: &str, index: usize) -> Option<NodeId> {
		if index == 0 {
			return None;
		}
		self.get_elements_by_path(id, pattern).get(index - 1).copied()
	}

	/// `id` (if it matches) and its descendants of the given kind.
	pub fn get_nodes_by_node_type(&self, id: NodeId, kind: NodeKind) -> Vec<NodeId> {
		std::iter::once(id)
			.chain(self.descendants(id))
			.filter(|n| self.kind(*n) == kind)
			.collect()
	}

	/// `id` (if it matches) and its descendants whose value is `value`.
	pub fn get_nodes_by_node_value(&self, id: NodeId, value: &str) -> Vec<NodeId> {
		std::iter::once(id)
			.chain(self.descendants(id))
			.filter(|n| self.node_value(*n) == Some(value))
			.collect()
	}
}
