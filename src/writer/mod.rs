/*!
# Serializer

Renders a node and its subtree back to XML text, either compactly or
indented for readability.

In compact mode the output reproduces the tree exactly: no whitespace is
added or removed. In normalized mode every element whose children are all
markup (no Text or CDATA section child) gets each child on its own line,
indented by one unit per nesting level. Elements with character data
children are written compactly, as inserting whitespace there would change
their text.

Without entity substitution, text and attribute values are written as
decoded except that `<` and any `&` which does not start a well-formed
reference are escaped, so the output always parses again. A `&` which does
start one (for example an unknown entity reference kept by the parser) is
written unchanged; text which decodes to such a sequence, such as the
source `&amp;lt;`, therefore reads back as the referenced character. With
substitution, the predefined entities are applied first and the custom
entities of the document's [`crate::EntityTable`] afterwards.
*/
use std::fmt;
use std::fs;
use std::path::Path;

use bytes::{BufMut, BytesMut};
use smartstring::alias::String as SmartString;

use crate::dom::{Document, NodeData, NodeId};
use crate::entities::escape_markup_into;
use crate::error::Result;

const DEFAULT_INDENT: &'static str = "    ";

/**
# Serializer options

[`WriterOptions::for_document`] picks up the empty tag policy configured on
the document through [`Document::set_expand_empty_tags`].
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
	/// Indent element-only content.
	pub normalized: bool,
	/// Replace special characters in text and attribute values by entity
	/// references.
	///
	/// Without it, only `<` and bare `&` are escaped.
	pub substitute_entities: bool,
	/// Indentation unit used in normalized mode.
	pub indent: SmartString,
	/// Write childless elements with an explicit end tag.
	pub expand_empty_tags: bool,
	/// Element names for which `expand_empty_tags` is inverted.
	pub empty_tag_exceptions: Vec<SmartString>,
}

impl WriterOptions {
	pub fn for_document(doc: &Document) -> WriterOptions {
		WriterOptions {
			expand_empty_tags: doc.expand_empty_tags(),
			empty_tag_exceptions: doc.empty_tag_exceptions().to_vec(),
			..WriterOptions::default()
		}
	}

	pub fn normalized(mut self, v: bool) -> WriterOptions {
		self.normalized = v;
		self
	}

	pub fn substitute_entities(mut self, v: bool) -> WriterOptions {
		self.substitute_entities = v;
		self
	}

	pub fn indent<T: Into<SmartString>>(mut self, v: T) -> WriterOptions {
		self.indent = v.into();
		self
	}

	fn expands(&self, name: &str) -> bool {
		let excepted = self.empty_tag_exceptions.iter().any(|x| x.as_str() == name);
		self.expand_empty_tags != excepted
	}
}

impl Default for WriterOptions {
	fn default() -> WriterOptions {
		WriterOptions {
			normalized: false,
			substitute_entities: false,
			indent: DEFAULT_INDENT.into(),
			expand_empty_tags: false,
			empty_tag_exceptions: Vec::new(),
		}
	}
}

/// Serializes the nodes of a single document.
struct Encoder<'d, 'o> {
	doc: &'d Document,
	opts: &'o WriterOptions,
}

impl<'d, 'o> Encoder<'d, 'o> {
	fn put_text<B: BufMut>(&self, out: &mut B, s: &str) {
		if self.opts.substitute_entities {
			self.doc.context().entities().encode_into(out, s);
		} else {
			escape_markup_into(out, s, false);
		}
	}

	fn put_attribute<B: BufMut>(&self, out: &mut B, name: &str, value: &str) {
		out.put_slice(name.as_bytes());
		out.put_u8(b'=');
		if self.opts.substitute_entities {
			out.put_u8(b'"');
			self.put_text(out, value);
			out.put_u8(b'"');
			return;
		}
		let has_double = value.contains('"');
		if has_double && !value.contains('\'') {
			out.put_u8(b'\'');
			escape_markup_into(out, value, false);
			out.put_u8(b'\'');
		} else {
			out.put_u8(b'"');
			escape_markup_into(out, value, has_double);
			out.put_u8(b'"');
		}
	}

	fn put_newline<B: BufMut>(&self, out: &mut B, level: usize) {
		out.put_u8(b'\n');
		for _ in 0..level {
			out.put_slice(self.opts.indent.as_bytes());
		}
	}

	/// Whether the children of `id` are laid out on separate lines.
	fn indents_children(&self, id: NodeId) -> bool {
		self.opts.normalized
			&& !self
				.doc
				.children(id)
				.iter()
				.any(|c| self.doc.kind(*c).is_text())
	}

	/// Write the children of `id`, which are at nesting `level`.
	fn put_children<B: BufMut>(&self, out: &mut B, id: NodeId, level: usize, boundaries: bool) {
		let indent = self.indents_children(id);
		for (i, child) in self.doc.children(id).iter().enumerate() {
			if indent && (boundaries || i > 0) {
				self.put_newline(out, level);
			}
			self.put_node(out, *child, level);
		}
		if indent && boundaries && self.doc.has_child_nodes(id) {
			self.put_newline(out, level.saturating_sub(1));
		}
	}

	fn put_node<B: BufMut>(&self, out: &mut B, id: NodeId, level: usize) {
		match &self.doc.node(id).data {
			NodeData::Document | NodeData::DocumentFragment => {
				self.put_children(out, id, level, false);
			}
			NodeData::DocumentType { text, .. } => out.put_slice(text.as_bytes()),
			NodeData::Element { name, attributes } => {
				out.put_u8(b'<');
				out.put_slice(name.name.as_bytes());
				for attr in attributes.iter() {
					if let NodeData::Attribute { name, value, .. } = &self.doc.node(*attr).data {
						out.put_u8(b' ');
						self.put_attribute(out, &name.name, value);
					}
				}
				if self.doc.has_child_nodes(id) {
					out.put_u8(b'>');
					self.put_children(out, id, level + 1, true);
				} else if self.opts.expands(&name.name) {
					out.put_u8(b'>');
				} else {
					out.put_slice(b"/>");
					return;
				}
				out.put_slice(b"</");
				out.put_slice(name.name.as_bytes());
				out.put_u8(b'>');
			}
			NodeData::Attribute { name, value, .. } => self.put_attribute(out, &name.name, value),
			NodeData::Text(data) => self.put_text(out, data),
			NodeData::CData(data) => {
				out.put_slice(b"<![CDATA[");
				if self.opts.substitute_entities {
					out.put_slice(data.replace("]]>", "]]&gt;").as_bytes());
				} else {
					out.put_slice(data.as_bytes());
				}
				out.put_slice(b"]]>");
			}
			NodeData::Comment(data) => {
				out.put_slice(b"<!--");
				out.put_slice(data.as_bytes());
				out.put_slice(b"-->");
			}
			NodeData::ProcessingInstruction { target, data } => {
				out.put_slice(b"<?");
				out.put_slice(target.as_bytes());
				if !data.is_empty() {
					out.put_u8(b' ');
					out.put_slice(data.as_bytes());
				}
				out.put_slice(b"?>");
			}
		}
	}
}

impl Document {
	/// Serialize the subtree of `id` into `out`.
	pub fn write_to<B: BufMut>(&self, id: NodeId, out: &mut B, opts: &WriterOptions) {
		Encoder { doc: self, opts }.put_node(out, id, 0);
	}

	/**
	Serialize the subtree of `id` to a string.

	The empty tag policy of the document applies.

	```
	let doc = rxdom::parse("<a><b>x</b><c/></a>", false, false).unwrap();
	let root = doc.document_element().unwrap();
	assert_eq!(doc.to_xml(root, false, false), "<a><b>x</b><c/></a>");
	assert_eq!(doc.to_xml(root, true, false), "<a>\n    <b>x</b>\n    <c/>\n</a>");
	```
	*/
	pub fn to_xml(&self, id: NodeId, normalized: bool, substitute_entities: bool) -> String {
		let opts = WriterOptions::for_document(self)
			.normalized(normalized)
			.substitute_entities(substitute_entities);
		let mut out = BytesMut::new();
		self.write_to(id, &mut out, &opts);
		// every write above is either a whole str or ASCII
		String::from_utf8_lossy(&out).into_owned()
	}

	/// Serialize the whole document into the file at `path`.
	pub fn save_file<P: AsRef<Path>>(&self, path: P, normalized: bool, substitute_entities: bool) -> Result<()> {
		let opts = WriterOptions::for_document(self)
			.normalized(normalized)
			.substitute_entities(substitute_entities);
		let mut out = BytesMut::new();
		self.write_to(self.document_node(), &mut out, &opts);
		fs::write(path, &out)?;
		Ok(())
	}
}

/// Compact serialization of the whole document.
impl fmt::Display for Document {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.to_xml(self.document_node(), false, false))
	}
}
