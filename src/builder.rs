/*!
# Tree builder

Turns the [`Event`]s of a [`Parser`] into nodes of a [`Document`].

The builder only tracks the current insertion point and a pending run of
character data; consecutive text events (including CDATA sections which
the parser reports as text) are merged into a single Text node.
*/
use crate::dom::{Document, NodeData, NodeId};
use crate::error::{Error, Position, Result, ERRCTX_TEXT};
use crate::parser::{Event, EventRead, Parser};

/// Builds a [`Document`] from parser events.
pub struct TreeBuilder {
	doc: Document,
	insertion_point: NodeId,
	pending_text: Option<String>,
}

impl TreeBuilder {
	/// Start building into `doc`; new nodes are appended to its document
	/// node.
	pub fn new(doc: Document) -> TreeBuilder {
		let insertion_point = doc.document_node();
		TreeBuilder {
			doc,
			insertion_point,
			pending_text: None,
		}
	}

	/// Current insertion point.
	pub fn insertion_point(&self) -> NodeId {
		self.insertion_point
	}

	fn at_document_level(&self) -> bool {
		self.insertion_point == self.doc.document_node()
	}

	fn append(&mut self, node: NodeId) -> Result<()> {
		self.doc.append_child(self.insertion_point, node)?;
		Ok(())
	}

	fn flush_text(&mut self) -> Result<()> {
		if let Some(text) = self.pending_text.take() {
			let node = self.doc.create_text_node(&text);
			self.append(node)?;
		}
		Ok(())
	}

	/**
	Apply a single event to the tree.

	Character data at document level is dropped if it is whitespace only;
	otherwise [`ERRCTX_TEXT`] is reported at the position returned by
	`position`.
	*/
	pub fn feed<F>(&mut self, ev: Event, position: F) -> Result<()>
	where
		F: FnOnce() -> Position,
	{
		match ev {
			Event::Text(text) => {
				if self.at_document_level() {
					if text.chars().all(char::is_whitespace) {
						return Ok(());
					}
					return Err(Error::Syntax(ERRCTX_TEXT, position()));
				}
				match self.pending_text.as_mut() {
					Some(pending) => pending.push_str(&text),
					None => self.pending_text = Some(text),
				}
			}
			Event::StartNamespace(..) | Event::EndNamespace(..) => (),
			Event::StartElement(name, attributes) => {
				self.flush_text()?;
				let element = self.doc.alloc_element(name);
				for attr in attributes {
					let attr_id = self.doc.alloc_attribute(attr.name, attr.value);
					if let NodeData::Attribute { owner, .. } = &mut self.doc.node_mut(attr_id).data {
						*owner = Some(element);
					}
					if let NodeData::Element { attributes, .. } = &mut self.doc.node_mut(element).data {
						attributes.push(attr_id);
					}
				}
				self.append(element)?;
				self.insertion_point = element;
			}
			Event::EndElement(_) => {
				self.flush_text()?;
				self.insertion_point = self
					.doc
					.parent(self.insertion_point)
					.unwrap_or_else(|| self.doc.document_node());
			}
			Event::CData(text) => {
				self.flush_text()?;
				let node = self.doc.create_cdata_section(&text);
				self.append(node)?;
			}
			Event::Comment(text) => {
				self.flush_text()?;
				let node = self.doc.create_comment(&text);
				self.append(node)?;
			}
			Event::ProcessingInstruction(target, data) => {
				self.flush_text()?;
				let node = self.doc.create_processing_instruction(&target, &data);
				self.append(node)?;
			}
			Event::Doctype(text) => {
				self.flush_text()?;
				let node = self.doc.create_document_type(&text);
				self.append(node)?;
			}
		}
		Ok(())
	}

	/// Finish building and return the document.
	pub fn finish(mut self) -> Result<Document> {
		self.flush_text()?;
		log::debug!(
			target: "rxdom::builder",
			"document complete with {} nodes",
			self.doc.len()
		);
		Ok(self.doc)
	}

	/// Consume all events of `parser`.
	pub fn build(mut self, parser: &mut Parser<'_>) -> Result<Document> {
		while let Some(ev) = parser.read()? {
			let p = &*parser;
			self.feed(ev, || p.position())?;
		}
		self.finish()
	}
}
