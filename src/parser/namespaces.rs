use std::collections::VecDeque;

use smartstring::alias::String as SmartString;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::lexer::{RawAttributes, RawEvent};

use super::{split_name, Attribute, Event, NamespaceName, QName, RcPtr, XMLNS_XML, XMLNS_XMLNS};

/// Bindings declared on one element, in declaration order.
///
/// The empty prefix denotes the default namespace.
type Frame = Vec<(SmartString, Option<NamespaceName>)>;

/**
# Namespace resolver

Converts [`RawEvent`] structs into [`Event`] structs with resolved names.

Declarations (`xmlns` and `xmlns:prefix` attributes) push a frame onto the
binding stack for the duration of the declaring element. A separate stack
holds the default namespace of every open element, so that unprefixed
element names are resolved from its top.

The prefix `xml` is always bound to [`XMLNS_XML`]. Attributes never inherit
the default namespace. Declaration attributes are kept on the element and
placed in the [`XMLNS_XMLNS`] namespace.

Undeclared prefixes do not fail the parse: the name keeps its prefix but
has no namespace URI.

## Caveat

This struct does *not* validate that the sequence of [`RawEvent`] structs
it is fed is well-formed; it relies on the lexer's tag matching.
*/
pub struct NamespaceResolver {
	ctx: RcPtr<Context>,
	fixed_xml_namespace: NamespaceName,
	fixed_xmlns_namespace: NamespaceName,
	namespace_stack: Vec<Frame>,
	default_stack: Vec<Option<NamespaceName>>,
	eventq: VecDeque<Event>,
	poison: Option<Error>,
}

impl NamespaceResolver {
	/// Create a new namespace resolver with its own (unshared) [`Context`].
	pub fn new() -> Self {
		Self::with_context(RcPtr::new(Context::new()))
	}

	/// Create a new namespace resolver with the given [`Context`].
	pub fn with_context(ctx: RcPtr<Context>) -> Self {
		let fixed_xml_namespace = ctx.intern_uri(XMLNS_XML);
		let fixed_xmlns_namespace = ctx.intern_uri(XMLNS_XMLNS);
		Self {
			ctx,
			fixed_xml_namespace,
			fixed_xmlns_namespace,
			namespace_stack: Vec::new(),
			default_stack: Vec::new(),
			eventq: VecDeque::new(),
			poison: None,
		}
	}

	fn check_poison(&self) -> Result<()> {
		if let Some(poison) = self.poison.as_ref() {
			return Err(poison.clone());
		}
		Ok(())
	}

	/// Number of currently open elements.
	pub fn depth(&self) -> usize {
		self.namespace_stack.len()
	}

	/// The default namespace in scope.
	pub fn default_namespace(&self) -> Option<&NamespaceName> {
		self.default_stack.last().and_then(|x| x.as_ref())
	}

	/// Resolve a prefix (not the empty one) against the bindings in scope.
	pub fn lookup_prefix(&self, prefix: &str) -> Option<&NamespaceName> {
		match prefix {
			"xml" => return Some(&self.fixed_xml_namespace),
			"xmlns" => return Some(&self.fixed_xmlns_namespace),
			_ => (),
		}
		for frame in self.namespace_stack.iter().rev() {
			for (declared, uri) in frame.iter().rev() {
				if declared.as_str() == prefix {
					return uri.as_ref();
				}
			}
		}
		None
	}

	fn resolve(&self, name: SmartString, is_attribute: bool) -> QName {
		let (prefix, _) = split_name(&name);
		let uri = if prefix.is_empty() {
			if is_attribute {
				if name.as_str() == "xmlns" {
					Some(self.fixed_xmlns_namespace.clone())
				} else {
					None
				}
			} else {
				self.default_namespace().cloned()
			}
		} else {
			match self.lookup_prefix(prefix) {
				Some(uri) => Some(uri.clone()),
				None => {
					log::debug!(
						target: "rxdom::namespaces",
						"undeclared namespace prefix in {:?}",
						name
					);
					None
				}
			}
		};
		QName::namespaced(uri, name)
	}

	fn start_element(&mut self, name: SmartString, attrs: RawAttributes) {
		let mut frame = Frame::new();
		let mut default_decl: Option<Option<NamespaceName>> = None;
		for (key, value) in attrs.iter() {
			let uri = if value.is_empty() {
				None
			} else {
				Some(self.ctx.intern_uri(value))
			};
			if key.as_str() == "xmlns" {
				default_decl = Some(uri.clone());
				frame.push((SmartString::new(), uri));
			} else if let Some(prefix) = key.strip_prefix("xmlns:") {
				if !prefix.is_empty() {
					frame.push((prefix.into(), uri));
				}
			}
		}
		let inherited = match default_decl {
			Some(decl) => decl,
			None => self.default_namespace().cloned(),
		};
		log::trace!(
			target: "rxdom::namespaces",
			"push frame with {} declarations at depth {}",
			frame.len(),
			self.namespace_stack.len()
		);
		for (prefix, uri) in frame.iter() {
			if let Some(uri) = uri {
				self.eventq.push_back(Event::StartNamespace(prefix.clone(), uri.clone()));
			}
		}
		self.namespace_stack.push(frame);
		self.default_stack.push(inherited);

		let qname = self.resolve(name, false);
		let attributes = attrs
			.into_iter()
			.map(|(key, value)| Attribute {
				name: self.resolve(key, true),
				value,
			})
			.collect();
		self.eventq.push_back(Event::StartElement(qname, attributes));
	}

	fn end_element(&mut self, name: SmartString) {
		let qname = self.resolve(name, false);
		self.eventq.push_back(Event::EndElement(qname));
		self.default_stack.pop();
		if let Some(frame) = self.namespace_stack.pop() {
			log::trace!(
				target: "rxdom::namespaces",
				"pop frame with {} declarations at depth {}",
				frame.len(),
				self.namespace_stack.len()
			);
			for (prefix, uri) in frame.into_iter() {
				if uri.is_some() {
					self.eventq.push_back(Event::EndNamespace(prefix));
				}
			}
		}
	}

	fn process_event(&mut self, ev: RawEvent) {
		match ev {
			RawEvent::StartElement(name, attrs) => self.start_element(name, attrs),
			RawEvent::EndElement(name) => self.end_element(name),
			RawEvent::Doctype(text) => self.eventq.push_back(Event::Doctype(text)),
			RawEvent::ProcessingInstruction(target, data) => self
				.eventq
				.push_back(Event::ProcessingInstruction(target, data)),
			RawEvent::Comment(text) => self.eventq.push_back(Event::Comment(text)),
			RawEvent::Text(text) => self.eventq.push_back(Event::Text(text)),
			RawEvent::CData(text) => self.eventq.push_back(Event::CData(text)),
		}
	}

	/// Read [`RawEvent`] structs from the given function until an
	/// [`Event`] can be emitted or the function signals the end of input.
	///
	/// Errors from `f` poison the resolver: they are returned on every
	/// further call, no matter the `f`.
	pub fn next<F: FnMut() -> Result<Option<RawEvent>>>(&mut self, mut f: F) -> Result<Option<Event>> {
		self.check_poison()?;
		loop {
			if let Some(ev) = self.eventq.pop_front() {
				return Ok(Some(ev));
			}
			match f() {
				Ok(None) => return Ok(None),
				Err(e) => {
					self.poison = Some(e.clone());
					return Err(e);
				}
				Ok(Some(raw)) => self.process_event(raw),
			}
		}
	}

	/// Access the inner context
	pub fn context(&self) -> &RcPtr<Context> {
		&self.ctx
	}
}
