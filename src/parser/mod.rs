/*!
# Event pipeline

The [`Parser`] joins the [`Lexer`] with an optional [`NamespaceResolver`]
and turns raw lexical events into [`Event`]s, which carry split and
(optionally) namespace-resolved names.
*/
use std::fmt;
#[cfg(not(feature = "mt"))]
use std::rc::Rc;
#[cfg(feature = "mt")]
use std::sync::Arc;

use smartstring::alias::String as SmartString;

mod namespaces;

pub use namespaces::NamespaceResolver;

use crate::context::Context;
use crate::error::{Position, Result};
use crate::lexer::{Lexer, LexerOptions, RawEvent};

/// Wrapper pointer around namespace URIs and the shared [`Context`]
///
/// In builds with the `mt` feature, this is a [`Arc`]. In non-`mt` builds,
/// this is a [`std::rc::Rc`]
#[cfg(feature = "mt")]
pub type RcPtr<T> = Arc<T>;
/// Wrapper pointer around namespace URIs and the shared [`Context`]
///
/// In builds with the `mt` feature, this is a [`std::sync::Arc`].
/// In non-`mt` builds, this is a [`Rc`].
#[cfg(not(feature = "mt"))]
pub type RcPtr<T> = Rc<T>;

/// Shared namespace URI
pub type NamespaceName = RcPtr<str>;

/// XML core namespace URI (for the `xml:` prefix)
pub const XMLNS_XML: &'static str = "http://www.w3.org/XML/1998/namespace";
/// XML namespace URI (for the `xmlns:` prefix)
pub const XMLNS_XMLNS: &'static str = "http://www.w3.org/2000/xmlns/";

/**
# Element or attribute name

`name` is the qualified name as written. `prefix`, `local_name` and
`namespace_uri` are only filled in when namespace processing is enabled;
otherwise they are empty.
*/
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct QName {
	pub name: SmartString,
	pub prefix: SmartString,
	pub local_name: SmartString,
	pub namespace_uri: Option<NamespaceName>,
}

impl QName {
	/// Name without namespace information.
	pub fn plain<T: Into<SmartString>>(name: T) -> QName {
		QName {
			name: name.into(),
			..QName::default()
		}
	}

	/// Name with namespace information; `name` is split at the first colon.
	pub fn namespaced<T: Into<SmartString>>(uri: Option<NamespaceName>, name: T) -> QName {
		let name = name.into();
		let (prefix, local_name) = split_name(&name);
		QName {
			prefix: prefix.into(),
			local_name: local_name.into(),
			name,
			namespace_uri: uri,
		}
	}

	/// The namespace URI or the empty string.
	pub fn uri(&self) -> &str {
		match self.namespace_uri.as_ref() {
			Some(uri) => &**uri,
			None => "",
		}
	}
}

impl fmt::Debug for QName {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self.namespace_uri.as_ref() {
			Some(uri) => write!(f, "{{{}}}{}", uri, self.name),
			None => write!(f, "{}", self.name),
		}
	}
}

/// Split a qualified name into prefix and local part.
///
/// Names without colon have an empty prefix.
pub fn split_name(name: &str) -> (&str, &str) {
	match name.find(':') {
		Some(i) => (&name[..i], &name[i + 1..]),
		None => ("", name),
	}
}

/// Attribute as reported in [`Event::StartElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	pub name: QName,
	pub value: String,
}

/**
# Logical document parts

Each [`Event`] refers to a piece of the document which has been parsed.
When namespace processing is enabled, [`Event::StartNamespace`] events
precede the [`Event::StartElement`] of the declaring element and
[`Event::EndNamespace`] events follow its [`Event::EndElement`].
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	/// Verbatim document type declaration.
	Doctype(String),
	/// Processing instruction target and data.
	ProcessingInstruction(SmartString, String),
	/// Comment content.
	Comment(String),
	/// A prefix (empty for the default namespace) comes into scope.
	StartNamespace(SmartString, NamespaceName),
	/// A prefix (empty for the default namespace) goes out of scope.
	EndNamespace(SmartString),
	/// Start of an element.
	StartElement(QName, Vec<Attribute>),
	/// End of an element.
	EndElement(QName),
	/// Character data.
	///
	/// This includes CDATA sections unless CDATA preservation is enabled.
	Text(String),
	/// CDATA section content.
	CData(String),
}

/**
# Parser options

```
use rxdom::ParseOptions;
let opts = ParseOptions::default().namespace_aware(true);
assert!(opts.namespace_aware);
assert!(!opts.preserve_cdata);
```
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
	/// Report CDATA sections as [`Event::CData`] instead of text.
	pub preserve_cdata: bool,
	/// Resolve namespace prefixes.
	pub namespace_aware: bool,
	/// Escape bare ampersands before tokenizing.
	pub repair_ampersands: bool,
	pub lexer: LexerOptions,
}

impl ParseOptions {
	pub fn preserve_cdata(mut self, v: bool) -> ParseOptions {
		self.preserve_cdata = v;
		self
	}

	pub fn namespace_aware(mut self, v: bool) -> ParseOptions {
		self.namespace_aware = v;
		self
	}

	pub fn repair_ampersands(mut self, v: bool) -> ParseOptions {
		self.repair_ampersands = v;
		self
	}

	pub fn lexer(mut self, v: LexerOptions) -> ParseOptions {
		self.lexer = v;
		self
	}
}

/// Source of [`Event`]s.
pub trait EventRead {
	/// Read a single event.
	///
	/// At the end of a valid document, `None` is returned. All errors are
	/// fatal and will be returned again on the next invocation.
	fn read(&mut self) -> Result<Option<Event>>;

	/// Read all remaining events.
	///
	/// The given `cb` is invoked for each event; an error returned by `cb`
	/// stops reading and is forwarded.
	fn read_all<F>(&mut self, mut cb: F) -> Result<()>
	where
		F: FnMut(Event) -> Result<()>,
	{
		loop {
			match self.read()? {
				None => return Ok(()),
				Some(ev) => cb(ev)?,
			}
		}
	}
}

/**
# Event parser

```
use rxdom::{EventRead, Parser, ParseOptions, Event};
let mut p = Parser::new("<a xmlns='urn:a'/>", &ParseOptions::default().namespace_aware(true));
match p.read().unwrap().unwrap() {
	Event::StartNamespace(prefix, uri) => {
		assert_eq!(prefix.as_str(), "");
		assert_eq!(&*uri, "urn:a");
	},
	other => panic!("unexpected event: {:?}", other),
}
```
*/
pub struct Parser<'x> {
	lexer: Lexer<'x>,
	resolver: Option<NamespaceResolver>,
	preserve_cdata: bool,
}

impl<'x> Parser<'x> {
	/// Create a parser with a fresh [`Context`].
	pub fn new(input: &'x str, opts: &ParseOptions) -> Parser<'x> {
		Self::with_context(input, opts, RcPtr::new(Context::new()))
	}

	/// Create a parser sharing the given [`Context`].
	///
	/// `opts.repair_ampersands` is not applied here as the parser borrows
	/// the input; see [`crate::entities::repair_ampersands`].
	pub fn with_context(input: &'x str, opts: &ParseOptions, ctx: RcPtr<Context>) -> Parser<'x> {
		let resolver = if opts.namespace_aware {
			Some(NamespaceResolver::with_context(ctx.clone()))
		} else {
			None
		};
		Parser {
			lexer: Lexer::with_options(input, opts.lexer, ctx),
			resolver,
			preserve_cdata: opts.preserve_cdata,
		}
	}

	/// Position of the most recently lexed construct.
	pub fn position(&self) -> Position {
		self.lexer.event_position()
	}

	fn convert(ev: RawEvent) -> Event {
		match ev {
			RawEvent::Doctype(text) => Event::Doctype(text),
			RawEvent::ProcessingInstruction(target, data) => Event::ProcessingInstruction(target, data),
			RawEvent::Comment(text) => Event::Comment(text),
			RawEvent::StartElement(name, attrs) => Event::StartElement(
				QName::plain(name),
				attrs
					.into_iter()
					.map(|(name, value)| Attribute {
						name: QName::plain(name),
						value,
					})
					.collect(),
			),
			RawEvent::EndElement(name) => Event::EndElement(QName::plain(name)),
			RawEvent::Text(text) => Event::Text(text),
			RawEvent::CData(text) => Event::CData(text),
		}
	}
}

impl<'x> EventRead for Parser<'x> {
	fn read(&mut self) -> Result<Option<Event>> {
		let ev = match self.resolver.as_mut() {
			Some(resolver) => {
				let lexer = &mut self.lexer;
				resolver.next(|| lexer.lex())?
			}
			None => match self.lexer.lex()? {
				Some(raw) => Some(Self::convert(raw)),
				None => None,
			},
		};
		Ok(ev.map(|ev| match ev {
			Event::CData(text) if !self.preserve_cdata => Event::Text(text),
			other => other,
		}))
	}
}

impl<'x> fmt::Debug for Parser<'x> {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Parser")
			.field("lexer", &self.lexer)
			.field("namespace_aware", &self.resolver.is_some())
			.field("preserve_cdata", &self.preserve_cdata)
			.finish()
	}
}
