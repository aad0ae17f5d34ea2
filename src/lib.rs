/*!
# Lenient XML documents

This crate parses XML text into an in-memory document, lets you query and
modify it, and writes it back out.

## Features (some call them restrictions)

* Non-validating: DTDs are kept verbatim but never interpreted
* No external resources
* Predefined entities, numeric character references and caller supplied
  entities; unknown entity references are passed through
* Optional namespace processing
* UTF-8 input only, the whole document has to be in memory
* Arena-backed document model with copyable node handles
* Compact and indented serialization
* Tokio-based loading supported via the `async` feature and [`parse_async`].

## Example

```
let mut doc = rxdom::parse("<root><item id='1'/><item id='2'/></root>", false, false).unwrap();
let root = doc.document_element().unwrap();
let second = doc.get_element_by_path(root, "item", 2).unwrap();
doc.set_attribute(second, "done", "yes").unwrap();
assert_eq!(
	doc.to_string(),
	"<root><item id=\"1\"/><item id=\"2\" done=\"yes\"/></root>",
);
```

## High-level usage

### Building documents

[`parse`] covers the common case. [`parse_with_options`] accepts
[`ParseOptions`] and a shared [`Context`], which carries the
[`EntityTable`]. [`parse_reader`] and [`parse_file`] read the complete
source before parsing.

### Event-based usage

The [`Parser`] can be used on its own to obtain a stream of [`Event`]s
without building a tree; see [`EventRead`].

### Output

[`Document::to_xml`] serializes any node, [`Document::write_to`] writes into
a [`bytes::BufMut`] using [`WriterOptions`].
*/
use std::fs;
use std::io;
use std::path::Path;

pub mod builder;
mod context;
pub mod dom;
pub mod entities;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod writer;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use builder::TreeBuilder;
pub use context::Context;
#[doc(inline)]
pub use dom::{Document, NodeId, NodeKind};
#[doc(inline)]
pub use entities::EntityTable;
#[doc(inline)]
pub use error::{Error, ErrorKind, Position, Result};
#[doc(inline)]
pub use lexer::{Lexer, LexerOptions};
#[doc(inline)]
pub use parser::{
	Attribute, Event, EventRead, NamespaceName, ParseOptions, Parser, QName, RcPtr, XMLNS_XML,
	XMLNS_XMLNS,
};
#[doc(inline)]
pub use writer::WriterOptions;

#[cfg(feature = "async")]
use tokio::io::{AsyncRead, AsyncReadExt};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/**
Parse a complete XML text into a [`Document`].

CDATA sections become CDATA section nodes if `preserve_cdata` is set and
are merged into the surrounding text otherwise. With `namespace_aware`,
element and attribute names are resolved against the `xmlns` declarations
in scope.

# Errors

Parsing stops at the first error; no partial document is returned.
*/
pub fn parse(text: &str, preserve_cdata: bool, namespace_aware: bool) -> Result<Document> {
	let opts = ParseOptions::default()
		.preserve_cdata(preserve_cdata)
		.namespace_aware(namespace_aware);
	parse_with_options(text, &opts, RcPtr::new(Context::new()))
}

/**
Parse a complete XML text with explicit options and context.

The returned document shares `ctx`, so its entity table is also used when
serializing with entity substitution.

```
use rxdom::{Context, EntityTable, ParseOptions, RcPtr};
let ctx = RcPtr::new(Context::with_entities(EntityTable::new().with_entity("me", "rxdom")));
let doc = rxdom::parse_with_options("<a>&me;</a>", &ParseOptions::default(), ctx).unwrap();
assert_eq!(doc.text(doc.document_element().unwrap()), "rxdom");
```
*/
pub fn parse_with_options(text: &str, opts: &ParseOptions, ctx: RcPtr<Context>) -> Result<Document> {
	let text = if opts.repair_ampersands {
		entities::repair_ampersands(text)
	} else {
		text.into()
	};
	let mut parser = Parser::with_context(&text, opts, ctx.clone());
	TreeBuilder::new(Document::with_context(ctx)).build(&mut parser)
}

/// Check that `text` parses, without keeping the document.
pub fn validate(text: &str) -> Result<()> {
	parse(text, false, false).map(|_| ())
}

fn decode_source(buf: Vec<u8>) -> Result<String> {
	String::from_utf8(buf).map_err(|_| Error::EmptyInput)
}

/// Read `r` to the end and parse the result.
///
/// Input which is not valid UTF-8 is rejected as
/// [`ErrorKind::EmptyOrNonStringInput`].
pub fn parse_reader<R: io::Read>(mut r: R, opts: &ParseOptions) -> Result<Document> {
	let mut buf = Vec::new();
	r.read_to_end(&mut buf)?;
	let text = decode_source(buf)?;
	parse_with_options(&text, opts, RcPtr::new(Context::new()))
}

/// Read the file at `path` and parse it.
pub fn parse_file<P: AsRef<Path>>(path: P, opts: &ParseOptions) -> Result<Document> {
	parse_reader(fs::File::open(path)?, opts)
}

/// Read `r` to the end without blocking the executor and parse the result.
#[cfg(feature = "async")]
pub async fn parse_async<R: AsyncRead + Unpin>(mut r: R, opts: &ParseOptions) -> Result<Document> {
	let mut buf = Vec::new();
	r.read_to_end(&mut buf).await?;
	let text = decode_source(buf)?;
	parse_with_options(&text, opts, RcPtr::new(Context::new()))
}
