/*!
# Single-pass XML tokenizer

The [`Lexer`] scans a complete, in-memory XML text once from left to right
and yields [`RawEvent`]s. It is non-validating and lenient: DTDs are kept
verbatim, unknown declarations in the body are skipped and unknown entity
references are passed through.

Names are neither split at colons nor resolved here; that is the job of the
[`crate::parser`] layer.
*/
use std::fmt;

use smartstring::alias::String as SmartString;

mod attributes;

pub use attributes::RawAttributes;

use crate::context::Context;
use crate::error::*;
use crate::parser::RcPtr;

const CDATA_SENTINEL: &'static [u8] = b"[CDATA[";
const DOCTYPE_SENTINEL: &'static [u8] = b"DOCTYPE";

/// Raw lexical event.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
	/// `<!DOCTYPE ...>`, including an inline subset, verbatim.
	Doctype(String),
	/// `<?target data?>`
	ProcessingInstruction(SmartString, String),
	/// `<!--...-->`, content only.
	Comment(String),
	/// Start tag with its name as written and its attributes in order.
	///
	/// A self-closing tag is followed by a synthesized
	/// [`RawEvent::EndElement`].
	StartElement(SmartString, RawAttributes),
	/// End tag with its name as written.
	EndElement(SmartString),
	/// Character data, entity references decoded.
	Text(String),
	/// Content of a CDATA section, verbatim.
	CData(String),
}

/// Tokenizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	/// Before the document element, skipping whitespace.
	BeforeProlog,
	/// After `<?`.
	InProcessingInstruction,
	/// After `<!`.
	InExclamationDecl,
	/// After `<!DOCTYPE`.
	InDoctype,
	/// After the `[` of a DOCTYPE declaration.
	InInlineDoctypeSubset,
	/// After `<!--` before the document element.
	InPrologComment,
	/// Inside the document element or after it.
	Parsing,
	/// After `<!--` after the document element started.
	InBodyComment,
}

/**
# Lexer options

```
use rxdom::LexerOptions;
let opts = LexerOptions::default().max_token_length(1024);
assert_eq!(opts.max_token_length, 1024);
```
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerOptions {
	/// Maximum length in bytes of a single tag, processing instruction,
	/// comment, CDATA section or declaration (including DOCTYPE), measured
	/// from its `<` to its closing `>`.
	///
	/// Character data between tags is not limited.
	pub max_token_length: usize,
}

impl LexerOptions {
	/// Set the maximum token length, consuming and returning the options.
	pub fn max_token_length(mut self, v: usize) -> LexerOptions {
		self.max_token_length = v;
		self
	}
}

impl Default for LexerOptions {
	fn default() -> LexerOptions {
		LexerOptions {
			max_token_length: 65535,
		}
	}
}

fn is_space(b: u8) -> bool {
	b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
	haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

fn is_invalid_name_byte(b: u8) -> bool {
	b == b'/' || b == b'=' || b == b'"' || b == b'\'' || b == b'<' || b == b'>'
}

/**
# Tokenizer

Yields the raw events of `input` one by one. After the first error, every
further call to [`Lexer::lex`] returns a clone of that error.

```
use rxdom::lexer::{Lexer, RawEvent};
let mut lexer = Lexer::new("<a>hi</a>");
assert_eq!(lexer.lex().unwrap(), Some(RawEvent::StartElement("a".into(), Vec::new())));
assert_eq!(lexer.lex().unwrap(), Some(RawEvent::Text("hi".to_string())));
assert_eq!(lexer.lex().unwrap(), Some(RawEvent::EndElement("a".into())));
assert_eq!(lexer.lex().unwrap(), None);
```
*/
pub struct Lexer<'x> {
	input: &'x str,
	pos: usize,
	end: usize,
	state: State,
	opts: LexerOptions,
	ctx: RcPtr<Context>,
	/// open element names with the offset of their start tag
	open: Vec<(SmartString, usize)>,
	pending_end: Option<SmartString>,
	decl_start: usize,
	event_offset: usize,
	seen_root: bool,
	empty: bool,
	err: Option<Error>,
}

impl<'x> Lexer<'x> {
	/// Create a lexer with default options and a fresh context.
	pub fn new(input: &'x str) -> Lexer<'x> {
		Self::with_options(input, LexerOptions::default(), RcPtr::new(Context::new()))
	}

	/// Create a lexer using the given options and context.
	pub fn with_options(input: &'x str, opts: LexerOptions, ctx: RcPtr<Context>) -> Lexer<'x> {
		let trimmed = input.trim_start();
		let pos = input.len() - trimmed.len();
		let end = pos + trimmed.trim_end().len();
		Lexer {
			input,
			pos,
			end,
			state: State::BeforeProlog,
			opts,
			ctx,
			open: Vec::new(),
			pending_end: None,
			decl_start: pos,
			event_offset: pos,
			seen_root: false,
			empty: pos == end,
			err: None,
		}
	}

	/// Current tokenizer state.
	pub fn state(&self) -> State {
		self.state
	}

	/// Byte offset of the start of the most recently returned event.
	pub fn event_offset(&self) -> usize {
		self.event_offset
	}

	/// Position of the start of the most recently returned event.
	pub fn event_position(&self) -> Position {
		Position::locate(self.input, self.event_offset)
	}

	/// Names of the currently open elements, outermost first.
	pub fn open_elements(&self) -> impl Iterator<Item = &str> + '_ {
		self.open.iter().map(|(name, _)| name.as_str())
	}

	/// The source text.
	pub fn input(&self) -> &'x str {
		self.input
	}

	fn position(&self, offset: usize) -> Position {
		Position::locate(self.input, offset)
	}

	fn syntax(&self, ctx: &'static str, offset: usize) -> Error {
		Error::Syntax(ctx, self.position(offset))
	}

	fn transition(&mut self, next: State) {
		log::trace!(target: "rxdom::lexer", "{:?} -> {:?} at {}", self.state, next, self.pos);
		self.state = next;
	}

	fn after_markup(&self) -> State {
		if self.seen_root {
			State::Parsing
		} else {
			State::BeforeProlog
		}
	}

	fn check_length(&self, start: usize, end: usize) -> Result<()> {
		if end - start > self.opts.max_token_length {
			Err(self.syntax(ERRCTX_TOKEN_LENGTH, start))
		} else {
			Ok(())
		}
	}

	/// Read the next event.
	///
	/// Returns `Ok(None)` at the end of the input.
	pub fn lex(&mut self) -> Result<Option<RawEvent>> {
		if let Some(e) = self.err.as_ref() {
			return Err(e.clone());
		}
		match self.lex_inner() {
			Ok(Some(ev)) => {
				log::trace!(target: "rxdom::lexer", "event at {}: {:?}", self.event_offset, ev);
				Ok(Some(ev))
			}
			Ok(None) => Ok(None),
			Err(e) => {
				self.err = Some(e.clone());
				Err(e)
			}
		}
	}

	fn lex_inner(&mut self) -> Result<Option<RawEvent>> {
		if self.empty {
			return Err(Error::EmptyInput);
		}
		if let Some(name) = self.pending_end.take() {
			return Ok(Some(RawEvent::EndElement(name)));
		}
		loop {
			let result = match self.state {
				State::BeforeProlog => self.lex_before_prolog()?,
				State::InProcessingInstruction => Some(self.lex_processing_instruction()?),
				State::InExclamationDecl => self.lex_exclamation()?,
				State::InDoctype | State::InInlineDoctypeSubset => Some(self.lex_doctype()?),
				State::InPrologComment | State::InBodyComment => Some(self.lex_comment()?),
				State::Parsing => {
					if self.pos >= self.end {
						return self.finish();
					}
					self.lex_content()?
				}
			};
			if let Some(ev) = result {
				return Ok(Some(ev));
			}
			if self.state == State::BeforeProlog && self.pos >= self.end {
				return self.finish();
			}
		}
	}

	fn finish(&mut self) -> Result<Option<RawEvent>> {
		if let Some((name, offset)) = self.open.last() {
			return Err(Error::UnclosedTag(name.to_string(), self.position(*offset)));
		}
		if !self.seen_root {
			return Err(self.syntax(ERRCTX_NO_ROOT, self.end));
		}
		Ok(None)
	}

	/// Skip to the next `<` and dispatch on the following byte.
	fn lex_before_prolog(&mut self) -> Result<Option<RawEvent>> {
		let bytes = self.input.as_bytes();
		let start = self.pos;
		let lt = match memchr::memchr(b'<', &bytes[start..self.end]) {
			Some(i) => start + i,
			None => self.end,
		};
		if let Some(i) = bytes[start..lt].iter().position(|b| !is_space(*b)) {
			return Err(self.syntax(ERRCTX_TEXT, start + i));
		}
		self.pos = lt;
		if lt >= self.end {
			return Ok(None);
		}
		self.decl_start = lt;
		match bytes.get(lt + 1) {
			Some(b'?') => {
				self.pos = lt + 2;
				self.transition(State::InProcessingInstruction);
			}
			Some(b'!') => {
				self.pos = lt + 2;
				self.transition(State::InExclamationDecl);
			}
			_ => self.transition(State::Parsing),
		}
		Ok(None)
	}

	fn lex_processing_instruction(&mut self) -> Result<RawEvent> {
		let start = self.decl_start;
		let close = match memchr::memmem::find(&self.input.as_bytes()[self.pos..self.end], b"?>") {
			Some(i) => self.pos + i,
			None => {
				return Err(Error::UnclosedTag("<?".to_string(), self.position(start)));
			}
		};
		self.check_length(start, close + 2)?;
		let content = &self.input[self.pos..close];
		let (target, data) = match content.find(|c: char| c.is_ascii_whitespace()) {
			Some(i) => (&content[..i], content[i..].trim()),
			None => (content, ""),
		};
		if target.is_empty() {
			return Err(self.syntax(ERRCTX_PI, start));
		}
		self.event_offset = start;
		self.pos = close + 2;
		let next = self.after_markup();
		self.transition(next);
		Ok(RawEvent::ProcessingInstruction(target.into(), data.to_string()))
	}

	fn lex_exclamation(&mut self) -> Result<Option<RawEvent>> {
		let rest = &self.input.as_bytes()[self.pos..self.end];
		if rest.starts_with(b"--") {
			self.pos += 2;
			let next = if self.seen_root {
				State::InBodyComment
			} else {
				State::InPrologComment
			};
			self.transition(next);
			Ok(None)
		} else if starts_with_ignore_case(rest, DOCTYPE_SENTINEL) {
			self.pos += DOCTYPE_SENTINEL.len();
			self.transition(State::InDoctype);
			Ok(None)
		} else if starts_with_ignore_case(rest, CDATA_SENTINEL) {
			if !self.seen_root {
				return Err(self.syntax(ERRCTX_CDATA_SECTION, self.decl_start));
			}
			self.pos += CDATA_SENTINEL.len();
			self.lex_cdata().map(Some)
		} else {
			self.skip_declaration()?;
			Ok(None)
		}
	}

	/// Scan for a `>` which is preceded by `]]`.
	fn lex_cdata(&mut self) -> Result<RawEvent> {
		let bytes = self.input.as_bytes();
		let content_start = self.pos;
		let mut search = content_start;
		loop {
			let gt = match memchr::memchr(b'>', &bytes[search..self.end]) {
				Some(i) => search + i,
				None => {
					return Err(Error::UnclosedTag(
						"<![CDATA[".to_string(),
						self.position(self.decl_start),
					));
				}
			};
			if gt >= content_start + 2 && &bytes[gt - 2..gt] == b"]]" {
				self.check_length(self.decl_start, gt + 1)?;
				self.event_offset = self.decl_start;
				self.pos = gt + 1;
				let next = self.after_markup();
				self.transition(next);
				return Ok(RawEvent::CData(self.input[content_start..gt - 2].to_string()));
			}
			search = gt + 1;
		}
	}

	/// Skip an unsupported `<!...>` declaration, honoring quotes and
	/// bracketed sections.
	fn skip_declaration(&mut self) -> Result<()> {
		let bytes = self.input.as_bytes();
		let start = self.decl_start;
		let mut quote: Option<u8> = None;
		let mut depth = 0usize;
		let mut i = self.pos;
		while i < self.end {
			let b = bytes[i];
			match quote {
				Some(q) if q == b => quote = None,
				Some(_) => (),
				None => match b {
					b'"' | b'\'' => quote = Some(b),
					b'[' => depth += 1,
					b']' => depth = depth.saturating_sub(1),
					b'>' if depth == 0 => {
						self.check_length(start, i + 1)?;
						log::debug!(
							target: "rxdom::lexer",
							"discarding declaration {:?}",
							&self.input[start..i + 1]
						);
						self.pos = i + 1;
						let next = self.after_markup();
						self.transition(next);
						return Ok(());
					}
					_ => (),
				},
			}
			i += 1;
		}
		Err(Error::UnclosedTag("<!".to_string(), self.position(start)))
	}

	/// Capture a DOCTYPE declaration verbatim, including its inline subset.
	fn lex_doctype(&mut self) -> Result<RawEvent> {
		let bytes = self.input.as_bytes();
		let start = self.decl_start;
		let mut quote: Option<u8> = None;
		let mut i = self.pos;
		while i < self.end {
			let b = bytes[i];
			if let Some(q) = quote {
				if q == b {
					quote = None;
				}
				i += 1;
				continue;
			}
			match (self.state, b) {
				(_, b'"') | (_, b'\'') => quote = Some(b),
				(State::InDoctype, b'[') => {
					self.pos = i;
					self.transition(State::InInlineDoctypeSubset);
				}
				(State::InDoctype, b'>') => {
					self.check_length(start, i + 1)?;
					self.event_offset = start;
					self.pos = i + 1;
					let next = self.after_markup();
					self.transition(next);
					return Ok(RawEvent::Doctype(self.input[start..i + 1].to_string()));
				}
				(State::InInlineDoctypeSubset, b'<') if bytes[i..self.end].starts_with(b"<!--") => {
					match memchr::memmem::find(&bytes[i + 4..self.end], b"-->") {
						Some(off) => {
							i = i + 4 + off + 3;
							continue;
						}
						None => break,
					}
				}
				(State::InInlineDoctypeSubset, b'<') if bytes[i..self.end].starts_with(b"<?") => {
					match memchr::memmem::find(&bytes[i + 2..self.end], b"?>") {
						Some(off) => {
							i = i + 2 + off + 2;
							continue;
						}
						None => break,
					}
				}
				(State::InInlineDoctypeSubset, b']') => {
					self.pos = i;
					self.transition(State::InDoctype);
				}
				_ => (),
			}
			i += 1;
		}
		Err(Error::UnclosedTag("<!DOCTYPE".to_string(), self.position(start)))
	}

	fn lex_comment(&mut self) -> Result<RawEvent> {
		let start = self.decl_start;
		let close = match memchr::memmem::find(&self.input.as_bytes()[self.pos..self.end], b"-->") {
			Some(i) => self.pos + i,
			None => {
				return Err(Error::UnclosedTag("<!--".to_string(), self.position(start)));
			}
		};
		self.check_length(start, close + 3)?;
		let content = self.input[self.pos..close].to_string();
		self.event_offset = start;
		self.pos = close + 3;
		let next = self.after_markup();
		self.transition(next);
		Ok(RawEvent::Comment(content))
	}

	/// Lex text or a tag in the `Parsing` state.
	///
	/// Returns `Ok(None)` if only the state changed.
	fn lex_content(&mut self) -> Result<Option<RawEvent>> {
		let bytes = self.input.as_bytes();
		let start = self.pos;
		if bytes[start] != b'<' {
			let lt = match memchr::memchr(b'<', &bytes[start..self.end]) {
				Some(i) => start + i,
				None => self.end,
			};
			self.event_offset = start;
			self.pos = lt;
			let text = self.ctx.entities().decode(&self.input[start..lt]).into_owned();
			return Ok(Some(RawEvent::Text(text)));
		}
		self.decl_start = start;
		match bytes.get(start + 1) {
			Some(b'/') => self.lex_end_tag().map(Some),
			Some(b'?') => {
				self.pos = start + 2;
				self.transition(State::InProcessingInstruction);
				Ok(None)
			}
			Some(b'!') => {
				self.pos = start + 2;
				self.transition(State::InExclamationDecl);
				Ok(None)
			}
			Some(_) => self.lex_start_tag().map(Some),
			None => Err(Error::UnclosedTag("<".to_string(), self.position(start))),
		}
	}

	/// Find the `>` closing the tag starting at `start`, skipping quoted
	/// sections.
	fn find_tag_end(&self, start: usize) -> Option<usize> {
		let bytes = self.input.as_bytes();
		let mut quote: Option<u8> = None;
		let mut i = start;
		while i < self.end {
			match quote {
				Some(q) => match memchr::memchr(q, &bytes[i..self.end]) {
					Some(off) => {
						i += off + 1;
						quote = None;
					}
					None => return None,
				},
				None => match memchr::memchr3(b'>', b'"', b'\'', &bytes[i..self.end]) {
					Some(off) => {
						let b = bytes[i + off];
						if b == b'>' {
							return Some(i + off);
						}
						quote = Some(b);
						i += off + 1;
					}
					None => return None,
				},
			}
		}
		None
	}

	fn lex_end_tag(&mut self) -> Result<RawEvent> {
		let start = self.pos;
		let gt = match memchr::memchr(b'>', &self.input.as_bytes()[start..self.end]) {
			Some(i) => start + i,
			None => {
				return Err(Error::UnclosedTag("</".to_string(), self.position(start)));
			}
		};
		self.check_length(start, gt + 1)?;
		let name = self.input[start + 2..gt].trim();
		if name.is_empty() || name.bytes().any(|b| is_space(b) || is_invalid_name_byte(b)) {
			return Err(self.syntax(ERRCTX_ELEMENT_FOOT, start));
		}
		match self.open.pop() {
			Some((expected, _)) if expected.as_str() == name => (),
			Some((expected, _)) => {
				return Err(Error::TagMismatch {
					expected: expected.to_string(),
					found: name.to_string(),
					position: self.position(start),
				});
			}
			None => return Err(self.syntax(ERRCTX_ELEMENT_FOOT, start)),
		}
		self.event_offset = start;
		self.pos = gt + 1;
		Ok(RawEvent::EndElement(name.into()))
	}

	fn lex_start_tag(&mut self) -> Result<RawEvent> {
		let start = self.pos;
		let gt = match self.find_tag_end(start + 1) {
			Some(i) => i,
			None => {
				return Err(Error::UnclosedTag("<".to_string(), self.position(start)));
			}
		};
		self.check_length(start, gt + 1)?;
		let mut content = self.input[start + 1..gt].trim_end();
		let self_closing = content.ends_with('/');
		if self_closing {
			content = &content[..content.len() - 1];
		}
		let name_end = content
			.bytes()
			.position(is_space)
			.unwrap_or_else(|| content.len());
		let name = &content[..name_end];
		if name.is_empty() || name.bytes().any(is_invalid_name_byte) {
			return Err(self.syntax(ERRCTX_NAME, start));
		}
		let rest = &content[name_end..];
		let rest_base = start + 1 + name_end;
		let attributes = if rest.contains(|c: char| c == '"' || c == '\'') {
			attributes::parse_attributes(rest, self.input, rest_base, self.ctx.entities())?
		} else {
			if let Some(i) = rest.bytes().position(|b| !is_space(b)) {
				return Err(self.syntax(ERRCTX_ATTNAME, rest_base + i));
			}
			RawAttributes::new()
		};
		let name: SmartString = name.into();
		self.event_offset = start;
		self.pos = gt + 1;
		self.seen_root = true;
		if self_closing {
			self.pending_end = Some(name.clone());
		} else {
			self.open.push((name.clone(), start));
		}
		Ok(RawEvent::StartElement(name, attributes))
	}
}

impl<'x> fmt::Debug for Lexer<'x> {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Lexer")
			.field("pos", &self.pos)
			.field("end", &self.end)
			.field("state", &self.state)
			.field("opts", &self.opts)
			.field("open", &self.open)
			.field("seen_root", &self.seen_root)
			.field("err", &self.err)
			.finish()
	}
}
