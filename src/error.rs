/*!
# Error types

This module holds the error types returned by the tokenizer, the tree
builder and the mutation operations of the document model.
*/
use std::error;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::sync::Arc;

pub const ERRCTX_ELEMENT_FOOT: &'static str = "in end tag";
pub const ERRCTX_NAME: &'static str = "in element name";
pub const ERRCTX_ATTNAME: &'static str = "in attribute name";
pub const ERRCTX_ATTVAL: &'static str = "in attribute value";
pub const ERRCTX_TEXT: &'static str = "in text outside of the document element";
pub const ERRCTX_CDATA_SECTION: &'static str = "in CDATA section";
pub const ERRCTX_PI: &'static str = "in processing instruction";
pub const ERRCTX_TOKEN_LENGTH: &'static str = "token exceeds maximum length";
pub const ERRCTX_NO_ROOT: &'static str = "no document element";

/**
Location of an error within the source text.

`line` and `column` are one-based, `column` counts characters (not bytes).
`offset` is the zero-based byte offset into the (untrimmed) input.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Position {
	/// Compute the position of byte `offset` within `text`.
	///
	/// Offsets beyond the end of `text` are clamped to its length.
	pub fn locate(text: &str, offset: usize) -> Position {
		let mut offset = offset.min(text.len());
		while !text.is_char_boundary(offset) {
			offset -= 1;
		}
		let head = &text[..offset];
		let line_start = match memchr::memrchr(b'\n', head.as_bytes()) {
			Some(i) => i + 1,
			None => 0,
		};
		Position {
			line: memchr::memchr_iter(b'\n', head.as_bytes()).count() + 1,
			column: head[line_start..].chars().count() + 1,
			offset,
		}
	}
}

impl fmt::Display for Position {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "line {}, column {}", self.line, self.column)
	}
}

/// [`std::sync::Arc`]-based around [`std::io::Error`] to allow cloning.
#[derive(Clone)]
pub struct IOErrorWrapper(Arc<io::Error>);

impl IOErrorWrapper {
	fn wrap(e: io::Error) -> IOErrorWrapper {
		IOErrorWrapper(Arc::new(e))
	}
}

impl fmt::Debug for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

impl fmt::Display for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&**self, f)
	}
}

impl PartialEq for IOErrorWrapper {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Deref for IOErrorWrapper {
	type Target = io::Error;

	fn deref(&self) -> &io::Error {
		&*self.0
	}
}

/**
Classification of an [`Error`].

This is the fixed taxonomy callers are expected to match on; the
[`Error`] variants carry the details.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The input was empty, consisted only of whitespace or was not text.
	EmptyOrNonStringInput,
	/// Malformed tag, attribute or declaration text.
	SyntaxError,
	/// A construct was still open when the input ended.
	UnclosedTag,
	/// An end tag did not match the innermost open start tag.
	TagMismatch,
	/// A node was placed where the target parent does not allow it.
	HierarchyViolation,
	/// A reference node is not a child of the expected parent.
	NodeNotFound,
	/// An operation was invoked on a node kind which does not support it.
	AbstractOperationInvoked,
	/// A character data offset or count was out of range.
	IndexSize,
	/// Reading the source failed.
	Io,
}

/// Error types which may be returned by the parser or the document model.
///
/// Errors raised during parsing are fatal: the parser returns the same
/// error for every further call after the first encounter.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// An I/O error was encountered while loading the source.
	IO(IOErrorWrapper),

	/// The input was empty, whitespace-only or not valid UTF-8.
	EmptyInput,

	/// Malformed markup.
	///
	/// The string indicates the context and should not be interpreted by
	/// user code.
	Syntax(&'static str, Position),

	/// End of input reached while the named construct was still open.
	///
	/// For elements, the string is the name of the innermost open element.
	/// For other constructs, it is the construct's opening delimiter.
	UnclosedTag(String, Position),

	/// End tag name does not match the innermost open start tag.
	TagMismatch {
		expected: String,
		found: String,
		position: Position,
	},

	/// The requested insertion would violate the document structure.
	HierarchyViolation(&'static str),

	/// A reference node was not found where it was expected.
	NodeNotFound(&'static str),

	/// The operation is not supported by the node kind it was invoked on.
	AbstractOperation(&'static str),

	/// A character offset or count exceeded the data of a character data
	/// node.
	IndexSize {
		offset: usize,
		count: usize,
		length: usize,
	},
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
	pub fn io(e: io::Error) -> Error {
		Error::IO(IOErrorWrapper::wrap(e))
	}

	/// Return the taxonomy entry of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::IO(_) => ErrorKind::Io,
			Error::EmptyInput => ErrorKind::EmptyOrNonStringInput,
			Error::Syntax(..) => ErrorKind::SyntaxError,
			Error::UnclosedTag(..) => ErrorKind::UnclosedTag,
			Error::TagMismatch { .. } => ErrorKind::TagMismatch,
			Error::HierarchyViolation(_) => ErrorKind::HierarchyViolation,
			Error::NodeNotFound(_) => ErrorKind::NodeNotFound,
			Error::AbstractOperation(_) => ErrorKind::AbstractOperationInvoked,
			Error::IndexSize { .. } => ErrorKind::IndexSize,
		}
	}

	/// Return the position in the source text, if the error has one.
	pub fn position(&self) -> Option<Position> {
		match self {
			Error::Syntax(_, pos) | Error::UnclosedTag(_, pos) => Some(*pos),
			Error::TagMismatch { position, .. } => Some(*position),
			_ => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::io(e)
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::IO(e) => write!(f, "I/O error: {}", e),
			Error::EmptyInput => f.write_str("empty or non-UTF-8 input"),
			Error::Syntax(ctx, pos) => write!(f, "syntax error {} at {}", ctx, pos),
			Error::UnclosedTag(name, pos) => {
				write!(f, "unclosed {} opened at {}", name, pos)
			}
			Error::TagMismatch {
				expected,
				found,
				position,
			} => write!(
				f,
				"end tag </{}> does not match start tag <{}> at {}",
				found, expected, position
			),
			Error::HierarchyViolation(msg) => write!(f, "hierarchy violation: {}", msg),
			Error::NodeNotFound(msg) => write!(f, "node not found: {}", msg),
			Error::AbstractOperation(msg) => write!(f, "unsupported operation: {}", msg),
			Error::IndexSize {
				offset,
				count,
				length,
			} => write!(
				f,
				"range {}+{} out of bounds for character data of length {}",
				offset, count, length
			),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::IO(e) => Some(&**e),
			_ => None,
		}
	}
}
