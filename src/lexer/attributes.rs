/*!
# Attribute sub-parser

Splits the part of a start tag after the element name into ordered
name/value pairs.
*/
use smartstring::alias::String as SmartString;

use crate::entities::EntityTable;
use crate::error::{Error, Position, Result, ERRCTX_ATTNAME, ERRCTX_ATTVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	None,
	Key,
	Value,
}

/// Ordered attribute list as found in the start tag.
pub type RawAttributes = Vec<(SmartString, String)>;

fn is_space(b: u8) -> bool {
	b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

/**
Parse the attribute list in `text`.

`source` and `base` are only used to compute error positions: `text` must
start at byte offset `base` of `source`.

Values are passed through `entities` only if they contain an ampersand.
A repeated attribute name silently replaces the value of the earlier
occurrence, keeping its position in the list.
*/
pub(crate) fn parse_attributes(
	text: &str,
	source: &str,
	base: usize,
	entities: &EntityTable,
) -> Result<RawAttributes> {
	let err = |ctx: &'static str, at: usize| Error::Syntax(ctx, Position::locate(source, base + at));
	let bytes = text.as_bytes();
	let mut result = RawAttributes::new();
	let mut state = State::None;
	let mut key_start = 0;
	let mut key_end = 0;
	let mut key_closed = false;
	let mut quote: Option<u8> = None;
	let mut value_start = 0;
	let mut maybe_entity = false;

	for (i, b) in bytes.iter().copied().enumerate() {
		match state {
			State::None => {
				if is_space(b) {
					continue;
				}
				if b == b'=' || b == b'"' || b == b'\'' {
					return Err(err(ERRCTX_ATTNAME, i));
				}
				state = State::Key;
				key_start = i;
				key_end = i + 1;
				key_closed = false;
			}
			State::Key => {
				if b == b'=' {
					state = State::Value;
					quote = None;
				} else if is_space(b) {
					key_closed = true;
				} else if b == b'"' || b == b'\'' || key_closed {
					// a second name or a value without `=`
					return Err(err(ERRCTX_ATTNAME, i));
				} else {
					key_end = i + 1;
				}
			}
			State::Value => match quote {
				None => {
					if is_space(b) {
						continue;
					}
					if b != b'"' && b != b'\'' {
						return Err(err(ERRCTX_ATTVAL, i));
					}
					quote = Some(b);
					value_start = i + 1;
					maybe_entity = false;
				}
				Some(q) if q == b => {
					let raw = &text[value_start..i];
					let value = if maybe_entity {
						entities.decode(raw).into_owned()
					} else {
						raw.to_string()
					};
					let key = &text[key_start..key_end];
					match result.iter_mut().find(|(k, _)| k == key) {
						Some(existing) => existing.1 = value,
						None => result.push((key.into(), value)),
					}
					state = State::None;
				}
				Some(_) => {
					if b == b'&' {
						maybe_entity = true;
					}
				}
			},
		}
	}

	match state {
		State::None => Ok(result),
		State::Key => Err(err(ERRCTX_ATTNAME, key_start)),
		State::Value => Err(err(ERRCTX_ATTVAL, text.len())),
	}
}
