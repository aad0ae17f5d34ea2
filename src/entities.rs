/*!
# Entity table

Mapping between entity references and their replacement text. The five
predefined XML entities are always known and take precedence; callers may
add their own entities on top (for example `nbsp` or `copy` when processing
XHTML-ish input).

The table is used in both directions: [`EntityTable::decode`] while
parsing and [`EntityTable::encode_into`] while serializing.
*/
use std::borrow::Cow;
use std::collections::HashMap;

use bytes::BufMut;

use smartstring::alias::String as SmartString;

const PREDEFINED: &'static [(&'static str, char)] = &[
	("amp", '&'),
	("lt", '<'),
	("gt", '>'),
	("quot", '"'),
	("apos", '\''),
];

/// Upper bound for the length of a reference name scanned after `&`.
const MAX_REFERENCE_LEN: usize = 64;

/// Return the character for a predefined entity name.
pub fn predefined(name: &str) -> Option<char> {
	PREDEFINED
		.iter()
		.find(|(n, _)| *n == name)
		.map(|(_, ch)| *ch)
}

fn predefined_reference(ch: char) -> Option<&'static str> {
	match ch {
		'&' => Some("&amp;"),
		'<' => Some("&lt;"),
		'>' => Some("&gt;"),
		'"' => Some("&quot;"),
		'\'' => Some("&apos;"),
		_ => None,
	}
}

fn is_name_byte(b: u8) -> bool {
	b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.' || b == b':' || b >= 0x80
}

fn decode_char_ref(body: &str) -> Option<char> {
	let cp = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
		u32::from_str_radix(hex, 16).ok()?
	} else {
		body.parse::<u32>().ok()?
	};
	std::char::from_u32(cp)
}

/// Return the length of the reference starting at `s[0] == '&'`, including
/// the terminating `;`, if `s` starts with a syntactically valid reference.
fn reference_len(s: &[u8]) -> Option<usize> {
	debug_assert!(s[0] == b'&');
	let limit = s.len().min(MAX_REFERENCE_LEN + 2);
	let end = memchr::memchr(b';', &s[1..limit])? + 1;
	let body = &s[1..end];
	if body.is_empty() {
		return None;
	}
	let valid = if body[0] == b'#' {
		let digits = &body[1..];
		match digits.first() {
			Some(b'x') | Some(b'X') => {
				digits.len() > 1 && digits[1..].iter().all(|b| b.is_ascii_hexdigit())
			}
			Some(_) => digits.iter().all(|b| b.is_ascii_digit()),
			None => false,
		}
	} else {
		!body[0].is_ascii_digit() && body.iter().all(|b| is_name_byte(*b))
	};
	if valid {
		Some(end + 1)
	} else {
		None
	}
}

/**
# Entity translation table

Holds the caller-supplied entities. The predefined entities are built in and
cannot be overridden.

```
use rxdom::EntityTable;
let table = EntityTable::new().with_entity("copy", "©");
assert_eq!(table.decode("&copy; 2004 &amp; later"), "© 2004 & later");
```
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityTable {
	custom: HashMap<SmartString, String>,
	// replacement text -> name, longest replacement first
	reverse: Vec<(String, SmartString)>,
}

impl EntityTable {
	/// Create a table which only knows the predefined entities.
	pub fn new() -> EntityTable {
		EntityTable::default()
	}

	/// Add a custom entity, consuming and returning the table.
	pub fn with_entity<N: Into<SmartString>, V: Into<String>>(mut self, name: N, value: V) -> Self {
		self.insert(name, value);
		self
	}

	/// Add or replace a custom entity.
	///
	/// Names of predefined entities are ignored.
	pub fn insert<N: Into<SmartString>, V: Into<String>>(&mut self, name: N, value: V) {
		let name = name.into();
		if predefined(&name).is_some() {
			return;
		}
		let value = value.into();
		self.reverse.retain(|(_, n)| *n != name);
		if !value.is_empty() {
			self.reverse.push((value.clone(), name.clone()));
			self.reverse.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.1.cmp(&b.1)));
		}
		self.custom.insert(name, value);
	}

	/// Number of custom entities.
	pub fn len(&self) -> usize {
		self.custom.len()
	}

	pub fn is_empty(&self) -> bool {
		self.custom.is_empty()
	}

	/// Look up the replacement text of a named entity.
	pub fn lookup(&self, name: &str) -> Option<Cow<'_, str>> {
		if let Some(ch) = predefined(name) {
			return Some(Cow::Owned(ch.to_string()));
		}
		self.custom.get(name).map(|v| Cow::Borrowed(v.as_str()))
	}

	fn push_replacement(&self, out: &mut String, body: &str) -> bool {
		if let Some(num) = body.strip_prefix('#') {
			match decode_char_ref(num) {
				Some(ch) => {
					out.push(ch);
					true
				}
				None => false,
			}
		} else if let Some(ch) = predefined(body) {
			out.push(ch);
			true
		} else if let Some(v) = self.custom.get(body) {
			out.push_str(v);
			true
		} else {
			false
		}
	}

	/// Replace all known references in `s`.
	///
	/// Unknown references and stray ampersands are kept verbatim. The
	/// replacement text is never rescanned, so `&amp;lt;` decodes to `&lt;`.
	pub fn decode<'a>(&self, s: &'a str) -> Cow<'a, str> {
		let bytes = s.as_bytes();
		let mut next = match memchr::memchr(b'&', bytes) {
			Some(i) => i,
			None => return Cow::Borrowed(s),
		};
		let mut out = String::with_capacity(s.len());
		let mut last = 0;
		loop {
			let copied_to = match reference_len(&bytes[next..]) {
				Some(len) => {
					out.push_str(&s[last..next]);
					if self.push_replacement(&mut out, &s[next + 1..next + len - 1]) {
						next + len
					} else {
						out.push_str(&s[next..next + len]);
						next + len
					}
				}
				None => {
					out.push_str(&s[last..next + 1]);
					next + 1
				}
			};
			last = copied_to;
			next = match memchr::memchr(b'&', &bytes[last..]) {
				Some(i) => last + i,
				None => break,
			};
		}
		out.push_str(&s[last..]);
		Cow::Owned(out)
	}

	/// Write `s` to `out`, replacing predefined characters first and then
	/// the replacement texts of custom entities by references.
	pub fn encode_into<B: BufMut>(&self, out: &mut B, s: &str) {
		let mut rest = s;
		'outer: while let Some(ch) = rest.chars().next() {
			if let Some(reference) = predefined_reference(ch) {
				out.put_slice(reference.as_bytes());
				rest = &rest[ch.len_utf8()..];
				continue;
			}
			for (value, name) in self.reverse.iter() {
				if rest.starts_with(value.as_str()) {
					out.put_u8(b'&');
					out.put_slice(name.as_bytes());
					out.put_u8(b';');
					rest = &rest[value.len()..];
					continue 'outer;
				}
			}
			let mut buf = [0u8; 4];
			out.put_slice(ch.encode_utf8(&mut buf).as_bytes());
			rest = &rest[ch.len_utf8()..];
		}
	}

	/// Convenience wrapper around [`EntityTable::encode_into`].
	pub fn encode(&self, s: &str) -> String {
		let mut out = Vec::with_capacity(s.len());
		self.encode_into(&mut out, s);
		// only whole chars and ASCII references were written
		String::from_utf8_lossy(&out).into_owned()
	}
}

/**
Write `s` to `out` so that it reads back as character data.

`<` is always escaped; `&` only when it does not start a syntactically
valid reference, so unknown entity references pass through unchanged.
`"` is escaped if `escape_quotes` is set.
*/
pub(crate) fn escape_markup_into<B: BufMut>(out: &mut B, s: &str, escape_quotes: bool) {
	let bytes = s.as_bytes();
	let mut last = 0;
	for i in memchr::memchr3_iter(b'<', b'&', b'"', bytes) {
		let replacement: &[u8] = match bytes[i] {
			b'<' => b"&lt;",
			b'&' if reference_len(&bytes[i..]).is_none() => b"&amp;",
			b'"' if escape_quotes => b"&quot;",
			_ => continue,
		};
		out.put_slice(&bytes[last..i]);
		out.put_slice(replacement);
		last = i + 1;
	}
	out.put_slice(&bytes[last..]);
}

/**
Escape every `&` which does not start a syntactically valid reference.

This is a best-effort repair pass for sloppy input such as
`<a href="?a=1&b=2">`; it runs before tokenizing and never fails.
*/
pub fn repair_ampersands(s: &str) -> Cow<'_, str> {
	let bytes = s.as_bytes();
	let mut out: Option<String> = None;
	let mut last = 0;
	for i in memchr::memchr_iter(b'&', bytes) {
		if reference_len(&bytes[i..]).is_some() {
			continue;
		}
		let buf = out.get_or_insert_with(|| String::with_capacity(s.len() + 16));
		buf.push_str(&s[last..i]);
		buf.push_str("&amp;");
		last = i + 1;
	}
	match out {
		None => Cow::Borrowed(s),
		Some(mut buf) => {
			buf.push_str(&s[last..]);
			Cow::Owned(buf)
		}
	}
}
