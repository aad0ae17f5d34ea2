#[macro_use]
extern crate afl;
extern crate rxdom;

fn main() {
	fuzz!(|data: &[u8]| {
		let text = match std::str::from_utf8(data) {
			Ok(v) => v,
			Err(_) => return,
		};
		let doc = match rxdom::parse(text, true, true) {
			Ok(v) => v,
			Err(_) => return,
		};
		// anything we accepted must be accepted again after writing it out
		let out = doc.to_xml(doc.document_node(), false, true);
		if let Err(e) = rxdom::parse(&out, true, true) {
			panic!("reparse of {:?} failed: {}", out, e);
		}
	});
}
