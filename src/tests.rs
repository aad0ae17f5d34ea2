use super::*;

use std::io::Write;

// smoke tests across all layers; the components are tested in their
// modules.

fn collect_events(input: &str, opts: ParseOptions) -> Vec<Event> {
	let mut p = Parser::new(input, &opts);
	let mut out = Vec::new();
	p.read_all(|ev| {
		out.push(ev);
		Ok(())
	})
	.unwrap();
	out
}

#[test]
fn parse_builds_document_with_prolog() {
	let doc = parse(
		"<?xml version=\"1.0\"?>\n<!DOCTYPE root [\n<!ELEMENT root ANY>\n]>\n<!-- c -->\n<root a=\"1\"><child>with some text</child></root>",
		false,
		false,
	)
	.unwrap();
	let docnode = doc.document_node();
	let kinds: Vec<_> = doc.children(docnode).iter().map(|c| doc.kind(*c)).collect();
	assert_eq!(
		kinds,
		vec![
			NodeKind::ProcessingInstruction,
			NodeKind::DocumentType,
			NodeKind::Comment,
			NodeKind::Element,
		]
	);
	let decl = doc.xml_declaration().unwrap();
	assert_eq!(doc.node_value(decl), Some("version=\"1.0\""));
	let dt = doc.doctype().unwrap();
	assert_eq!(doc.node_name(dt), "root");
	assert_eq!(
		doc.doctype_text(dt),
		Some("<!DOCTYPE root [\n<!ELEMENT root ANY>\n]>")
	);
	let root = doc.document_element().unwrap();
	assert_eq!(doc.get_attribute(root, "a"), Some("1"));
	assert_eq!(doc.text(root), "with some text");
}

#[test]
fn round_trip_compact() {
	let inputs = [
		"<root><a x=\"1\">text<b/></a><!--c--><?pi data?></root>",
		"<?xml version=\"1.0\"?><root><![CDATA[<raw>]]></root>",
		"<a><b><c>deep</c></b><d></d></a>",
	];
	for input in inputs.iter() {
		let doc = parse(input, true, false).unwrap();
		let mut out = doc.to_string();
		if input.contains("<d></d>") {
			// childless elements are self-closed by default
			out = out.replace("<d/>", "<d></d>");
		}
		assert_eq!(&out, input);
	}
}

#[test]
fn round_trip_normalizes_attribute_quotes() {
	let doc = parse("<a x='1' y=\"it's\"/>", false, false).unwrap();
	assert_eq!(doc.to_string(), "<a x=\"1\" y=\"it's\"/>");
}

#[test]
fn whitespace_text_inside_elements_is_kept() {
	let doc = parse("<a>\n  <b/>\n</a>", false, false).unwrap();
	let a = doc.document_element().unwrap();
	assert_eq!(doc.child_count(a), 3);
	assert_eq!(doc.node_value(doc.children(a)[0]), Some("\n  "));
	assert_eq!(doc.to_string(), "<a>\n  <b/>\n</a>");
}

#[test]
fn tree_consistency_after_mutations() {
	let mut doc = parse("<r><a/><b/><c/></r>", false, false).unwrap();
	let r = doc.document_element().unwrap();
	let (a, b, c) = {
		let k = doc.children(r);
		(k[0], k[1], k[2])
	};
	doc.insert_before(r, c, Some(a)).unwrap();
	doc.remove_child(r, b).unwrap();
	doc.append_child(a, b).unwrap();
	let frag = doc.create_document_fragment();
	let x = doc.create_element("x");
	let y = doc.create_text_node("y");
	doc.append_child(frag, x).unwrap();
	doc.append_child(frag, y).unwrap();
	doc.replace_child(r, frag, a).unwrap();
	doc.append_child(r, a).unwrap();

	for parent in std::iter::once(r).chain(doc.descendants(r)) {
		let children = doc.children(parent).to_vec();
		let mut forward = Vec::new();
		let mut cur = doc.first_child(parent);
		while let Some(n) = cur {
			forward.push(n);
			cur = doc.next_sibling(n);
		}
		let mut backward = Vec::new();
		let mut cur = doc.last_child(parent);
		while let Some(n) = cur {
			backward.push(n);
			cur = doc.previous_sibling(n);
		}
		backward.reverse();
		assert_eq!(forward, children);
		assert_eq!(backward, children);
	}
	assert_eq!(doc.to_string(), "<r><c/><x/>y<a><b/></a></r>");
}

#[test]
fn single_document_element() {
	let mut doc = parse("<!--x--><root/>", false, false).unwrap();
	let docnode = doc.document_node();
	let before = doc.children(docnode).to_vec();
	let second = doc.create_element("second");
	let err = doc.append_child(docnode, second).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::HierarchyViolation);
	let err = doc.insert_before(docnode, second, Some(before[0])).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::HierarchyViolation);
	assert_eq!(doc.children(docnode), &before[..]);
	assert_eq!(doc.parent(second), None);
}

#[test]
fn second_root_in_input_is_rejected() {
	let err = parse("<a/><b/>", false, false).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::HierarchyViolation);
}

#[test]
fn namespace_scoping() {
	let input = "<a xmlns:p=\"urn:x\"><p:b/></a>";
	let doc = parse(input, false, true).unwrap();
	let a = doc.document_element().unwrap();
	let b = doc.children(a)[0];
	assert_eq!(doc.namespace_uri(b), "urn:x");
	assert_eq!(doc.local_name(b), "b");
	assert_eq!(doc.prefix(b), "p");
	assert_eq!(doc.namespace_uri(a), "");

	let events = collect_events(input, ParseOptions::default().namespace_aware(true));
	let ends: Vec<_> = events
		.iter()
		.filter(|ev| match ev {
			Event::EndNamespace(prefix) => prefix.as_str() == "p",
			_ => false,
		})
		.collect();
	assert_eq!(ends.len(), 1);
	match events.last() {
		Some(Event::EndNamespace(prefix)) => assert_eq!(prefix.as_str(), "p"),
		other => panic!("unexpected event: {:?}", other),
	}
}

#[test]
fn default_namespace_applies_to_elements_only() {
	let doc = parse("<a xmlns=\"urn:d\" x=\"1\"><b/></a>", false, true).unwrap();
	let a = doc.document_element().unwrap();
	let b = doc.children(a)[0];
	assert_eq!(doc.namespace_uri(a), "urn:d");
	assert_eq!(doc.namespace_uri(b), "urn:d");
	let x = doc.get_attribute_node(a, "x").unwrap();
	assert_eq!(doc.namespace_uri(x), "");
	assert_eq!(doc.get_elements_by_tag_name_ns(a, "urn:d", "b"), vec![b]);
}

#[test]
fn tag_mismatch_detection() {
	let err = parse("<a><b></a></b>", false, false).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::TagMismatch);
	assert!(err.position().is_some());

	let doc = parse("<a><b></b></a>", false, false).unwrap();
	let a = doc.document_element().unwrap();
	let b = doc.children(a)[0];
	assert_eq!(doc.node_name(b), "b");
	assert_eq!(doc.parent(b), Some(a));
}

#[test]
fn unclosed_tag_detection() {
	match parse("<a><b></b>", false, false) {
		Err(Error::UnclosedTag(name, pos)) => {
			assert_eq!(name, "a");
			assert_eq!(pos.offset, 0);
		}
		other => panic!("unexpected result: {:?}", other),
	}
}

#[test]
fn cdata_boundary() {
	let doc = parse("<a><![CDATA[x]]y]]></a>", true, false).unwrap();
	let a = doc.document_element().unwrap();
	let cd = doc.children(a)[0];
	assert_eq!(doc.kind(cd), NodeKind::CDataSection);
	assert_eq!(doc.node_value(cd), Some("x]]y"));

	let doc = parse("<a>1<![CDATA[x]]y]]>2</a>", false, false).unwrap();
	let a = doc.document_element().unwrap();
	assert_eq!(doc.child_count(a), 1);
	assert_eq!(doc.node_value(doc.children(a)[0]), Some("1x]]y2"));
}

#[test]
fn detach_and_reattach_within_document() {
	let mut doc = parse("<r><src><x/><y/></src><dst/></r>", false, false).unwrap();
	let r = doc.document_element().unwrap();
	let src = doc.children(r)[0];
	let dst = doc.children(r)[1];
	let removed = doc.remove_child(r, src).unwrap();
	assert_eq!(doc.parent(removed), None);
	doc.append_child(dst, removed).unwrap();
	let names: Vec<_> = doc
		.children(removed)
		.iter()
		.map(|c| doc.node_name(*c))
		.collect();
	assert_eq!(names, vec!["x", "y"]);
	assert_eq!(doc.owner_document(removed), Some(doc.document_node()));
	assert_eq!(doc.to_string(), "<r><dst><src><x/><y/></src></dst></r>");
}

#[test]
fn detach_and_reattach_across_documents() {
	let mut src = parse("<r><e><x/><y/></e></r>", false, false).unwrap();
	let mut dst = parse("<other/>", false, false).unwrap();
	let r = src.document_element().unwrap();
	let e = src.children(r)[0];
	src.remove_child(r, e).unwrap();

	// handles are bound to their document
	let other = dst.document_element().unwrap();
	assert_eq!(
		dst.append_child(other, e).unwrap_err().kind(),
		ErrorKind::HierarchyViolation
	);

	let imported = dst.import_node(&src, e, true).unwrap();
	dst.append_child(other, imported).unwrap();
	assert_eq!(dst.owner_document(imported), Some(dst.document_node()));
	assert_eq!(dst.to_string(), "<other><e><x/><y/></e></other>");
}

#[test]
fn path_queries() {
	let doc = parse("<root><item id=\"1\"/><item id=\"2\"/></root>", false, false).unwrap();
	let root = doc.document_element().unwrap();
	let second = doc.get_element_by_path(root, "item", 2).unwrap();
	assert_eq!(doc.get_attribute(second, "id"), Some("2"));

	let everywhere = doc.get_elements_by_path(second, "//item");
	assert_eq!(everywhere.len(), 2);
	assert_eq!(everywhere, doc.get_elements_by_path(doc.document_node(), "//item"));
	assert_eq!(doc.get_elements_by_path(second, "/root/item"), everywhere);
	assert_eq!(doc.get_element_by_id(root, "1"), Some(everywhere[0]));
}

#[test]
fn empty_and_textless_input() {
	assert_eq!(parse("", false, false).unwrap_err().kind(), ErrorKind::EmptyOrNonStringInput);
	assert_eq!(parse("  \n", false, false).unwrap_err().kind(), ErrorKind::EmptyOrNonStringInput);
	assert_eq!(parse("<!-- only -->", false, false).unwrap_err().kind(), ErrorKind::SyntaxError);
	assert_eq!(parse("hello", false, false).unwrap_err().kind(), ErrorKind::SyntaxError);
}

#[test]
fn validate_reports_errors_without_tree() {
	assert!(validate("<a><b/></a>").is_ok());
	assert_eq!(validate("<a>").unwrap_err().kind(), ErrorKind::UnclosedTag);
	assert_eq!(validate("<a/>junk").unwrap_err().kind(), ErrorKind::SyntaxError);
}

#[test]
fn compact_output_without_substitution_reparses() {
	let input = "<a t=\"x&lt;y\">a&lt;b &amp; c &unknown;</a>";
	let doc = parse(input, false, false).unwrap();
	let a = doc.document_element().unwrap();
	assert_eq!(doc.text(a), "a<b & c &unknown;");
	let out = doc.to_string();
	assert_eq!(out, input);
	let again = parse(&out, false, false).unwrap();
	let a2 = again.document_element().unwrap();
	assert_eq!(again.text(a2), doc.text(a));
	assert_eq!(again.get_attribute(a2, "t"), Some("x<y"));
}

#[test]
fn repair_ampersands_before_parsing() {
	let input = "<a href=\"?x=1&y=2\">fish & chips &amp; more</a>";
	let opts = ParseOptions::default().repair_ampersands(true);
	let doc = parse_with_options(input, &opts, RcPtr::new(Context::new())).unwrap();
	let a = doc.document_element().unwrap();
	assert_eq!(doc.get_attribute(a, "href"), Some("?x=1&y=2"));
	assert_eq!(doc.text(a), "fish & chips & more");
	assert_eq!(
		doc.to_xml(a, false, true),
		"<a href=\"?x=1&amp;y=2\">fish &amp; chips &amp; more</a>"
	);
}

#[test]
fn shared_context_entities() {
	let table = EntityTable::new().with_entity("product", "rxdom");
	let ctx = RcPtr::new(Context::with_entities(table));
	let a = parse_with_options("<a>&product;</a>", &ParseOptions::default(), ctx.clone()).unwrap();
	let b = parse_with_options("<b v=\"&product;\"/>", &ParseOptions::default(), ctx).unwrap();
	assert_eq!(a.text(a.document_element().unwrap()), "rxdom");
	let broot = b.document_element().unwrap();
	assert_eq!(b.get_attribute(broot, "v"), Some("rxdom"));
	assert_eq!(b.to_xml(broot, false, true), "<b v=\"&product;\"/>");
}

#[test]
fn normalized_output_of_parsed_document() {
	let doc = parse("<a><b>x</b><c><d/></c></a>", false, false).unwrap();
	assert_eq!(
		doc.to_xml(doc.document_node(), true, false),
		"<a>\n    <b>x</b>\n    <c>\n        <d/>\n    </c>\n</a>"
	);
}

#[test]
fn parse_reader_reads_whole_source() {
	let doc = parse_reader(&b"<a>\xc3\xa4</a>"[..], &ParseOptions::default()).unwrap();
	assert_eq!(doc.text(doc.document_element().unwrap()), "\u{e4}");
	let err = parse_reader(&b"<a>\xff</a>"[..], &ParseOptions::default()).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::EmptyOrNonStringInput);
}

#[test]
fn parse_file_and_save_file() {
	let dir = std::env::temp_dir();
	let path = dir.join(format!("rxdom-test-{}.xml", std::process::id()));
	{
		let mut f = std::fs::File::create(&path).unwrap();
		f.write_all(b"<a><b/></a>").unwrap();
	}
	let mut doc = parse_file(&path, &ParseOptions::default()).unwrap();
	let a = doc.document_element().unwrap();
	doc.set_attribute(a, "saved", "1").unwrap();
	doc.save_file(&path, false, false).unwrap();
	let back = std::fs::read_to_string(&path).unwrap();
	std::fs::remove_file(&path).unwrap();
	assert_eq!(back, "<a saved=\"1\"><b/></a>");

	let err = parse_file(dir.join("rxdom-does-not-exist.xml"), &ParseOptions::default()).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Io);
}

#[cfg(feature = "async")]
#[tokio::test]
async fn parse_async_reads_chunked_source() {
	let reader = tokio_test::io::Builder::new()
		.read(b"<root><it")
		.read(b"em/></root>")
		.build();
	let doc = parse_async(reader, &ParseOptions::default()).await.unwrap();
	let root = doc.document_element().unwrap();
	assert_eq!(doc.get_elements_by_tag_name(root, "item").len(), 1);
}

#[cfg(feature = "mt")]
#[test]
fn context_is_shared_between_threads() {
	let ctx = RcPtr::new(Context::with_entities(EntityTable::new().with_entity("t", "thread")));
	let handles: Vec<_> = (0..4)
		.map(|i| {
			let ctx = ctx.clone();
			std::thread::spawn(move || {
				let text = format!("<a n=\"{}\">&t;</a>", i);
				let doc = parse_with_options(&text, &ParseOptions::default(), ctx).unwrap();
				doc.text(doc.document_element().unwrap())
			})
		})
		.collect();
	for h in handles {
		assert_eq!(h.join().unwrap(), "thread");
	}
}
