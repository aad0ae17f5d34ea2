/*!
# Arena-backed document object model

A [`Document`] owns all of its nodes in a flat arena; nodes are addressed
by copyable [`NodeId`] handles. Child order is stored once per parent and
sibling navigation is derived from it, so forward and backward walks can
never disagree.

```
use rxdom::{Document, NodeKind};
let mut doc = Document::new();
let root = doc.create_element("root");
let text = doc.create_text_node("hi");
doc.append_child(doc.document_node(), root).unwrap();
doc.append_child(root, text).unwrap();
assert_eq!(doc.document_element(), Some(root));
assert_eq!(doc.kind(doc.first_child(root).unwrap()), NodeKind::Text);
```
*/
mod document;
mod mutation;
mod node;
mod query;

pub use document::Document;
pub use node::{NodeId, NodeKind};
pub use query::Descendants;

pub(crate) use node::NodeData;
