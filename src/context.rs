use std::fmt;

#[cfg(all(feature = "shared_ns", feature = "mt"))]
use std::sync::{Mutex, MutexGuard, Weak};
#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
use std::cell::{RefCell, RefMut};
#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
use std::rc::Weak;

use crate::entities::EntityTable;
use crate::parser::{NamespaceName, RcPtr};

#[cfg(feature = "shared_ns")]
type UriWeakSet = weak_table::WeakHashSet<Weak<str>>;

/**
# Shared configuration for multiple parses

The context carries the [`EntityTable`] used for decoding and encoding
entity references, and (with the `shared_ns` feature) interns namespace URIs
so that documents parsed with the same context share a single allocation per
URI.

The context is never mutated by parsing except for the intern table, which
is internally synchronized. If the crate is built with the `mt` feature, the
Context is Send and Sync and can be shared between threads through an
[`RcPtr`]; otherwise it is neither.
*/
pub struct Context {
	entities: EntityTable,
	#[cfg(all(feature = "shared_ns", feature = "mt"))]
	nss: Mutex<UriWeakSet>,
	#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
	nss: RefCell<UriWeakSet>,
}

impl Context {
	#[cfg(all(feature = "shared_ns", feature = "mt"))]
	fn wrap_nss(nss: UriWeakSet) -> Mutex<UriWeakSet> {
		Mutex::new(nss)
	}

	#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
	fn wrap_nss(nss: UriWeakSet) -> RefCell<UriWeakSet> {
		RefCell::new(nss)
	}

	/// Create a new context with only the predefined entities.
	pub fn new() -> Context {
		Self::with_entities(EntityTable::new())
	}

	/// Create a new context using the given entity table.
	pub fn with_entities(entities: EntityTable) -> Context {
		Context {
			entities,
			#[cfg(feature = "shared_ns")]
			nss: Self::wrap_nss(weak_table::WeakHashSet::new()),
		}
	}

	/// Access the entity table.
	pub fn entities(&self) -> &EntityTable {
		&self.entities
	}

	#[cfg(all(feature = "shared_ns", feature = "mt"))]
	fn lock_nss<'a>(&'a self) -> MutexGuard<'a, UriWeakSet> {
		// a panic while holding the lock cannot leave the set inconsistent
		match self.nss.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	#[cfg(all(feature = "shared_ns", not(feature = "mt")))]
	fn lock_nss<'a>(&'a self) -> RefMut<'a, UriWeakSet> {
		self.nss.borrow_mut()
	}

	/// Intern a namespace URI
	///
	/// With `shared_ns`, the URI is interned in the context and a refcounted
	/// pointer is returned. When the last reference to that pointer expires,
	/// the string will be lazily removed from the internal storage. Without
	/// the feature, a fresh pointer is allocated on each call.
	pub fn intern_uri(&self, uri: &str) -> NamespaceName {
		#[cfg(feature = "shared_ns")]
		{
			let mut nss = self.lock_nss();
			return match nss.get(uri) {
				Some(ptr) => ptr,
				None => {
					let ptr: NamespaceName = RcPtr::from(uri);
					nss.insert(ptr.clone());
					ptr
				}
			};
		}
		#[cfg(not(feature = "shared_ns"))]
		RcPtr::from(uri)
	}

	/// Remove all unreferenced URIs from storage and shrink the storage to
	/// fit the requirements.
	pub fn release_temporaries(&self) {
		#[cfg(feature = "shared_ns")]
		{
			let mut nss = self.lock_nss();
			nss.remove_expired();
			nss.shrink_to_fit();
		}
	}

	/// Return the number of URIs interned.
	///
	/// Returns zero if built without `shared_ns`. This count includes
	/// strings which are unreferenced and not yet expired.
	pub fn uris(&self) -> usize {
		#[cfg(feature = "shared_ns")]
		{
			let nss = self.lock_nss();
			nss.len()
		}
		#[cfg(not(feature = "shared_ns"))]
		0
	}
}

impl Default for Context {
	fn default() -> Context {
		Context::new()
	}
}

impl fmt::Debug for Context {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		let mut f = f.debug_struct("Context");
		f.field("instance", &(self as *const Context));
		f.field("entities", &self.entities.len());
		#[cfg(feature = "shared_ns")]
		{
			let nss = self.lock_nss();
			f.field("nss.capacity()", &nss.capacity())
				.field("nss.length()", &nss.len());
		}
		f.finish()
	}
}
