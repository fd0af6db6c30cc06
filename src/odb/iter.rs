//! Sequential access to the objects of a container.
//!
//! # Example
//! ```no_run
//! # use odb_reader::{Container, KeyTable, LoadOptions};
//! # let keys = KeyTable::new();
//! # let container = Container::open("file.smr-d", &keys, LoadOptions::default()).unwrap();
//! for (index, result) in container.iter_objects() {
//!     match result {
//!         Ok(object) => println!("{}: {:?}", index, object.kind()),
//!         Err(e) => eprintln!("{}: {}", index, e),
//!     }
//! }
//! ```

use super::container::Container;
use super::objects::OdbObject;
use super::types::error::Result;

/// Iterator over `(index, object)` pairs.
///
/// Each object is decoded independently, so an error at one index does not
/// end the iteration.
///
/// Created by [`Container::iter_objects()`](crate::Container::iter_objects).
pub struct ObjectIterator<'a> {
    container: &'a Container,
    index: usize,
}

impl<'a> ObjectIterator<'a> {
    pub(super) fn new(container: &'a Container) -> Self {
        Self {
            container,
            index: 0,
        }
    }
}

impl Iterator for ObjectIterator<'_> {
    type Item = (usize, Result<OdbObject>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.container.object_count() {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some((index, self.container.object_at(index)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.container.object_count().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ObjectIterator<'_> {}
