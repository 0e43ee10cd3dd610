//! `Reference` implementation for the in-memory database.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use typedtree_core::{
    Error, EventCallback, EventType, OnceCallback, Path, PathError, Reference, SubscriptionHandle,
    Value,
};

use crate::database::Inner;

/// A location in a [`MemoryDatabase`](crate::MemoryDatabase).
///
/// Resolving a child with an unparsable relative path does not fail; it
/// yields a reference whose writes return `Error::Path` and whose value reads
/// deliver `Null`.
#[derive(Clone)]
pub struct MemoryReference {
    inner: Arc<Inner>,
    path: Path,
    invalid: Option<PathError>,
}

impl MemoryReference {
    pub(crate) fn root_of(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            path: Path::root(),
            invalid: None,
        }
    }

    /// Why this reference cannot address anything, if it can't.
    pub fn path_error(&self) -> Option<&PathError> {
        self.invalid.as_ref()
    }
}

impl fmt::Debug for MemoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryReference")
            .field("path", &self.path.to_string())
            .field("invalid", &self.invalid)
            .finish()
    }
}

impl Reference for MemoryReference {
    fn root(&self) -> Self {
        Self::root_of(self.inner.clone())
    }

    fn child(&self, relative: &str) -> Self {
        if self.invalid.is_some() {
            return self.clone();
        }
        match Path::parse(relative) {
            Ok(relative) => Self {
                inner: self.inner.clone(),
                path: self.path.join(&relative),
                invalid: None,
            },
            Err(e) => {
                debug!(base = %self.path, relative, error = %e, "unusable child reference");
                Self {
                    inner: self.inner.clone(),
                    path: self.path.clone(),
                    invalid: Some(e),
                }
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn observe_once(&self, event: EventType, callback: OnceCallback) {
        if self.invalid.is_some() {
            self.inner
                .observe_once_detached(self.path.clone(), event, callback);
        } else {
            self.inner.observe_once(self.path.clone(), event, callback);
        }
    }

    fn observe(&self, event: EventType, callback: EventCallback) -> SubscriptionHandle {
        if self.invalid.is_some() {
            self.inner.observe_detached(self.path.clone(), event, callback)
        } else {
            self.inner.observe(self.path.clone(), event, callback)
        }
    }

    fn remove_observer(&self, handle: SubscriptionHandle) {
        self.inner.remove_observer(handle);
    }

    fn set_value(&self, value: Value) -> Result<(), Error> {
        match &self.invalid {
            Some(e) => Err(Error::Path(e.clone())),
            None => self.inner.write(&self.path, value),
        }
    }

    fn child_by_auto_id(&self) -> Self {
        let mut child = self.clone();
        if child.invalid.is_none() {
            child.path.components.push(self.inner.next_push_id());
        }
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;
    use typedtree_core::path;

    #[test]
    fn child_joins_relative_paths() {
        let db = MemoryDatabase::new();
        let r = db.reference().child("users").child("/ada//profile/");
        assert_eq!(r.path(), &path!("users/ada/profile"));
        assert_eq!(r.key(), Some("profile"));
        assert!(r.path_error().is_none());
    }

    #[test]
    fn root_from_anywhere() {
        let db = MemoryDatabase::new();
        let deep = db.reference().child("a/b/c");
        assert!(deep.root().path().is_empty());
        assert_eq!(deep.root().key(), None);
    }

    #[test]
    fn invalid_child_is_sticky() {
        let db = MemoryDatabase::new();
        let bad = db.reference().child("a").child("b#c");
        assert!(bad.path_error().is_some());
        assert_eq!(bad.path(), &path!("a"));
        assert!(bad.child("fine").path_error().is_some());
        assert!(bad.root().path_error().is_none());
    }

    #[test]
    fn auto_id_child_is_under_parent() {
        let db = MemoryDatabase::new();
        let parent = db.reference().child("messages");
        let child = parent.child_by_auto_id();
        assert_eq!(child.path().parent(), Some(path!("messages")));
        assert_eq!(child.key().map(str::len), Some(20));
        assert_ne!(child.key(), parent.child_by_auto_id().key());
    }

    #[test]
    fn debug_shows_path() {
        let db = MemoryDatabase::new();
        let r = db.reference().child("a/b");
        assert!(format!("{:?}", r).contains("a/b"));
    }
}
