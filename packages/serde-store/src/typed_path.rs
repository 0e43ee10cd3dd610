//! Paths that carry the type of the data stored at them.
//!
//! A `TypedPath<T>` promises that its location holds one `T`; a
//! `CollectionPath<T>` promises that every direct child of its location is a
//! `T`. The promise lives only in the type system: both are a rendered path
//! plus `PhantomData`.
//!
//! # Example
//!
//! ```rust
//! use typedtree_serde::{CollectionPath, PathType, TypedPath};
//!
//! fn visits() -> TypedPath<i64> {
//!     TypedPath::parse("counters/visits").expect("static path")
//! }
//!
//! fn messages() -> CollectionPath<String> {
//!     CollectionPath::parse("messages").expect("static path")
//! }
//!
//! assert_eq!(visits().rendered(), "counters/visits");
//! assert_eq!(messages().child("m1").unwrap().rendered(), "messages/m1");
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use typedtree_core::{Path, PathError};

/// A location addressable as a single typed value.
///
/// Implement this for your own path constructors when `TypedPath` is not
/// enough; every read and write through the path uses `Element`.
pub trait PathType {
    /// The type stored at the location.
    type Element;

    /// The location, relative to the store root.
    fn rendered(&self) -> String;
}

/// A location whose direct children are each a typed value.
pub trait CollectionPathType {
    /// The type of every child.
    type Element;

    /// The location of the parent node, relative to the store root.
    fn rendered(&self) -> String;
}

/// A location holding exactly one `T`.
pub struct TypedPath<T> {
    path: Path,
    _element: PhantomData<fn() -> T>,
}

/// A location whose children are each a `T`.
pub struct CollectionPath<T> {
    path: Path,
    _element: PhantomData<fn() -> T>,
}

macro_rules! typed_path_common {
    ($name:ident) => {
        impl<T> $name<T> {
            /// Bind an untyped path to `T`.
            pub fn new(path: Path) -> Self {
                Self {
                    path,
                    _element: PhantomData,
                }
            }

            /// Parse a slash-delimited path.
            pub fn parse(s: &str) -> Result<Self, PathError> {
                Path::parse(s).map(Self::new)
            }

            /// Build from individual key segments.
            pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                Path::try_from_components(segments).map(Self::new)
            }

            /// The untyped location.
            pub fn as_path(&self) -> &Path {
                &self.path
            }

            pub fn into_path(self) -> Path {
                self.path
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self::new(self.path.clone())
            }
        }

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.path == other.path
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> Hash for $name<T> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.path.hash(state);
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("path", &self.path.to_string())
                    .field("element", &std::any::type_name::<T>())
                    .finish()
            }
        }

        impl<T> fmt::Display for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.path, f)
            }
        }
    };
}

typed_path_common!(TypedPath);
typed_path_common!(CollectionPath);

impl<T> TypedPath<T> {
    /// A typed path below this one, holding a `U`.
    pub fn child<U>(&self, key: &str) -> Result<TypedPath<U>, PathError> {
        self.path.child(key).map(TypedPath::new)
    }
}

impl<T> CollectionPath<T> {
    /// The path of one element of the collection.
    pub fn child(&self, key: &str) -> Result<TypedPath<T>, PathError> {
        self.path.child(key).map(TypedPath::new)
    }
}

impl<T> PathType for TypedPath<T> {
    type Element = T;

    fn rendered(&self) -> String {
        self.path.to_string()
    }
}

impl<T> CollectionPathType for CollectionPath<T> {
    type Element = T;

    fn rendered(&self) -> String {
        self.path.to_string()
    }
}

impl<P: PathType + ?Sized> PathType for &P {
    type Element = P::Element;

    fn rendered(&self) -> String {
        (**self).rendered()
    }
}

impl<P: CollectionPathType + ?Sized> CollectionPathType for &P {
    type Element = P::Element;

    fn rendered(&self) -> String {
        (**self).rendered()
    }
}
