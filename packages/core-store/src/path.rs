//! Path type with validated database key segments.

use std::fmt;

/// Maximum length of a single key segment, in UTF-8 bytes.
pub const MAX_KEY_BYTES: usize = 768;

/// Characters that may never appear inside a key segment.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path component is not a valid key.
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },
    /// The path string is invalid.
    InvalidPath { message: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidComponent {
                component,
                position,
                message,
            } => {
                write!(
                    f,
                    "invalid path component '{}' at position {}: {}",
                    component, position, message
                )
            }
            PathError::InvalidPath { message } => {
                write!(f, "invalid path: {}", message)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A validated location in the tree.
///
/// Components are database keys: non-empty UTF-8 of at most
/// [`MAX_KEY_BYTES`] bytes, without `.`, `#`, `$`, `[`, `]`, `/` or ASCII
/// control characters. The empty path addresses the root.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub components: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Path {
            components: Vec::new(),
        }
    }

    /// Parse a path string, validating components.
    ///
    /// # Path Syntax
    ///
    /// - Components are separated by `/`
    /// - Empty components are ignored (normalizes `//`, leading and trailing `/`)
    /// - Each component must be a valid key
    ///
    /// # Examples
    ///
    /// ```rust
    /// use typedtree_core::Path;
    ///
    /// let path = Path::parse("users/-NxA1b/name").unwrap();
    /// assert_eq!(path.len(), 3);
    ///
    /// assert_eq!(Path::parse("/foo/bar/").unwrap(), Path::parse("foo/bar").unwrap());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let components: Vec<String> = s
            .split('/')
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();

        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }

        Ok(Path { components })
    }

    /// Try to create a path from components, validating each.
    pub fn try_from_components<I, S>(components: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }
        Ok(Path { components })
    }

    /// Check whether a single string is usable as a key.
    pub fn is_valid_key(key: &str) -> bool {
        Self::validate_component(key, 0).is_ok()
    }

    fn validate_component(component: &str, position: usize) -> Result<(), PathError> {
        let invalid = |message: String| PathError::InvalidComponent {
            component: component.to_string(),
            position,
            message,
        };

        if component.is_empty() {
            return Err(invalid("empty component".to_string()));
        }

        if component.len() > MAX_KEY_BYTES {
            return Err(invalid(format!(
                "key is {} bytes, limit is {}",
                component.len(),
                MAX_KEY_BYTES
            )));
        }

        for c in component.chars() {
            if FORBIDDEN.contains(&c) {
                return Err(invalid(format!("invalid character '{}' in key", c)));
            }
            if c.is_ascii_control() {
                return Err(invalid(format!("control character {:?} in key", c)));
            }
        }

        Ok(())
    }

    /// Check if this path is empty (root path).
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// The last component, or `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The path one level up. The root's parent is `None`.
    pub fn parent(&self) -> Option<Path> {
        if self.is_empty() {
            return None;
        }
        Some(Path {
            components: self.components[..self.len() - 1].to_vec(),
        })
    }

    /// Extend this path by one validated key.
    pub fn child(&self, key: &str) -> Result<Path, PathError> {
        Self::validate_component(key, self.len())?;
        let mut components = self.components.clone();
        components.push(key.to_string());
        Ok(Path { components })
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Path { components }
    }

    /// Check if this path has the given prefix.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.components.len() <= self.components.len()
            && prefix.components == self.components[..prefix.components.len()]
    }

    /// Check whether one path contains the other (or they are equal).
    ///
    /// A write at either location can change what is stored at the other.
    pub fn is_related(&self, other: &Path) -> bool {
        self.has_prefix(other) || other.has_prefix(self)
    }

    /// Strip a prefix from this path.
    ///
    /// Returns `None` if the prefix doesn't match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if self.has_prefix(prefix) {
            Some(Path {
                components: self.components[prefix.components.len()..].to_vec(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}

impl std::str::FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use typedtree_core::path;
///
/// let p = path!("counters/visits");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}
