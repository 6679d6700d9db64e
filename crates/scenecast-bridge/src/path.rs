//! Scene paths
//!
//! A path is an ordered list of segment names. The slash-joined string form
//! only exists at the wire boundary.

use std::fmt;

/// Separator used by the string form of a path.
pub const SEPARATOR: char = '/';

/// Address of a node in the scene hierarchy. The root is the empty path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments. Segments containing `/` are split and
    /// empty pieces are dropped.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Self::root();
        for segment in segments {
            path.push(segment.as_ref());
        }
        path
    }

    /// Parse the wire form (`"/a/b"`, `"a/b"` and `"a//b/"` are equal).
    pub fn parse(s: &str) -> Self {
        Self::new([s])
    }

    fn push(&mut self, name: &str) {
        self.segments.extend(
            name.split(SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        );
    }

    /// Return a new path with `name` appended. `name` may itself contain
    /// several segments.
    pub fn append(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.push(name);
        child
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, or `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        let (_, init) = self.segments.split_last()?;
        Some(Path {
            segments: init.to_vec(),
        })
    }

    /// Split into `(parent, last segment)`.
    pub fn split_last(&self) -> Option<(Path, &str)> {
        let (last, init) = self.segments.split_last()?;
        Some((
            Path {
                segments: init.to_vec(),
            },
            last.as_str(),
        ))
    }

    /// Wire form, always starting with `/`.
    pub fn lower(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_display() {
        assert_eq!(Path::root().lower(), "/");
        assert!(Path::root().is_root());
        assert!(Path::parse("/").is_root());
        assert!(Path::parse("").is_root());
    }

    #[test]
    fn test_parse_normalizes_separators() {
        let a = Path::parse("/a/b");
        assert_eq!(a, Path::parse("a/b"));
        assert_eq!(a, Path::parse("a//b/"));
        assert_eq!(a.segments(), &["a".to_string(), "b".to_string()]);
        assert_eq!(a.lower(), "/a/b");
    }

    #[test]
    fn test_append_splits_names() {
        let base = Path::new(["meshcat"]);
        let child = base.append("shapes/cube");
        assert_eq!(child.len(), 3);
        assert_eq!(child.lower(), "/meshcat/shapes/cube");
        // Base is untouched.
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_parent_and_last() {
        let p = Path::parse("/a/b/c");
        assert_eq!(p.last(), Some("c"));
        assert_eq!(p.parent(), Some(Path::parse("/a/b")));
        let (parent, last) = p.split_last().unwrap();
        assert_eq!(parent.lower(), "/a/b");
        assert_eq!(last, "c");
        assert!(Path::root().parent().is_none());
        assert!(Path::root().last().is_none());
    }

    #[test]
    fn test_structural_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Path::parse("/x/y"));
        assert!(set.contains(&Path::new(["x", "y"])));
        assert!(!set.contains(&Path::new(["x"])));
    }
}
