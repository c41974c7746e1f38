use std::fmt;

const SEPARATOR: char = '/';

/// Absolute, normalized, slash-separated location under the granted root.
///
/// Always starts with `/`, never ends with `/` unless it is the root itself,
/// and contains no empty, `.` or `..` segments. Equality is string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Non-empty segments from the root down.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit(SEPARATOR).next()
    }

    /// Path with the last segment removed, `None` for the root.
    pub fn parent(&self) -> Option<CanonicalPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// Append a single entry name as listed by the provider.
    ///
    /// The name is taken verbatim; listing results are not re-normalized.
    pub fn join(&self, name: &str) -> CanonicalPath {
        if self.is_root() {
            Self(format!("/{}", name))
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }
}

impl Default for CanonicalPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turn a protocol path into a canonical path.
///
/// Absolute paths start with `/`; anything else is taken relative to `cwd`.
/// `.` is dropped, `..` pops one segment and is a no-op at the root, repeated
/// separators collapse. Never fails: malformed input degrades to some valid
/// canonical path and the caller checks existence afterwards.
pub fn normalize(raw: &str, cwd: &CanonicalPath) -> CanonicalPath {
    let relative_base = if raw.starts_with(SEPARATOR) {
        None
    } else {
        Some(cwd.segments())
    };

    let mut stack: Vec<&str> = relative_base.into_iter().flatten().collect();
    for segment in raw.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }

    if stack.is_empty() {
        CanonicalPath::root()
    } else {
        CanonicalPath(format!("/{}", stack.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn cwd(path: &str) -> CanonicalPath {
        normalize(path, &CanonicalPath::root())
    }

    #[rstest]
    #[case("/", "/", "/")]
    #[case("", "/", "/")]
    #[case("", "/docs", "/docs")]
    #[case(".", "/docs", "/docs")]
    #[case("a.txt", "/", "/a.txt")]
    #[case("a.txt", "/docs", "/docs/a.txt")]
    #[case("/a.txt", "/docs", "/a.txt")]
    #[case("../a.txt", "/docs", "/a.txt")]
    #[case("..", "/", "/")]
    #[case("/../../..", "/docs", "/")]
    #[case("//docs///a.txt", "/", "/docs/a.txt")]
    #[case("docs/", "/", "/docs")]
    #[case("./docs/./sub/../a.txt", "/", "/docs/a.txt")]
    #[case("...", "/", "/...")]
    #[case("a b/c", "/x", "/x/a b/c")]
    fn test_normalize(#[case] raw: &str, #[case] base: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw, &cwd(base)).as_str(), expected);
    }

    #[rstest]
    #[case("/docs/../a/./b//c/")]
    #[case("relative/../..//x")]
    #[case("")]
    #[case("/")]
    #[case("../../..")]
    #[case("a/b/c")]
    fn test_normalize_idempotent(#[case] raw: &str) {
        let base = cwd("/work/dir");
        let once = normalize(raw, &base);
        let twice = normalize(once.as_str(), &base);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parent_and_file_name() {
        let root = CanonicalPath::root();
        assert_eq!(root.parent(), None);
        assert_eq!(root.file_name(), None);

        let top = cwd("/docs");
        assert_eq!(top.parent(), Some(CanonicalPath::root()));
        assert_eq!(top.file_name(), Some("docs"));

        let nested = cwd("/docs/a.txt");
        assert_eq!(nested.parent(), Some(top));
        assert_eq!(nested.file_name(), Some("a.txt"));
    }

    #[test]
    fn test_join() {
        let root = CanonicalPath::root();
        assert_eq!(root.join("docs").as_str(), "/docs");
        assert_eq!(root.join("docs").join("a.txt").as_str(), "/docs/a.txt");
    }

    #[test]
    fn test_segments() {
        let binding = cwd("/docs/sub/a.txt");
        let segments: Vec<&str> = binding.segments().collect();
        assert_eq!(segments, vec!["docs", "sub", "a.txt"]);
        assert_eq!(CanonicalPath::root().segments().count(), 0);
    }
}
