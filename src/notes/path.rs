use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use derive_more::{Deref, From};

/// Separates names in the textual form of a path; note names cannot contain it.
pub const PATH_SEPARATOR: char = '/';

/// Names from the root down to a container. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deref, From)]
#[deref(forward)]
pub struct NotePath(Vec<String>);

impl NotePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.push(name.into());
        Self(names)
    }

    /// The enclosing path; the root is its own parent.
    pub fn parent(&self) -> Self {
        let mut names = self.0.clone();
        names.pop();
        Self(names)
    }
}

impl fmt::Display for NotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "{PATH_SEPARATOR}");
        }
        for name in &self.0 {
            write!(f, "{PATH_SEPARATOR}{name}")?;
        }
        Ok(())
    }
}

/// Parses `/`-separated names. Empty segments are skipped, so `""` and `"/"` are the root.
impl FromStr for NotePath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl FromIterator<String> for NotePath {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for NotePath {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("", &[])]
    #[case("/", &[])]
    #[case("Work", &["Work"])]
    #[case("/Work/todo", &["Work", "todo"])]
    #[case("Work//todo/", &["Work", "todo"])]
    #[case("Ünïcode/🚀", &["Ünïcode", "🚀"])]
    fn parses_slash_separated_paths(#[case] input: &str, #[case] expected: &[&str]) {
        let path: NotePath = input.parse().unwrap();
        assert_eq!(&*path, expected);
    }

    #[test]
    fn displays_root_as_slash() {
        assert_eq!(NotePath::root().to_string(), "/");
        assert_eq!(NotePath::root().join("a").join("b").to_string(), "/a/b");
    }

    #[test]
    fn parent_of_root_is_root() {
        let root = NotePath::root();
        assert_eq!(root.parent(), root);
        assert_eq!(root.parent().parent(), root);
    }

    #[test]
    fn parent_drops_last_name() {
        let path: NotePath = ["Work", "todo"].into_iter().collect();
        assert_eq!(path.parent(), NotePath::from(vec!["Work".to_string()]));
    }
}
