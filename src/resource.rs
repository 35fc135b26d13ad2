//! Paths inside the server's resource tree

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Just a wrapper around a normalized resource path (e.g. `calendars/user1/cal/object.ics`)
///
/// Leading and trailing slashes, as well as empty segments, are dropped, so that `/calendars/user1/`
/// and `calendars/user1` are the same path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DavPath {
    path: String,
}

impl DavPath {
    pub fn new<S: AsRef<str>>(path: S) -> Self {
        let path = path.as_ref()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self { path }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The last segment of this path (empty for the root)
    pub fn name(&self) -> &str {
        match self.path.rfind('/') {
            Some(pos) => &self.path[pos + 1..],
            None => &self.path,
        }
    }

    /// The path of the parent collection, or `None` for the root
    pub fn parent(&self) -> Option<DavPath> {
        if self.is_root() {
            return None;
        }
        match self.path.rfind('/') {
            Some(pos) => Some(Self { path: self.path[..pos].to_string() }),
            None => Some(Self { path: String::new() }),
        }
    }

    /// Build a new path by appending `child` (which may contain several segments)
    pub fn join(&self, child: &str) -> DavPath {
        Self::new(format!("{}/{}", self.path, child))
    }

    /// Resolve an href found in a property value.
    ///
    /// Hrefs starting with `/` are absolute, anything else is relative to `self`.
    pub fn resolve(&self, href: &str) -> DavPath {
        let href = href.trim();
        if href.starts_with('/') {
            Self::new(href)
        } else {
            self.join(href)
        }
    }
}

impl From<&str> for DavPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl Display for DavPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "/{}", self.path)
    }
}

/// Used to support serde
impl Serialize for DavPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.path)
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for DavPath {
    fn deserialize<D>(deserializer: D) -> Result<DavPath, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(DavPath::new(s))
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(DavPath::new("/calendars/user1/"), DavPath::new("calendars//user1"));
        assert_eq!(DavPath::new("/").as_str(), "");
        assert!(DavPath::new("/").is_root());
    }

    #[test]
    fn test_parent_and_name() {
        let p = DavPath::new("/calendars/user1/cal/object.ics");
        assert_eq!(p.name(), "object.ics");
        assert_eq!(p.parent(), Some(DavPath::new("calendars/user1/cal")));
        assert_eq!(DavPath::new("calendars").parent(), Some(DavPath::new("")));
        assert_eq!(DavPath::new("").parent(), None);
    }

    #[test]
    fn test_resolve() {
        let home = DavPath::new("calendars/user2");
        assert_eq!(home.resolve("inbox/"), DavPath::new("calendars/user2/inbox"));
        assert_eq!(home.resolve("/calendars/other/inbox"), DavPath::new("calendars/other/inbox"));
        assert_eq!(home.to_string(), "/calendars/user2");
    }
}
