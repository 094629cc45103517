//! Validation and normalization of namespace paths
//!
//! Every path that reaches the core is absolute and POSIX-style. This module
//! turns raw collaborator input into an [`FsPath`], rejecting malformed input
//! with [`FsError::InvalidArgument`].

use crate::error::{FsError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A normalized absolute path inside the simulated namespace
///
/// # Rules
/// - Must start with `/`
/// - Repeated slashes collapse, `.` segments are dropped
/// - `..` pops one segment and never climbs above the root
/// - Segments may not contain control characters and are at most 255 bytes
///
/// # Examples
///
/// ```
/// use blockfs::FsPath;
///
/// let path = FsPath::parse("/documents//work/./report.txt").unwrap();
/// assert_eq!(path.as_str(), "/documents/work/report.txt");
///
/// let up = FsPath::parse("/documents/work/..").unwrap();
/// assert_eq!(up.as_str(), "/documents");
///
/// assert!(FsPath::parse("relative/path").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FsPath(String);

impl FsPath {
    /// Allowed characters in a single path segment
    const SEGMENT_PATTERN: &'static str = r"^[^\x00-\x1F\x7F/]+$";

    /// Maximum length of one segment
    const MAX_SEGMENT_LENGTH: usize = 255;

    /// Maximum length of a whole path
    const MAX_PATH_LENGTH: usize = 4096;

    /// The root directory
    pub fn root() -> Self {
        FsPath(String::from("/"))
    }

    /// Parse and normalize an absolute path
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(FsError::InvalidArgument("path cannot be empty".to_string()));
        }

        if !input.starts_with('/') {
            return Err(FsError::InvalidArgument(format!(
                "path '{}' must be absolute",
                input
            )));
        }

        if input.len() > Self::MAX_PATH_LENGTH {
            return Err(FsError::InvalidArgument(format!(
                "path too long (max {} bytes)",
                Self::MAX_PATH_LENGTH
            )));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in input.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    segments.pop();
                }
                name => {
                    Self::validate_segment(name)?;
                    segments.push(name);
                }
            }
        }

        if segments.is_empty() {
            return Ok(Self::root());
        }

        let mut normalized = String::with_capacity(input.len());
        for segment in segments {
            normalized.push('/');
            normalized.push_str(segment);
        }
        Ok(FsPath(normalized))
    }

    /// Resolve `input` against a current directory
    ///
    /// Absolute input is parsed as-is, `~` names the root, anything else is
    /// joined onto `cwd`. This is what collaborators use before calling in.
    pub fn resolve(cwd: &FsPath, input: &str) -> Result<Self> {
        if input.starts_with('/') {
            Self::parse(input)
        } else if input == "~" {
            Ok(Self::root())
        } else if cwd.is_root() {
            Self::parse(&format!("/{}", input))
        } else {
            Self::parse(&format!("{}/{}", cwd.0, input))
        }
    }

    fn validate_segment(segment: &str) -> Result<()> {
        if segment.len() > Self::MAX_SEGMENT_LENGTH {
            return Err(FsError::InvalidArgument(format!(
                "path segment too long (max {} bytes)",
                Self::MAX_SEGMENT_LENGTH
            )));
        }

        static SEGMENT_RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
        let re = SEGMENT_RE
            .get_or_init(|| Regex::new(Self::SEGMENT_PATTERN))
            .as_ref()
            .map_err(|e| FsError::InvalidArgument(format!("segment pattern: {}", e)))?;
        if !re.is_match(segment) {
            return Err(FsError::InvalidArgument(format!(
                "path segment {:?} contains control characters",
                segment
            )));
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Path segments from the root down
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit('/').next()
        }
    }

    /// Parent directory, `None` for the root
    pub fn parent(&self) -> Option<FsPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(FsPath(self.0[..idx].to_string())),
        }
    }

    /// Append a single child name
    pub fn join(&self, name: &str) -> Result<FsPath> {
        if name.contains('/') || name == "." || name == ".." {
            return Err(FsError::InvalidArgument(format!(
                "'{}' is not a single path segment",
                name
            )));
        }
        Self::validate_segment(name)?;
        Ok(self.child(name))
    }

    /// Append a name already known to be a valid segment (a tree key)
    pub(crate) fn child(&self, name: &str) -> FsPath {
        if self.is_root() {
            FsPath(format!("/{}", name))
        } else {
            FsPath(format!("{}/{}", self.0, name))
        }
    }

    /// Whether this path equals `ancestor` or lies underneath it
    pub fn is_within(&self, ancestor: &FsPath) -> bool {
        if ancestor.is_root() || self == ancestor {
            return true;
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }
}

impl AsRef<str> for FsPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FsPath {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FsPath {
    type Error = FsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<FsPath> for String {
    fn from(path: FsPath) -> Self {
        path.0
    }
}
