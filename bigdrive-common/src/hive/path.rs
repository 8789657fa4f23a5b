use crate::error::{HiveError, HiveResult};
use std::fmt::{Display, Formatter};

const SEPARATOR: char = '\\';

/// Backslash-separated location of a key inside a hive, e.g. `Software\BigDrive\Drives`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryPath {
    segments: Vec<String>,
}

impl RegistryPath {
    pub fn parse(path: &str) -> HiveResult<Self> {
        let segments: Vec<String> = path
            .trim_matches(SEPARATOR)
            .split(SEPARATOR)
            .map(str::to_string)
            .collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(HiveError::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn join(&self, name: impl Into<String>) -> HiveResult<Self> {
        let name = name.into();
        if name.is_empty() || name.contains(SEPARATOR) {
            return Err(HiveError::InvalidPath(format!("{self}{SEPARATOR}{name}")));
        }
        let mut segments = self.segments.clone();
        segments.push(name);
        Ok(Self { segments })
    }

    /// Joins a relative backslash path, e.g. `InprocServer32` or `A\B`.
    pub fn join_path(&self, relative: &str) -> HiveResult<Self> {
        let relative = RegistryPath::parse(relative)?;
        let mut segments = self.segments.clone();
        segments.extend(relative.segments);
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The enclosing key, or `None` for a top-level key.
    pub fn parent(&self) -> Option<Self> {
        match self.segments.len() {
            0 | 1 => None,
            n => Some(Self {
                segments: self.segments[..n - 1].to_vec(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl Display for RegistryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}
