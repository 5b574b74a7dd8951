//! Sandbox guard: lexical path confinement to a single data root.
//!
//! Every path an operation touches is produced here. `SandboxPath` has no public
//! constructor, so holding one is proof that the path passed validation.
//!
//! Accepted spellings for a root-relative path, given the default mount `data`:
//! - `/data/x.txt` (absolute-looking)
//! - `./data/x.txt` (root-relative)
//! - `data/x.txt` (bare, but led by the mount segment, so still the root)
//! - `x.txt` (bare relative, interpreted against the root)
//! - an absolute physical path that already lies under the root
//!
//! Normalization never touches the filesystem.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Path violation: '{raw}' {reason}")]
pub struct PathViolation {
    pub raw: String,
    pub reason: String,
}

impl PathViolation {
    fn new(raw: &str, reason: impl Into<String>) -> Self {
        Self {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    mount: String,
}

/// A path confined to the sandbox root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SandboxPath {
    abs: PathBuf,
    rel: PathBuf,
}

impl SandboxPath {
    pub fn as_path(&self) -> &Path {
        &self.abs
    }

    /// Root-relative form, always `/`-separated (empty for the root itself).
    pub fn relative(&self) -> String {
        self.rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn file_name(&self) -> Option<&str> {
        self.abs.file_name().and_then(|n| n.to_str())
    }

    pub fn extension(&self) -> Option<String> {
        self.abs
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

impl fmt::Display for SandboxPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.relative())
    }
}

impl Sandbox {
    /// `root` must be absolute; `mount` is the single segment callers use to spell it.
    pub fn new(root: impl Into<PathBuf>, mount: &str) -> Result<Self, PathViolation> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(PathViolation::new(
                &root.to_string_lossy(),
                "is not an absolute sandbox root",
            ));
        }
        let mount = mount.trim_matches('/');
        if mount.is_empty() || mount.contains('/') || mount == "." || mount == ".." {
            return Err(PathViolation::new(mount, "is not a valid mount name"));
        }
        let root = lexical_normalize(&root)
            .ok_or_else(|| PathViolation::new(&root.to_string_lossy(), "cannot be normalized"))?;
        Ok(Self {
            root,
            mount: mount.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub fn resolve(&self, raw: &str) -> Result<SandboxPath, PathViolation> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathViolation::new(raw, "is empty"));
        }

        if let Some(rest) = self.strip_mount(trimmed) {
            return self.confine_relative(raw, rest);
        }

        let candidate = Path::new(trimmed);
        if candidate.has_root() || candidate.is_absolute() {
            let normalized = lexical_normalize(candidate)
                .ok_or_else(|| PathViolation::new(raw, "escapes the filesystem root"))?;
            let rel = normalized
                .strip_prefix(&self.root)
                .map_err(|_| PathViolation::new(raw, "is outside the sandbox root"))?
                .to_path_buf();
            return Ok(SandboxPath {
                abs: normalized,
                rel,
            });
        }

        self.confine_relative(raw, trimmed)
    }

    /// Re-admit a physical path discovered by walking a sandboxed directory.
    pub fn adopt(&self, physical: &Path) -> Result<SandboxPath, PathViolation> {
        let raw = physical.to_string_lossy();
        let normalized = lexical_normalize(physical)
            .ok_or_else(|| PathViolation::new(&raw, "cannot be normalized"))?;
        let rel = normalized
            .strip_prefix(&self.root)
            .map_err(|_| PathViolation::new(&raw, "is outside the sandbox root"))?
            .to_path_buf();
        Ok(SandboxPath {
            abs: normalized,
            rel,
        })
    }

    /// Resolve `child` relative to an already confined directory.
    pub fn join(&self, base: &SandboxPath, child: &str) -> Result<SandboxPath, PathViolation> {
        let joined = if base.rel.as_os_str().is_empty() {
            child.to_string()
        } else {
            format!("{}/{}", base.relative(), child.trim_start_matches('/'))
        };
        self.confine_relative(child, &joined)
    }

    fn strip_mount<'a>(&self, raw: &'a str) -> Option<&'a str> {
        for prefix in [
            format!("/{}", self.mount),
            format!("./{}", self.mount),
            self.mount.clone(),
        ] {
            if let Some(rest) = raw.strip_prefix(prefix.as_str()) {
                if rest.is_empty() || rest.starts_with('/') {
                    return Some(rest);
                }
            }
        }
        None
    }

    fn confine_relative(&self, raw: &str, rest: &str) -> Result<SandboxPath, PathViolation> {
        let mut rel = PathBuf::new();
        for component in Path::new(rest).components() {
            match component {
                Component::CurDir | Component::RootDir => {}
                Component::Normal(segment) => rel.push(segment),
                Component::ParentDir => {
                    if !rel.pop() {
                        return Err(PathViolation::new(raw, "traverses above the sandbox root"));
                    }
                }
                Component::Prefix(_) => {
                    return Err(PathViolation::new(raw, "carries a drive or UNC prefix"));
                }
            }
        }
        let abs = if rel.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(&rel)
        };
        Ok(SandboxPath { abs, rel })
    }
}

/// Collapse `.` and `..` without touching the filesystem. `None` if `..` climbs past `/`.
fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::Normal(segment) => {
                out.push(segment);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
        }
    }
    Some(out)
}
