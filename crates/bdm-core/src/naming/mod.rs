//! Destination naming policy.
//!
//! `Index` names files by submission index, keeping the URL's extension (`0.jpg`);
//! `Basename` keeps the last URL path segment (`photo.jpg`). Both produce a
//! non-empty, Linux-safe file name, unique within one run.

mod sanitize;

use std::collections::HashSet;
use std::path::PathBuf;

use crate::storage::TEMP_SUFFIX;

pub use sanitize::sanitize_file_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    Index,
    #[default]
    Basename,
}

/// Last non-empty path segment of `url`, ignoring query and fragment.
///
/// Falls back to plain string splitting when `url` does not parse.
pub fn last_path_segment(url: &str) -> Option<String> {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => {
            let path = url.split(&['?', '#'][..]).next().unwrap_or("");
            path.rsplit('/').find(|s| !s.is_empty()).map(str::to_string)
        }
    }?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment)
}

/// Extension of `name` including the dot (`.tar.gz` yields `.gz`). Only short
/// alphanumeric extensions count.
fn extension(name: &str) -> Option<&str> {
    let dot = name.rfind('.')?;
    let ext = &name[dot + 1..];
    if dot == 0 || ext.is_empty() || ext.len() > 16 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(&name[dot..])
}

/// Hands out destination paths for one run.
#[derive(Debug)]
pub struct Namer {
    policy: NamingPolicy,
    output_dir: PathBuf,
    taken: HashSet<String>,
}

impl Namer {
    pub fn new(policy: NamingPolicy, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            policy,
            output_dir: output_dir.into(),
            taken: HashSet::new(),
        }
    }

    /// Destination for the job with sequence index `index` and source `url`.
    pub fn destination(&mut self, index: usize, url: &str) -> PathBuf {
        let name = self.file_name(index, url);
        self.output_dir.join(name)
    }

    fn file_name(&mut self, index: usize, url: &str) -> String {
        let segment = last_path_segment(url);
        let candidate = match self.policy {
            NamingPolicy::Index => {
                let ext = segment.as_deref().and_then(extension).unwrap_or("");
                format!("{}{}", index, ext)
            }
            NamingPolicy::Basename => segment
                .as_deref()
                .map(sanitize_file_name)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("download-{}.bin", index)),
        };
        self.claim(candidate, index)
    }

    /// Reserve `candidate` together with its `.part` temp name, or `stem-<index>[-n].ext`
    /// when either is already in use.
    fn claim(&mut self, candidate: String, index: usize) -> String {
        if self.reserve(&candidate) {
            return candidate;
        }
        let (stem, ext) = match extension(&candidate) {
            Some(ext) => (&candidate[..candidate.len() - ext.len()], ext),
            None => (candidate.as_str(), ""),
        };
        let mut attempt = 0usize;
        loop {
            let name = if attempt == 0 {
                format!("{}-{}{}", stem, index, ext)
            } else {
                format!("{}-{}-{}{}", stem, index, attempt, ext)
            };
            if self.reserve(&name) {
                tracing::debug!(job = index, name = %name, "renamed duplicate destination");
                return name;
            }
            attempt += 1;
        }
    }

    fn reserve(&mut self, name: &str) -> bool {
        let temp = format!("{}{}", name, TEMP_SUFFIX);
        if self.taken.contains(name) || self.taken.contains(&temp) {
            return false;
        }
        self.taken.insert(name.to_string());
        self.taken.insert(temp);
        true
    }
}
