//! Job-configuration schema loading
//!
//! The job form is described by a YAML template in which any node may be an
//! `!include` reference pulling in another file, plus a directory of analysis
//! profiles discovered at load time. The resolver here is an explicit value
//! rooted at the including file's directory — there is no process-wide
//! parser state, and every inclusion re-roots relative paths at its own
//! location.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::{Error, Result};

/// Tag marking a node whose content comes from another file.
pub const INCLUDE_TAG: &str = "!include";

/// Include chains deeper than this fail with [`Error::IncludeCycle`]. The
/// real templates nest two or three levels; anything near the cap is a
/// reference loop.
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// Profiles are discovered under this path relative to the experiment root.
pub const PROFILE_SUBDIR: &str = "workflow/analysis_profiles";

/// Resolves one document and its `!include` references.
///
/// Constructed per resolved file; `root` is the directory of the file being
/// expanded, so relative include paths follow the includer, not the process
/// working directory.
#[derive(Debug)]
pub struct Resolver {
    root: PathBuf,
    depth: usize,
}

impl Resolver {
    /// Load `path` as YAML and expand every `!include` it contains.
    pub fn resolve(path: &Path) -> Result<Value> {
        Self::resolve_at(path, 0)
    }

    fn resolve_at(path: &Path, depth: usize) -> Result<Value> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(Error::IncludeCycle {
                path: path.to_owned(),
                max: MAX_INCLUDE_DEPTH,
            });
        }
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        let tree: Value =
            serde_yaml::from_str(&text).map_err(|source| Error::MalformedDocument {
                path: path.to_owned(),
                source,
            })?;
        let resolver = Resolver {
            root: path.parent().unwrap_or(Path::new(".")).to_owned(),
            depth,
        };
        resolver.expand(tree, path)
    }

    fn expand(&self, value: Value, from: &Path) -> Result<Value> {
        match value {
            Value::Tagged(tagged) if tagged.tag == INCLUDE_TAG => {
                let Some(rel) = tagged.value.as_str() else {
                    return Err(Error::BadIncludeTag {
                        from: from.to_owned(),
                    });
                };
                self.include(rel, from)
            }
            Value::Mapping(map) => {
                let mut out = Mapping::new();
                for (key, value) in map {
                    out.insert(key, self.expand(value, from)?);
                }
                Ok(Value::Mapping(out))
            }
            Value::Sequence(seq) => Ok(Value::Sequence(
                seq.into_iter()
                    .map(|value| self.expand(value, from))
                    .collect::<Result<_>>()?,
            )),
            other => Ok(other),
        }
    }

    fn include(&self, rel: &str, from: &Path) -> Result<Value> {
        let target = self.root.join(rel);
        if !target.exists() {
            return Err(Error::MissingInclude {
                target,
                from: from.to_owned(),
            });
        }
        log::debug!("including {}", target.display());
        let extension = target
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if matches!(extension, "yaml" | "yml") {
            // parsed as its own document, includes re-rooted at its directory
            Self::resolve_at(&target, self.depth + 1)
        } else {
            // any other extension is pulled in as one opaque text scalar
            fs::read_to_string(&target)
                .map(Value::String)
                .map_err(|source| Error::Io {
                    path: target,
                    source,
                })
        }
    }
}

/// Populate the schema's profile selector from a profile directory.
///
/// The selector is the first mapping node (depth-first) carrying a string
/// `options` field, a comma-joined enumeration. Every non-hidden file in
/// `profile_dir`, in directory listing order, is appended to `options` and
/// its resolved sub-tree attached under the selector keyed by file name. A
/// file named `default.yaml` becomes the selector's pre-selected `default`.
///
/// A missing profile directory is fatal; the caller never gets a silently
/// empty profile set.
pub fn assemble_profiles(schema: &mut Value, profile_dir: &Path) -> Result<()> {
    if !profile_dir.is_dir() {
        return Err(Error::MissingProfileDirectory {
            path: profile_dir.to_owned(),
        });
    }

    let mut profiles = Vec::new();
    let entries = fs::read_dir(profile_dir).map_err(|source| Error::Io {
        path: profile_dir.to_owned(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| Error::Io {
            path: profile_dir.to_owned(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let sub_tree = Resolver::resolve(&entry.path())?;
        profiles.push((name, sub_tree));
    }
    log::debug!(
        "discovered {} profiles in {}",
        profiles.len(),
        profile_dir.display()
    );

    let selector = find_selector(schema).ok_or(Error::MissingSelector)?;
    let has_default = profiles.iter().any(|(name, _)| name == "default.yaml");
    for (name, sub_tree) in profiles {
        if let Some(Value::String(options)) = selector.get_mut("options") {
            options.push(',');
            options.push_str(&name);
        }
        selector.insert(Value::String(name), sub_tree);
    }
    if has_default {
        selector.insert(
            Value::String("default".into()),
            Value::String("default.yaml".into()),
        );
    }
    Ok(())
}

/// Depth-first search for the first mapping with a string `options` field.
fn find_selector(value: &mut Value) -> Option<&mut Mapping> {
    match value {
        Value::Mapping(map) => {
            if matches!(map.get("options"), Some(Value::String(_))) {
                return Some(map);
            }
            for (_, value) in map.iter_mut() {
                if let Some(found) = find_selector(value) {
                    return Some(found);
                }
            }
            None
        }
        Value::Sequence(seq) => {
            for value in seq.iter_mut() {
                if let Some(found) = find_selector(value) {
                    return Some(found);
                }
            }
            None
        }
        _ => None,
    }
}

/// Experiment root for a movie path, following the site layout
/// `<root>/dat/<movie>`: the prefix before the `dat` segment with its
/// trailing separator trimmed. `None` when the path has no `dat` segment.
pub fn experiment_root(movie: &Path) -> Option<PathBuf> {
    let text = movie.to_str()?;
    let idx = text.find("dat")?;
    let prefix = &text[..idx];
    let prefix = prefix.strip_suffix(std::path::MAIN_SEPARATOR).unwrap_or(prefix);
    Some(PathBuf::from(prefix))
}

/// Profile directory for a movie: `<experiment root>/workflow/analysis_profiles`.
pub fn profile_dir(movie: &Path) -> Option<PathBuf> {
    Some(experiment_root(movie)?.join(PROFILE_SUBDIR))
}
