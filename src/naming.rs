//! Naming-strategy resolver (C3, §4.2).
//!
//! spec.md §4.2 has the resolver raise `InvalidStrategy` for an unknown
//! strategy value. Modeling `NamingStrategy` as an exhaustively-matched Rust
//! enum makes that case unreachable at this layer, so `resolve` and
//! `fallback_base` below are infallible; [`crate::error::Error::InvalidStrategy`]
//! still exists for the rare case a caller constructs a strategy dynamically
//! (e.g. from an externally supplied string) without going through
//! `clap::ValueEnum`.

/// How a child file's output path is constructed from its parent's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NamingStrategy {
    /// Child names are taken as-is, independent of the parent.
    Root,
    /// Child paths are resolved relative to the parent's full path (the
    /// parent is treated as a directory).
    Child,
    /// Child paths are resolved relative to the parent's *containing*
    /// directory.
    Sibling,
    /// Like `Sibling`, but interior separators in the child name are
    /// collapsed to `_` before joining (legacy behavior).
    #[value(name = "flat-sibling")]
    FlatSibling,
}

impl Default for NamingStrategy {
    fn default() -> Self {
        NamingStrategy::Child
    }
}

fn directory_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Joins `base` and `child` with `/`, collapsing redundant separators.
/// `..` is never resolved — this is a textual join, not a filesystem
/// canonicalization (§4.2).
fn join(base: &str, child: &str) -> String {
    if base.is_empty() {
        return child.trim_start_matches('/').to_string();
    }
    let base = base.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    format!("{base}/{child}")
}

/// Resolves the output path for a produced file given `(strategy,
/// parent_path, child_name)`.
pub fn resolve(strategy: NamingStrategy, parent_path: &str, child_name: &str) -> String {
    match strategy {
        NamingStrategy::Root => child_name.to_string(),
        NamingStrategy::Child => {
            if parent_path.is_empty() {
                child_name.to_string()
            } else {
                join(parent_path, child_name)
            }
        }
        NamingStrategy::Sibling => {
            if parent_path.is_empty() {
                child_name.to_string()
            } else {
                join(directory_of(parent_path), child_name)
            }
        }
        NamingStrategy::FlatSibling => {
            let flattened = child_name.replace(['/', '\\'], "_");
            if parent_path.is_empty() {
                flattened
            } else {
                join(directory_of(parent_path), &flattened)
            }
        }
    }
}

/// The fallback base name for nameless entries, per strategy (§9 Open
/// Questions, resolved): `Child` uses the literal `unk`; `Root` uses the
/// full archive path-stem including parent directory; `Sibling` and
/// `FlatSibling` use the archive stem only.
pub fn fallback_base(strategy: NamingStrategy, parent_path: &str, parent_stem: &str) -> String {
    match strategy {
        NamingStrategy::Child => "unk".to_string(),
        NamingStrategy::Root => {
            let dir = directory_of(parent_path);
            if dir.is_empty() {
                parent_stem.to_string()
            } else {
                format!("{dir}/{parent_stem}")
            }
        }
        NamingStrategy::Sibling | NamingStrategy::FlatSibling => parent_stem.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_ignores_parent() {
        assert_eq!(resolve(NamingStrategy::Root, "path/test.archive", "child.txt"), "child.txt");
        assert_eq!(resolve(NamingStrategy::Root, "", "child.txt"), "child.txt");
    }

    #[test]
    fn child_joins_full_parent_path() {
        assert_eq!(
            resolve(NamingStrategy::Child, "path/test.archive", "a.dat"),
            "path/test.archive/a.dat"
        );
        assert_eq!(resolve(NamingStrategy::Child, "", "a.dat"), "a.dat");
    }

    #[test]
    fn sibling_joins_parent_directory() {
        assert_eq!(
            resolve(NamingStrategy::Sibling, "path/test.archive", "a.dat"),
            "path/a.dat"
        );
    }

    #[test]
    fn flat_sibling_collapses_separators() {
        assert_eq!(
            resolve(NamingStrategy::FlatSibling, "path/test.archive", "nested/a.dat"),
            "path/nested_a.dat"
        );
    }

    #[test]
    fn fallback_bases_match_table() {
        assert_eq!(fallback_base(NamingStrategy::Child, "path/test.archive", "test"), "unk");
        assert_eq!(fallback_base(NamingStrategy::Root, "path/test.archive", "test"), "path/test");
        assert_eq!(fallback_base(NamingStrategy::Sibling, "path/test.archive", "test"), "test");
    }
}
