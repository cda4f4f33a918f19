//! Structural diff and patch over [`ConfigTree`]s.
//!
//! [`get_modifications`] walks both trees in traversal order and is
//! deterministic: the same pair of trees always yields the same list, so
//! independently computed diffs can be compared for conflicts.
//! [`apply_modifications`] replays such a list and is all-or-nothing.

mod modification;
pub use modification::*;


use std::collections::HashSet;

use tracing::trace;

use crate::tree::join_path;
use crate::tree::ConfigOption;
use crate::tree::ConfigTree;
use crate::tree::Section;
use crate::DiffError;

pub fn get_modifications(
    from: &ConfigTree,
    to: &ConfigTree,
) -> Vec<Modification> {
    diff_sections(from.root(), to.root())
}

/// Same as [`get_modifications`] for two sections, whatever their names.
pub fn section_modifications(
    from: &Section,
    to: &Section,
) -> Vec<Modification> {
    diff_sections(from, to)
}

/// Replays `mods` onto `tree`. On any conflict the tree is left untouched.
pub fn apply_modifications(
    tree: &mut ConfigTree,
    mods: &[Modification],
) -> Result<(), DiffError> {
    let mut work = tree.clone();
    apply_to_section(work.root_mut(), mods, &mut Vec::new())?;
    *tree = work;
    Ok(())
}

impl ConfigTree {
    pub fn modifications_to(
        &self,
        other: &ConfigTree,
    ) -> Vec<Modification> {
        get_modifications(self, other)
    }

    pub fn apply_modifications(
        &mut self,
        mods: &[Modification],
    ) -> Result<(), DiffError> {
        apply_modifications(self, mods)
    }
}

fn diff_sections(
    from: &Section,
    to: &Section,
) -> Vec<Modification> {
    let mut mods = Vec::new();

    let moved = reordered_names(
        from.options.iter().map(|o| o.name.as_str()),
        to.options.iter().map(|o| o.name.as_str()),
        |name| to.option(name).is_some(),
        |name| from.option(name).is_some(),
    );
    for (position, option) in from.options.iter().enumerate() {
        if to.option(&option.name).is_none() {
            mods.push(Modification::DelOption {
                name: option.name.clone(),
                position,
            });
        }
    }
    for (position, option) in to.options.iter().enumerate() {
        match from.option(&option.name) {
            None => mods.push(Modification::AddOption {
                name: option.name.clone(),
                position,
                value: option.value.clone(),
                comment: option.comment.clone(),
            }),
            Some(old) => {
                let reordered = moved.contains(option.name.as_str());
                if old.value != option.value || old.comment != option.comment || reordered {
                    mods.push(Modification::ModOption {
                        name: option.name.clone(),
                        position,
                        value: option.value.clone(),
                        comment: (old.comment != option.comment).then(|| option.comment.clone()),
                        reordered,
                    });
                }
            }
        }
    }

    let moved = reordered_names(
        from.sections.iter().map(|s| s.name.as_str()),
        to.sections.iter().map(|s| s.name.as_str()),
        |name| to.section(name).is_some(),
        |name| from.section(name).is_some(),
    );
    for (position, section) in from.sections.iter().enumerate() {
        if to.section(&section.name).is_none() {
            mods.push(Modification::DelSection {
                name: section.name.clone(),
                position,
            });
        }
    }
    for (position, section) in to.sections.iter().enumerate() {
        match from.section(&section.name) {
            None => mods.push(Modification::AddSection {
                name: section.name.clone(),
                position,
                section: section.clone(),
            }),
            Some(old) => {
                let changes = diff_sections(old, section);
                let reordered = moved.contains(section.name.as_str());
                if !changes.is_empty() || old.comment != section.comment || reordered {
                    mods.push(Modification::ModSection {
                        name: section.name.clone(),
                        position,
                        comment: (old.comment != section.comment).then(|| section.comment.clone()),
                        reordered,
                        changes,
                    });
                }
            }
        }
    }

    mods
}

/// Names kept on both sides whose relative order changed: every common
/// name outside the longest common subsequence of the two orderings.
fn reordered_names<'a>(
    from: impl Iterator<Item = &'a str>,
    to: impl Iterator<Item = &'a str>,
    in_to: impl Fn(&str) -> bool,
    in_from: impl Fn(&str) -> bool,
) -> HashSet<&'a str> {
    let left: Vec<&str> = from.filter(|n| in_to(*n)).collect();
    let right: Vec<&str> = to.filter(|n| in_from(*n)).collect();
    if left == right {
        return HashSet::new();
    }

    let (n, m) = (left.len(), right.len());
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if left[i] == right[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut stable = HashSet::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if left[i] == right[j] {
            stable.insert(left[i]);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    right.into_iter().filter(|name| !stable.contains(name)).collect()
}

fn conflict(
    action: ModAction,
    path: &[String],
    name: &str,
    reason: &'static str,
) -> DiffError {
    let mut segments: Vec<&str> = path.iter().map(String::as_str).collect();
    segments.push(name);
    DiffError::ApplyConflict {
        action: action.as_str(),
        path: join_path(&segments),
        reason,
    }
}

fn apply_to_section(
    section: &mut Section,
    mods: &[Modification],
    path: &mut Vec<String>,
) -> Result<(), DiffError> {
    // Deletions first so a name may change kind within one list
    for m in mods {
        match m {
            Modification::DelOption { name, .. } => {
                section
                    .remove_option(name)
                    .ok_or_else(|| conflict(m.action(), path, name, "option does not exist"))?;
            }
            Modification::DelSection { name, .. } => {
                section
                    .remove_section(name)
                    .ok_or_else(|| conflict(m.action(), path, name, "section does not exist"))?;
            }
            _ => {}
        }
    }

    let mut option_inserts: Vec<(usize, ConfigOption)> = Vec::new();
    let mut section_inserts: Vec<(usize, Section)> = Vec::new();
    for m in mods {
        match m {
            Modification::ModOption {
                name,
                position,
                value,
                comment,
                reordered,
            } => {
                let option = section
                    .option_mut(name)
                    .ok_or_else(|| conflict(m.action(), path, name, "option does not exist"))?;
                option.value = value.clone();
                if let Some(comment) = comment {
                    option.comment = comment.clone();
                }
                if *reordered {
                    if let Some(option) = section.remove_option(name) {
                        option_inserts.push((*position, option));
                    }
                }
            }
            Modification::ModSection {
                name,
                position,
                comment,
                reordered,
                changes,
            } => {
                let child = section
                    .section_mut(name)
                    .ok_or_else(|| conflict(m.action(), path, name, "section does not exist"))?;
                if let Some(comment) = comment {
                    child.comment = comment.clone();
                }
                path.push(name.clone());
                let nested = apply_to_section(child, changes, path);
                path.pop();
                nested?;
                if *reordered {
                    if let Some(child) = section.remove_section(name) {
                        section_inserts.push((*position, child));
                    }
                }
            }
            Modification::AddOption {
                name,
                position,
                value,
                comment,
            } => {
                if is_taken(section, &option_inserts, &section_inserts, name) {
                    return Err(conflict(m.action(), path, name, "already exists"));
                }
                let mut option = ConfigOption::new(name.clone(), value.clone());
                option.comment = comment.clone();
                option_inserts.push((*position, option));
            }
            Modification::AddSection {
                name,
                position,
                section: added,
            } => {
                if is_taken(section, &option_inserts, &section_inserts, name) {
                    return Err(conflict(m.action(), path, name, "already exists"));
                }
                section_inserts.push((*position, added.clone()));
            }
            Modification::DelOption { .. } | Modification::DelSection { .. } => {}
        }
    }

    // Ascending target positions rebuild the target order exactly
    option_inserts.sort_by_key(|(position, _)| *position);
    for (position, option) in option_inserts {
        section.insert_option(position, option);
    }
    section_inserts.sort_by_key(|(position, _)| *position);
    for (position, child) in section_inserts {
        section.insert_section(position, child);
    }
    trace!(path = %join_path(&path.iter().map(String::as_str).collect::<Vec<_>>()), "applied {} modification(s)", mods.len());
    Ok(())
}

fn is_taken(
    section: &Section,
    option_inserts: &[(usize, ConfigOption)],
    section_inserts: &[(usize, Section)],
    name: &str,
) -> bool {
    section.contains(name)
        || option_inserts.iter().any(|(_, o)| o.name == name)
        || section_inserts.iter().any(|(_, s)| s.name == name)
}
