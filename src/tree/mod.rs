//! In-memory hierarchical configuration document.
//!
//! A [`ConfigTree`] is rooted at an unnamed [`Section`]. Nodes are addressed
//! by `/`-joined paths of case-sensitive names, e.g.
//! `/DIRAC/Configuration/Servers`. Insertion order of options and sections
//! is significant and preserved by every operation, including the textual
//! codec.

mod codec;
mod section;
pub use section::*;


use crate::TreeError;

const RESERVED_CHARS: &[char] = &['/', '=', '{', '}', '#', '\n', '\r'];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigTree {
    root: Section,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Section {
        &mut self.root
    }

    /// `/` or an empty path address the root.
    pub fn get_section(
        &self,
        path: &str,
    ) -> Result<&Section, TreeError> {
        let segments = split_path(path)?;
        let mut current = &self.root;
        for (i, seg) in segments.iter().enumerate() {
            current = current
                .section(seg)
                .ok_or_else(|| TreeError::NotFound(join_path(&segments[..=i])))?;
        }
        Ok(current)
    }

    pub fn get_option(
        &self,
        path: &str,
    ) -> Result<&str, TreeError> {
        let (parent, name) = split_leaf(path)?;
        self.get_section(&join_path(&parent))
            .ok()
            .and_then(|s| s.option(name))
            .map(ConfigOption::value)
            .ok_or_else(|| TreeError::NotFound(normalize(path)))
    }

    /// Sets an option, creating missing intermediate sections. Overwrites
    /// the value of an existing option.
    pub fn set_option(
        &mut self,
        path: &str,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        let (parent, name) = split_leaf(path)?;
        let section = self.ensure_section(&parent)?;
        if section.section_position(name).is_some() {
            return Err(TreeError::AlreadyExists(normalize(path)));
        }
        match section.option_mut(name) {
            Some(option) => option.value = value.into(),
            None => section.options.push(ConfigOption::new(name, value)),
        }
        Ok(())
    }

    /// Adds an empty section. Missing intermediate sections are created;
    /// the last segment must not exist yet.
    pub fn add_section(
        &mut self,
        path: &str,
    ) -> Result<(), TreeError> {
        let (parent, name) = split_leaf(path)?;
        let section = self.ensure_section(&parent)?;
        if section.contains(name) {
            return Err(TreeError::AlreadyExists(normalize(path)));
        }
        section.sections.push(Section::new(name));
        Ok(())
    }

    pub fn delete_section(
        &mut self,
        path: &str,
    ) -> Result<Section, TreeError> {
        let (parent, name) = split_leaf(path)?;
        self.find_section_mut(&parent)
            .ok()
            .and_then(|s| s.remove_section(name))
            .ok_or_else(|| TreeError::NotFound(normalize(path)))
    }

    pub fn delete_option(
        &mut self,
        path: &str,
    ) -> Result<ConfigOption, TreeError> {
        let (parent, name) = split_leaf(path)?;
        self.find_section_mut(&parent)
            .ok()
            .and_then(|s| s.remove_option(name))
            .ok_or_else(|| TreeError::NotFound(normalize(path)))
    }

    /// Attaches a comment to the option or section at `path`.
    pub fn set_comment(
        &mut self,
        path: &str,
        comment: impl Into<String>,
    ) -> Result<(), TreeError> {
        let (parent, name) = split_leaf(path)?;
        let section = self
            .find_section_mut(&parent)
            .map_err(|_| TreeError::NotFound(normalize(path)))?;
        if let Some(option) = section.option_mut(name) {
            option.comment = comment.into();
        } else if let Some(child) = section.section_mut(name) {
            child.comment = comment.into();
        } else {
            return Err(TreeError::NotFound(normalize(path)));
        }
        Ok(())
    }

    pub fn list_sections(
        &self,
        path: &str,
    ) -> Result<Vec<&str>, TreeError> {
        Ok(self.get_section(path)?.sections.iter().map(|s| s.name()).collect())
    }

    pub fn list_options(
        &self,
        path: &str,
    ) -> Result<Vec<&str>, TreeError> {
        Ok(self.get_section(path)?.options.iter().map(|o| o.name()).collect())
    }

    fn find_section_mut(
        &mut self,
        segments: &[&str],
    ) -> Result<&mut Section, TreeError> {
        let mut current = &mut self.root;
        for (i, seg) in segments.iter().enumerate() {
            let idx = current
                .section_position(seg)
                .ok_or_else(|| TreeError::NotFound(join_path(&segments[..=i])))?;
            current = &mut current.sections[idx];
        }
        Ok(current)
    }

    fn ensure_section(
        &mut self,
        segments: &[&str],
    ) -> Result<&mut Section, TreeError> {
        let mut current = &mut self.root;
        for (i, seg) in segments.iter().enumerate() {
            if current.option_position(seg).is_some() {
                return Err(TreeError::AlreadyExists(join_path(&segments[..=i])));
            }
            let idx = match current.section_position(seg) {
                Some(idx) => idx,
                None => {
                    current.sections.push(Section::new(*seg));
                    current.sections.len() - 1
                }
            };
            current = &mut current.sections[idx];
        }
        Ok(current)
    }
}

/// Checks a single node name.
pub(crate) fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty name");
    }
    if name.contains(RESERVED_CHARS) {
        return Err("reserved character in name");
    }
    if name.trim() != name {
        return Err("surrounding whitespace in name");
    }
    Ok(())
}

pub(crate) fn split_path(path: &str) -> Result<Vec<&str>, TreeError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for seg in &segments {
        validate_name(seg).map_err(|reason| TreeError::InvalidPath {
            path: path.to_string(),
            reason,
        })?;
    }
    Ok(segments)
}

fn split_leaf(path: &str) -> Result<(Vec<&str>, &str), TreeError> {
    let mut segments = split_path(path)?;
    let name = segments.pop().ok_or_else(|| TreeError::InvalidPath {
        path: path.to_string(),
        reason: "operation not allowed on the root",
    })?;
    Ok((segments, name))
}

pub(crate) fn join_path(segments: &[&str]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().fold(String::new(), |mut acc, seg| {
        acc.push('/');
        acc.push_str(seg);
        acc
    })
}

fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    join_path(&segments)
}
