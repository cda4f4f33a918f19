use crate::tree::Section;

/// One structural change between two trees, relative to its parent section.
///
/// `position` is the index of the node among its siblings of the same kind:
/// in the source tree for deletions, in the target tree otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    AddSection {
        name: String,
        position: usize,
        section: Section,
    },
    DelSection {
        name: String,
        position: usize,
    },
    /// Recursive diff of a section present on both sides
    ModSection {
        name: String,
        position: usize,
        comment: Option<String>,
        reordered: bool,
        changes: Vec<Modification>,
    },
    AddOption {
        name: String,
        position: usize,
        value: String,
        comment: String,
    },
    DelOption {
        name: String,
        position: usize,
    },
    ModOption {
        name: String,
        position: usize,
        value: String,
        comment: Option<String>,
        reordered: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModAction {
    AddSection,
    DelSection,
    ModSection,
    AddOption,
    DelOption,
    ModOption,
}

impl ModAction {
    pub fn is_section_level(self) -> bool {
        matches!(self, ModAction::AddSection | ModAction::DelSection | ModAction::ModSection)
    }

    pub fn is_option_level(self) -> bool {
        !self.is_section_level()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModAction::AddSection => "addSec",
            ModAction::DelSection => "delSec",
            ModAction::ModSection => "modSec",
            ModAction::AddOption => "addOpt",
            ModAction::DelOption => "delOpt",
            ModAction::ModOption => "modOpt",
        }
    }
}

impl Modification {
    pub fn action(&self) -> ModAction {
        match self {
            Modification::AddSection { .. } => ModAction::AddSection,
            Modification::DelSection { .. } => ModAction::DelSection,
            Modification::ModSection { .. } => ModAction::ModSection,
            Modification::AddOption { .. } => ModAction::AddOption,
            Modification::DelOption { .. } => ModAction::DelOption,
            Modification::ModOption { .. } => ModAction::ModOption,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Modification::AddSection { name, .. }
            | Modification::DelSection { name, .. }
            | Modification::ModSection { name, .. }
            | Modification::AddOption { name, .. }
            | Modification::DelOption { name, .. }
            | Modification::ModOption { name, .. } => name,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            Modification::AddSection { position, .. }
            | Modification::DelSection { position, .. }
            | Modification::ModSection { position, .. }
            | Modification::AddOption { position, .. }
            | Modification::DelOption { position, .. }
            | Modification::ModOption { position, .. } => *position,
        }
    }

    /// Nested list of a `modSec`
    pub fn changes(&self) -> Option<&[Modification]> {
        match self {
            Modification::ModSection { changes, .. } => Some(changes),
            _ => None,
        }
    }
}
