/// A named leaf of the configuration tree.
///
/// The value is opaque text at this layer; multi-valued options are
/// conventionally stored as a comma separated list (see [`ConfigOption::values`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) comment: String,
}

impl ConfigOption {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comment: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Splits a comma-list value, dropping blanks.
    pub fn values(&self) -> Vec<&str> {
        self.value.split(',').map(str::trim).filter(|v| !v.is_empty()).collect()
    }
}

/// A named node holding ordered options and ordered child sections.
///
/// Option and section names share one namespace inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    pub(crate) name: String,
    pub(crate) comment: String,
    pub(crate) options: Vec<ConfigOption>,
    pub(crate) sections: Vec<Section>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn options(&self) -> &[ConfigOption] {
        &self.options
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.sections.is_empty()
    }

    pub fn option(
        &self,
        name: &str,
    ) -> Option<&ConfigOption> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn section(
        &self,
        name: &str,
    ) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// True when either an option or a section carries `name`
    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.option_position(name).is_some() || self.section_position(name).is_some()
    }

    pub(crate) fn option_position(
        &self,
        name: &str,
    ) -> Option<usize> {
        self.options.iter().position(|o| o.name == name)
    }

    pub(crate) fn section_position(
        &self,
        name: &str,
    ) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    pub(crate) fn option_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut ConfigOption> {
        self.options.iter_mut().find(|o| o.name == name)
    }

    pub(crate) fn section_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    pub(crate) fn remove_option(
        &mut self,
        name: &str,
    ) -> Option<ConfigOption> {
        self.option_position(name).map(|i| self.options.remove(i))
    }

    pub(crate) fn remove_section(
        &mut self,
        name: &str,
    ) -> Option<Section> {
        self.section_position(name).map(|i| self.sections.remove(i))
    }

    /// Inserts at `position`, clamped to the current length.
    pub(crate) fn insert_option(
        &mut self,
        position: usize,
        option: ConfigOption,
    ) {
        let at = position.min(self.options.len());
        self.options.insert(at, option);
    }

    pub(crate) fn insert_section(
        &mut self,
        position: usize,
        section: Section,
    ) {
        let at = position.min(self.sections.len());
        self.sections.insert(at, section);
    }
}
