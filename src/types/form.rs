use std::fmt;

/// Stable handle to a field of a [`Form`]: its position in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldHandle(usize);

impl FieldHandle {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The `type` of a form control, as far as validation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    Text,
    Textarea,
    Password,
    Hidden,
    File,
    Search,
    Email,
    Url,
    Number,
    Range,
    Color,
    Date,
    Month,
    Week,
    Time,
    Datetime,
    DatetimeLocal,
    Checkbox,
    Radio,
    SelectOne,
    SelectMultiple,
    /// Buttons and anything unrecognised.
    Other,
}

impl ControlType {
    /// Parse a control `type` string, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> ControlType {
        match value.to_ascii_lowercase().as_str() {
            "text" => ControlType::Text,
            "textarea" => ControlType::Textarea,
            "password" => ControlType::Password,
            "hidden" => ControlType::Hidden,
            "file" => ControlType::File,
            "search" => ControlType::Search,
            "email" => ControlType::Email,
            "url" => ControlType::Url,
            "number" => ControlType::Number,
            "range" => ControlType::Range,
            "color" => ControlType::Color,
            "date" => ControlType::Date,
            "month" => ControlType::Month,
            "week" => ControlType::Week,
            "time" => ControlType::Time,
            "datetime" => ControlType::Datetime,
            "datetime-local" => ControlType::DatetimeLocal,
            "checkbox" => ControlType::Checkbox,
            "radio" => ControlType::Radio,
            "select-one" => ControlType::SelectOne,
            "select-multiple" => ControlType::SelectMultiple,
            _ => ControlType::Other,
        }
    }

    /// Text-like controls: the only ones that can be "empty" and the only
    /// ones value processors touch.
    #[must_use]
    pub fn is_text(self) -> bool {
        !matches!(
            self,
            ControlType::Checkbox
                | ControlType::Radio
                | ControlType::SelectOne
                | ControlType::SelectMultiple
                | ControlType::Other
        )
    }

    #[must_use]
    pub fn is_checkable(self) -> bool {
        matches!(self, ControlType::Checkbox | ControlType::Radio)
    }

    #[must_use]
    pub fn is_select(self) -> bool {
        matches!(self, ControlType::SelectOne | ControlType::SelectMultiple)
    }
}

/// Snapshot of one form control's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: Option<String>,
    control: ControlType,
    value: String,
    checked: bool,
    disabled: bool,
    read_only: bool,
    options: Vec<bool>,
}

impl Field {
    #[must_use]
    pub fn new(name: &str, control: ControlType) -> Self {
        Self {
            name: (!name.is_empty()).then(|| name.to_owned()),
            control,
            value: String::new(),
            checked: false,
            disabled: false,
            read_only: false,
            options: Vec::new(),
        }
    }

    /// Shorthand for a text input with a value.
    #[must_use]
    pub fn text(name: &str, value: &str) -> Self {
        Self::new(name, ControlType::Text).with_value(value)
    }

    #[must_use]
    pub fn checkbox(name: &str, checked: bool) -> Self {
        Self::new(name, ControlType::Checkbox).with_checked(checked)
    }

    #[must_use]
    pub fn radio(name: &str, value: &str, checked: bool) -> Self {
        Self::new(name, ControlType::Radio)
            .with_value(value)
            .with_checked(checked)
    }

    /// A single-choice select with `option_count` options and the given selection.
    #[must_use]
    pub fn select(name: &str, option_count: usize, selected: Option<usize>) -> Self {
        let mut field = Self::new(name, ControlType::SelectOne);
        field.options = vec![false; option_count];
        if let Some(slot) = selected.and_then(|i| field.options.get_mut(i)) {
            *slot = true;
        }
        field
    }

    /// A multiple-choice select with the given options selected.
    #[must_use]
    pub fn multi_select(name: &str, option_count: usize, selected: &[usize]) -> Self {
        let mut field = Self::new(name, ControlType::SelectMultiple);
        field.options = (0..option_count).map(|i| selected.contains(&i)).collect();
        field
    }

    #[must_use]
    pub fn with_value(mut self, value: &str) -> Self {
        value.clone_into(&mut self.value);
        self
    }

    #[must_use]
    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn control(&self) -> ControlType {
        self.control
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Index of the first selected option, if any.
    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.options.iter().position(|&s| s)
    }

    /// Selection state of one option; `None` when the option does not exist.
    #[must_use]
    pub fn option_selected(&self, index: usize) -> Option<bool> {
        self.options.get(index).copied()
    }

    /// Empty text control. Non-text controls are never blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.control.is_text() && self.value.is_empty()
    }

    pub fn set_value(&mut self, value: String) {
        self.value = value;
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Replace the selection of a select control.
    pub fn select_options(&mut self, selected: &[usize]) {
        for (i, slot) in self.options.iter_mut().enumerate() {
            *slot = selected.contains(&i);
        }
    }
}

/// The live field set a rule tree is evaluated against, in document order.
#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: Vec<Field>,
}

impl Form {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    #[must_use]
    pub fn with(mut self, field: Field) -> Self {
        self.push(field);
        self
    }

    /// Append a field and return its handle.
    pub fn push(&mut self, field: Field) -> FieldHandle {
        self.fields.push(field);
        FieldHandle(self.fields.len() - 1)
    }

    #[must_use]
    pub fn field(&self, handle: FieldHandle) -> Option<&Field> {
        self.fields.get(handle.0)
    }

    pub fn field_mut(&mut self, handle: FieldHandle) -> Option<&mut Field> {
        self.fields.get_mut(handle.0)
    }

    /// All fields with their handles, including disabled and unnamed ones.
    pub fn iter(&self) -> impl Iterator<Item = (FieldHandle, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| (FieldHandle(i), f))
    }

    /// Handle of the `item`-th enabled field named `name`.
    #[must_use]
    pub fn find(&self, name: &str, item: usize) -> Option<FieldHandle> {
        self.iter()
            .filter(|(_, f)| !f.disabled && f.name() == Some(name))
            .map(|(h, _)| h)
            .nth(item)
    }

    /// Value of the first enabled field named `name`.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.find(name, 0)
            .and_then(|h| self.field(h))
            .map(Field::value)
    }

    /// Set the value of the `item`-th enabled field named `name`. Returns
    /// whether such a field exists.
    pub fn set_value(&mut self, name: &str, item: usize, value: &str) -> bool {
        match self.find(name, item).and_then(|h| self.field_mut(h)) {
            Some(field) => {
                field.set_value(value.to_owned());
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
