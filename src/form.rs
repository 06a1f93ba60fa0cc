use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::dates::normalize_date_input;
use crate::inputter::{InputResult, Inputter};
use crate::record::{Field, FieldKind, Fields, ID_FIELD, Record, RecordId, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Add,
    Edit(RecordId),
}

#[derive(Debug, PartialEq)]
pub enum FormOutcome {
    Editing,
    Submitted,
    Canceled,
}

/// State of the add/edit dialog: one input per editable field.
#[derive(Debug, Clone)]
pub struct FormState {
    pub mode: FormMode,
    fields: Vec<Field>,
    inputs: Vec<Inputter>,
    focused: usize,
}

/// Snapshot of one form line for rendering.
#[derive(Debug, Clone, Default)]
pub struct FormLine {
    pub label: String,
    pub input: InputResult,
    pub focused: bool,
}

impl FormState {
    /// Empty form for a new record. `id` is never editable.
    pub fn add(fields: &[Field]) -> Self {
        let fields: Vec<Field> = fields
            .iter()
            .filter(|f| f.name != ID_FIELD)
            .cloned()
            .collect();
        let inputs = vec![Inputter::default(); fields.len()];
        FormState {
            mode: FormMode::Add,
            fields,
            inputs,
            focused: 0,
        }
    }

    /// Form pre-filled from `record`; dates in their `YYYY-MM-DD` input form.
    pub fn edit(fields: &[Field], record: &Record, date_fields: &[String]) -> Self {
        let mut form = FormState::add(fields);
        form.mode = FormMode::Edit(record.id().to_string());
        for (field, input) in form.fields.iter().zip(form.inputs.iter_mut()) {
            let raw = record.display(&field.name);
            if field.kind == FieldKind::Date || date_fields.contains(&field.name) {
                input.set(&normalize_date_input(&raw));
            } else {
                input.set(&raw);
            }
        }
        form
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Add => "Add new record",
            FormMode::Edit(_) => "Edit record",
        }
    }

    pub fn focus_next(&mut self) {
        if !self.inputs.is_empty() {
            self.focused = (self.focused + 1) % self.inputs.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.inputs.is_empty() {
            self.focused = (self.focused + self.inputs.len() - 1) % self.inputs.len();
        }
    }

    /// Route a key to the form. Navigation keys move the focus, everything
    /// else edits the focused field.
    pub fn read(&mut self, key: KeyEvent) -> FormOutcome {
        match (key.code, key.modifiers) {
            (KeyCode::Tab, m) if m.contains(KeyModifiers::SHIFT) => {
                self.focus_prev();
                FormOutcome::Editing
            }
            (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
                self.focus_prev();
                FormOutcome::Editing
            }
            (KeyCode::Tab, _) | (KeyCode::Down, _) => {
                self.focus_next();
                FormOutcome::Editing
            }
            (KeyCode::Enter, _) => FormOutcome::Submitted,
            (KeyCode::Esc, _) => FormOutcome::Canceled,
            _ => {
                if let Some(input) = self.inputs.get_mut(self.focused) {
                    input.read(key);
                }
                FormOutcome::Editing
            }
        }
    }

    /// Field values coerced into their declared kinds. Empty inputs are left out.
    pub fn values(&self) -> Fields {
        self.fields
            .iter()
            .zip(self.inputs.iter())
            .map(|(field, input)| (field.name.clone(), Value::parse_as(field.kind, input.value())))
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }

    pub fn lines(&self) -> Vec<FormLine> {
        self.fields
            .iter()
            .zip(self.inputs.iter())
            .enumerate()
            .map(|(idx, (field, input))| FormLine {
                label: field.label(),
                input: input.get(),
                focused: idx == self.focused,
            })
            .collect()
    }
}
