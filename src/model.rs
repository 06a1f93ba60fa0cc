use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::num::NonZeroUsize;
use tracing::{debug, info, trace, warn};

use crate::dates::format_date;
use crate::domain::{CMDMode, GridConfig, HELP_TEXT, Message, PAGE_SIZES};
use crate::form::{FormLine, FormMode, FormOutcome, FormState};
use crate::inputter::{InputResult, Inputter};
use crate::record::{Field, FieldKind, Record, RecordId};
use crate::store::{RowStore, SortDirection};
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, FOOTER_HEIGHT, TABLE_BORDER, TABLE_HEADER_HEIGHT,
    TOOLBAR_HEIGHT,
};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FORM,
    POPUP,
    CMDINPUT,
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let chrome = TOOLBAR_HEIGHT + TABLE_BORDER + TABLE_HEADER_HEIGHT + FOOTER_HEIGHT;
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(TABLE_BORDER),
            table_height: ui_height.saturating_sub(chrome + CMDLINE_HEIGH).max(1),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Everything the ui needs to draw one frame.
#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub total_count: usize,
    pub first_row: usize,
    pub page_rows: usize,
    pub page_index: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub filter_text: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub form_title: String,
    pub form: Vec<FormLine>,
    pub show_form: bool,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            total_count: 0,
            first_row: 0,
            page_rows: 0,
            page_index: 0,
            page_count: 1,
            page_size: 0,
            filter_text: String::new(),
            show_popup: false,
            popup_message: String::new(),
            form_title: String::new(),
            form: Vec::new(),
            show_form: false,
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

pub struct Model {
    config: GridConfig,
    name: String,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    store: RowStore,
    curser_row: usize, // Row of the current page
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    visible_columns: Vec<usize>,
    form: Option<FormState>,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    pub fn init(
        config: &GridConfig,
        mut store: RowStore,
        name: impl Into<String>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        store.set_page_size(config.page_size);
        if let Some(field) = config.sort_field.as_deref() {
            // set_sort on the current field would flip it to descending
            if store.view_state().sort_field != field {
                store.set_sort(field);
            }
        }
        let mut model = Self {
            config: config.clone(),
            name: name.into(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            store,
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            visible_columns: Vec::new(),
            form: None,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        };
        let loaded = format!("{} records", model.store.len());
        model.set_status_message(loaded);
        model.update_table_data();
        model
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// While a prompt or form is open keys are passed through unmapped.
    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput || self.modus == Modus::FORM
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn is_date_field(&self, field: &Field) -> bool {
        field.kind == FieldKind::Date || self.config.date_fields.contains(&field.name)
    }

    fn selected_id(&self) -> Option<RecordId> {
        self.store
            .view()
            .rows
            .get(self.curser_row)
            .map(|r| r.id().to_string())
    }

    fn selected_field(&self) -> Option<&Field> {
        self.store
            .fields()
            .get(self.offset_column + self.curser_column)
    }

    fn cell_text(&self, field: &Field, record: &Record) -> String {
        let raw = record.display(&field.name);
        let shown = if self.is_date_field(field) {
            format_date(&raw).into_owned()
        } else {
            raw
        };
        shown.replace("\r\n", " ↵ ").replace('\n', " ↵ ")
    }

    fn header_text(&self, field: &Field) -> String {
        let state = self.store.view_state();
        let mut label = field.label();
        if state.sort_field == field.name {
            label.push_str(match state.sort_direction {
                SortDirection::Ascending => " ▲",
                SortDirection::Descending => " ▼",
            });
        }
        label
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            reduced
        } else {
            name.to_string()
        }
    }

    fn update_table_data(&mut self) {
        let page_count = self.store.page_count();
        let view = self.store.view();
        let state = self.store.view_state();
        let fields = self.store.fields();

        self.curser_row = self.curser_row.min(view.rows.len().saturating_sub(1));
        let table_height = self.uilayout.table_height;
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if self.curser_row >= self.offset_row + table_height {
            self.offset_row = self.curser_row + 1 - table_height;
        }
        let rbegin = self.offset_row.min(view.rows.len());
        let rend = std::cmp::min(rbegin + table_height, view.rows.len());

        // Render width of every column from its header and the rows on this page
        let columns: Vec<ColumnView> = fields
            .iter()
            .map(|field| {
                let name = self.header_text(field);
                let data: Vec<String> = view.rows[rbegin..rend]
                    .iter()
                    .map(|r| self.cell_text(field, r))
                    .collect();
                let max_width = data
                    .iter()
                    .map(|s| s.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0);
                let width =
                    std::cmp::min(max_width + COLUMN_WIDTH_MARGIN, self.config.max_column_width);
                ColumnView { name, width, data }
            })
            .collect();

        self.offset_column = self.offset_column.min(columns.len().saturating_sub(1));
        let mut visible_columns = Vec::new();
        let mut table = Vec::new();
        let mut visible_width = 0;
        for (cidx, column) in columns.into_iter().enumerate().skip(self.offset_column) {
            if visible_width + column.width + 1 <= self.uilayout.table_width {
                visible_width += column.width + 1;
                visible_columns.push(cidx);
                table.push(column);
            } else {
                // Add the last partial visible column
                if visible_width < self.uilayout.table_width {
                    let remaining_width = self.uilayout.table_width - visible_width;
                    visible_columns.push(cidx);
                    table.push(ColumnView {
                        width: remaining_width,
                        ..column
                    });
                }
                break;
            }
        }
        for column in table.iter_mut() {
            column.name = Self::get_visible_name(&column.name, column.width);
        }
        self.curser_column = self
            .curser_column
            .min(visible_columns.len().saturating_sub(1));

        trace!(
            "Table: Cr {}, Cc {}, Or {}, Oc {}, Rb {}, Re {}, page {}/{}, total {}",
            self.curser_row,
            self.curser_column,
            self.offset_row,
            self.offset_column,
            rbegin,
            rend,
            state.page_index + 1,
            page_count,
            view.total_count
        );

        self.uidata = UIData {
            name: self.name.clone(),
            table,
            selected_row: self.curser_row - rbegin.min(self.curser_row),
            selected_column: self.curser_column,
            total_count: view.total_count,
            first_row: state.page_index.saturating_mul(state.page_size.get()),
            page_rows: view.rows.len(),
            page_index: state.page_index,
            page_count,
            page_size: state.page_size.get(),
            filter_text: state.filter_text.clone(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.uidata.popup_message.clone(),
            form_title: self
                .form
                .as_ref()
                .map(|f| f.title().to_string())
                .unwrap_or_default(),
            form: self.form.as_ref().map(|f| f.lines()).unwrap_or_default(),
            show_form: self.modus == Modus::FORM,
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
        };
        self.visible_columns = visible_columns;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.update_table_data();
    }

    pub fn update(&mut self, message: Option<Message>) {
        let Some(msg) = message else {
            return;
        };
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_selection_up(),
                Message::MoveDown => self.move_selection_down(),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(usize::MAX),
                Message::NextPage => self.goto_page(self.store.view_state().page_index + 1),
                Message::PrevPage => {
                    self.goto_page(self.store.view_state().page_index.saturating_sub(1))
                }
                Message::FirstPage => self.goto_page(0),
                Message::LastPage => self.goto_page(usize::MAX),
                Message::GotoPage => self.enter_cmd_mode(CMDMode::GotoPage),
                Message::CyclePageSize => self.cycle_page_size(),
                Message::Sort => self.sort_current_column(),
                Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                Message::ClearFilter => self.apply_filter(String::new()),
                Message::Add => self.open_add_form(),
                Message::Edit => self.open_edit_form(),
                Message::Delete => self.delete_selected(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Help => self.exit(),
                _ => (),
            },
            Modus::FORM => match msg {
                Message::RawKey(key) => self.form_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CMDINPUT => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.update_table_data();
            }
            Modus::FORM => {
                self.form = None;
                self.modus = Modus::TABLE;
                self.previous_modus = Modus::FORM;
                self.update_table_data();
            }
            Modus::TABLE | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.update_table_data();
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;

        self.input.clear();
        if mode == CMDMode::Filter {
            let current = self.store.view_state().filter_text.clone();
            self.input.set(&current);
        }
        self.last_input = self.input.get();
        self.update_table_data();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            } else {
                self.uidata.cmdinput = self.last_input.clone();
            }
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.clone();
        let canceled = self.last_input.canceled;
        let mode = self.cmd_mode.take();
        self.last_input = InputResult::default();

        match (mode, canceled) {
            (_, true) => self.update_table_data(),
            (Some(CMDMode::Filter), false) => self.apply_filter(cmd_input),
            (Some(CMDMode::GotoPage), false) => match cmd_input.trim().parse::<usize>() {
                Ok(page) if page > 0 => self.goto_page(page - 1),
                _ => {
                    self.set_status_message(format!("Not a page number: {cmd_input}"));
                    self.update_table_data();
                }
            },
            (None, false) => {
                info!("Cmd mode is none!");
                self.update_table_data();
            }
        }
    }

    fn apply_filter(&mut self, text: String) {
        self.store.set_filter(text);
        self.store.set_page(0);
        self.curser_row = 0;
        self.offset_row = 0;
        let view = self.store.view();
        let message = if self.store.view_state().filter_text.is_empty() {
            format!("{} records", view.total_count)
        } else {
            format!("Filter matches {} of {} records", view.total_count, self.store.len())
        };
        self.set_status_message(message);
        self.update_table_data();
    }

    fn goto_page(&mut self, index: usize) {
        let last = self.store.page_count() - 1;
        self.store.set_page(index.min(last));
        self.curser_row = 0;
        self.offset_row = 0;
        self.update_table_data();
    }

    fn cycle_page_size(&mut self) {
        let current = self.store.view_state().page_size.get();
        let next = PAGE_SIZES
            .iter()
            .copied()
            .find(|&s| s > current)
            .unwrap_or(PAGE_SIZES[0]);
        if let Some(size) = NonZeroUsize::new(next) {
            self.store.set_page_size(size);
        }
        self.curser_row = 0;
        self.offset_row = 0;
        self.set_status_message(format!("{next} rows per page"));
        self.update_table_data();
    }

    fn sort_current_column(&mut self) {
        if let Some(name) = self.selected_field().map(|f| f.name.clone()) {
            self.store.set_sort(&name);
            self.update_table_data();
        }
    }

    fn select_row(&mut self, row: usize) {
        self.curser_row = row;
        self.update_table_data();
    }

    /// Show the page holding `id` and put the cursor on it.
    fn select_record(&mut self, id: &str) {
        match self.store.position_in_view(id) {
            Some(pos) => {
                let size = self.store.view_state().page_size.get();
                self.store.set_page(pos / size);
                self.curser_row = pos % size;
            }
            None => debug!("Record {id} is hidden by the filter"),
        }
        self.update_table_data();
    }

    fn move_selection_up(&mut self) {
        if self.curser_row > 0 {
            self.curser_row -= 1;
            self.update_table_data();
        } else if self.store.view_state().page_index > 0 {
            let page = self.store.view_state().page_index - 1;
            self.store.set_page(page);
            self.curser_row = usize::MAX;
            self.update_table_data();
        }
    }

    fn move_selection_down(&mut self) {
        let page_rows = self.uidata.page_rows;
        if self.curser_row + 1 < page_rows {
            self.curser_row += 1;
            self.update_table_data();
        } else if self.store.view_state().page_index + 1 < self.store.page_count() {
            let page = self.store.view_state().page_index + 1;
            self.store.set_page(page);
            self.curser_row = 0;
            self.offset_row = 0;
            self.update_table_data();
        }
    }

    fn move_selection_left(&mut self) {
        if self.curser_column > 0 {
            self.curser_column -= 1;
        } else if self.offset_column > 0 {
            self.offset_column -= 1;
        }
        self.update_table_data();
    }

    fn move_selection_right(&mut self) {
        if self.offset_column + self.curser_column + 1 < self.store.fields().len() {
            if self.curser_column + 1 < self.visible_columns.len() {
                self.curser_column += 1;
            } else {
                // At the end of the screen
                self.offset_column += 1;
            }
            self.update_table_data();
        }
    }

    fn open_add_form(&mut self) {
        self.form = Some(FormState::add(self.store.fields()));
        self.previous_modus = self.modus;
        self.modus = Modus::FORM;
        self.update_table_data();
    }

    fn open_edit_form(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status_message("Nothing to edit");
            return;
        };
        if let Some(record) = self.store.get(&id) {
            self.form = Some(FormState::edit(
                self.store.fields(),
                record,
                &self.config.date_fields,
            ));
            self.previous_modus = self.modus;
            self.modus = Modus::FORM;
            self.update_table_data();
        }
    }

    fn form_input(&mut self, key: KeyEvent) {
        let outcome = match self.form.as_mut() {
            Some(form) => form.read(key),
            None => FormOutcome::Canceled,
        };
        match outcome {
            FormOutcome::Editing => {
                if let Some(form) = self.form.as_ref() {
                    self.uidata.form = form.lines();
                }
            }
            FormOutcome::Submitted => self.submit_form(),
            FormOutcome::Canceled => self.exit(),
        }
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::FORM;
        let values = form.values();
        match form.mode {
            FormMode::Add => {
                let id = self.store.add(values).id().to_string();
                self.set_status_message("Added record");
                self.select_record(&id);
            }
            FormMode::Edit(id) => match self.store.update(&id, values).map(|_| ()) {
                Ok(()) => {
                    self.set_status_message("Updated record");
                    self.select_record(&id);
                }
                Err(e) => {
                    warn!("Update failed: {e}");
                    self.set_status_message(format!("Update failed: {e}"));
                    self.update_table_data();
                }
            },
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status_message("Nothing to delete");
            return;
        };
        match self.store.delete(&id) {
            Ok(_) => {
                self.set_status_message("Deleted record");
                // Deleting the last row of the last page leaves it empty
                if self.store.view().rows.is_empty() {
                    let page = self.store.view_state().page_index;
                    self.store.set_page(page.saturating_sub(1));
                    self.curser_row = usize::MAX;
                }
            }
            Err(e) => {
                warn!("Delete failed: {e}");
                self.set_status_message(format!("Delete failed: {e}"));
            }
        }
        self.update_table_data();
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn row_as_csv(fields: &[Field], record: &Record) -> String {
        fields
            .iter()
            .map(|f| Self::wrap_cell_content(&record.display(&f.name)))
            .collect::<Vec<String>>()
            .join(",")
    }

    fn copy_to_clipboard(&mut self, content: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard unavailable: {e:?}");
                    self.set_status_message("Clipboard unavailable");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => {
                    trace!("Copied content to clipboard.");
                    self.set_status_message("Copied to clipboard");
                }
                Err(e) => {
                    warn!("Error copying to clipboard: {e:?}");
                    self.set_status_message("Copy failed");
                }
            }
        }
    }

    fn copy_cell(&mut self) {
        let view = self.store.view();
        let cell = match (view.rows.get(self.curser_row), self.selected_field()) {
            (Some(record), Some(field)) => record.display(&field.name),
            _ => return,
        };
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn copy_row(&mut self) {
        let view = self.store.view();
        let Some(record) = view.rows.get(self.curser_row) else {
            return;
        };
        let row = Self::row_as_csv(self.store.fields(), record);
        self.copy_to_clipboard(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fields;
    use pretty_assertions::assert_eq;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn store(n: usize) -> RowStore {
        let rows = (0..n)
            .map(|i| {
                fields([
                    ("id", format!("{i:02}")),
                    ("name", format!("name{i}")),
                    ("dob", format!("19{:02}-01-15", 50 + i)),
                ])
            })
            .collect();
        RowStore::from_records(rows).unwrap()
    }

    fn model(n: usize) -> Model {
        let config = GridConfig::default().with_page_size(NonZeroUsize::new(5).unwrap());
        Model::init(&config, store(n), "test", 120, 40)
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg));
    }

    fn type_keys(model: &mut Model, s: &str) {
        for c in s.chars() {
            send(
                model,
                Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)),
            );
        }
    }

    fn key(model: &mut Model, code: KeyCode) {
        send(model, Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn column(model: &Model, name: &str) -> Vec<String> {
        let ui = model.get_uidata();
        ui.table
            .iter()
            .find(|c| c.name.starts_with(name))
            .map(|c| c.data.clone())
            .unwrap_or_default()
    }

    #[test]
    fn initial_page_uses_configured_size() {
        let model = model(12);
        let ui = model.get_uidata();
        assert_eq!(ui.total_count, 12);
        assert_eq!(ui.page_rows, 5);
        assert_eq!(ui.page_count, 3);
        assert_eq!(column(&model, "Id"), vec!["00", "01", "02", "03", "04"]);
        assert_eq!(column(&model, "Id ▲").len(), 5);
    }

    #[test]
    fn dates_are_rendered_day_first() {
        let model = model(1);
        assert_eq!(column(&model, "Dob"), vec!["15-01-1950"]);
    }

    #[test]
    fn paging_is_clamped_to_last_page() {
        let mut model = model(12);
        send(&mut model, Message::LastPage);
        assert_eq!(model.get_uidata().page_index, 2);
        assert_eq!(column(&model, "Id"), vec!["10", "11"]);
        send(&mut model, Message::NextPage);
        assert_eq!(model.get_uidata().page_index, 2);
        send(&mut model, Message::FirstPage);
        send(&mut model, Message::PrevPage);
        assert_eq!(model.get_uidata().page_index, 0);
    }

    #[test]
    fn cursor_moves_across_pages() {
        let mut model = model(12);
        for _ in 0..5 {
            send(&mut model, Message::MoveDown);
        }
        assert_eq!(model.get_uidata().page_index, 1);
        assert_eq!(model.get_uidata().selected_row, 0);
        send(&mut model, Message::MoveUp);
        assert_eq!(model.get_uidata().page_index, 0);
        assert_eq!(model.get_uidata().selected_row, 4);
    }

    #[test]
    fn cycling_page_size_resets_page() {
        let mut model = model(30);
        send(&mut model, Message::NextPage);
        send(&mut model, Message::CyclePageSize);
        let ui = model.get_uidata();
        assert_eq!(ui.page_size, 10);
        assert_eq!(ui.page_index, 0);
        assert_eq!(ui.status_message, "10 rows per page");
    }

    #[test]
    fn sort_toggles_on_current_column() {
        let mut model = model(3);
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::Sort);
        assert_eq!(model.store().view_state().sort_field, "dob");
        assert_eq!(column(&model, "Dob ▲").len(), 3);
        send(&mut model, Message::Sort);
        assert_eq!(column(&model, "Dob ▼").len(), 3);
        assert_eq!(
            model.store().view_state().sort_direction,
            SortDirection::Descending
        );
        assert_eq!(column(&model, "Id"), vec!["02", "01", "00"]);
    }

    #[test]
    fn configured_sort_on_id_stays_ascending() {
        let config = GridConfig::default()
            .with_page_size(NonZeroUsize::new(5).unwrap())
            .with_sort_field(Some("id".to_string()));
        let model = Model::init(&config, store(3), "test", 120, 40);
        assert_eq!(
            model.store().view_state().sort_direction,
            SortDirection::Ascending
        );
        assert_eq!(column(&model, "Id"), vec!["00", "01", "02"]);
    }

    #[test]
    fn filter_prompt_returns_to_first_page() {
        let mut model = model(12);
        send(&mut model, Message::NextPage);
        send(&mut model, Message::Filter);
        type_keys(&mut model, "name");
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.store().view_state().page_index, 0);
        assert_eq!(model.get_uidata().page_index, 0);
    }

    #[test]
    fn filter_prompt_applies_on_enter() {
        let mut model = model(12);
        send(&mut model, Message::Filter);
        assert!(model.raw_keyevents());
        type_keys(&mut model, "NAME1");
        key(&mut model, KeyCode::Enter);
        assert!(!model.raw_keyevents());
        assert_eq!(model.store().view_state().filter_text, "NAME1");
        assert_eq!(column(&model, "Id"), vec!["01", "10", "11"]);
        assert_eq!(model.get_uidata().status_message, "Filter matches 3 of 12 records");

        send(&mut model, Message::ClearFilter);
        assert_eq!(model.get_uidata().total_count, 12);
    }

    #[test]
    fn filter_prompt_escape_keeps_filter() {
        let mut model = model(12);
        send(&mut model, Message::Filter);
        type_keys(&mut model, "name2");
        key(&mut model, KeyCode::Enter);
        send(&mut model, Message::Filter);
        assert_eq!(model.get_uidata().cmdinput.input, "name2");
        type_keys(&mut model, "zzz");
        key(&mut model, KeyCode::Esc);
        assert_eq!(model.store().view_state().filter_text, "name2");
        assert_eq!(model.get_uidata().total_count, 1);
    }

    #[test]
    fn goto_page_prompt() {
        let mut model = model(12);
        send(&mut model, Message::GotoPage);
        type_keys(&mut model, "2");
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.get_uidata().page_index, 1);

        send(&mut model, Message::GotoPage);
        type_keys(&mut model, "x");
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.get_uidata().page_index, 1);
        assert_eq!(model.get_uidata().status_message, "Not a page number: x");
    }

    #[test]
    fn add_form_appends_and_jumps_to_record() {
        let mut model = model(12);
        send(&mut model, Message::Add);
        assert!(model.get_uidata().show_form);
        assert_eq!(model.get_uidata().form.len(), 2);
        type_keys(&mut model, "zed");
        key(&mut model, KeyCode::Tab);
        type_keys(&mut model, "2000-02-29");
        key(&mut model, KeyCode::Enter);

        let ui = model.get_uidata();
        assert!(!ui.show_form);
        assert_eq!(model.store().len(), 13);
        // the generated id decides where the record lands in the id order
        let row = ui.selected_row;
        assert_eq!(column(&model, "Name")[row], "zed");
        assert_eq!(column(&model, "Dob")[row], "29-02-2000");
        assert_eq!(ui.status_message, "Added record");
    }

    #[test]
    fn edit_form_updates_selected_record() {
        let mut model = model(3);
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Edit);
        assert_eq!(model.get_uidata().form_title, "Edit record");
        assert_eq!(model.get_uidata().form[0].input.input, "name1");
        assert_eq!(model.get_uidata().form[1].input.input, "1951-01-15");
        type_keys(&mut model, "x");
        key(&mut model, KeyCode::Enter);

        let record = model.store().get("01").unwrap();
        assert_eq!(record.display("name"), "name1x");
        assert_eq!(record.display("dob"), "1951-01-15");
        assert_eq!(column(&model, "Id"), vec!["00", "01", "02"]);
    }

    #[test]
    fn cancelled_form_changes_nothing() {
        let mut model = model(3);
        send(&mut model, Message::Add);
        type_keys(&mut model, "ghost");
        key(&mut model, KeyCode::Esc);
        assert!(!model.get_uidata().show_form);
        assert!(!model.raw_keyevents());
        assert_eq!(model.store().len(), 3);
    }

    #[test]
    fn delete_removes_selected_record() {
        let mut model = model(6);
        send(&mut model, Message::LastPage);
        send(&mut model, Message::Delete);
        assert_eq!(model.store().len(), 5);
        assert!(model.store().get("05").is_none());
        assert_eq!(model.get_uidata().page_index, 0);
        assert_eq!(model.get_uidata().selected_row, 4);
        assert_eq!(model.get_uidata().status_message, "Deleted record");
    }

    #[test]
    fn delete_on_empty_page_reports() {
        let mut model = model(0);
        send(&mut model, Message::Delete);
        assert_eq!(model.get_uidata().status_message, "Nothing to delete");
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = model(3);
        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        send(&mut model, Message::Delete);
        assert_eq!(model.store().len(), 3);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
    }

    #[test]
    fn quit_sets_status() {
        let mut model = model(1);
        send(&mut model, Message::Quit);
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn csv_row_quotes_cells() {
        let fields = vec![Field::text("id"), Field::text("a"), Field::text("b")];
        let record = Record::new(
            "1".into(),
            crate::record::fields([("a", "x, y"), ("b", "say \"hi\"")]),
        );
        assert_eq!(
            Model::row_as_csv(&fields, &record),
            "1,\"x, y\",\"say \"\"hi\"\"\""
        );
    }

    #[test]
    fn narrow_terminal_shows_partial_column() {
        let config = GridConfig::default();
        let model = Model::init(&config, store(2), "test", 12, 20);
        let ui = model.get_uidata();
        let width: usize = ui.table.iter().map(|c| c.width).sum::<usize>() + ui.table.len();
        assert!(width <= 12 + ui.table.len());
        assert!(!ui.table.is_empty());
    }
}
