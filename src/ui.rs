use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::{CMDMode, GridConfig};
use crate::model::{Model, UIData};

pub const TOOLBAR_HEIGHT: usize = 1;
pub const TABLE_BORDER: usize = 2;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const FOOTER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const FORM_LABEL_WIDTH: u16 = 14;

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [toolbar, table, footer, cmdline] = Layout::vertical([
            Constraint::Length(TOOLBAR_HEIGHT as u16),
            Constraint::Min(1),
            Constraint::Length(FOOTER_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        self.draw_toolbar(uidata, frame, toolbar);
        self.draw_table(uidata, frame, table);
        self.draw_footer(uidata, frame, footer);
        self.draw_cmdline(uidata, frame, cmdline);

        if uidata.show_form {
            self.draw_form(uidata, frame);
        }
        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_toolbar(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [title, filter] =
            Layout::horizontal([Constraint::Min(1), Constraint::Min(1)]).areas(area);
        frame.render_widget(Line::from(format!(" {} ", uidata.name).bold()), title);

        let filter_line = if uidata.filter_text.is_empty() {
            Line::from(vec![" Search ".into(), "</> ".blue().bold()])
        } else {
            Line::from(vec![
                " Search: ".into(),
                uidata.filter_text.clone().yellow(),
                " ".into(),
            ])
        };
        frame.render_widget(filter_line.right_aligned(), filter);
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(
            uidata
                .table
                .iter()
                .map(|c| Cell::from(c.name.clone())),
        )
        .style(Style::new().add_modifier(Modifier::BOLD))
        .height(TABLE_HEADER_HEIGHT as u16);

        let nrows = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nrows).map(|ridx| {
            Row::new(uidata.table.iter().map(|c| {
                let cell: String = c.data[ridx].chars().take(self.max_column_width).collect();
                Cell::from(cell)
            }))
        });
        let widths = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16));

        let instructions = Line::from(vec![
            " Add ".into(),
            "<A>".blue().bold(),
            " Edit ".into(),
            "<E>".blue().bold(),
            " Delete ".into(),
            "<D>".blue().bold(),
            " Help ".into(),
            "<?> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title_bottom(instructions.centered())
            .border_set(border::PLAIN);

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(1)
            .row_highlight_style(Style::new().reversed())
            .cell_highlight_style(Style::new().bold().yellow().reversed());

        let mut state = TableState::default();
        if nrows > 0 {
            state = state
                .with_selected(Some(uidata.selected_row))
                .with_selected_column(Some(uidata.selected_column));
        }
        frame.render_stateful_widget(table, area, &mut state);

        if uidata.total_count == 0 {
            let message = if uidata.filter_text.is_empty() {
                "No records"
            } else {
                "No matching records"
            };
            let [_, inner, _] = Layout::vertical([
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .areas(area);
            frame.render_widget(Line::from(message.italic()).centered(), inner);
        }
    }

    fn draw_footer(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let range = if uidata.page_rows == 0 {
            format!("0 of {}", uidata.total_count)
        } else {
            format!(
                "{}–{} of {}",
                uidata.first_row + 1,
                uidata.first_row + uidata.page_rows,
                uidata.total_count
            )
        };
        let footer = Line::from(vec![
            "Rows per page: ".into(),
            uidata.page_size.to_string().bold(),
            "   ".into(),
            Span::from(range),
            "   Page ".into(),
            format!("{}/{}", uidata.page_index + 1, uidata.page_count).bold(),
            " ".into(),
        ]);
        frame.render_widget(footer.right_aligned(), area);
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::Filter) => "/",
                Some(CMDMode::GotoPage) => "Page: ",
                None => ":",
            };
            let line = Line::from(vec![prompt.blue().bold(), uidata.cmdinput.input.clone().into()]);
            frame.render_widget(line, area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
        } else {
            frame.render_widget(Line::from(uidata.status_message.clone().dim()), area);
        }
    }

    fn draw_form(&self, uidata: &UIData, frame: &mut Frame) {
        let height = uidata.form.len() as u16 + 2;
        let area = popup_area(frame.area(), 60, height + 2);
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", uidata.form_title).bold()).centered())
            .title_bottom(
                Line::from(vec![
                    " Save ".into(),
                    "<Enter>".blue().bold(),
                    " Next ".into(),
                    "<Tab>".blue().bold(),
                    " Cancel ".into(),
                    "<Esc> ".blue().bold(),
                ])
                .centered(),
            )
            .border_set(border::THICK);
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(block, area);

        for (idx, line) in uidata.form.iter().enumerate() {
            let y = inner.y + 1 + idx as u16;
            if y >= inner.bottom() {
                break;
            }
            let row = Rect::new(inner.x + 1, y, inner.width.saturating_sub(2), 1);
            let [label, value] =
                Layout::horizontal([Constraint::Length(FORM_LABEL_WIDTH), Constraint::Min(1)])
                    .areas(row);
            let label_style = if line.focused {
                Style::new().bold().yellow()
            } else {
                Style::new()
            };
            frame.render_widget(Span::styled(line.label.clone(), label_style), label);
            frame.render_widget(
                Span::styled(line.input.input.clone(), Style::new().underlined()),
                value,
            );
            if line.focused {
                let x = value.x + line.input.curser_pos as u16;
                frame.set_cursor_position(Position::new(x.min(value.right().saturating_sub(1)), y));
            }
        }
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let text = Text::from(uidata.popup_message.as_str());
        let height = text.height() as u16 + 2;
        let width = text.width() as u16 + 4;
        let area = popup_area(frame.area(), width, height);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(text)
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    area
}
