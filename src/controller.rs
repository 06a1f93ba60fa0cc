use std::time::Duration;
use tracing::trace;

use crate::domain::{GridConfig, GridError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &GridConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, GridError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        Some(Message::RawKey(key))
                    } else {
                        self.handle_key(key)
                    }
                }
                Event::Resize(width, height) => {
                    Some(Message::Resize(width as usize, height as usize))
                }
                _ => None,
            });
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::Char('n'), _) | (KeyCode::PageDown, _) => Some(Message::NextPage),
            (KeyCode::Char('p'), _) | (KeyCode::PageUp, _) => Some(Message::PrevPage),
            (KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Char(':'), _) => Some(Message::GotoPage),
            (KeyCode::Char('z'), _) => Some(Message::CyclePageSize),
            (KeyCode::Char('s'), _) => Some(Message::Sort),
            (KeyCode::Char('/'), _) => Some(Message::Filter),
            (KeyCode::Backspace, _) => Some(Message::ClearFilter),
            (KeyCode::Char('a'), _) => Some(Message::Add),
            (KeyCode::Char('e'), _) | (KeyCode::Enter, _) => Some(Message::Edit),
            (KeyCode::Char('d'), _) | (KeyCode::Delete, _) => Some(Message::Delete),
            (KeyCode::Char('c'), _) => Some(Message::CopyCell),
            (KeyCode::Char('C'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
