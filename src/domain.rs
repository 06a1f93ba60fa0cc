use std::io::Error;
use std::num::NonZeroUsize;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::record::RecordId;

pub const PAGE_SIZES: [usize; 5] = [5, 10, 25, 50, 100];

pub const HELP_TEXT: &str = "\
Navigation
  j / k, Up / Down     move row cursor
  h / l, Left / Right  move column cursor
  g / G                first / last row on page
  n / p, PgDn / PgUp   next / previous page
  Home / End           first / last page
  :                    go to page
  z                    cycle rows per page

Data
  s                    sort by column (again to reverse)
  /                    filter rows
  Backspace            clear filter
  a                    add record
  e, Enter             edit record
  d, Delete            delete record
  c / C                copy cell / row

  ?                    this help
  q                    quit
  Esc                  close dialog";

#[derive(Debug, Error)]
pub enum GridError {
    #[error("no record with id {0}")]
    NotFound(RecordId),
    #[error("duplicate record id {0}")]
    DuplicateId(RecordId),
    #[error(transparent)]
    IoError(#[from] Error),
    #[error(transparent)]
    PolarsError(#[from] PolarsError),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct GridConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub page_size: NonZeroUsize,
    pub sort_field: Option<String>,
    pub date_fields: Vec<String>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 30,
            page_size: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
            sort_field: None,
            date_fields: vec!["dob".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Filter,
    GotoPage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveBeginning,
    MoveEnd,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    GotoPage,
    CyclePageSize,
    Sort,
    Filter,
    ClearFilter,
    Add,
    Edit,
    Delete,
    CopyCell,
    CopyRow,
    Help,
    Exit,
    RawKey(KeyEvent),
    Resize(usize, usize),
}
