use std::fs::File;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

mod controller;
mod dates;
mod domain;
mod form;
mod inputter;
mod loader;
mod model;
mod record;
mod store;
mod ui;

use controller::Controller;
use domain::{GridConfig, GridError};
use model::{Model, Status};
use record::{Field, FieldKind, ID_FIELD};
use store::RowStore;
use ui::TableUI;

#[derive(Parser, Debug)]
#[command(version, about = "A tui based, editable and paginated data grid.")]
struct Args {
    /// Tabular file to load (csv, parquet, arrow). Starts with an empty user table if omitted.
    path: Option<String>,

    /// Rows per page
    #[arg(long, default_value = "10")]
    page_size: NonZeroUsize,

    /// Initial sort field (ascending)
    #[arg(long)]
    sort: Option<String>,

    /// Fields rendered as DD-MM-YYYY dates
    #[arg(long = "date-field", default_value = "dob")]
    date_fields: Vec<String>,

    #[arg(long, default_value_t = 30)]
    max_column_width: usize,

    /// Log file, defaults to rowgrid.log in the temp directory
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> GridConfig {
        GridConfig::default()
            .with_page_size(self.page_size)
            .with_sort_field(self.sort.clone())
            .with_date_fields(self.date_fields.clone())
            .with_max_column_width(self.max_column_width)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(&args) {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(args: &Args) {
    let path = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("rowgrid.log"));
    let file = match File::create(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", path.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish()
        .with(ErrorLayer::default());
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Cannot install logger: {e}");
    }
}

/// Schema of the user table the grid starts with when no file is given.
fn default_fields() -> Vec<Field> {
    vec![
        Field::text(ID_FIELD),
        Field::text("firstName"),
        Field::text("lastName"),
        Field::text("email"),
        Field::new("dob", FieldKind::Date),
        Field::new("age", FieldKind::Number),
        Field::text("country"),
        Field::text("phone"),
    ]
}

fn load(args: &Args) -> Result<(String, RowStore), GridError> {
    match args.path.as_deref() {
        Some(raw) => {
            let expanded =
                shellexpand::full(raw).map_err(|e| GridError::LoadingFailed(e.to_string()))?;
            let path = PathBuf::from(expanded.as_ref());
            let (file_info, store) = loader::load_store(path)?;
            info!(
                "Loaded {} ({} bytes, {} records)",
                file_info.path.display(),
                file_info.file_size,
                store.len()
            );
            let name = file_info
                .path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("???")
                .to_string();
            Ok((name, store))
        }
        None => Ok(("rowgrid".to_string(), RowStore::with_fields(default_fields()))),
    }
}

fn run(args: &Args) -> Result<(), GridError> {
    info!("Starting rowgrid!");
    let cfg = args.config();
    let (name, store) = load(args)?;

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &cfg, store, name);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    cfg: &GridConfig,
    store: RowStore,
    name: String,
) -> Result<(), GridError> {
    let size = terminal.size()?;
    let mut model = Model::init(cfg, store, name, size.width as usize, size.height as usize);
    let mut ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message);
    }
    info!("Quitting with {} records", model.store().len());
    Ok(())
}
