use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dates::parse_date;
use crate::domain::GridError;
use crate::record::{Field, FieldKind, Fields, ID_FIELD, Record, Value};
use crate::store::RowStore;

#[derive(Debug, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    file_type: FileType,
}

struct LoadedColumn {
    field: Field,
    data: Vec<Value>,
}

/// Load a tabular file into a store. The file's columns become the store's
/// declared field set, an `id` column supplies record ids.
pub fn load_store(path: PathBuf) -> Result<(FileInfo, RowStore), GridError> {
    let file_info = get_file_info(path)?;
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Each column is converted in its own rayon task.
    let start_time = Instant::now();
    let df = frame.collect()?;
    let c_: Result<Vec<LoadedColumn>, _> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = c_?;
    info!(
        "Loading {} rows took {}ms ...",
        df.height(),
        start_time.elapsed().as_millis()
    );

    let store = build_store(columns, df.height())?;
    Ok((file_info, store))
}

fn build_store(mut columns: Vec<LoadedColumn>, nrows: usize) -> Result<RowStore, GridError> {
    if let Some(pos) = columns.iter().position(|c| c.field.name == ID_FIELD) {
        let id_column = columns.remove(pos);
        columns.insert(0, id_column);
    }
    for c in columns.iter() {
        debug!("Column: \"{}\" {:?}", c.field.name, c.field.kind);
    }

    let has_id = columns.first().is_some_and(|c| c.field.name == ID_FIELD);
    let records = (0..nrows)
        .map(|ridx| {
            let id = if has_id {
                columns[0].data[ridx].to_string()
            } else {
                String::new()
            };
            let id = if id.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                id
            };
            let values: Fields = columns
                .iter()
                .filter(|c| c.field.name != ID_FIELD)
                .map(|c| (c.field.name.clone(), c.data[ridx].clone()))
                .collect();
            Record::new(id, values)
        })
        .collect();

    let mut fields: Vec<Field> = columns.into_iter().map(|c| c.field).collect();
    if !has_id {
        fields.insert(0, Field::text(ID_FIELD));
    }
    RowStore::with_records(fields, records)
}

fn field_kind(dtype: &DataType) -> FieldKind {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => FieldKind::Number,
        DataType::Date => FieldKind::Date,
        _ => FieldKind::Text,
    }
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
    let kind = if col_name == ID_FIELD {
        FieldKind::Text
    } else {
        field_kind(df.column(col_name)?.dtype())
    };

    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let data = series
        .into_iter()
        .map(|value| match value {
            None => Value::Empty,
            Some(s) => match kind {
                FieldKind::Number => s
                    .parse::<f64>()
                    .map(Value::Number)
                    .unwrap_or_else(|_| Value::Text(s.to_string())),
                FieldKind::Date => parse_date(s)
                    .map(Value::Date)
                    .unwrap_or_else(|| Value::Text(s.to_string())),
                FieldKind::Text => Value::Text(s.to_string()),
            },
        })
        .collect();

    Ok(LoadedColumn {
        field: Field::new(col_name, kind),
        data,
    })
}

fn detect_file_type(path: &Path) -> Result<FileType, GridError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(GridError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, GridError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => GridError::FileNotFound,
        ErrorKind::PermissionDenied => GridError::PermissionDenied,
        _ => GridError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(GridError::LoadingFailed("Not a file!".into()));
    }

    Ok(FileInfo {
        file_type: detect_file_type(&path)?,
        file_size: metadata.len(),
        path,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_try_parse_dates(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
