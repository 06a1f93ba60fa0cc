use std::cmp::Ordering;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::domain::GridError;
use crate::record::{Field, FieldKind, Fields, ID_FIELD, Record, RecordId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub filter_text: String,
    pub sort_field: String,
    pub sort_direction: SortDirection,
    pub page_index: usize,
    pub page_size: NonZeroUsize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            filter_text: String::new(),
            sort_field: ID_FIELD.to_string(),
            sort_direction: SortDirection::Ascending,
            page_index: 0,
            page_size: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// One computed page of the derived view.
#[derive(Debug)]
pub struct View<'a> {
    pub rows: Vec<&'a Record>,
    pub total_count: usize,
}

/// Authoritative in-memory row collection plus the filter/sort/page state
/// that derives the visible page from it.
#[derive(Debug, Default)]
pub struct RowStore {
    fields: Vec<Field>,
    records: Vec<Record>,
    issued_ids: HashSet<RecordId>,
    state: ViewState,
}

impl RowStore {
    /// Empty store with a declared field set.
    pub fn with_fields(fields: Vec<Field>) -> Self {
        RowStore {
            fields,
            ..Default::default()
        }
    }

    /// Store with a declared field set and an initial collection. Records
    /// keep the id they carry; ids must be unique.
    pub fn with_records(fields: Vec<Field>, records: Vec<Record>) -> Result<Self, GridError> {
        let mut store = RowStore::with_fields(fields);
        for record in records {
            if !store.issued_ids.insert(record.id().to_string()) {
                return Err(GridError::DuplicateId(record.id().to_string()));
            }
            store.records.push(record);
        }
        debug!(
            "Created store with {} fields and {} records",
            store.fields.len(),
            store.records.len()
        );
        Ok(store)
    }

    /// Store whose field set is inferred from the keys of the first record,
    /// in their order. Every input gets a fresh id unless it carries an `id`
    /// value.
    pub fn from_records(rows: Vec<Fields>) -> Result<Self, GridError> {
        let fields = match rows.first() {
            Some(first) => first
                .iter()
                .map(|(name, value)| Field::new(name.clone(), infer_kind(value)))
                .collect(),
            None => Vec::new(),
        };
        let records = rows
            .into_iter()
            .map(|row| {
                let id = match row.get(ID_FIELD) {
                    Some(v) if !v.is_empty() => v.to_string(),
                    _ => Uuid::new_v4().to_string(),
                };
                Record::new(id, row)
            })
            .collect();
        RowStore::with_records(fields, records)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id() == id)
    }

    fn fresh_id(&mut self) -> RecordId {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.issued_ids.insert(id.clone()) {
                return id;
            }
        }
    }

    pub fn add(&mut self, values: Fields) -> &Record {
        let id = self.fresh_id();
        for name in values.keys() {
            if name != ID_FIELD && !self.fields.iter().any(|f| &f.name == name) {
                debug!("Added record has unknown field {name:?}");
            }
        }
        debug!("Add record {id}");
        self.records.push(Record::new(id, values));
        &self.records[self.records.len() - 1]
    }

    pub fn update(&mut self, id: &str, values: Fields) -> Result<&Record, GridError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| GridError::NotFound(id.to_string()))?;
        debug!("Update record {id}");
        record.replace_values(values);
        Ok(&*record)
    }

    pub fn delete(&mut self, id: &str) -> Result<Record, GridError> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| GridError::NotFound(id.to_string()))?;
        debug!("Delete record {id}");
        Ok(self.records.remove(pos))
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.state.filter_text = text.into();
    }

    pub fn set_sort(&mut self, field: &str) {
        if self.state.sort_field == field {
            self.state.sort_direction = self.state.sort_direction.toggled();
        } else {
            self.state.sort_field = field.to_string();
            self.state.sort_direction = SortDirection::Ascending;
        }
        trace!(
            "Sort by {:?} {:?}",
            self.state.sort_field, self.state.sort_direction
        );
    }

    pub fn set_page(&mut self, index: usize) {
        self.state.page_index = index;
    }

    pub fn set_page_size(&mut self, size: NonZeroUsize) {
        self.state.page_size = size;
        self.state.page_index = 0;
    }

    fn matches(&self, record: &Record, needle: &str) -> bool {
        needle.is_empty()
            || record.id().to_lowercase().contains(needle)
            || self
                .fields
                .iter()
                .filter(|f| f.name != ID_FIELD)
                .any(|f| record.display(&f.name).to_lowercase().contains(needle))
    }

    /// Filtered and sorted records, before pagination.
    fn filtered_sorted(&self) -> Vec<&Record> {
        let needle = self.state.filter_text.to_lowercase();
        let mut rows: Vec<&Record> = self
            .records
            .iter()
            .filter(|r| self.matches(r, &needle))
            .collect();

        let field = self.state.sort_field.as_str();
        let direction = self.state.sort_direction;
        // slice::sort_by is stable, ties keep insertion order
        rows.sort_by(|a, b| {
            let ord = compare_field(a, b, field);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        rows
    }

    pub fn view(&self) -> View<'_> {
        let rows = self.filtered_sorted();
        let total_count = rows.len();
        let size = self.state.page_size.get();
        let begin = self.state.page_index.saturating_mul(size).min(total_count);
        let end = begin.saturating_add(size).min(total_count);
        trace!(
            "View: filter {:?}, {} of {} rows match, page {} [{begin}..{end})",
            self.state.filter_text,
            total_count,
            self.records.len(),
            self.state.page_index
        );
        View {
            rows: rows[begin..end].to_vec(),
            total_count,
        }
    }

    /// Number of pages for the current filtered row count, at least one.
    pub fn page_count(&self) -> usize {
        let total = self.filtered_sorted().len();
        total.div_ceil(self.state.page_size.get()).max(1)
    }

    /// Position of `id` in the filtered and sorted sequence.
    pub fn position_in_view(&self, id: &str) -> Option<usize> {
        self.filtered_sorted().iter().position(|r| r.id() == id)
    }
}

fn compare_field(a: &Record, b: &Record, field: &str) -> Ordering {
    match (a.get_ref(field), b.get_ref(field)) {
        (Some(x), Some(y)) => x.natural_cmp(y),
        _ => a.id().cmp(b.id()),
    }
}

fn infer_kind(value: &Value) -> FieldKind {
    match value {
        Value::Number(_) => FieldKind::Number,
        Value::Date(_) => FieldKind::Date,
        Value::Text(_) | Value::Empty => FieldKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fields;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn people() -> RowStore {
        let rows = vec![
            fields([("id", "1"), ("name", "Carol"), ("country", "Norway")]),
            fields([("id", "2"), ("name", "alice"), ("country", "Chile")]),
            fields([("id", "3"), ("name", "Bob"), ("country", "Norway")]),
            fields([("id", "4"), ("name", "Dave"), ("country", "Chile")]),
            fields([("id", "5"), ("name", "Eve"), ("country", "Norway")]),
        ];
        RowStore::from_records(rows).unwrap()
    }

    fn ids(view: &View) -> Vec<String> {
        view.rows.iter().map(|r| r.id().to_string()).collect()
    }

    fn numbered(n: usize) -> RowStore {
        let rows = (0..n)
            .map(|i| fields([("id", format!("{i:02}")), ("n", i.to_string())]))
            .collect();
        RowStore::from_records(rows).unwrap()
    }

    #[test]
    fn infers_fields_from_first_record() {
        let store = people();
        let names: Vec<&str> = store.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "country"]);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn inferred_fields_keep_first_record_order() {
        let rows = vec![fields([
            ("firstName", "Ada"),
            ("lastName", "Lovelace"),
            ("email", "ada@example.com"),
        ])];
        let store = RowStore::from_records(rows).unwrap();
        let names: Vec<&str> = store.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["firstName", "lastName", "email"]);
    }

    #[test]
    fn initial_view_is_sorted_by_id_ascending() {
        let rows = ["03", "02", "01"]
            .into_iter()
            .map(|id| fields([("id", id)]))
            .collect();
        let mut store = RowStore::from_records(rows).unwrap();
        assert_eq!(store.view_state().sort_field, "id");
        assert_eq!(ids(&store.view()), vec!["01", "02", "03"]);

        store.set_sort("id");
        assert_eq!(store.view_state().sort_direction, SortDirection::Descending);
        assert_eq!(ids(&store.view()), vec!["03", "02", "01"]);
    }

    #[test]
    fn filter_matches_id_outside_declared_fields() {
        let mut store = RowStore::with_fields(vec![Field::text("name")]);
        let id = store.add(fields([("name", "Ada")])).id().to_string();
        store.add(fields([("name", "Bob")]));
        store.set_filter(&id[..8]);
        assert_eq!(ids(&store.view()), vec![id]);
    }

    #[test]
    fn empty_filter_matches_everything() {
        let store = people();
        let view = store.view();
        assert_eq!(view.total_count, 5);
        assert_eq!(ids(&view), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let mut store = people();
        store.set_filter("NOR");
        let view = store.view();
        assert_eq!(ids(&view), vec!["1", "3", "5"]);
        assert_eq!(view.total_count, 3);

        store.set_filter("Al");
        assert_eq!(ids(&store.view()), vec!["2"]);

        store.set_filter("zzz");
        let view = store.view();
        assert!(view.rows.is_empty());
        assert_eq!(view.total_count, 0);
    }

    #[test]
    fn filter_matches_id_and_numbers() {
        let mut store = RowStore::with_fields(vec![
            Field::text("id"),
            Field::new("age", FieldKind::Number),
        ]);
        let id = store.add(fields([("age", 30.5)])).id().to_string();
        store.add(fields([("age", 41.0)]));

        store.set_filter("30.5");
        assert_eq!(ids(&store.view()), vec![id.clone()]);

        store.set_filter(&id[..8].to_uppercase());
        assert_eq!(ids(&store.view()), vec![id]);
    }

    #[test]
    fn filter_ignores_fields_outside_the_field_set() {
        let mut store = RowStore::with_fields(vec![Field::text("name")]);
        store.add(fields([("name", "Ada"), ("secret", "needle")]));
        store.set_filter("needle");
        assert_eq!(store.view().total_count, 0);
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let mut store = people();
        store.set_sort("country");
        assert_eq!(ids(&store.view()), vec!["2", "4", "1", "3", "5"]);

        store.set_sort("country");
        assert_eq!(store.view_state().sort_direction, SortDirection::Descending);
        assert_eq!(ids(&store.view()), vec!["1", "3", "5", "2", "4"]);
    }

    #[test]
    fn sort_toggle_twice_returns_to_ascending() {
        let mut store = people();
        store.set_sort("name");
        let first = ids(&store.view());
        store.set_sort("name");
        store.set_sort("name");
        assert_eq!(store.view_state().sort_direction, SortDirection::Ascending);
        assert_eq!(ids(&store.view()), first);
        // lexicographic: upper case sorts before lower case
        assert_eq!(first, vec!["3", "1", "4", "5", "2"]);
    }

    #[test]
    fn sorting_another_field_resets_direction() {
        let mut store = people();
        store.set_sort("name");
        store.set_sort("name");
        store.set_sort("country");
        assert_eq!(store.view_state().sort_field, "country");
        assert_eq!(store.view_state().sort_direction, SortDirection::Ascending);
    }

    #[test]
    fn numbers_sort_numerically() {
        let mut store = RowStore::with_fields(vec![Field::new("age", FieldKind::Number)]);
        for age in [9.0, 100.0, 10.0, 9.5] {
            store.add(fields([("age", age)]));
        }
        store.set_sort("age");
        let ages: Vec<Value> = store.view().rows.iter().map(|r| r.get("age")).collect();
        assert_eq!(
            ages,
            vec![
                Value::Number(9.0),
                Value::Number(9.5),
                Value::Number(10.0),
                Value::Number(100.0)
            ]
        );
    }

    #[test]
    fn missing_values_sort_first() {
        let mut store = RowStore::with_fields(vec![Field::text("name")]);
        let a = store.add(fields([("name", "b")])).id().to_string();
        let b = store.add(Fields::new()).id().to_string();
        store.set_sort("name");
        assert_eq!(ids(&store.view()), vec![b, a]);
    }

    #[test]
    fn dates_sort_chronologically() {
        let dobs = [
            "1990-01-15",
            "1985-07-20",
            "2001-03-02",
            "1985-01-31",
            "1999-12-24",
        ];
        let rows = dobs
            .iter()
            .enumerate()
            .map(|(i, d)| fields([("id", i.to_string()), ("dob", d.to_string())]))
            .collect();
        let mut store = RowStore::from_records(rows).unwrap();
        store.set_sort("dob");
        let sorted: Vec<String> = store.view().rows.iter().map(|r| r.display("dob")).collect();
        assert_eq!(
            sorted,
            vec![
                "1985-01-31",
                "1985-07-20",
                "1990-01-15",
                "1999-12-24",
                "2001-03-02"
            ]
        );
        // The DD-MM-YYYY display form would have put 02-03-2001 first.
        let shown: Vec<String> = store
            .view()
            .rows
            .iter()
            .map(|r| crate::dates::format_date(&r.display("dob")).into_owned())
            .collect();
        assert_eq!(shown[0], "31-01-1985");
    }

    #[test]
    fn date_values_sort_chronologically() {
        let mut store = RowStore::with_fields(vec![Field::new("dob", FieldKind::Date)]);
        for (y, m, d) in [(1990, 1, 15), (1985, 7, 20), (1985, 1, 31)] {
            store.add(fields([("dob", NaiveDate::from_ymd_opt(y, m, d).unwrap())]));
        }
        store.set_sort("dob");
        store.set_sort("dob");
        let sorted: Vec<String> = store.view().rows.iter().map(|r| r.display("dob")).collect();
        assert_eq!(sorted, vec!["1990-01-15", "1985-07-20", "1985-01-31"]);
    }

    #[test]
    fn pagination_slices_and_clamps() {
        let mut store = numbered(7);
        store.set_page_size(NonZeroUsize::new(3).unwrap());

        store.set_page(0);
        assert_eq!(ids(&store.view()), vec!["00", "01", "02"]);
        store.set_page(1);
        assert_eq!(ids(&store.view()), vec!["03", "04", "05"]);
        store.set_page(2);
        assert_eq!(ids(&store.view()), vec!["06"]);
        store.set_page(3);
        let view = store.view();
        assert!(view.rows.is_empty());
        assert_eq!(view.total_count, 7);

        store.set_page(usize::MAX);
        assert!(store.view().rows.is_empty());
        assert_eq!(store.page_count(), 3);
    }

    #[test]
    fn page_size_change_resets_page() {
        let mut store = numbered(30);
        store.set_page(2);
        store.set_page_size(NonZeroUsize::new(25).unwrap());
        assert_eq!(store.view_state().page_index, 0);
        assert_eq!(store.view().rows.len(), 25);
    }

    #[test]
    fn filter_keeps_page_index() {
        let mut store = numbered(30);
        store.set_page_size(NonZeroUsize::new(3).unwrap());
        store.set_page(1);
        store.set_filter("1");
        assert_eq!(store.view_state().page_index, 1);
        // 01, 10..19 and 21 match; page 1 holds the 4th to 6th of them
        assert_eq!(store.view().total_count, 12);
        assert_eq!(ids(&store.view()), vec!["12", "13", "14"]);
    }

    #[test]
    fn page_count_is_at_least_one() {
        let store = RowStore::with_fields(vec![Field::text("name")]);
        assert_eq!(store.page_count(), 1);
        assert_eq!(numbered(10).page_count(), 1);
        assert_eq!(numbered(11).page_count(), 2);
    }

    #[test]
    fn add_appends_with_fresh_id() {
        let mut store = people();
        let added = store.add(fields([("id", "1"), ("name", "Frank")])).clone();
        assert_ne!(added.id(), "1");
        assert_eq!(added.display("name"), "Frank");
        assert_eq!(store.len(), 6);
        assert_eq!(store.records.last(), Some(&added));
        assert_eq!(store.view().total_count, 6);
    }

    #[test]
    fn add_then_update_keeps_id_and_position() {
        let mut store = people();
        let id = store.add(fields([("name", "Frank")])).id().to_string();
        let updated = store
            .update(&id, fields([("id", "hijack"), ("name", "Grace"), ("country", "Peru")]))
            .unwrap()
            .clone();
        assert_eq!(updated.id(), id);
        assert_eq!(updated.display("name"), "Grace");
        assert_eq!(updated.display("country"), "Peru");
        assert_eq!(store.get(&id), Some(&updated));
        assert!(store.get("hijack").is_none());
        assert_eq!(store.records.iter().position(|r| r.id() == id), Some(5));
        store.set_sort("name");
        assert_eq!(store.position_in_view(&id), Some(4));
    }

    #[test]
    fn update_replaces_values_exactly() {
        let mut store = people();
        store.update("3", fields([("name", "Bobby")])).unwrap();
        let record = store.get("3").unwrap();
        assert_eq!(record.display("name"), "Bobby");
        assert_eq!(record.get("country"), Value::Empty);
        assert_eq!(store.position_in_view("3"), Some(2));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut store = people();
        let err = store.update("nope", Fields::new()).unwrap_err();
        assert!(matches!(err, GridError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn delete_twice_is_not_found() {
        let mut store = people();
        let removed = store.delete("2").unwrap();
        assert_eq!(removed.display("name"), "alice");
        assert_eq!(ids(&store.view()), vec!["1", "3", "4", "5"]);
        assert!(matches!(store.delete("2"), Err(GridError::NotFound(_))));
        assert!(matches!(store.update("2", Fields::new()), Err(GridError::NotFound(_))));
    }

    #[test]
    fn deleted_ids_are_never_reissued() {
        let mut store = RowStore::with_fields(vec![Field::text("name")]);
        let first = store.add(Fields::new()).id().to_string();
        store.delete(&first).unwrap();
        assert!(store.issued_ids.contains(&first));
        let second = store.add(Fields::new()).id().to_string();
        assert_ne!(first, second);
    }

    #[test]
    fn duplicate_initial_ids_are_rejected() {
        let rows = vec![fields([("id", "1")]), fields([("id", "1")])];
        assert!(matches!(
            RowStore::from_records(rows),
            Err(GridError::DuplicateId(id)) if id == "1"
        ));
    }

    #[test]
    fn rows_without_id_get_generated_ids() {
        let rows = vec![fields([("name", "a")]), fields([("name", "b")])];
        let store = RowStore::from_records(rows).unwrap();
        let view = store.view();
        assert_eq!(view.total_count, 2);
        assert_ne!(view.rows[0].id(), view.rows[1].id());
        assert!(Uuid::parse_str(view.rows[0].id()).is_ok());
    }
}
