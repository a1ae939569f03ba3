use eventsink_common::{cell_for, Cell, FieldMap, Header, Row};

/// Project an event onto a header: one cell per column, in column order.
/// Columns the event lacks get [`Cell::Empty`]; keys the header lacks are dropped.
pub fn project(header: &Header, fields: &FieldMap) -> Row {
    header
        .iter()
        .map(|column| fields.get(column).map_or(Cell::Empty, cell_for))
        .collect()
}
