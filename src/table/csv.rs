//! CSV serialization for tables
//!
//! Writes a table as two streams: the data stream is plain CSV (a header
//! row of column ids, then one row per record), and the metadata stream is
//! a small CSV describing the table and its columns, so the reader can
//! reconstruct typed columns without guessing.
//!
//! Quoting follows the common convention: fields containing a comma,
//! quote, or line break are quoted, with embedded quotes doubled. A null
//! cell is an empty unquoted field; an empty text cell is a quoted empty
//! field, so the two round-trip distinctly.

use std::io::{Read, Write};

use super::{Column, DataType, Table, TableError, Value};

/// Header of the metadata stream
const META_HEADER: [&str; 4] = ["field", "id", "description", "type"];

/// Write a table as CSV data plus CSV metadata
pub fn write_csv<W: Write, M: Write>(
    table: &Table,
    mut data: W,
    mut meta: M,
) -> Result<(), TableError> {
    // Metadata: table row, then one row per column
    write_row(&mut meta, META_HEADER.into_iter().map(escape))?;
    write_row(
        &mut meta,
        ["table", table.id(), table.description(), ""]
            .into_iter()
            .map(escape),
    )?;
    for column in table.columns() {
        write_row(
            &mut meta,
            ["column", column.id(), column.description(), column.data_type().name()]
                .into_iter()
                .map(escape),
        )?;
    }

    // Data: header row of column ids, then the records
    write_row(&mut data, table.columns().iter().map(|c| escape(c.id())))?;
    for record in table.records() {
        write_row(&mut data, record.cells().iter().map(encode_cell))?;
    }

    Ok(())
}

/// Read a table from CSV data plus CSV metadata
pub fn read_csv<R: Read, M: Read>(mut data: R, mut meta: M) -> Result<Table, TableError> {
    let mut meta_text = String::new();
    meta.read_to_string(&mut meta_text)?;
    let mut data_text = String::new();
    data.read_to_string(&mut data_text)?;

    let mut table = parse_meta(&meta_text)?;
    parse_data(&data_text, &mut table)?;
    Ok(table)
}

fn parse_meta(input: &str) -> Result<Table, TableError> {
    let rows = parse_rows(input)?;
    let mut rows = rows.into_iter();

    let (line, header) = rows
        .next()
        .ok_or_else(|| parse_error(1, "metadata is empty"))?;
    if header.len() != META_HEADER.len()
        || header.iter().zip(META_HEADER).any(|(f, h)| f.text != h)
    {
        return Err(parse_error(line, "metadata header must be field,id,description,type"));
    }

    let (line, table_row) = rows
        .next()
        .ok_or_else(|| parse_error(line, "metadata has no table row"))?;
    if table_row.len() != 4 || table_row[0].text != "table" {
        return Err(parse_error(line, "expected a table row"));
    }

    let mut columns = Vec::new();
    for (line, row) in rows {
        if row.len() != 4 || row[0].text != "column" {
            return Err(parse_error(line, "expected a column row"));
        }
        let data_type = DataType::from_name(&row[3].text)
            .ok_or_else(|| parse_error(line, &format!("unknown column type {:?}", row[3].text)))?;
        columns.push(Column::new(
            row[1].text.clone(),
            row[2].text.clone(),
            data_type,
        ));
    }

    Table::new(table_row[1].text.clone(), table_row[2].text.clone(), columns)
}

fn parse_data(input: &str, table: &mut Table) -> Result<(), TableError> {
    let rows = parse_rows(input)?;
    let mut rows = rows.into_iter();

    let (line, header) = rows
        .next()
        .ok_or_else(|| parse_error(1, "data is empty"))?;
    if header.len() != table.num_columns()
        || header
            .iter()
            .zip(table.columns())
            .any(|(f, c)| f.text != c.id())
    {
        return Err(parse_error(line, "data header does not match the column ids"));
    }

    for (line, row) in rows {
        if row.len() != table.num_columns() {
            return Err(parse_error(
                line,
                &format!(
                    "record has {} cells, table has {} columns",
                    row.len(),
                    table.num_columns()
                ),
            ));
        }
        let mut cells = Vec::with_capacity(row.len());
        for (field, column) in row.iter().zip(table.columns()) {
            cells.push(decode_cell(field, column.data_type()).map_err(|m| parse_error(line, &m))?);
        }
        table.append(cells)?;
    }

    Ok(())
}

fn parse_error(line: usize, message: &str) -> TableError {
    TableError::Parse {
        line,
        message: message.to_string(),
    }
}

/// One parsed CSV field; quoting is remembered to distinguish an empty
/// text cell (quoted) from a null cell (unquoted)
#[derive(Debug)]
struct Field {
    text: String,
    quoted: bool,
}

/// Parse CSV rows, keeping the line number each row starts on
fn parse_rows(input: &str) -> Result<Vec<(usize, Vec<Field>)>, TableError> {
    let mut rows = Vec::new();
    let mut row: Vec<Field> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;

    let mut line = 1usize;
    let mut row_line = 1usize;

    let mut chars = input.chars().peekable();
    // True between a closing quote and the next separator
    let mut after_quote = false;
    // True while inside a quoted field
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                        after_quote = true;
                    }
                }
                '\n' => {
                    field.push(c);
                    line += 1;
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !after_quote => {
                in_quotes = true;
                quoted = true;
            }
            '"' => {
                return Err(parse_error(line, "unexpected quote inside unquoted field"));
            }
            ',' => {
                row.push(Field {
                    text: std::mem::take(&mut field),
                    quoted,
                });
                quoted = false;
                after_quote = false;
            }
            '\r' => {
                // Part of a CRLF line break; bare CR is folded the same way
                if chars.peek() == Some(&'\n') {
                    continue;
                }
                end_line(&mut rows, &mut row, &mut field, &mut quoted, row_line);
                after_quote = false;
                line += 1;
                row_line = line;
            }
            '\n' => {
                end_line(&mut rows, &mut row, &mut field, &mut quoted, row_line);
                after_quote = false;
                line += 1;
                row_line = line;
            }
            _ if after_quote => {
                return Err(parse_error(line, "unexpected character after closing quote"));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(parse_error(line, "unterminated quoted field"));
    }
    // Final row without trailing newline
    if !row.is_empty() || !field.is_empty() || quoted {
        row.push(Field { text: field, quoted });
        rows.push((row_line, row));
    }

    Ok(rows)
}

fn end_line(
    rows: &mut Vec<(usize, Vec<Field>)>,
    row: &mut Vec<Field>,
    field: &mut String,
    quoted: &mut bool,
    row_line: usize,
) {
    row.push(Field {
        text: std::mem::take(field),
        quoted: *quoted,
    });
    *quoted = false;
    rows.push((row_line, std::mem::take(row)));
}

fn write_row<W: Write>(
    w: &mut W,
    fields: impl Iterator<Item = String>,
) -> Result<(), TableError> {
    let joined: Vec<String> = fields.collect();
    writeln!(w, "{}", joined.join(","))?;
    Ok(())
}

/// Quote a field if it contains a separator, quote, or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn encode_cell(value: &Value) -> String {
    match value.to_token() {
        None => String::new(),
        Some(token) if token.is_empty() => "\"\"".to_string(),
        Some(token) => escape(&token),
    }
}

fn decode_cell(field: &Field, data_type: DataType) -> Result<Value, String> {
    if !field.quoted && field.text.is_empty() {
        return Ok(Value::Null);
    }
    Value::from_token(data_type, &field.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, DataType, Table, Value};

    fn sample_table() -> Table {
        let mut table = Table::new(
            "trips",
            "observed trips",
            vec![
                Column::new("start", "interval start", DataType::Float),
                Column::new("count", "trips in interval", DataType::Int),
                Column::new("label", "free text", DataType::Text),
                Column::new("valid", "validated", DataType::Bool),
            ],
        )
        .unwrap();

        table
            .append(vec![
                Value::Float(0.5),
                Value::Int(12),
                Value::Text("morning, early".into()),
                Value::Bool(true),
            ])
            .unwrap();
        table
            .append(vec![
                Value::Float(f64::INFINITY),
                Value::Null,
                Value::Text(String::new()),
                Value::Null,
            ])
            .unwrap();
        table
            .append(vec![
                Value::Float(-1.25),
                Value::Int(-3),
                Value::Text("say \"hi\"\nnext line".into()),
                Value::Bool(false),
            ])
            .unwrap();
        table
    }

    fn roundtrip(table: &Table) -> Table {
        let mut data = Vec::new();
        let mut meta = Vec::new();
        write_csv(table, &mut data, &mut meta).unwrap();
        read_csv(data.as_slice(), meta.as_slice()).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let table = sample_table();
        let back = roundtrip(&table);
        assert_eq!(back, table);
    }

    #[test]
    fn test_roundtrip_empty_table() {
        let table = Table::new(
            "empty",
            "",
            vec![Column::new("x", "", DataType::Int)],
        )
        .unwrap();
        let back = roundtrip(&table);
        assert_eq!(back, table);
        assert!(back.is_empty());
    }

    #[test]
    fn test_null_vs_empty_text() {
        let back = roundtrip(&sample_table());
        let record = back.record(1).unwrap();
        assert!(record.by_id("count").unwrap().is_null());
        assert_eq!(record.by_id("label").unwrap().as_text(), Some(""));
    }

    #[test]
    fn test_nan_roundtrip() {
        let mut table = Table::new(
            "t",
            "",
            vec![Column::new("x", "", DataType::Float)],
        )
        .unwrap();
        table.append(vec![Value::Float(f64::NAN)]).unwrap();

        let back = roundtrip(&table);
        match back.record(0).unwrap().value(0).unwrap() {
            Value::Float(v) => assert!(v.is_nan()),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_quoting_in_output() {
        let mut data = Vec::new();
        let mut meta = Vec::new();
        write_csv(&sample_table(), &mut data, &mut meta).unwrap();
        let text = String::from_utf8(data).unwrap();

        assert!(text.contains("\"morning, early\""));
        assert!(text.contains("\"say \"\"hi\"\"\nnext line\""));
        assert!(text.starts_with("start,count,label,valid\n"));
    }

    #[test]
    fn test_metadata_describes_columns() {
        let back = roundtrip(&sample_table());
        assert_eq!(back.id(), "trips");
        assert_eq!(back.description(), "observed trips");
        assert_eq!(back.column(0).unwrap().description(), "interval start");
        assert_eq!(back.column(1).unwrap().data_type(), DataType::Int);
    }

    #[test]
    fn test_header_mismatch_rejected() {
        let mut data = Vec::new();
        let mut meta = Vec::new();
        write_csv(&sample_table(), &mut data, &mut meta).unwrap();

        let wrong = "a,b,c,d\n1.0,2,x,true\n";
        let err = read_csv(wrong.as_bytes(), meta.as_slice()).unwrap_err();
        assert!(matches!(err, TableError::Parse { line: 1, .. }), "{:?}", err);
    }

    #[test]
    fn test_bad_cell_reports_line() {
        let mut data = Vec::new();
        let mut meta = Vec::new();
        write_csv(&sample_table(), &mut data, &mut meta).unwrap();

        let bad = "start,count,label,valid\n0.5,twelve,x,true\n";
        let err = read_csv(bad.as_bytes(), meta.as_slice()).unwrap_err();
        match err {
            TableError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("twelve"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_quote_rejected() {
        let mut data = Vec::new();
        let mut meta = Vec::new();
        write_csv(&sample_table(), &mut data, &mut meta).unwrap();

        let bad = "start,count,label,valid\n0.5,1,\"oops,true\n";
        let err = read_csv(bad.as_bytes(), meta.as_slice()).unwrap_err();
        assert!(matches!(err, TableError::Parse { .. }));
    }

    #[test]
    fn test_bad_metadata_rejected() {
        let err = read_csv("x\n".as_bytes(), "not,a,meta,header\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::Parse { line: 1, .. }));
    }
}
