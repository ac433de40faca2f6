//! XML serialization for tables
//!
//! Writes a table as a single self-describing document: column
//! declarations first, then the records, so the reader reconstructs typed
//! columns from the document alone.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <table id="trips" description="observed trips">
//!   <columns>
//!     <column nr="0" id="start" description="interval start" type="float"/>
//!   </columns>
//!   <records>
//!     <record>
//!       <value nr="0">0.5</value>
//!       <value nr="1" null="true"/>
//!     </record>
//!   </records>
//! </table>
//! ```
//!
//! The reader is a small pull parser for exactly this document shape; the
//! five XML character entities are escaped on write and resolved on read.

use std::io::{Read, Write};

use super::{Column, DataType, Table, TableError, Value};

/// Write a table as an XML document
pub fn write_xml<W: Write>(table: &Table, mut w: W) -> Result<(), TableError> {
    writeln!(w, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(
        w,
        "<table id=\"{}\" description=\"{}\">",
        escape(table.id()),
        escape(table.description())
    )?;

    writeln!(w, "  <columns>")?;
    for (nr, column) in table.columns().iter().enumerate() {
        writeln!(
            w,
            "    <column nr=\"{}\" id=\"{}\" description=\"{}\" type=\"{}\"/>",
            nr,
            escape(column.id()),
            escape(column.description()),
            column.data_type().name()
        )?;
    }
    writeln!(w, "  </columns>")?;

    writeln!(w, "  <records>")?;
    for record in table.records() {
        writeln!(w, "    <record>")?;
        for (nr, cell) in record.cells().iter().enumerate() {
            match cell.to_token() {
                None => writeln!(w, "      <value nr=\"{}\" null=\"true\"/>", nr)?,
                Some(token) => writeln!(
                    w,
                    "      <value nr=\"{}\">{}</value>",
                    nr,
                    escape(&token)
                )?,
            }
        }
        writeln!(w, "    </record>")?;
    }
    writeln!(w, "  </records>")?;
    writeln!(w, "</table>")?;

    Ok(())
}

/// Read a table from an XML document produced by [`write_xml`]
pub fn read_xml<R: Read>(mut r: R) -> Result<Table, TableError> {
    let mut text = String::new();
    r.read_to_string(&mut text)?;

    let mut scanner = Scanner::new(&text);

    let mut tag = scanner.next_tag()?;
    if tag.declaration {
        tag = scanner.next_tag()?;
    }
    tag.expect_open("table", &scanner)?;
    let table_id = tag.attr("id").unwrap_or("").to_string();
    let table_description = tag.attr("description").unwrap_or("").to_string();

    scanner.next_tag()?.expect_open("columns", &scanner)?;
    let mut columns = Vec::new();
    loop {
        let tag = scanner.next_tag()?;
        if tag.is_close("columns") {
            break;
        }
        tag.expect_open("column", &scanner)?;
        if !tag.self_closing {
            return Err(scanner.error("column declarations must be self-closing"));
        }
        check_nr(&tag, columns.len(), &scanner)?;
        let data_type = tag
            .attr("type")
            .and_then(DataType::from_name)
            .ok_or_else(|| scanner.error("column is missing a valid type attribute"))?;
        columns.push(Column::new(
            tag.attr("id").unwrap_or("").to_string(),
            tag.attr("description").unwrap_or("").to_string(),
            data_type,
        ));
    }

    let mut table = Table::new(table_id, table_description, columns)?;

    scanner.next_tag()?.expect_open("records", &scanner)?;
    loop {
        let tag = scanner.next_tag()?;
        if tag.is_close("records") {
            break;
        }
        tag.expect_open("record", &scanner)?;
        if tag.self_closing {
            return Err(scanner.error("record element must contain its values"));
        }

        let mut cells = Vec::with_capacity(table.num_columns());
        loop {
            let tag = scanner.next_tag()?;
            if tag.is_close("record") {
                break;
            }
            tag.expect_open("value", &scanner)?;
            check_nr(&tag, cells.len(), &scanner)?;

            let column_type = table
                .column(cells.len())
                .ok_or_else(|| scanner.error("record has more values than columns"))?
                .data_type();

            if tag.self_closing {
                if tag.attr("null") == Some("true") {
                    cells.push(Value::Null);
                } else {
                    cells.push(
                        Value::from_token(column_type, "")
                            .map_err(|m| scanner.error(&m))?,
                    );
                }
            } else {
                let token = scanner.take_text()?;
                scanner.next_tag()?.expect_close("value", &scanner)?;
                cells.push(
                    Value::from_token(column_type, &token).map_err(|m| scanner.error(&m))?,
                );
            }
        }
        table.append(cells)?;
    }

    scanner.next_tag()?.expect_close("table", &scanner)?;

    Ok(table)
}

fn check_nr(tag: &Tag, expected: usize, scanner: &Scanner<'_>) -> Result<(), TableError> {
    let nr = tag
        .attr("nr")
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| scanner.error("missing or invalid nr attribute"))?;
    if nr != expected {
        return Err(scanner.error(&format!("nr {} out of order, expected {}", nr, expected)));
    }
    Ok(())
}

/// One parsed tag
#[derive(Debug)]
struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
    closing: bool,
    self_closing: bool,
    declaration: bool,
}

impl Tag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn is_close(&self, name: &str) -> bool {
        self.closing && self.name == name
    }

    fn expect_open(&self, name: &str, scanner: &Scanner<'_>) -> Result<(), TableError> {
        if self.closing || self.name != name {
            return Err(scanner.error(&format!("expected <{}>, found <{}{}>", name,
                if self.closing { "/" } else { "" }, self.name)));
        }
        Ok(())
    }

    fn expect_close(&self, name: &str, scanner: &Scanner<'_>) -> Result<(), TableError> {
        if !self.is_close(name) {
            return Err(scanner.error(&format!("expected </{}>, found <{}{}>", name,
                if self.closing { "/" } else { "" }, self.name)));
        }
        Ok(())
    }
}

/// Character scanner over the document, tracking the current line
struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
        }
    }

    fn error(&self, message: &str) -> TableError {
        TableError::Parse {
            line: self.line,
            message: message.to_string(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Scan the next tag, skipping whitespace before it
    fn next_tag(&mut self) -> Result<Tag, TableError> {
        self.skip_whitespace();
        match self.bump() {
            Some('<') => {}
            Some(c) => return Err(self.error(&format!("expected a tag, found {:?}", c))),
            None => return Err(self.error("unexpected end of document")),
        }

        // <?xml ...?> prolog
        if self.chars.peek() == Some(&'?') {
            loop {
                match self.bump() {
                    Some('>') => {
                        return Ok(Tag {
                            name: String::new(),
                            attrs: Vec::new(),
                            closing: false,
                            self_closing: false,
                            declaration: true,
                        })
                    }
                    Some(_) => {}
                    None => return Err(self.error("unterminated declaration")),
                }
            }
        }

        let closing = if self.chars.peek() == Some(&'/') {
            self.bump();
            true
        } else {
            false
        };

        let name = self.take_name()?;
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('/') => {
                    self.bump();
                    if self.bump() != Some('>') {
                        return Err(self.error("expected > after /"));
                    }
                    self_closing = true;
                    break;
                }
                Some(_) => {
                    let attr_name = self.take_name()?;
                    if self.bump() != Some('=') {
                        return Err(self.error("expected = in attribute"));
                    }
                    if self.bump() != Some('"') {
                        return Err(self.error("expected quoted attribute value"));
                    }
                    let mut raw = String::new();
                    loop {
                        match self.bump() {
                            Some('"') => break,
                            Some(c) => raw.push(c),
                            None => return Err(self.error("unterminated attribute value")),
                        }
                    }
                    let value = unescape(&raw).map_err(|m| self.error(&m))?;
                    attrs.push((attr_name, value));
                }
                None => return Err(self.error("unterminated tag")),
            }
        }

        Ok(Tag {
            name,
            attrs,
            closing,
            self_closing,
            declaration: false,
        })
    }

    fn take_name(&mut self) -> Result<String, TableError> {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                break;
            }
            self.bump();
            name.push(c);
        }
        if name.is_empty() {
            return Err(self.error("expected a name"));
        }
        Ok(name)
    }

    /// Take element text up to the next tag, resolving entities.
    ///
    /// The text is preserved exactly; the writer emits no padding inside
    /// value elements.
    fn take_text(&mut self) -> Result<String, TableError> {
        let mut raw = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '<' {
                break;
            }
            self.bump();
            raw.push(c);
        }
        unescape(&raw).map_err(|m| self.error(&m))
    }
}

/// Escape the five XML character entities
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Resolve the five XML character entities
fn unescape(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        let mut entity = String::new();
        loop {
            match chars.next() {
                Some(';') => break,
                Some(c) if entity.len() < 8 => entity.push(c),
                _ => return Err(format!("malformed entity near {:?}", entity)),
            }
        }
        match entity.as_str() {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => return Err(format!("unknown entity &{};", entity)),
        }
    }
    Ok(out)
}
