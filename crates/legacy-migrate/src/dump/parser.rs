//! MySQL dump tokenizer.
//!
//! Splits dump text into statements and extracts the value tuples of
//! `INSERT`/`REPLACE` statements. A malformed statement is logged and
//! skipped; it never aborts the parse.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::{DumpValue, ParsedDump, RawDumpStatement, SkippedStatement};

/// Iterator over the statements of a dump.
///
/// Statement terminators inside quoted strings, quoted identifiers and
/// comments are ignored. `DELIMITER` directives are honored.
pub struct StatementSplitter<'a> {
    src: &'a str,
    pos: usize,
    delimiter: String,
}

impl<'a> StatementSplitter<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            delimiter: ";".to_string(),
        }
    }

    fn skip_blank(&mut self) {
        let bytes = self.src.as_bytes();
        loop {
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            match comment_end(bytes, self.pos) {
                Some(end) => self.pos = end,
                None => return,
            }
        }
    }

    /// Consume a `DELIMITER xx` line at the current position, if any.
    fn take_delimiter_directive(&mut self) -> bool {
        let rest = &self.src[self.pos..];
        if rest.len() < 10 || !rest.as_bytes()[..9].eq_ignore_ascii_case(b"DELIMITER") {
            return false;
        }
        if !rest.as_bytes()[9].is_ascii_whitespace() {
            return false;
        }
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let delim = rest[9..line_end].trim();
        if !delim.is_empty() {
            self.delimiter = delim.to_string();
        }
        self.pos += line_end;
        true
    }
}

impl<'a> Iterator for StatementSplitter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.src.as_bytes();
        loop {
            self.skip_blank();
            if self.pos >= bytes.len() {
                return None;
            }
            if self.take_delimiter_directive() {
                continue;
            }

            let start = self.pos;
            let delim = self.delimiter.as_bytes();
            let mut end = None;
            while self.pos < bytes.len() {
                let b = bytes[self.pos];
                if b == b'\'' || b == b'"' || b == b'`' {
                    self.pos = quoted_end(bytes, self.pos);
                } else if let Some(comment) = comment_end(bytes, self.pos) {
                    self.pos = comment;
                } else if bytes[self.pos..].starts_with(delim) {
                    end = Some(self.pos);
                    self.pos += delim.len();
                    break;
                } else {
                    self.pos += 1;
                }
            }

            let stmt = self.src[start..end.unwrap_or(bytes.len())].trim();
            if !stmt.is_empty() {
                return Some(stmt);
            }
        }
    }
}

/// End offset of a comment starting at `pos`, if one starts there.
fn comment_end(bytes: &[u8], pos: usize) -> Option<usize> {
    let rest = &bytes[pos.min(bytes.len())..];
    let to_eol = |from: usize| {
        bytes[from..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| from + p + 1)
            .unwrap_or(bytes.len())
    };

    if rest.starts_with(b"--")
        && rest.get(2).map_or(true, |b| b.is_ascii_whitespace())
    {
        return Some(to_eol(pos));
    }
    if rest.starts_with(b"#") {
        return Some(to_eol(pos));
    }
    if rest.starts_with(b"/*") {
        return Some(
            bytes[pos + 2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map(|p| pos + 2 + p + 2)
                .unwrap_or(bytes.len()),
        );
    }
    None
}

/// Offset just past the closing quote of the quoted run starting at `pos`.
fn quoted_end(bytes: &[u8], pos: usize) -> usize {
    let quote = bytes[pos];
    let mut i = pos + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && quote != b'`' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Parse the dump, keeping only rows of `required` tables (all tables when `None`).
pub fn parse_dump(text: &str, required: Option<&HashSet<&str>>) -> ParsedDump {
    let wanted = |table: &str| required.map_or(true, |set| set.contains(table));

    let mut parsed = ParsedDump::default();
    let mut schemas: HashMap<String, Vec<String>> = HashMap::new();

    for stmt in StatementSplitter::new(text) {
        parsed.statements_seen += 1;

        let mut cursor = Cursor::new(stmt);
        cursor.skip_ws();
        if cursor.eat_keyword("CREATE") {
            if let Some((table, columns)) = parse_create_table(&mut cursor) {
                if wanted(&table) {
                    debug!("Captured {} columns for {}", columns.len(), table);
                    schemas.insert(table, columns);
                }
            }
            continue;
        }
        if !(cursor.eat_keyword("INSERT") || cursor.eat_keyword("REPLACE")) {
            continue;
        }

        let table = match insert_target(&mut cursor) {
            Ok(table) => table,
            Err(reason) => {
                warn!("Skipping malformed INSERT: {}", reason);
                parsed.skipped.push(SkippedStatement {
                    table: None,
                    reason,
                });
                continue;
            }
        };
        if !wanted(&table) {
            continue;
        }

        let statement = match insert_body(&mut cursor, table.clone()) {
            Ok(statement) => statement,
            Err(reason) => {
                warn!("Skipping malformed INSERT into {}: {}", table, reason);
                parsed.skipped.push(SkippedStatement {
                    table: Some(table),
                    reason,
                });
                continue;
            }
        };

        let columns = match statement.columns.as_ref().or_else(|| schemas.get(&table)) {
            Some(columns) => columns.clone(),
            None => {
                let reason = "no column list and no preceding CREATE TABLE".to_string();
                warn!("Skipping INSERT into {}: {}", table, reason);
                parsed.skipped.push(SkippedStatement {
                    table: Some(table),
                    reason,
                });
                continue;
            }
        };

        if let Some(bad) = statement.rows.iter().position(|r| r.len() != columns.len()) {
            let reason = format!(
                "tuple {} has {} values, expected {}",
                bad + 1,
                statement.rows[bad].len(),
                columns.len()
            );
            warn!("Skipping malformed INSERT into {}: {}", table, reason);
            parsed.skipped.push(SkippedStatement {
                table: Some(table),
                reason,
            });
            continue;
        }

        parsed.inserts_parsed += 1;
        parsed
            .tables
            .entry(table)
            .or_default()
            .append(&columns, statement.rows);
    }

    debug!(
        "Parsed {} statements: {} inserts, {} skipped",
        parsed.statements_seen,
        parsed.inserts_parsed,
        parsed.skipped.len()
    );
    parsed
}

/// Parse a single `INSERT`/`REPLACE` statement.
pub fn parse_insert(stmt: &str) -> Result<RawDumpStatement, String> {
    let mut cursor = Cursor::new(stmt);
    cursor.skip_ws();
    if !(cursor.eat_keyword("INSERT") || cursor.eat_keyword("REPLACE")) {
        return Err("not an INSERT statement".into());
    }
    let table = insert_target(&mut cursor)?;
    let statement = insert_body(&mut cursor, table)?;
    if let Some(columns) = &statement.columns {
        if let Some(row) = statement.rows.iter().find(|r| r.len() != columns.len()) {
            return Err(format!(
                "tuple has {} values, expected {}",
                row.len(),
                columns.len()
            ));
        }
    }
    Ok(statement)
}

/// Parse modifiers and the table name following `INSERT`.
fn insert_target(cursor: &mut Cursor<'_>) -> Result<String, String> {
    for modifier in ["LOW_PRIORITY", "DELAYED", "HIGH_PRIORITY", "IGNORE"] {
        cursor.skip_ws();
        cursor.eat_keyword(modifier);
    }
    cursor.skip_ws();
    cursor.eat_keyword("INTO");
    cursor.skip_ws();
    cursor.qualified_name()
}

/// Parse the optional column list and the value tuples.
fn insert_body(cursor: &mut Cursor<'_>, table: String) -> Result<RawDumpStatement, String> {
    cursor.skip_ws();
    let columns = if cursor.peek() == Some(b'(') {
        Some(cursor.ident_list()?)
    } else {
        None
    };

    cursor.skip_ws();
    if !(cursor.eat_keyword("VALUES") || cursor.eat_keyword("VALUE")) {
        return Err("expected VALUES".into());
    }

    let mut rows = Vec::new();
    loop {
        cursor.skip_ws();
        rows.push(cursor.tuple()?);
        cursor.skip_ws();
        if cursor.eat(b',') {
            continue;
        }
        break;
    }

    cursor.skip_ws();
    if !cursor.at_end() && !cursor.eat_keyword("ON") && !cursor.eat_keyword("AS") {
        return Err(format!("unexpected input after values at byte {}", cursor.pos));
    }

    Ok(RawDumpStatement {
        table,
        columns,
        rows,
    })
}

/// Column names of a `CREATE TABLE` statement (after the `CREATE` keyword).
fn parse_create_table(cursor: &mut Cursor<'_>) -> Option<(String, Vec<String>)> {
    cursor.skip_ws();
    cursor.eat_keyword("TEMPORARY");
    cursor.skip_ws();
    if !cursor.eat_keyword("TABLE") {
        return None;
    }
    cursor.skip_ws();
    if cursor.eat_keyword("IF") {
        cursor.skip_ws();
        cursor.eat_keyword("NOT");
        cursor.skip_ws();
        cursor.eat_keyword("EXISTS");
        cursor.skip_ws();
    }
    let table = cursor.qualified_name().ok()?;
    cursor.skip_ws();
    if !cursor.eat(b'(') {
        return None;
    }

    const NON_COLUMN: [&str; 9] = [
        "PRIMARY", "KEY", "UNIQUE", "INDEX", "CONSTRAINT", "FOREIGN", "FULLTEXT", "SPATIAL",
        "CHECK",
    ];

    let mut columns = Vec::new();
    loop {
        cursor.skip_ws();
        let quoted = cursor.peek() == Some(b'`');
        let name = cursor.ident().ok()?;
        if quoted || !NON_COLUMN.iter().any(|k| k.eq_ignore_ascii_case(&name)) {
            columns.push(name);
        }
        match cursor.skip_definition() {
            Some(b',') => continue,
            Some(b')') => break,
            _ => return None,
        }
    }
    Some((table, columns))
}

/// Byte cursor over a single statement.
struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8) -> Result<(), String> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(format!("expected '{}' at byte {}", b as char, self.pos))
        }
    }

    fn skip_ws(&mut self) {
        loop {
            while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            match comment_end(self.bytes, self.pos) {
                Some(end) if !self.at_end() => self.pos = end,
                _ => return,
            }
        }
    }

    /// Consume `kw` (case-insensitive) when it is followed by a word boundary.
    fn eat_keyword(&mut self, kw: &str) -> bool {
        let end = self.pos + kw.len();
        if end > self.bytes.len() || !self.bytes[self.pos..end].eq_ignore_ascii_case(kw.as_bytes()) {
            return false;
        }
        if self.bytes.get(end).is_some_and(|&b| is_ident_byte(b)) {
            return false;
        }
        self.pos = end;
        true
    }

    fn ident(&mut self) -> Result<String, String> {
        if self.peek() == Some(b'`') {
            let start = self.pos;
            self.pos = quoted_end(self.bytes, self.pos);
            if self.bytes.get(self.pos - 1) != Some(&b'`') || self.pos - start < 2 {
                return Err("unterminated quoted identifier".into());
            }
            return Ok(self.src[start + 1..self.pos - 1].replace("``", "`"));
        }
        let start = self.pos;
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected identifier at byte {}", self.pos));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    /// `db`.`table` resolves to `table`.
    fn qualified_name(&mut self) -> Result<String, String> {
        let mut name = self.ident()?;
        while self.eat(b'.') {
            name = self.ident()?;
        }
        Ok(name)
    }

    fn ident_list(&mut self) -> Result<Vec<String>, String> {
        self.expect(b'(')?;
        let mut names = Vec::new();
        loop {
            self.skip_ws();
            names.push(self.ident()?);
            self.skip_ws();
            if self.eat(b',') {
                continue;
            }
            self.expect(b')')?;
            return Ok(names);
        }
    }

    fn tuple(&mut self) -> Result<Vec<DumpValue>, String> {
        self.expect(b'(')?;
        let mut values = Vec::new();
        self.skip_ws();
        if self.eat(b')') {
            return Ok(values);
        }
        loop {
            self.skip_ws();
            values.push(self.value()?);
            self.skip_ws();
            if self.eat(b',') {
                continue;
            }
            self.expect(b')')?;
            return Ok(values);
        }
    }

    fn value(&mut self) -> Result<DumpValue, String> {
        match self.peek() {
            None => Err("unexpected end of statement".into()),
            Some(q @ (b'\'' | b'"')) => self.quoted_string(q).map(DumpValue::Text),
            Some(b'0') if matches!(self.peek_at(1), Some(b'x' | b'X')) => self.hex_literal(),
            Some(b'x' | b'X') if self.peek_at(1) == Some(b'\'') => {
                self.pos += 1;
                let hex = self.quoted_string(b'\'')?;
                decode_hex(&hex).map(DumpValue::Text)
            }
            Some(b'b' | b'B') if self.peek_at(1) == Some(b'\'') => {
                self.pos += 1;
                let bits = self.quoted_string(b'\'')?;
                u64::from_str_radix(&bits, 2)
                    .map(|n| DumpValue::Number(n.to_string()))
                    .map_err(|_| format!("invalid bit literal b'{}'", bits))
            }
            Some(b'_') => {
                // Charset introducer: _utf8mb4'...', _binary 0x...
                self.ident()?;
                self.skip_ws();
                self.value()
            }
            Some(b) if b == b'-' || b == b'+' || b == b'.' || b.is_ascii_digit() => self.number(),
            Some(b) if b.is_ascii_alphabetic() => {
                let word = self.ident()?;
                match word.to_ascii_uppercase().as_str() {
                    "NULL" => Ok(DumpValue::Null),
                    "TRUE" => Ok(DumpValue::Number("1".into())),
                    "FALSE" => Ok(DumpValue::Number("0".into())),
                    _ => Err(format!("unsupported literal '{}'", word)),
                }
            }
            Some(b) => Err(format!("unexpected '{}' at byte {}", b as char, self.pos)),
        }
    }

    fn number(&mut self) -> Result<DumpValue, String> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let mut digits = 0;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            digits += 1;
        }
        if self.eat(b'.') {
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return Err(format!("invalid number at byte {}", start));
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            if exp_start == self.pos {
                return Err(format!("invalid exponent at byte {}", start));
            }
        }
        let raw = self.src[start..self.pos].trim_start_matches('+');
        Ok(DumpValue::Number(raw.to_string()))
    }

    fn hex_literal(&mut self) -> Result<DumpValue, String> {
        self.pos += 2;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        decode_hex(&self.src[start..self.pos]).map(DumpValue::Text)
    }

    /// Quoted string with MySQL escapes and doubled quotes resolved.
    fn quoted_string(&mut self, quote: u8) -> Result<String, String> {
        let start = self.pos;
        self.expect(quote)?;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(format!("unterminated string starting at byte {}", start));
            };
            self.pos += 1;
            if b == b'\\' {
                let Some(next) = self.peek() else {
                    return Err(format!("unterminated string starting at byte {}", start));
                };
                self.pos += 1;
                match next {
                    b'0' => out.push(0),
                    b'b' => out.push(0x08),
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'Z' => out.push(0x1a),
                    b'%' | b'_' => {
                        out.push(b'\\');
                        out.push(next);
                    }
                    other => out.push(other),
                }
            } else if b == quote {
                if self.peek() == Some(quote) {
                    self.pos += 1;
                    out.push(quote);
                } else {
                    return Ok(String::from_utf8_lossy(&out).into_owned());
                }
            } else {
                out.push(b);
            }
        }
    }

    /// Skip the rest of a CREATE TABLE definition; returns the `,` or `)`
    /// that ended it.
    fn skip_definition(&mut self) -> Option<u8> {
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'\'' | b'"' | b'`' => {
                    self.pos = quoted_end(self.bytes, self.pos);
                    continue;
                }
                b'(' => depth += 1,
                b')' if depth == 0 => {
                    self.pos += 1;
                    return Some(b')');
                }
                b')' => depth -= 1,
                b',' if depth == 0 => {
                    self.pos += 1;
                    return Some(b',');
                }
                _ => {}
            }
            self.pos += 1;
        }
        None
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn decode_hex(hex: &str) -> Result<String, String> {
    if hex.len() % 2 != 0 {
        return Err(format!("odd-length hex literal '{}'", hex));
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| format!("invalid hex literal '{}'", hex))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
