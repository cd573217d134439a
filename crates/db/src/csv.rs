//! Minimal CSV reading and writing for the sectional transfer format.
//!
//! A sectional file holds several tables. A row whose first cell is
//! `content:<Model>` (remaining cells blank) opens a section, the following
//! row is that section's header and later rows are data.

use std::collections::BTreeMap;

const SECTION_PREFIX: &str = "content:";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("data on line {line} appears before any 'content:<Model>' section marker")]
    RowOutsideSection { line: usize },
}

/// One table of a sectional file. Each row maps header names to cell values;
/// blank header cells are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub model: String,
    pub header: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Split `input` into records of fields. Handles quoted fields, doubled
/// quotes, CRLF line endings and newlines inside quotes. Blank lines yield
/// empty records. Each record carries the line it started on.
pub fn parse_records(input: &str) -> Result<Vec<(usize, Vec<String>)>, CsvError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                finish_record(&mut records, &mut record, &mut field, record_line);
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote { line: quote_line });
    }
    if !field.is_empty() || !record.is_empty() {
        finish_record(&mut records, &mut record, &mut field, record_line);
    }
    Ok(records)
}

fn finish_record(
    records: &mut Vec<(usize, Vec<String>)>,
    record: &mut Vec<String>,
    field: &mut String,
    line: usize,
) {
    if record.is_empty() && field.is_empty() {
        records.push((line, Vec::new()));
        return;
    }
    record.push(std::mem::take(field));
    records.push((line, std::mem::take(record)));
}

/// Group the records of a sectional file into [`Section`]s.
pub fn read_sections(input: &str) -> Result<Vec<Section>, CsvError> {
    let mut sections: Vec<Section> = Vec::new();
    let mut awaiting_header = false;

    for (line, record) in parse_records(input)? {
        if record.is_empty() {
            continue;
        }

        if let Some(model) = section_marker(&record) {
            sections.push(Section {
                model,
                header: Vec::new(),
                rows: Vec::new(),
            });
            awaiting_header = true;
            continue;
        }

        let Some(section) = sections.last_mut() else {
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            return Err(CsvError::RowOutsideSection { line });
        };

        if awaiting_header {
            section.header = record;
            awaiting_header = false;
            continue;
        }

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let row = section
            .header
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (name.clone(), record.get(i).cloned().unwrap_or_default()))
            .collect();
        section.rows.push(row);
    }

    Ok(sections)
}

fn section_marker(record: &[String]) -> Option<String> {
    let first = record.first()?.trim();
    let prefix = first.get(..SECTION_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(SECTION_PREFIX) {
        return None;
    }
    let model = &first[SECTION_PREFIX.len()..];
    if model.is_empty() {
        return None;
    }
    let is_word = model.chars().all(|c| c.is_alphanumeric() || c == '_');
    let rest_blank = record[1..].iter().all(|cell| cell.trim().is_empty());
    (is_word && rest_blank).then(|| model.to_string())
}

/// Quote a field when it contains a separator, quote or line break.
pub fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Append one section (marker, header and rows) to `out`.
pub fn write_section(out: &mut String, model: &str, header: &[&str], rows: &[Vec<String>]) {
    out.push('\n');
    out.push_str(SECTION_PREFIX);
    out.push_str(model);
    out.push('\n');
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = row.iter().map(|cell| escape_field(cell)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quotes_and_embedded_newlines() {
        let records = parse_records("a,\"b, c\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",x\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1, vec!["a", "b, c", "say \"hi\""]);
        assert_eq!(records[1].1, vec!["multi\nline", "x"]);
    }

    #[test]
    fn unterminated_quote_reports_line() {
        let err = parse_records("a,b\nc,\"oops\n").unwrap_err();
        assert_eq!(err, CsvError::UnterminatedQuote { line: 2 });
    }

    #[test]
    fn sections_pad_short_rows_and_skip_blank_ones() {
        let input = "\ncontent:Publisher,,\n\
                     publisher_name,publisher_website,publisher_email\n\
                     Packt,https://packt.com\n\
                     ,,\n\
                     content:Contributor\n\
                     contributor_first_names,,contributor_email\n\
                     Ben,ignored,ben@example.com\n";
        let sections = read_sections(input).unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].model, "Publisher");
        assert_eq!(sections[0].rows.len(), 1);
        assert_eq!(sections[0].rows[0]["publisher_email"], "");
        assert_eq!(sections[1].rows[0].len(), 2);
        assert_eq!(sections[1].rows[0]["contributor_email"], "ben@example.com");
    }

    #[test]
    fn data_before_marker_is_rejected() {
        let err = read_sections("name\nPackt\n").unwrap_err();
        assert_eq!(err, CsvError::RowOutsideSection { line: 1 });
    }

    #[test]
    fn escaping_matches_parsing() {
        assert_eq!(escape_field("hello, world"), "\"hello, world\"");
        assert_eq!(escape_field("plain"), "plain");

        let mut out = String::new();
        write_section(
            &mut out,
            "Review",
            &["review_content"],
            &[vec!["Loved it, \"truly\"".to_string()]],
        );
        let sections = read_sections(&out).unwrap();
        assert_eq!(sections[0].rows[0]["review_content"], "Loved it, \"truly\"");
    }
}
