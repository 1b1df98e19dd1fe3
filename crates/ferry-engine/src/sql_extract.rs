//! Textual extraction of simple `SELECT` statements.
//!
//! This is not a SQL parser. It finds the top-level `SELECT`, `FROM` and
//! `WHERE` keywords (outside quotes and parentheses) and slices the text
//! between them. Keywords match case-insensitively; everything else keeps
//! its original case.

use ferry_common::constants::ALL_COLUMNS;
use ferry_common::error::{FerryError, FerryResult};

/// The parts of a `SELECT` the query engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    /// Table between `FROM` and `WHERE`.
    pub table: String,
    /// Columns named between `SELECT` and `FROM`.
    pub columns: Vec<String>,
    /// Text after `WHERE`.
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Select,
    From,
    Where,
    As,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    keyword: Keyword,
    start: usize,
    end: usize,
}

/// Extracts table, columns and condition from a single `SELECT`.
///
/// Columns are split on top-level commas, except that a column list
/// containing `AS` is kept whole as one entry.
///
/// # Errors
///
/// Returns [`FerryError::UnsupportedQuery`] for anything other than one
/// `SELECT ... FROM <table> [WHERE ...]` statement.
pub fn extract_select(sql: &str) -> FerryResult<SelectStatement> {
    let text = sql.trim().trim_end_matches(';').trim_end();
    let marks = scan_keywords(text);
    let count = |k: Keyword| marks.iter().filter(|m| m.keyword == k).count();

    let select = match marks.first() {
        Some(m) if m.keyword == Keyword::Select && m.start == 0 => *m,
        _ => return Err(unsupported("only SELECT statements are supported", sql)),
    };
    if count(Keyword::Select) != 1 {
        return Err(unsupported("expected a single SELECT", sql));
    }
    if count(Keyword::From) != 1 {
        return Err(unsupported("expected exactly one FROM clause", sql));
    }
    if count(Keyword::Where) > 1 {
        return Err(unsupported("expected at most one WHERE clause", sql));
    }

    let find = |k: Keyword| marks.iter().copied().find(|m| m.keyword == k);
    let from = find(Keyword::From).ok_or_else(|| unsupported("missing FROM clause", sql))?;
    let filter = find(Keyword::Where);
    if filter.is_some_and(|w| w.start < from.start) {
        return Err(unsupported("WHERE before FROM", sql));
    }

    let column_text = text[select.end..from.start].trim();
    if column_text.is_empty() {
        return Err(unsupported("no columns selected", sql));
    }
    let has_alias = marks
        .iter()
        .any(|m| m.keyword == Keyword::As && m.start < from.start);
    let columns = split_columns(column_text, has_alias)
        .ok_or_else(|| unsupported("empty column in select list", sql))?;

    let table_end = filter.map_or(text.len(), |w| w.start);
    let table = text[from.end..table_end].trim();
    if table.is_empty() {
        return Err(unsupported("missing table name", sql));
    }
    if table.contains(char::is_whitespace) || table.contains(',') {
        return Err(unsupported("joins, aliases and trailing clauses are not supported", sql));
    }

    let condition = match filter {
        Some(w) => {
            let condition = text[w.end..].trim();
            if condition.is_empty() {
                return Err(unsupported("empty WHERE clause", sql));
            }
            Some(condition.to_string())
        }
        None => None,
    };

    Ok(SelectStatement {
        table: table.to_string(),
        columns,
        condition,
    })
}

fn unsupported(reason: &str, sql: &str) -> FerryError {
    FerryError::unsupported_query(format!("{}: {}", reason, sql.trim()))
}

fn split_columns(text: &str, keep_whole: bool) -> Option<Vec<String>> {
    if text == ALL_COLUMNS || keep_whole {
        return Some(vec![text.to_string()]);
    }

    let mut columns = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                columns.push(text[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    columns.push(text[start..].trim().to_string());

    if columns.iter().any(String::is_empty) {
        return None;
    }
    Some(columns)
}

/// Finds keywords at parenthesis depth zero, outside quoted text.
fn scan_keywords(text: &str) -> Vec<Mark> {
    let mut marks = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut word_start: Option<usize> = None;

    let close_word = |start: usize, end: usize, depth: usize, marks: &mut Vec<Mark>| {
        if depth != 0 {
            return;
        }
        let word = &text[start..end];
        let keyword = if word.eq_ignore_ascii_case("select") {
            Keyword::Select
        } else if word.eq_ignore_ascii_case("from") {
            Keyword::From
        } else if word.eq_ignore_ascii_case("where") {
            Keyword::Where
        } else if word.eq_ignore_ascii_case("as") {
            Keyword::As
        } else {
            return;
        };
        marks.push(Mark { keyword, start, end });
    };

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        let is_word = ch.is_alphanumeric() || ch == '_';
        match (word_start, is_word) {
            (None, true) => word_start = Some(i),
            (Some(start), false) => {
                close_word(start, i, depth, &mut marks);
                word_start = None;
            }
            _ => {}
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if let Some(start) = word_start {
        close_word(start, text.len(), depth, &mut marks);
    }
    marks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_select() {
        let stmt = extract_select("SELECT name, age FROM users WHERE age > 30").unwrap();
        assert_eq!(stmt.table, "users");
        assert_eq!(stmt.columns, vec!["name", "age"]);
        assert_eq!(stmt.condition.as_deref(), Some("age > 30"));
    }

    #[test]
    fn test_keywords_any_case_content_kept() {
        let stmt = extract_select("select Name from People where City = 'Oslo';").unwrap();
        assert_eq!(stmt.table, "People");
        assert_eq!(stmt.columns, vec!["Name"]);
        assert_eq!(stmt.condition.as_deref(), Some("City = 'Oslo'"));
    }

    #[test]
    fn test_star_and_no_where() {
        let stmt = extract_select("  SELECT * FROM t  ").unwrap();
        assert_eq!(stmt.columns, vec!["*"]);
        assert_eq!(stmt.condition, None);
    }

    #[test]
    fn test_alias_keeps_whole_list() {
        let stmt = extract_select("SELECT a AS x, b FROM t").unwrap();
        assert_eq!(stmt.columns, vec!["a AS x, b"]);
    }

    #[test]
    fn test_function_commas_not_split() {
        let stmt = extract_select("SELECT coalesce(a, b), c FROM t").unwrap();
        assert_eq!(stmt.columns, vec!["coalesce(a, b)", "c"]);
    }

    #[test]
    fn test_keywords_in_strings_ignored() {
        let stmt = extract_select("SELECT a FROM t WHERE note = 'from where'").unwrap();
        assert_eq!(stmt.table, "t");
        assert_eq!(stmt.condition.as_deref(), Some("note = 'from where'"));
    }

    #[test]
    fn test_identifiers_containing_keywords() {
        let stmt = extract_select("SELECT from_date, selected FROM wherehouse").unwrap();
        assert_eq!(stmt.columns, vec!["from_date", "selected"]);
        assert_eq!(stmt.table, "wherehouse");
    }

    #[test]
    fn test_rejections() {
        for sql in [
            "UPDATE t SET a = 1",
            "SELECT a",
            "SELECT a FROM t FROM u",
            "SELECT FROM t",
            "SELECT a FROM",
            "SELECT a FROM t WHERE",
            "SELECT a, FROM t",
            "SELECT a FROM t JOIN u ON t.id = u.id",
            "SELECT a FROM t UNION SELECT a FROM u",
        ] {
            assert!(
                matches!(extract_select(sql), Err(FerryError::UnsupportedQuery { .. })),
                "accepted {:?}",
                sql
            );
        }
    }

    #[test]
    fn test_subquery_in_condition() {
        let stmt = extract_select("SELECT a FROM t WHERE id IN (SELECT id FROM u)").unwrap();
        assert_eq!(stmt.table, "t");
        assert_eq!(stmt.condition.as_deref(), Some("id IN (SELECT id FROM u)"));
    }
}
