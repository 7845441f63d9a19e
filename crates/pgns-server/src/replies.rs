use pgns_core::{QueryOutput, TextRow};

/// One piece of a simple-query reply, in the order the backend sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    Columns(Vec<String>),
    Row(TextRow),
    Complete(u64),
}

/// Groups reply events into one result per statement. Every `Complete`
/// closes the current statement; its tag is rebuilt from the matching
/// statement of `sql`.
pub fn collect_results<I>(sql: &str, events: I) -> Vec<QueryOutput>
where
    I: IntoIterator<Item = ReplyEvent>,
{
    let statements: Vec<&str> = split_statements(sql)
        .into_iter()
        .filter(|stmt| !statement_keyword(stmt).is_empty())
        .collect();
    let mut results = Vec::new();
    let mut current = QueryOutput::default();
    for event in events {
        match event {
            ReplyEvent::Columns(columns) => current.columns = columns,
            ReplyEvent::Row(row) => current.rows.push(row),
            ReplyEvent::Complete(count) => {
                let statement = statements.get(results.len()).copied().unwrap_or_default();
                current.tag = command_tag(statement, count);
                results.push(std::mem::take(&mut current));
            }
        }
    }
    results
}

/// Splits a simple-query string at top-level semicolons. Quoted strings,
/// quoted identifiers, dollar-quoted bodies and comments are skipped over.
/// Empty statements are dropped.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
            }
            b'$' => match dollar_tag(&bytes[i..]) {
                Some(tag_len) => {
                    let tag = &bytes[i..i + tag_len];
                    let body = i + tag_len;
                    i = bytes[body..]
                        .windows(tag_len)
                        .position(|w| w == tag)
                        .map_or(bytes.len(), |pos| body + pos + tag_len);
                }
                None => i += 1,
            },
            b';' => {
                push_statement(&mut statements, &sql[start..i]);
                start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    if start < sql.len() {
        push_statement(&mut statements, &sql[start..]);
    }
    statements
}

fn push_statement<'a>(statements: &mut Vec<&'a str>, fragment: &'a str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        statements.push(fragment);
    }
}

/// Length of a `$tag$` opener at the start of `bytes`, if there is one.
fn dollar_tag(bytes: &[u8]) -> Option<usize> {
    let rest = &bytes[1..];
    let name_len = rest
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))?;
    if rest[name_len] != b'$' || rest.first().is_some_and(u8::is_ascii_digit) {
        return None;
    }
    Some(name_len + 2)
}

/// First keyword of a statement, upper-cased, ignoring leading comments.
pub fn statement_keyword(statement: &str) -> String {
    let mut rest = statement.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            break;
        }
    }
    rest.split(|c: char| c.is_whitespace() || c == ';' || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

/// Rebuilds a command tag from the statement keyword, since the simple
/// query API only reports the row count.
pub fn command_tag(statement: &str, rows: u64) -> String {
    let keyword = statement_keyword(statement);
    match keyword.as_str() {
        "SELECT" | "WITH" | "VALUES" | "TABLE" => format!("SELECT {rows}"),
        "INSERT" => format!("INSERT 0 {rows}"),
        "UPDATE" | "DELETE" | "MERGE" | "FETCH" | "MOVE" | "COPY" => format!("{keyword} {rows}"),
        _ => keyword,
    }
}
