use crate::namespace::Namespace;

const QUALIFIED_KEYWORDS: [&str; 2] = [" FROM ", " JOIN "];

/// Qualifies table references with `namespace` by plain text substitution.
///
/// Only upper-case `FROM`/`JOIN` padded by single spaces are recognized.
/// There is no SQL awareness: occurrences inside string literals are
/// rewritten too, and every match gets the same namespace.
pub fn add_namespace(query: &str, namespace: &Namespace) -> String {
    let mut rewritten = query.to_string();
    for keyword in QUALIFIED_KEYWORDS {
        if rewritten.contains(keyword) {
            rewritten = rewritten.replace(keyword, &format!("{keyword}{}.", namespace.as_str()));
        }
    }
    rewritten
}
