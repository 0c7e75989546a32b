//! SQL fragments for in-place edits of JSON array columns.
//!
//! Each fragment is used inside a single `UPDATE` on the owning row, so the
//! read of the old array and the write of the new one cannot interleave with
//! another writer. Predicates refer to the current element as `elem.value`.

/// Shape of the elements held by an array column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Elements {
    /// Plain JSON strings (author ids)
    Strings,
    /// JSON objects (tags, actions, comments)
    Objects,
}

impl Elements {
    fn wrap(self, expr: &str) -> String {
        match self {
            Elements::Strings => expr.to_string(),
            Elements::Objects => format!("json({})", expr),
        }
    }
}

/// `column` followed by the elements of the JSON array bound at `batch`,
/// order preserved on both sides. The batch is a single parameter of any
/// length.
pub(crate) fn extended(table: &str, column: &str, batch: &str, elements: Elements) -> String {
    format!(
        "(SELECT json_group_array({value}) FROM (\
            SELECT elem.value AS value, 0 AS part, elem.key AS pos FROM json_each({table}.{column}) AS elem \
            UNION ALL \
            SELECT elem.value, 1, elem.key FROM json_each({batch}) AS elem \
            ORDER BY part, pos))",
        value = elements.wrap("value"),
    )
}

/// `column` rebuilt from the elements satisfying `keep`, order preserved.
pub(crate) fn retained(table: &str, column: &str, keep: &str, elements: Elements) -> String {
    format!(
        "(SELECT json_group_array({value}) FROM json_each({table}.{column}) AS elem WHERE {keep})",
        value = elements.wrap("elem.value"),
    )
}

/// `EXISTS` test for an element of `column` satisfying `matches`.
pub(crate) fn contains(table: &str, column: &str, matches: &str) -> String {
    format!("EXISTS (SELECT 1 FROM json_each({table}.{column}) AS elem WHERE {matches})")
}

/// JSON path to `field` of the first element satisfying `matches`.
pub(crate) fn element_path(table: &str, column: &str, matches: &str, field: &str) -> String {
    format!(
        "'$[' || (SELECT elem.key FROM json_each({table}.{column}) AS elem WHERE {matches} LIMIT 1) || '].{field}'"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_binds_one_batch() {
        let sql = extended("courses", "tags", "?1", Elements::Objects);
        assert!(sql.starts_with("(SELECT json_group_array(json(value))"));
        assert!(sql.contains("json_each(courses.tags)"));
        assert!(sql.contains("json_each(?1)"));
        assert_eq!(sql.matches('?').count(), 1);

        let sql = extended("courses", "author_ids", "?1", Elements::Strings);
        assert!(sql.starts_with("(SELECT json_group_array(value)"));
    }
}
