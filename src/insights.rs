//! Rules of thumb for speeding up a generated query. The checks look for keywords in
//! the query text, so they can fire on a keyword inside a string literal; the query is
//! never parsed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insight {
    /// A SELECT without a WHERE clause
    MissingWhere,
    SelectAll,
    /// A JOIN that is not spelled INNER JOIN
    BareJoin,
    OrderBy,
    GroupBy,
    /// Nothing specific matched
    General,
}

impl Insight {
    pub(crate) fn advice(self) -> &'static str {
        match self {
            Insight::MissingWhere => {
                "consider adding a WHERE clause to filter the results and reduce the rows scanned"
            }
            Insight::SelectAll => {
                "SELECT * reads every column, list only the columns you need"
            }
            Insight::BareJoin => {
                "write INNER JOIN if you only need rows that match on both sides"
            }
            Insight::OrderBy => "make sure the ORDER BY columns are indexed to speed up sorting",
            Insight::GroupBy => {
                "GROUP BY can be expensive, consider indexing the grouped columns"
            }
            Insight::General => {
                "no specific suggestions, indexes on frequently filtered columns usually help"
            }
        }
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.advice())
    }
}

/// Collects the hints that apply to `sql`, in a fixed order. An empty query gets none;
/// any other query gets at least the general hint.
pub(crate) fn analyze(sql: &str) -> Vec<Insight> {
    let sql = sql.trim().to_lowercase();

    if sql.is_empty() {
        return Vec::new();
    }

    let mut insights = Vec::new();

    if sql.contains("select") && !sql.contains("where") {
        insights.push(Insight::MissingWhere);
    }

    if sql.contains("select *") {
        insights.push(Insight::SelectAll);
    }

    if sql.contains("join") && !sql.contains("inner join") {
        insights.push(Insight::BareJoin);
    }

    if sql.contains("order by") {
        insights.push(Insight::OrderBy);
    }

    if sql.contains("group by") {
        insights.push(Insight::GroupBy);
    }

    if insights.is_empty() {
        insights.push(Insight::General);
    }

    insights
}
