//! Schema intake. A schema is whatever text the user hands over; it is never parsed.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub(crate) const SCHEMA_EXTENSIONS: [&str; 4] = ["sql", "txt", "json", "csv"];

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error(
        "\"{}\" is not a supported schema file, expected one of: .sql, .txt, .json, .csv",
        .0.display()
    )]
    UnsupportedExtension(PathBuf),
    #[error("failed to read schema file \"{}\"", .0.display())]
    Read(PathBuf, #[source] std::io::Error),
}

fn has_schema_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SCHEMA_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Reads a schema file verbatim.
pub(crate) fn read_schema_file(path: &Path) -> Result<String, Error> {
    if !has_schema_extension(path) {
        return Err(Error::UnsupportedExtension(path.to_path_buf()));
    }

    // Schema files are read as text; invalid UTF-8 is reported rather than replaced
    std::fs::read_to_string(path).map_err(|e| Error::Read(path.to_path_buf(), e))
}

/// A name for a schema read from `path`, taken from the file stem.
pub(crate) fn schema_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "schema".to_string())
}

/// Counts the `CREATE TABLE` statements in a schema, in any case and with any
/// whitespace between the two keywords.
pub(crate) fn count_tables(schema: &str) -> usize {
    let lower = schema.to_ascii_lowercase();

    lower
        .match_indices("create")
        .filter(|(start, keyword)| {
            let rest = &lower[start + keyword.len()..];
            let table = rest.trim_start();

            table.len() < rest.len() && table.starts_with("table")
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_supported_files_verbatim() {
        let dir = tempfile::tempdir().unwrap();

        let contents = "CREATE TABLE employees (\n  id int,\n  salary int\n);\n\n";

        for name in ["schema.sql", "schema.TXT", "schema.json", "schema.csv"] {
            let path = dir.path().join(name);
            std::fs::write(&path, contents).unwrap();

            assert_eq!(read_schema_file(&path).unwrap(), contents);
        }
    }

    #[test]
    fn test_rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();

        for name in ["schema.xlsx", "schema"] {
            let path = dir.path().join(name);
            std::fs::write(&path, "id,name").unwrap();

            assert!(matches!(
                read_schema_file(&path),
                Err(Error::UnsupportedExtension(_))
            ));
        }
    }

    #[test]
    fn test_missing_file() {
        let result = read_schema_file(Path::new("/nonexistent/nlsql/schema.sql"));

        assert!(matches!(result, Err(Error::Read(_, _))));
    }

    #[test]
    fn test_schema_name_from_path() {
        assert_eq!(schema_name_from_path(Path::new("/tmp/shop.sql")), "shop");
        assert_eq!(schema_name_from_path(Path::new("orders.v2.csv")), "orders.v2");
    }

    #[test]
    fn test_count_tables() {
        let schema = "CREATE TABLE users (id int);\ncreate\n  table orders (id int);\n\
                      CREATE INDEX users_id ON users (id);\nCreate Table IF NOT EXISTS items ();";

        assert_eq!(count_tables(schema), 3);
        assert_eq!(count_tables("CREATETABLE nope;"), 0);
        assert_eq!(count_tables("id,name\n1,alice"), 0);
    }
}
