//! Read-only query classification.
//!
//! The classifier is a conservative deny-list, not a SQL parser. It accepts
//! false positives (a table literally named `DROP` is rejected) so that no
//! grammar is needed, and it never touches a connection.

use crate::error::ServerError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Keywords that reject a query wherever they appear as a whole word.
///
/// Order matters: the first keyword that matches is the one reported.
pub const DENIED_KEYWORDS: &[&str] = &[
    // Data modification
    "INSERT",
    "UPDATE",
    "DELETE",
    "MERGE",
    "TRUNCATE",
    // Schema modification
    "DROP",
    "ALTER",
    "CREATE",
    // Permissions
    "GRANT",
    "REVOKE",
    "DENY",
    // Dynamic execution
    "EXEC",
    "EXECUTE",
    "SP_EXECUTESQL",
    // External data access
    "BULK",
    "OPENROWSET",
    "OPENDATASOURCE",
    // Server administration
    "BACKUP",
    "RESTORE",
    "SHUTDOWN",
    "KILL",
    "RECONFIGURE",
    "DBCC",
];

/// Prefixes a query may start with, compared case-insensitively.
const ALLOWED_PREFIXES: &[&str] = &["SELECT", "WITH", "SET", "--", "/*"];

pub const EMPTY_QUERY_REASON: &str = "SQL query cannot be empty.";

pub const READ_ONLY_REASON: &str =
    "Only read operations are allowed; queries must start with SELECT or WITH.";

pub const MULTIPLE_STATEMENTS_REASON: &str =
    "Multiple statements are not allowed. Please execute one SELECT query at a time.";

// Helper to compile regex with better error message on failure.
// These should never fail since patterns are built from hardcoded keywords.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern)
        .unwrap_or_else(|e| panic!("Internal error: invalid regex pattern '{}': {}", pattern, e))
}

fn keyword_alternation() -> String {
    DENIED_KEYWORDS.join("|")
}

/// One whole-word, case-insensitive pattern per denied keyword, in list order.
static DENIED_KEYWORD_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    DENIED_KEYWORDS
        .iter()
        .map(|keyword| (compile(&format!(r"(?i)\b{}\b", keyword)), *keyword))
        .collect()
});

/// A statement that opens with a denied verb.
static LEADING_DENIED_VERB: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"(?i)^({})\b", keyword_alternation())));

/// A `;` followed by a denied verb, directly or after a comment and line break.
static CHAINED_STATEMENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let verbs = keyword_alternation();
    vec![
        compile(&format!(r"(?i);\s*({})\b", verbs)),
        compile(&format!(r"(?i);\s*--.*\r?\n\s*({})\b", verbs)),
        compile(&format!(r"(?is);\s*/\*.*?\*/\s*({})\b", verbs)),
    ]
});

/// Outcome of classifying a query.
///
/// A reason is present exactly when the query was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    valid: bool,
    reason: Option<String>,
}

impl Verdict {
    fn accept() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Why the query was rejected.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Turn a rejection into [`ServerError::ValidationFailed`].
    pub fn into_result(self) -> Result<(), ServerError> {
        match self.reason {
            Some(reason) if !self.valid => Err(ServerError::validation(reason)),
            _ => Ok(()),
        }
    }
}

/// Stateless read-only query classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryClassifier;

impl QueryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a query. Rules apply in order and the first failure wins.
    pub fn validate(&self, query: &str) -> Verdict {
        validate(query)
    }
}

/// Classify raw SQL text as an acceptable read-only query or not.
pub fn validate(query: &str) -> Verdict {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Verdict::reject(EMPTY_QUERY_REASON);
    }

    if !has_allowed_prefix(trimmed) {
        return Verdict::reject(match leading_denied_verb(trimmed) {
            Some(verb) => format!("{} {} statements are not allowed.", READ_ONLY_REASON, verb),
            None => READ_ONLY_REASON.to_string(),
        });
    }

    if let Some(keyword) = first_denied_keyword(trimmed) {
        return Verdict::reject(format!(
            "Error: {} statements are not allowed. This is a read-only server.",
            keyword
        ));
    }

    if has_multiple_statements(trimmed) {
        return Verdict::reject(MULTIPLE_STATEMENTS_REASON);
    }

    Verdict::accept()
}

fn has_allowed_prefix(query: &str) -> bool {
    ALLOWED_PREFIXES.iter().any(|prefix| {
        query
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

/// The denied verb a statement opens with, in its canonical spelling.
fn leading_denied_verb(statement: &str) -> Option<&'static str> {
    let found = LEADING_DENIED_VERB.captures(statement)?.get(1)?.as_str();
    DENIED_KEYWORDS
        .iter()
        .find(|keyword| keyword.eq_ignore_ascii_case(found))
        .copied()
}

/// The first denied keyword (in list order) appearing as a whole word.
fn first_denied_keyword(query: &str) -> Option<&'static str> {
    DENIED_KEYWORD_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(query))
        .map(|(_, keyword)| *keyword)
}

/// Detect a second statement after a `;`.
///
/// The split is textual: a `;` inside a string literal or a delimited
/// identifier is treated as a statement separator too.
fn has_multiple_statements(query: &str) -> bool {
    if !query.contains(';') {
        return false;
    }

    if CHAINED_STATEMENT_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(query))
    {
        return true;
    }

    query
        .split(';')
        .skip_while(|statement| statement.trim().is_empty())
        .skip(1)
        .any(|statement| {
            let statement = statement.trim();
            statement.is_empty()
                || statement.starts_with("--")
                || statement.starts_with("/*")
                || leading_denied_verb(statement).is_some()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(query: &str) {
        let verdict = validate(query);
        assert!(
            verdict.is_valid(),
            "query should be valid: {query}. Reason: {:?}",
            verdict.reason()
        );
        assert_eq!(verdict.reason(), None);
    }

    fn assert_invalid(query: &str) -> String {
        let verdict = validate(query);
        assert!(!verdict.is_valid(), "query should be rejected: {query}");
        verdict
            .reason()
            .map(str::to_string)
            .unwrap_or_else(|| panic!("rejected query without reason: {query}"))
    }

    // =========================================================================
    // Accepted queries
    // =========================================================================

    #[test]
    fn test_simple_selects_are_valid() {
        assert_valid("SELECT * FROM Users");
        assert_valid("select id, name from products");
        assert_valid("SELECT TOP 10 * FROM Orders ORDER BY CreatedDate DESC");
        assert_valid("SELECT COUNT(*) FROM Customers WHERE IsActive = 1");
        assert_valid("SELECT a.*, b.Name FROM TableA a JOIN TableB b ON a.Id = b.AId");
        assert_valid("   \n\tSELECT 1   ");
    }

    #[test]
    fn test_ctes_are_valid() {
        assert_valid("WITH cte AS (SELECT 1 AS Id) SELECT * FROM cte");
        assert_valid("WITH Orders_CTE AS (SELECT * FROM Orders) SELECT * FROM Orders_CTE");
    }

    #[test]
    fn test_keyword_like_names_are_valid() {
        assert_valid("SELECT UpdatedDate, InsertedBy FROM AuditLog");
        assert_valid("SELECT * FROM Users WHERE UpdatedDate > '2023-01-01'");
        assert_valid("SELECT DeletedAt, InsertedBy FROM AuditLog");
        assert_valid("SELECT * FROM CREATE_LOG");
    }

    #[test]
    fn test_session_settings_and_comments_are_valid_prefixes() {
        assert_valid("SET NOCOUNT ON");
        assert_valid("-- latest orders\nSELECT * FROM Orders");
        assert_valid("/* report */ SELECT 1");
    }

    #[test]
    fn test_second_plain_select_passes() {
        // Only empty, comment, or denied-verb statements trip the rule.
        assert_valid("SELECT 1; SELECT 2");
    }

    // =========================================================================
    // Rejected queries
    // =========================================================================

    #[test]
    fn test_empty_queries_are_invalid() {
        for query in ["", "   ", "\n\t"] {
            let reason = assert_invalid(query);
            assert!(reason.to_lowercase().contains("empty"));
        }
    }

    #[test]
    fn test_non_read_prefixes_are_invalid() {
        for query in [
            "INSERT INTO Users (Name) VALUES ('Test')",
            "insert into products values (1, 'test', 10.99)",
            "UPDATE Users SET Name = 'Test' WHERE Id = 1",
            "DELETE FROM Users WHERE Id = 1",
            "TRUNCATE TABLE Users",
            "MERGE INTO Target USING Source ON Target.Id = Source.Id WHEN MATCHED THEN UPDATE SET Name = Source.Name",
            "ALTER TABLE Users ADD Email VARCHAR(255)",
            "CREATE PROCEDURE sp_Test AS SELECT 1",
            "EXEC sp_DeleteAllUsers",
            "execute sp_DropDatabase",
            "EXEC('DELETE FROM Users')",
            "GRANT SELECT ON Users TO TestUser",
            "REVOKE ALL ON Database TO TestUser",
            "DENY INSERT ON Users TO TestUser",
            "BACKUP DATABASE TestDb TO DISK = 'C:\\backup.bak'",
            "RESTORE DATABASE TestDb FROM DISK = 'C:\\backup.bak'",
            "DECLARE @x INT",
            "SELEC * FROM Users",
        ] {
            let reason = assert_invalid(query);
            assert!(
                reason.to_lowercase().contains("only read operations are allowed"),
                "unexpected reason for {query}: {reason}"
            );
        }
    }

    #[test]
    fn test_drop_names_the_keyword() {
        let reason = assert_invalid("DROP TABLE Users");
        assert!(reason.to_lowercase().contains("start with select or with"));
        assert!(reason.contains("DROP"));

        let reason = assert_invalid("drop database TestDb");
        assert!(reason.contains("DROP statements"));

        let reason = assert_invalid("DECLARE @x INT");
        assert_eq!(reason, READ_ONLY_REASON);

        let reason = assert_invalid("SELECT 1 WHERE 1 = 1 OR DROP = 1");
        assert!(reason.contains("DROP"));
    }

    #[test]
    fn test_denied_keywords_inside_selects() {
        let reason = assert_invalid("SELECT * FROM OPENROWSET('SQLNCLI', 'x', 'SELECT 1')");
        assert!(reason.contains("OPENROWSET"));

        let reason = assert_invalid("with x as (select 1 as a) select * from x where exec = 1");
        assert!(reason.contains("EXEC"));

        let reason = assert_invalid("SET ROWCOUNT 0 DBCC CHECKDB");
        assert!(reason.contains("DBCC"));
    }

    #[test]
    fn test_every_denied_keyword_is_rejected_as_a_whole_word() {
        assert_eq!(DENIED_KEYWORDS.len(), 23);

        for keyword in DENIED_KEYWORDS {
            let expected = format!(
                "Error: {} statements are not allowed. This is a read-only server.",
                keyword
            );

            let reason = assert_invalid(&format!("SELECT 1 WHERE x = 1 OR {} = 1", keyword));
            assert_eq!(reason, expected);

            let lower = keyword.to_lowercase();
            let reason = assert_invalid(&format!("SELECT 1 WHERE x = 1 OR {} = 1", lower));
            assert_eq!(reason, expected);
        }
    }

    #[test]
    fn test_names_containing_denied_keywords_are_valid() {
        for keyword in DENIED_KEYWORDS {
            assert_valid(&format!("SELECT {}_x, x{} FROM t", keyword, keyword));
            assert_valid(&format!("SELECT Last{}Date FROM t", keyword.to_lowercase()));
        }
    }

    #[test]
    fn test_first_keyword_in_list_order_wins() {
        // DELETE precedes DROP in the deny-list regardless of text position.
        let reason = assert_invalid("SELECT drop, delete FROM t");
        assert!(reason.contains("DELETE"), "{reason}");
        assert!(!reason.contains("DROP"), "{reason}");
    }

    #[test]
    fn test_multiple_statements_are_invalid() {
        for query in [
            "SELECT * FROM Users; DELETE FROM Users",
            "SELECT 1; DROP TABLE Users",
            "SELECT * FROM Users; INSERT INTO Logs VALUES ('hacked')",
        ] {
            assert!(!validate(query).is_valid(), "{query}");
        }
    }

    #[test]
    fn test_comment_injection_is_invalid() {
        assert!(!validate("SELECT * FROM Users WHERE Id = 1; --\nDELETE FROM Users").is_valid());
    }

    #[test]
    fn test_trailing_statements_are_invalid() {
        assert_eq!(assert_invalid("SELECT 1;"), MULTIPLE_STATEMENTS_REASON);
        assert_eq!(assert_invalid("SELECT 1; -- done"), MULTIPLE_STATEMENTS_REASON);
        assert_eq!(assert_invalid("SELECT 1; /* tail */"), MULTIPLE_STATEMENTS_REASON);
    }

    #[test]
    fn test_semicolon_inside_literal_is_treated_as_separator() {
        // Known limitation: the split does not understand string literals.
        assert_eq!(
            assert_invalid("SELECT 'x;--y' AS v"),
            MULTIPLE_STATEMENTS_REASON
        );
    }

    // =========================================================================
    // Verdict behaviour
    // =========================================================================

    #[test]
    fn test_validate_is_idempotent() {
        for query in ["SELECT 1", "DROP TABLE x", "", "SELECT 1; DELETE FROM t"] {
            assert_eq!(validate(query), validate(query));
        }
    }

    #[test]
    fn test_verdict_into_result() {
        assert!(validate("SELECT 1").into_result().is_ok());

        match validate("").into_result() {
            Err(ServerError::ValidationFailed(reason)) => assert_eq!(reason, EMPTY_QUERY_REASON),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_classifier_matches_free_function() {
        let classifier = QueryClassifier::new();
        assert_eq!(classifier.validate("SELECT 1"), validate("SELECT 1"));
    }
}
