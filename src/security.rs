//! Security module: read-only query classification and identifier quoting.

mod identifiers;
mod validation;

pub use identifiers::{parse_qualified_name, quote_identifier};
pub use validation::{
    validate, QueryClassifier, Verdict, DENIED_KEYWORDS, EMPTY_QUERY_REASON,
    MULTIPLE_STATEMENTS_REASON, READ_ONLY_REASON,
};
