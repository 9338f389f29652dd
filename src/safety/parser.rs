//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the SQLite dialect to parse SQL and classify
//! statements by their safety level.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::error::{PracticeError, Result};

use super::{ClassificationResult, SafetyLevel, StatementType};

/// SQL classifier that parses and classifies SQL queries.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: SQLiteDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
        }
    }

    /// Classifies a SQL string, returning an error if it cannot be parsed.
    pub fn try_classify(&self, sql: &str) -> Result<ClassificationResult> {
        let statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| PracticeError::query(format!("SQL parse error: {}", e)))?;

        if statements.is_empty() {
            return Ok(ClassificationResult::with_warning(
                SafetyLevel::Destructive,
                StatementType::Unknown,
                "Empty SQL statement",
            ));
        }

        if statements.len() == 1 {
            let (level, stmt_type) = classify_statement(&statements[0]);
            return Ok(ClassificationResult::new(level, stmt_type));
        }

        // Multiple statements: use the most dangerous classification
        let mut max_level = SafetyLevel::Safe;
        let mut max_stmt_type = StatementType::Select;

        for stmt in &statements {
            let (level, stmt_type) = classify_statement(stmt);
            if level_priority(&level) > level_priority(&max_level) {
                max_level = level;
                max_stmt_type = stmt_type;
            }
        }

        Ok(ClassificationResult::with_warning(
            max_level,
            StatementType::Multiple(Box::new(max_stmt_type)),
            format!("{} statements submitted at once", statements.len()),
        ))
    }
}

/// Returns a priority value for safety levels (higher = more dangerous).
fn level_priority(level: &SafetyLevel) -> u8 {
    match level {
        SafetyLevel::Safe => 0,
        SafetyLevel::Mutating => 1,
        SafetyLevel::Destructive => 2,
    }
}

/// Keeps whichever classification is more dangerous; ties keep `current`.
fn most_dangerous(
    current: (SafetyLevel, StatementType),
    candidate: (SafetyLevel, StatementType),
) -> (SafetyLevel, StatementType) {
    if level_priority(&candidate.0) > level_priority(&current.0) {
        candidate
    } else {
        current
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> (SafetyLevel, StatementType) {
    match statement {
        // Query: may contain mutations in nested bodies, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                // EXPLAIN ANALYZE executes the query - inherit inner statement's safety level
                let (inner_level, _) = classify_statement(statement);
                (inner_level, StatementType::Explain)
            } else {
                (SafetyLevel::Safe, StatementType::Explain)
            }
        }

        // Mutating: data modification
        Statement::Insert { .. } => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),

        // Destructive: data loss, schema or connection changes
        Statement::Delete { .. } => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementType::Truncate),
        Statement::AlterTable { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::CreateTable { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateIndex { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateView { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateVirtualTable { .. } => {
            (SafetyLevel::Destructive, StatementType::Create)
        }
        Statement::Pragma { .. } => (SafetyLevel::Destructive, StatementType::Pragma),
        Statement::AttachDatabase { .. } => (SafetyLevel::Destructive, StatementType::Attach),

        // Conservative default: treat unknown statements as destructive
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a Query by recursively inspecting for data-modifying operations.
/// Returns the most dangerous (SafetyLevel, StatementType) found.
fn classify_query(query: &Query) -> (SafetyLevel, StatementType) {
    let mut max = (SafetyLevel::Safe, StatementType::Select);

    // Check CTEs in WITH clause
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            max = most_dangerous(max, classify_query(&cte.query));
        }
    }

    // Check the main query body
    most_dangerous(max, classify_set_expr(&query.body))
}

/// Classifies a SetExpr, detecting mutations and recursing into nested queries.
#[allow(unreachable_patterns)]
fn classify_set_expr(set_expr: &SetExpr) -> (SafetyLevel, StatementType) {
    match set_expr {
        // Mutations wrapped as query bodies
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => classify_statement(stmt),

        // Nested query - recurse
        SetExpr::Query(query) => classify_query(query),

        // SELECT - check FROM clause for subqueries
        SetExpr::Select(select) => classify_select(select),

        // Set operations (UNION, INTERSECT, EXCEPT) - check both sides
        SetExpr::SetOperation { left, right, .. } => {
            most_dangerous(classify_set_expr(left), classify_set_expr(right))
        }

        // Values, Table - safe (no subqueries possible)
        SetExpr::Values(_) | SetExpr::Table(_) => (SafetyLevel::Safe, StatementType::Select),

        // Any body kind not listed above is not trusted
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a Select by checking its FROM clause for subqueries.
fn classify_select(select: &Select) -> (SafetyLevel, StatementType) {
    select.from.iter().fold(
        (SafetyLevel::Safe, StatementType::Select),
        |max, table_with_joins| most_dangerous(max, classify_table_with_joins(table_with_joins)),
    )
}

/// Classifies a TableWithJoins, checking the main relation and all joins.
fn classify_table_with_joins(twj: &TableWithJoins) -> (SafetyLevel, StatementType) {
    twj.joins.iter().fold(classify_table_factor(&twj.relation), |max, join| {
        most_dangerous(max, classify_table_factor(&join.relation))
    })
}

/// Classifies a TableFactor, recursing into derived tables (subqueries).
fn classify_table_factor(factor: &TableFactor) -> (SafetyLevel, StatementType) {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        // Other variants (Table, TableFunction, etc.) are safe
        _ => (SafetyLevel::Safe, StatementType::Select),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(sql: &str) -> ClassificationResult {
        SqlClassifier::new().try_classify(sql).unwrap()
    }

    fn assert_classification(sql: &str, expected_level: SafetyLevel, expected_type: StatementType) {
        let result = classify(sql);
        assert_eq!(
            result.level, expected_level,
            "SQL: '{}' - expected level {:?}, got {:?}",
            sql, expected_level, result.level
        );
        assert_eq!(
            result.statement_type, expected_type,
            "SQL: '{}' - expected type {:?}, got {:?}",
            sql, expected_type, result.statement_type
        );
    }

    // Safe queries
    #[test]
    fn test_select_is_safe() {
        assert_classification(
            "SELECT * FROM products",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_select_with_join_and_group_is_safe() {
        assert_classification(
            "SELECT c.Region, SUM(t.TotalValue) AS total
             FROM transactions t LEFT JOIN customers c ON c.CustomerID = t.CustomerID
             GROUP BY c.Region HAVING SUM(t.TotalValue) > 300",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_select_with_subqueries_is_safe() {
        assert_classification(
            "SELECT p.ProductName FROM products p
             WHERE NOT EXISTS (SELECT 1 FROM transactions t WHERE p.ProductID = t.ProductID)",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_derived_table_is_safe() {
        assert_classification(
            "SELECT sub.* FROM (SELECT t.*, ROW_NUMBER() OVER (PARTITION BY t.ProductID ORDER BY t.TransactionDate) AS rn FROM transactions t) AS sub WHERE rn = 3",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_union_is_safe() {
        assert_classification(
            "SELECT ProductID FROM products UNION SELECT ProductID FROM transactions",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_cte_select_is_safe() {
        assert_classification(
            "WITH totals AS (SELECT ProductID, SUM(TotalValue) AS v FROM transactions GROUP BY ProductID)
             SELECT * FROM totals",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_explain_is_safe() {
        assert_classification(
            "EXPLAIN SELECT * FROM products",
            SafetyLevel::Safe,
            StatementType::Explain,
        );
    }

    // Mutating queries
    #[test]
    fn test_insert_is_mutating() {
        assert_classification(
            "INSERT INTO products (ProductID, ProductName) VALUES ('P9', 'Kite')",
            SafetyLevel::Mutating,
            StatementType::Insert,
        );
    }

    #[test]
    fn test_insert_select_is_mutating() {
        assert_classification(
            "INSERT INTO archive SELECT * FROM transactions",
            SafetyLevel::Mutating,
            StatementType::Insert,
        );
    }

    #[test]
    fn test_update_is_mutating() {
        assert_classification(
            "UPDATE products SET Price = 0 WHERE ProductID = 'P001'",
            SafetyLevel::Mutating,
            StatementType::Update,
        );
    }

    // Destructive queries
    #[test]
    fn test_delete_is_destructive() {
        assert_classification(
            "DELETE FROM transactions WHERE Quantity > 2",
            SafetyLevel::Destructive,
            StatementType::Delete,
        );
    }

    #[test]
    fn test_drop_table_is_destructive() {
        assert_classification(
            "DROP TABLE products",
            SafetyLevel::Destructive,
            StatementType::Drop,
        );
    }

    #[test]
    fn test_drop_table_if_exists_is_destructive() {
        assert_classification(
            "DROP TABLE IF EXISTS products",
            SafetyLevel::Destructive,
            StatementType::Drop,
        );
    }

    #[test]
    fn test_alter_table_is_destructive() {
        assert_classification(
            "ALTER TABLE products ADD COLUMN Weight REAL",
            SafetyLevel::Destructive,
            StatementType::Alter,
        );
    }

    #[test]
    fn test_create_table_is_destructive() {
        assert_classification(
            "CREATE TABLE scratch (id INTEGER PRIMARY KEY, name TEXT)",
            SafetyLevel::Destructive,
            StatementType::Create,
        );
    }

    #[test]
    fn test_create_index_is_destructive() {
        assert_classification(
            "CREATE INDEX idx_tx_product ON transactions(ProductID)",
            SafetyLevel::Destructive,
            StatementType::Create,
        );
    }

    #[test]
    fn test_pragma_is_destructive() {
        assert_classification(
            "PRAGMA foreign_keys = 1",
            SafetyLevel::Destructive,
            StatementType::Pragma,
        );
    }

    // Multi-statement queries
    #[test]
    fn test_multi_statement_uses_most_dangerous() {
        let result = classify("SELECT * FROM products; DELETE FROM transactions");
        assert_eq!(result.level, SafetyLevel::Destructive);
        match result.statement_type {
            StatementType::Multiple(inner) => assert_eq!(*inner, StatementType::Delete),
            _ => panic!("Expected Multiple statement type"),
        }
        assert!(result.warning.unwrap().contains("2 statements"));
    }

    #[test]
    fn test_multi_statement_select_insert() {
        let result =
            classify("SELECT * FROM products; INSERT INTO products (ProductID) VALUES ('P9')");
        assert_eq!(result.level, SafetyLevel::Mutating);
        match result.statement_type {
            StatementType::Multiple(inner) => assert_eq!(*inner, StatementType::Insert),
            _ => panic!("Expected Multiple statement type"),
        }
    }

    #[test]
    fn test_multi_statement_all_safe_is_still_multiple() {
        let result = classify("SELECT * FROM products; SELECT COUNT(*) FROM customers");
        assert_eq!(result.level, SafetyLevel::Safe);
        assert!(!result.is_single_read());
    }

    #[test]
    fn test_trailing_semicolon_is_single_statement() {
        let result = classify("SELECT * FROM products;");
        assert!(result.is_single_read());
    }

    // Parse failure handling
    #[test]
    fn test_parse_failure_is_an_error() {
        let err = SqlClassifier::new()
            .try_classify("THIS IS NOT VALID SQL AT ALL")
            .unwrap_err();
        assert!(matches!(err, PracticeError::Query(_)));
    }

    #[test]
    fn test_try_classify_reports_parse_error() {
        let err = SqlClassifier::new()
            .try_classify("SELECT FROM WHERE")
            .unwrap_err();
        assert!(err.to_string().contains("SQL parse error"));
    }

    #[test]
    fn test_empty_sql_is_destructive() {
        let result = classify("   \n\t  ");
        assert_eq!(result.level, SafetyLevel::Destructive);
        assert_eq!(result.statement_type, StatementType::Unknown);
        assert!(!result.is_single_read());
    }

    #[test]
    fn test_case_insensitive() {
        assert_classification(
            "select * from products",
            SafetyLevel::Safe,
            StatementType::Select,
        );
        assert_classification(
            "SeLeCt * FrOm PrOdUcTs",
            SafetyLevel::Safe,
            StatementType::Select,
        );
    }

    #[test]
    fn test_classifier_default() {
        let classifier = SqlClassifier::default();
        let result = classifier.try_classify("SELECT 1").unwrap();
        assert_eq!(result.level, SafetyLevel::Safe);
    }
}
