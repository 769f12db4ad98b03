// src/plugins/sql_injection.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::plugin::{
    Confidence, Evidence, PluginCapabilities, PluginContext, PluginError, PluginFinding,
    PluginMetadata, SafetyLevel, ScannerPlugin, Severity,
};
use crate::plugins::extract_snippet;

const PLUGIN_ID: &str = "sql-injection";

/// Response slower than this while a delay function sits in a parameter is
/// treated as a time-based indicator.
const TIMING_THRESHOLD_MS: u64 = 5000;

static DATABASE_ERROR_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "MySQL",
            Regex::new(
                r"(?i)(SQL syntax.*MySQL|Warning.*mysql_|MySQLSyntaxErrorException|You have an error in your SQL syntax)",
            )
            .unwrap(),
        ),
        (
            "PostgreSQL",
            Regex::new(
                r"(?i)(PostgreSQL.*ERROR|Warning.*\Wpg_|valid PostgreSQL result|PG::SyntaxError|ERROR:\s+syntax error at or near)",
            )
            .unwrap(),
        ),
        (
            "MSSQL",
            Regex::new(
                r"(?i)(Driver.*SQL[\- _]*Server|OLE DB.*SQL Server|\[SQL Server\]|ODBC SQL Server Driver|SqlException|Incorrect syntax near)",
            )
            .unwrap(),
        ),
        (
            "Oracle",
            Regex::new(
                r"(?i)(\bORA-[0-9]{4}|Oracle error|Warning.*\Woci_|quoted string not properly terminated)",
            )
            .unwrap(),
        ),
        (
            "SQLite",
            Regex::new(
                r#"(?i)(SQLite/JDBCDriver|SQLite\.Exception|Warning.*sqlite_|\[SQLITE_ERROR\]|sqlite3\.OperationalError|near ".*": syntax error)"#,
            )
            .unwrap(),
        ),
        (
            "Generic",
            Regex::new(
                r"(?i)(SQL syntax|syntax error|unclosed quotation mark|unterminated string literal|invalid input syntax|unrecognized token|column.*does not exist|table.*does not exist)",
            )
            .unwrap(),
        ),
    ]
});

static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(union)(.*)(select)(.*)(from)").unwrap(),
        Regex::new(r"(?i)(select).*(from).*(where)").unwrap(),
        Regex::new(r"(?i)(drop).*(table|database)").unwrap(),
        Regex::new(r"(?i)(')\s*(or|and)\s*('|\d)").unwrap(),
        Regex::new(r"(?i)\b(waitfor|benchmark|sleep|pg_sleep)\s*\(").unwrap(),
        Regex::new(r"(?i)(\bor\b|\band\b)\s+\d+\s*=\s*\d+").unwrap(),
    ]
});

static TIME_BASED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(waitfor\s+delay|benchmark\(|sleep\(|pg_sleep\(|dbms_lock\.sleep)").unwrap()
});

static BOOLEAN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)((and|or)\s+(\d+=\d+|true|false|\d+<>\d+))").unwrap());

/// Detects SQL injection indicators through database error messages,
/// reflected injection patterns, fingerprinting, and timing analysis.
///
/// Error analysis always runs; the timing and boolean checks only run when
/// the scan allows ACTIVE plugins.
pub struct SqlInjectionPlugin {
    metadata: PluginMetadata,
}

impl SqlInjectionPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new(
                PLUGIN_ID,
                "SQL Injection Detector",
                "1.0.0",
                "Aegis Team",
                "Detects SQL injection vulnerabilities through error analysis, \
                 timing attacks, and pattern matching",
                SafetyLevel::Active,
            ),
        }
    }

    fn detect_error_based(&self, context: &PluginContext) -> Vec<PluginFinding> {
        let mut findings = Vec::new();
        let body = context.response().body();
        if body.is_empty() {
            return findings;
        }

        for (db_type, pattern) in DATABASE_ERROR_PATTERNS.iter() {
            let Some(m) = pattern.find(body) else {
                continue;
            };

            let snippet = extract_snippet(body, m.start(), 150);
            findings.push(
                PluginFinding::builder(
                    PLUGIN_ID,
                    &format!("SQL Injection - Error-Based ({})", db_type),
                    context.target_url().clone(),
                )
                .severity(determine_severity(context, &snippet))
                .confidence(determine_confidence(body, db_type))
                .description(format!(
                    "Database error message detected indicating potential SQL injection \
                     vulnerability. Database type: {}. The application is exposing internal \
                     database errors which can be leveraged by attackers to extract data or \
                     understand the database structure.",
                    db_type
                ))
                .evidence(Evidence::response_snippet(snippet, "error_message"))
                .evidence(Evidence::pattern_match(
                    format!("{} error pattern", db_type),
                    "database_type",
                ))
                .remediation(
                    "Use parameterized queries or prepared statements, implement proper \
                     error handling to avoid exposing database errors, and apply input \
                     validation with least-privilege database accounts",
                )
                .build(),
            );
        }

        findings
    }

    fn detect_reflected_patterns(&self, context: &PluginContext) -> Vec<PluginFinding> {
        let mut findings = Vec::new();
        let body = context.response().body();
        if body.is_empty() {
            return findings;
        }

        for (name, value) in context.parameters() {
            for pattern in INJECTION_PATTERNS.iter() {
                let Some(m) = pattern.find(value) else {
                    continue;
                };

                if body.contains(value.as_str()) || contains_sql_keywords(body) {
                    findings.push(
                        PluginFinding::builder(
                            PLUGIN_ID,
                            "Potential SQL Injection - Pattern Reflection",
                            context.target_url().clone(),
                        )
                        .parameter(name)
                        .severity(Severity::Medium)
                        .confidence(Confidence::Possible)
                        .description(format!(
                            "Parameter '{}' contains SQL injection patterns that may be \
                             reflected in the response. This could indicate insufficient \
                             input validation.",
                            name
                        ))
                        .evidence(Evidence::pattern_match(m.as_str(), "parameter_value"))
                        .remediation(
                            "Implement strict input validation, use parameterized queries, \
                             and apply output encoding",
                        )
                        .build(),
                    );
                    // one finding per parameter
                    break;
                }
            }
        }

        findings
    }

    fn fingerprint_database(&self, context: &PluginContext) -> Vec<PluginFinding> {
        let response = context.response();
        let mut detected = Vec::new();

        if let Some(powered_by) = response.header("X-Powered-By") {
            if powered_by.to_lowercase().contains("php") {
                detected.push("MySQL/MariaDB (inferred from PHP)".to_string());
            }
        }

        if let Some(server) = response.header("Server") {
            let lower = server.to_lowercase();
            if lower.contains("oracle") {
                detected.push("Oracle".to_string());
            } else if lower.contains("microsoft") || lower.contains("iis") {
                detected.push("Microsoft SQL Server (inferred from IIS)".to_string());
            }
        }

        let body = response.body();
        if body.contains("mysql_") || body.contains("mysqli_") {
            detected.push("MySQL".to_string());
        }
        if body.contains("pg_") || body.contains("postgresql") {
            detected.push("PostgreSQL".to_string());
        }
        if body.contains("sqlite") {
            detected.push("SQLite".to_string());
        }

        if detected.is_empty() {
            return Vec::new();
        }

        vec![
            PluginFinding::builder(
                PLUGIN_ID,
                "Database Technology Fingerprinted",
                context.target_url().clone(),
            )
            .severity(Severity::Info)
            .confidence(Confidence::Likely)
            .description(
                "Database technology was identified through response analysis. This \
                 information can help attackers craft database-specific attacks.",
            )
            .evidence(Evidence::pattern_match(
                detected.join(", "),
                "detected_databases",
            ))
            .remediation(
                "Minimize information disclosure in responses and configure server \
                 headers to hide the technology stack",
            )
            .notes(format!("Detected databases: {}", detected.join(", ")))
            .build(),
        ]
    }

    fn detect_timing_anomalies(&self, context: &PluginContext) -> Vec<PluginFinding> {
        let mut findings = Vec::new();
        let response_time = context.response().response_time_ms();

        for (name, value) in context.parameters() {
            let Some(m) = TIME_BASED_PATTERN.find(value) else {
                continue;
            };

            if response_time > TIMING_THRESHOLD_MS {
                findings.push(
                    PluginFinding::builder(
                        PLUGIN_ID,
                        "Potential Time-Based Blind SQL Injection",
                        context.target_url().clone(),
                    )
                    .parameter(name)
                    .severity(Severity::High)
                    .confidence(Confidence::Likely)
                    .description(format!(
                        "Parameter '{}' contains time-based SQL injection patterns and the \
                         response time ({}ms) suggests the database may be executing delay \
                         functions.",
                        name, response_time
                    ))
                    .evidence(Evidence::timing_data(
                        format!("{}ms", response_time),
                        "Response time indicates possible time-based injection",
                    ))
                    .evidence(Evidence::pattern_match(m.as_str(), "time_based_pattern"))
                    .remediation(
                        "Use parameterized queries exclusively, set database query \
                         timeouts, and monitor slow queries",
                    )
                    .build(),
                );
            }
        }

        findings
    }

    fn detect_boolean_based(&self, context: &PluginContext) -> Vec<PluginFinding> {
        let mut findings = Vec::new();
        let response = context.response();
        let body = response.body();

        for (name, value) in context.parameters() {
            let Some(m) = BOOLEAN_PATTERN.find(value) else {
                continue;
            };

            // a 200 with body content is taken as evidence the condition
            // evaluated
            if response.status() == 200 && !body.is_empty() {
                findings.push(
                    PluginFinding::builder(
                        PLUGIN_ID,
                        "Potential Boolean-Based Blind SQL Injection",
                        context.target_url().clone(),
                    )
                    .parameter(name)
                    .severity(Severity::High)
                    .confidence(Confidence::Possible)
                    .description(format!(
                        "Parameter '{}' contains boolean-based SQL injection patterns. The \
                         application may be evaluating SQL boolean conditions, which could \
                         allow attackers to extract data through true/false queries.",
                        name
                    ))
                    .evidence(Evidence::pattern_match(m.as_str(), "boolean_pattern"))
                    .evidence(Evidence::response_snippet(
                        format!("Status: 200, Content length: {}", body.len()),
                        "response_characteristics",
                    ))
                    .remediation(
                        "Use parameterized queries with type checking and input \
                         validation with whitelisting",
                    )
                    .build(),
                );
            }
        }

        findings
    }
}

impl Default for SqlInjectionPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn determine_severity(context: &PluginContext, error_snippet: &str) -> Severity {
    let url = context.target_url().as_str().to_lowercase();
    if url.contains("admin") || url.contains("login") || url.contains("auth") {
        return Severity::Critical;
    }

    let lower = error_snippet.to_lowercase();
    if lower.contains("password")
        || lower.contains("user")
        || lower.contains("credit")
        || lower.contains("ssn")
    {
        return Severity::High;
    }

    Severity::Medium
}

fn determine_confidence(body: &str, db_type: &str) -> Confidence {
    let lower = body.to_lowercase();
    let mut indicators = 0;
    for needle in ["syntax", "error", "exception", "query"] {
        if lower.contains(needle) {
            indicators += 1;
        }
    }
    if db_type != "Generic" {
        indicators += 1;
    }

    match indicators {
        i if i >= 4 => Confidence::Confirmed,
        i if i >= 2 => Confidence::Likely,
        _ => Confidence::Possible,
    }
}

fn contains_sql_keywords(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["select", "insert", "update", "delete", "union", "where", "from"]
        .iter()
        .filter(|keyword| lower.contains(**keyword))
        .count()
        >= 3
}

/// Keep the highest-confidence finding per (endpoint, title).
fn deduplicate(findings: Vec<PluginFinding>) -> Vec<PluginFinding> {
    let mut unique: HashMap<String, PluginFinding> = HashMap::new();

    for finding in findings {
        let key = format!("{}|{}", finding.endpoint, finding.title);
        let keep = match unique.get(&key) {
            Some(existing) => finding.confidence > existing.confidence,
            None => true,
        };
        if keep {
            unique.insert(key, finding);
        }
    }

    unique.into_values().collect()
}

#[async_trait]
impl ScannerPlugin for SqlInjectionPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities {
            max_concurrent_requests: 1,
            ..PluginCapabilities::default()
        }
    }

    async fn run(&self, context: Arc<PluginContext>) -> Result<Vec<PluginFinding>, PluginError> {
        let mut findings = Vec::new();

        findings.extend(self.detect_error_based(&context));
        findings.extend(self.detect_reflected_patterns(&context));
        findings.extend(self.fingerprint_database(&context));

        if context.scan().max_safety_level() >= SafetyLevel::Active {
            findings.extend(self.detect_timing_anomalies(&context));
            findings.extend(self.detect_boolean_based(&context));
        }

        Ok(deduplicate(findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawledPage;
    use crate::http::HttpResponseData;
    use crate::plugins::testing::{context, context_with_level};
    use crate::scanner::ScanConfiguration;
    use std::time::Duration;
    use url::Url;

    fn slow_context(url: &str, response_time_ms: u64) -> Arc<PluginContext> {
        let url = Url::parse(url).unwrap();
        let response = HttpResponseData::new(
            200,
            "OK",
            HashMap::new(),
            "content",
            Duration::from_millis(response_time_ms),
        );
        let page = Arc::new(CrawledPage::new(url.clone(), response, 0, Vec::new()));
        let config = ScanConfiguration::builder(url)
            .max_safety_level(SafetyLevel::Active)
            .build();
        Arc::new(PluginContext::new(page, &config))
    }

    #[tokio::test]
    async fn detects_mysql_error_message() {
        let plugin = SqlInjectionPlugin::new();
        let body = "You have an error in your SQL syntax; check the manual";
        let findings = plugin
            .run(context("https://example.com/products?id=1", &[], body))
            .await
            .unwrap();

        assert!(findings
            .iter()
            .any(|f| f.title == "SQL Injection - Error-Based (MySQL)"));
    }

    #[tokio::test]
    async fn admin_endpoints_escalate_severity() {
        let plugin = SqlInjectionPlugin::new();
        let body = "Incorrect syntax near 'admin'";
        let findings = plugin
            .run(context("https://example.com/admin/users?id=2", &[], body))
            .await
            .unwrap();

        let mssql = findings
            .iter()
            .find(|f| f.title == "SQL Injection - Error-Based (MSSQL)")
            .unwrap();
        assert_eq!(mssql.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn boolean_pattern_with_200_body_is_flagged() {
        let plugin = SqlInjectionPlugin::new();
        let findings = plugin
            .run(context_with_level(
                "https://example.com/items?id=1+or+1%3D1",
                &[],
                "<html>items</html>",
                SafetyLevel::Active,
            ))
            .await
            .unwrap();

        let boolean = findings
            .iter()
            .find(|f| f.title == "Potential Boolean-Based Blind SQL Injection")
            .unwrap();
        assert_eq!(boolean.parameter.as_deref(), Some("id"));
        assert_eq!(boolean.confidence, Confidence::Possible);
    }

    #[tokio::test]
    async fn active_checks_skipped_at_passive_level() {
        let plugin = SqlInjectionPlugin::new();
        let findings = plugin
            .run(context_with_level(
                "https://example.com/items?id=1+or+1%3D1",
                &[],
                "<html>items</html>",
                SafetyLevel::Passive,
            ))
            .await
            .unwrap();

        assert!(!findings
            .iter()
            .any(|f| f.title == "Potential Boolean-Based Blind SQL Injection"));
    }

    #[tokio::test]
    async fn slow_response_with_delay_function_is_flagged() {
        let plugin = SqlInjectionPlugin::new();
        let findings = plugin
            .run(slow_context(
                "https://example.com/report?delay=sleep(10)",
                8000,
            ))
            .await
            .unwrap();

        assert!(findings
            .iter()
            .any(|f| f.title == "Potential Time-Based Blind SQL Injection"));
    }

    #[tokio::test]
    async fn fast_response_with_delay_function_is_not_flagged() {
        let plugin = SqlInjectionPlugin::new();
        let findings = plugin
            .run(slow_context("https://example.com/report?delay=sleep(10)", 50))
            .await
            .unwrap();

        assert!(!findings
            .iter()
            .any(|f| f.title == "Potential Time-Based Blind SQL Injection"));
    }

    #[tokio::test]
    async fn clean_page_yields_nothing() {
        let plugin = SqlInjectionPlugin::new();
        let findings = plugin
            .run(context(
                "https://example.com/",
                &[],
                "<html>welcome</html>",
            ))
            .await
            .unwrap();

        assert!(findings.is_empty());
    }

    #[test]
    fn deduplication_keeps_highest_confidence() {
        let endpoint = Url::parse("https://example.com/").unwrap();
        let low = PluginFinding::possible(PLUGIN_ID, "Same Title", endpoint.clone()).build();
        let high = PluginFinding::confirmed(PLUGIN_ID, "Same Title", endpoint).build();

        let deduped = deduplicate(vec![low, high]);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].confidence, Confidence::Confirmed);
    }
}
