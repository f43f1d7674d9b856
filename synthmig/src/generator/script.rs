//! Journey scaffolds for browser monitors.
//!
//! Legacy transaction scripts are not translated. They are carried over as comments for manual
//! conversion, next to a scaffold that already runs.

use crate::models::MonitorRecord;

const SYNTHETICS_IMPORT: &str = "import { journey, step, expect } from '@elastic/synthetics';";

/// Build the journey source for a browser monitor.
pub fn journey_script(record: &MonitorRecord) -> String {
    let name = escape_single_quoted(&record.name);
    let mut script = format!(
        "{SYNTHETICS_IMPORT}\n\
         \n\
         journey('{name}', ({{ page, params }}) => {{\n    \
             step('Navigate to URL', async () => {{\n        \
                 await page.goto(params.url);\n    \
             }});\n"
    );

    match record.transaction_script.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(legacy) => {
            script.push_str(
                "\n    \
                 step('Verify page loaded', async () => {\n        \
                     await expect(page).toHaveTitle(/.*/);\n    \
                 });\n\
                 \n    \
                 // TODO: convert the Uptrends transaction script below into steps.\n",
            );
            for line in legacy.lines() {
                script.push_str("    // ");
                script.push_str(line.trim_end());
                script.push('\n');
            }
        }
        None => {
            let status = record.expected_http_status_code.unwrap_or(200);
            script.push_str(&format!(
                "\n    \
                 step('Verify page response', async () => {{\n        \
                     const response = await page.waitForResponse(params.url);\n        \
                     expect(response.status()).toBe({status});\n    \
                 }});\n"
            ));
        }
    }

    script.push_str("});\n");
    script
}

/// Escape a value for a single-quoted JS string literal, which cannot span lines.
fn escape_single_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold_without_legacy_script() {
        let record = MonitorRecord {
            url: Some("https://app.example.com".to_string()),
            expected_http_status_code: Some(204),
            ..MonitorRecord::new("g", "Checkout", "Transaction")
        };
        let script = journey_script(&record);

        assert!(script.starts_with(SYNTHETICS_IMPORT));
        assert!(script.contains("journey('Checkout', ({ page, params }) => {"));
        assert!(script.contains("await page.goto(params.url);"));
        assert!(script.contains("expect(response.status()).toBe(204);"));
        assert!(!script.contains("TODO"));
        assert_eq!(script.matches('{').count(), script.matches('}').count());
        assert_eq!(script.matches('(').count(), script.matches(')').count());
    }

    #[test]
    fn test_default_status_is_200() {
        let script = journey_script(&MonitorRecord::new("g", "Portal", "MultiStepApi"));
        assert!(script.contains("toBe(200);"));
    }

    #[test]
    fn test_legacy_script_is_commented_out() {
        let record = MonitorRecord {
            transaction_script: Some("[{\"Navigate\": \"https://x\"},\n {\"Click\": \"#login\"}]".to_string()),
            ..MonitorRecord::new("g", "Login", "Transaction")
        };
        let script = journey_script(&record);

        assert!(script.contains("step('Verify page loaded'"));
        assert!(script.contains("toHaveTitle(/.*/)"));
        assert!(script.contains("    // [{\"Navigate\": \"https://x\"},\n"));
        assert!(script.contains("    //  {\"Click\": \"#login\"}]\n"));
        assert!(!script.contains("waitForResponse"));
        assert!(script.trim_end().ends_with("});"));
    }

    #[test]
    fn test_name_is_escaped() {
        let script = journey_script(&MonitorRecord::new("g", "Bob's shop", "Transaction"));
        assert!(script.contains(r"journey('Bob\'s shop'"));
    }

    #[test]
    fn test_name_line_breaks_are_escaped() {
        let script = journey_script(&MonitorRecord::new("g", "Shop\r\nHome\\eu", "Transaction"));
        assert!(script.contains(r"journey('Shop\r\nHome\\eu', ({ page, params }) => {"));
        assert_eq!(script.lines().filter(|line| line.contains("journey(")).count(), 1);
    }
}
