use tracing::{debug, error};

use crate::http_probe::TimingResult;

/// How each result is written to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    JsonLines,
    Csv,
    /// Anything else. Kept so each render can report it and yield an empty line.
    Unknown(String),
}

impl From<&str> for OutputFormat {
    fn from(value: &str) -> Self {
        match value {
            "jsonl" => OutputFormat::JsonLines,
            "csv" => OutputFormat::Csv,
            other => OutputFormat::Unknown(other.to_string()),
        }
    }
}

impl TimingResult {
    /// Single line JSON object; empty if serialization fails.
    pub fn to_json(&self) -> String {
        debug!(action = "JSON", url = %self.url, "starting");
        match serde_json::to_string(self) {
            Ok(line) => line,
            Err(err) => {
                error!(action = "JSON", url = %self.url, error = %err, "could not marshal JSON");
                String::new()
            }
        }
    }

    /// `url,dns,tls,connect,ttfb,total` with human readable durations.
    pub fn to_csv(&self) -> String {
        debug!(action = "CSV", url = %self.url, "starting");
        format!(
            "{},{:?},{:?},{:?},{:?},{:?}",
            self.url, self.dns, self.tls, self.connect, self.ttfb, self.total
        )
    }
}

/// Render one result. Never fails: problems are logged and produce an empty line.
pub fn render(result: &TimingResult, format: &OutputFormat) -> String {
    match format {
        OutputFormat::JsonLines => result.to_json(),
        OutputFormat::Csv => result.to_csv(),
        OutputFormat::Unknown(name) => {
            error!(action = "Output", url = %result.url, output = %name, "unknown output format");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn measured() -> TimingResult {
        TimingResult {
            url: "https://example.com".to_string(),
            dns: Duration::from_micros(2_500),
            tls: Duration::from_micros(40_125),
            connect: Duration::from_micros(11_000),
            ttfb: Duration::from_micros(123_456),
            total: Duration::from_micros(123_999),
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from("jsonl"), OutputFormat::JsonLines);
        assert_eq!(OutputFormat::from("csv"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from("xml"), OutputFormat::Unknown("xml".to_string()));
    }

    #[test]
    fn test_csv_fields() {
        let line = render(&measured(), &OutputFormat::Csv);
        assert_eq!(line, "https://example.com,2.5ms,40.125ms,11ms,123.456ms,123.999ms");
    }

    #[test]
    fn test_csv_always_six_fields() {
        for result in [measured(), TimingResult::zero("http://unreachable.invalid")] {
            let line = render(&result, &OutputFormat::Csv);
            assert_eq!(line.matches(',').count(), 5, "line: {line}");
        }
        assert_eq!(
            render(&TimingResult::zero("http://a"), &OutputFormat::Csv),
            "http://a,0ns,0ns,0ns,0ns,0ns"
        );
    }

    #[test]
    fn test_jsonl_is_one_line_and_parses_back() {
        let line = render(&measured(), &OutputFormat::JsonLines);
        assert!(!line.contains('\n'));
        let parsed: TimingResult = serde_json::from_str(&line).expect("valid JSON");
        assert_eq!(parsed, measured());
    }

    #[test]
    fn test_unknown_format_renders_empty() {
        let format = OutputFormat::from("xml");
        assert_eq!(render(&measured(), &format), "");
    }
}
