// Reporting and output for sqlprobe
// Raw latency samples as JSON, plus optional CSV and Markdown hit reports

use crate::error::ProbeError;
use crate::models::{Hit, RiskVerdict};
use crate::verdict::latency_samples;
use chrono::Local;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    let first_char = match field.chars().next() {
        Some(c) => c,
        None => return String::new(),
    };
    let needs_escaping = matches!(first_char, '=' | '+' | '-' | '@' | '\t');

    if needs_escaping {
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write the latency of every hit, in order, as a JSON array.
pub fn write_latency_samples(path: &Path, hits: &[Hit]) -> Result<(), ProbeError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&latency_samples(hits))?;
    fs::write(path, json)?;
    Ok(())
}

pub fn export_csv(hits: &[Hit], dir: &Path) -> Result<PathBuf, std::io::Error> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("sqlprobe_report_{}.csv", timestamp));
    let mut file = File::create(&path)?;

    writeln!(file, "Index,Method,URL,Payload,ElapsedMs,Status")?;
    for hit in hits {
        writeln!(
            file,
            "{},{},{},{},{:.3},{}",
            hit.query.index,
            hit.query.method,
            escape_csv_field(&hit.query.url),
            escape_csv_field(&hit.query.payload),
            hit.elapsed_ms,
            escape_csv_field(&hit.result.status_message)
        )?;
    }

    Ok(path)
}

pub fn export_markdown(
    verdict: &RiskVerdict,
    hits: &[Hit],
    dir: &Path,
) -> Result<PathBuf, std::io::Error> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("sqlprobe_report_{}.md", timestamp));
    let mut file = File::create(&path)?;

    writeln!(file, "# sqlprobe Report\n")?;
    writeln!(file, "- **Grade:** {}", verdict.grade)?;
    match verdict.percentage {
        Some(p) => writeln!(file, "- **Percentage:** {:.2}%", p)?,
        None => writeln!(file, "- **Percentage:** n/a")?,
    }
    writeln!(file, "- **Samples:** {}\n", hits.len())?;
    writeln!(file, "{}\n", verdict.message)?;
    writeln!(file, "## Hits\n")?;
    for hit in hits {
        writeln!(
            file,
            "- **{}** {} | payload: {} | {:.2} ms | {}",
            hit.query.method, hit.query.url, hit.query.payload, hit.elapsed_ms, hit.result.status_message
        )?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_plain_and_quoted_fields() {
        assert_eq!(escape_csv_field(""), "");
        assert_eq!(escape_csv_field("OK"), "OK");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn escape_formula_prefixes() {
        assert_eq!(escape_csv_field("=1"), "\"'=1\"");
        assert_eq!(escape_csv_field("-- comment"), "\"'-- comment\"");
        assert_eq!(escape_csv_field("@@version"), "\"'@@version\"");
    }
}
