//! Prometheus text exposition format.

use std::fmt::Write;

use crate::metrics::{MetricFamily, MetricSet};

/// Content type of the rendered body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render a metric set in Prometheus exposition format.
///
/// Every family gets `HELP` and `TYPE` lines even when it has no samples.
pub fn encode(set: &MetricSet) -> String {
    let mut output = String::with_capacity(set.sample_count() * 64 + set.families().len() * 96);

    for family in set.families() {
        write_family(&mut output, family);
    }

    output
}

fn write_family(output: &mut String, family: &MetricFamily) {
    let desc = &family.desc;

    writeln!(output, "# HELP {} {}", desc.name, escape_help(desc.help)).ok();
    writeln!(output, "# TYPE {} gauge", desc.name).ok();

    for sample in &family.samples {
        let labels: Vec<(&str, &str)> = sample.labels(desc).collect();
        writeln!(
            output,
            "{}{} {}",
            desc.name,
            format_labels(&labels),
            format_value(sample.value)
        )
        .ok();
    }
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape HELP text. Quotes are legal there.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for Prometheus exposition format.
fn format_labels(labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
