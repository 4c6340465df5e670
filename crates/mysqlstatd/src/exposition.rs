//! Text exposition format.
//!
//! The prometheus 0.13 `TextEncoder` cannot write untyped families, and
//! every poll produces some (fallback status variables, slave status
//! columns). Untyped families are rendered here in the same layout; all
//! others go through `TextEncoder` one family at a time, so the output stays
//! ordered by name.

use std::borrow::Cow;
use std::io::Write;

use prometheus::proto::{MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};

/// Encodes `families` into `out`.
pub(crate) fn encode_text(families: &[MetricFamily], out: &mut Vec<u8>) -> prometheus::Result<()> {
    let encoder = TextEncoder::new();
    for family in families {
        if family.get_metric().is_empty() {
            continue;
        }
        if family.get_field_type() == MetricType::UNTYPED {
            write_untyped(family, out)?;
        } else {
            encoder.encode(std::slice::from_ref(family), out)?;
        }
    }
    Ok(())
}

fn write_untyped(family: &MetricFamily, out: &mut Vec<u8>) -> std::io::Result<()> {
    let name = family.get_name();
    if !family.get_help().is_empty() {
        writeln!(out, "# HELP {} {}", name, escape(family.get_help(), false))?;
    }
    writeln!(out, "# TYPE {} untyped", name)?;

    for metric in family.get_metric() {
        out.write_all(name.as_bytes())?;
        let mut separator = "{";
        for pair in metric.get_label() {
            write!(
                out,
                "{}{}=\"{}\"",
                separator,
                pair.get_name(),
                escape(pair.get_value(), true)
            )?;
            separator = ",";
        }
        if !metric.get_label().is_empty() {
            out.write_all(b"}")?;
        }
        writeln!(out, " {}", metric.get_untyped().get_value())?;
    }
    Ok(())
}

/// Escapes `\` and newlines, and `"` inside label values.
fn escape(value: &str, label_value: bool) -> Cow<'_, str> {
    let needs_escape = value
        .chars()
        .any(|c| c == '\\' || c == '\n' || (label_value && c == '"'));
    if !needs_escape {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '"' if label_value => escaped.push_str("\\\""),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::proto::{LabelPair, Metric, Untyped};

    fn untyped_family(
        name: &str,
        help: &str,
        samples: Vec<(Vec<(&str, &str)>, f64)>,
    ) -> MetricFamily {
        let mut family = MetricFamily::default();
        family.set_name(name.to_string());
        family.set_help(help.to_string());
        family.set_field_type(MetricType::UNTYPED);
        for (labels, value) in samples {
            let mut metric = Metric::default();
            for (label, label_value) in labels {
                let mut pair = LabelPair::default();
                pair.set_name(label.to_string());
                pair.set_value(label_value.to_string());
                metric.mut_label().push(pair);
            }
            let mut untyped = Untyped::default();
            untyped.set_value(value);
            metric.set_untyped(untyped);
            family.mut_metric().push(metric);
        }
        family
    }

    fn render(families: &[MetricFamily]) -> String {
        let mut out = Vec::new();
        encode_text(families, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn untyped_family_without_labels() {
        let text = render(&[untyped_family(
            "db_global_status_uptime",
            "Generic metric from SHOW GLOBAL STATUS.",
            vec![(vec![], 86400.0)],
        )]);
        assert_eq!(
            text,
            "# HELP db_global_status_uptime Generic metric from SHOW GLOBAL STATUS.\n\
             # TYPE db_global_status_uptime untyped\n\
             db_global_status_uptime 86400\n"
        );
    }

    #[test]
    fn untyped_labels_are_escaped() {
        let text = render(&[untyped_family(
            "db_info_schema_user_statistics_unknown_col",
            "Unsupported metric from column UNKNOWN_COL",
            vec![(vec![("user", "a\"b\\c\nd")], 9.5)],
        )]);
        assert!(text.contains(
            "db_info_schema_user_statistics_unknown_col{user=\"a\\\"b\\\\c\\nd\"} 9.5\n"
        ));
    }

    #[test]
    fn help_escapes_backslash_and_newline_only() {
        assert_eq!(escape("a\\b\nc\"", false), "a\\\\b\\nc\"");
        assert!(matches!(escape("plain", true), Cow::Borrowed(_)));
    }

    #[test]
    fn mixed_families_keep_input_order() {
        let mut counter = MetricFamily::default();
        counter.set_name("db_exporter_scrapes_total".to_string());
        counter.set_help("Total number of times MySQL was scraped for metrics.".to_string());
        counter.set_field_type(MetricType::COUNTER);
        let mut metric = Metric::default();
        let mut value = prometheus::proto::Counter::default();
        value.set_value(2.0);
        metric.set_counter(value);
        counter.mut_metric().push(metric);

        let text = render(&[
            counter,
            untyped_family("db_slave_status_master_log_file", "", vec![(vec![], 123.0)]),
        ]);
        let counter_at = text.find("# TYPE db_exporter_scrapes_total counter").unwrap();
        let untyped_at = text.find("# TYPE db_slave_status_master_log_file untyped").unwrap();
        assert!(counter_at < untyped_at);
        assert!(text.contains("db_exporter_scrapes_total 2\n"));
        assert!(text.contains("db_slave_status_master_log_file 123\n"));
        assert!(!text.contains("# HELP db_slave_status_master_log_file"));
    }

    #[test]
    fn empty_family_is_skipped() {
        let text = render(&[untyped_family("db_global_status_uptime", "x", Vec::new())]);
        assert!(text.is_empty());
    }
}
