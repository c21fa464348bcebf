//! Exposition-format metrics text parsing.
//!
//! Upstream services expose plain text with one sample per line:
//!
//! ```text
//! # HELP mqtt_published_total MQTT messages published
//! # TYPE mqtt_published_total counter
//! mqtt_published_total 137.0
//! model_infer_ms_bucket{le="5.0"} 3.0
//! model_infer_ms_sum 412.5
//! model_infer_ms_count 18.0
//! ```
//!
//! Lookups never fail loudly: anything that does not match yields `None`, and
//! callers treat `None` as "leave the gauge unchanged".

/// Value of the first unlabelled sample named exactly `name`.
///
/// Comment lines and labelled series (`name{...}`) never match.
pub fn extract_counter(text: &str, name: &str) -> Option<f64> {
    text.lines().find_map(|line| sample_value(line, name))
}

/// `sum / max(1, count)` when both samples are present.
pub fn extract_average(text: &str, sum_name: &str, count_name: &str) -> Option<f64> {
    let sum = extract_counter(text, sum_name)?;
    let count = extract_counter(text, count_name)?;
    Some(sum / count.max(1.0))
}

/// Average of a histogram exported as `<base>_sum` / `<base>_count`.
pub fn extract_histogram_average(text: &str, base: &str) -> Option<f64> {
    extract_average(text, &format!("{base}_sum"), &format!("{base}_count"))
}

fn sample_value(line: &str, name: &str) -> Option<f64> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }

    let mut tokens = line.split_whitespace();
    if tokens.next()? != name {
        return None;
    }

    let value: f64 = tokens.next()?.parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# HELP results_received_total Results received from inference
# TYPE results_received_total counter
results_received_total 42.0
results_received_created 1.7e9
mqtt_published_total 137
preprocess_time_ms_bucket{le=\"5.0\"} 3.0
preprocess_time_ms_sum 61.5
preprocess_time_ms_count 12.0
";

    #[test]
    fn test_extracts_integer_and_decimal_counters() {
        assert_eq!(extract_counter(SAMPLE, "results_received_total"), Some(42.0));
        assert_eq!(extract_counter(SAMPLE, "mqtt_published_total"), Some(137.0));
    }

    #[test]
    fn test_missing_metric_is_none() {
        assert_eq!(extract_counter(SAMPLE, "opcua_published_total"), None);
    }

    #[test]
    fn test_prefix_and_labelled_series_do_not_match() {
        assert_eq!(extract_counter(SAMPLE, "results_received"), None);
        assert_eq!(extract_counter(SAMPLE, "preprocess_time_ms_bucket"), None);
        assert_eq!(extract_counter("# foo 1\n", "foo"), None);
    }

    #[test]
    fn test_average_divides_sum_by_count() {
        let text = "foo_sum 10\nfoo_count 4\n";
        assert_eq!(extract_average(text, "foo_sum", "foo_count"), Some(2.5));
    }

    #[test]
    fn test_average_requires_both_samples() {
        assert_eq!(extract_average("foo_sum 10\n", "foo_sum", "foo_count"), None);
        assert_eq!(extract_average("foo_count 4\n", "foo_sum", "foo_count"), None);
    }

    #[test]
    fn test_average_guards_zero_count() {
        let text = "foo_sum 10\nfoo_count 0\n";
        assert_eq!(extract_average(text, "foo_sum", "foo_count"), Some(10.0));
    }

    #[test]
    fn test_histogram_average_uses_sum_and_count() {
        let avg = extract_histogram_average(SAMPLE, "preprocess_time_ms").unwrap();
        assert!((avg - 5.125).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_text_never_panics() {
        let garbage = "mqtt_published_total\nmqtt_published_total abc\n\u{0}\u{1}{{{\n   \n";
        assert_eq!(extract_counter(garbage, "mqtt_published_total"), None);
        assert_eq!(extract_counter("", "x"), None);
        assert_eq!(extract_counter("x NaN", "x"), None);
    }

    #[test]
    fn test_first_parsable_sample_wins() {
        let text = "x oops\nx 3\nx 4\n";
        assert_eq!(extract_counter(text, "x"), Some(3.0));
    }
}
