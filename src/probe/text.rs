//! Line and token helpers for parsing tool output

use super::ProbeError;

/// Trimmed, non-empty lines of a tool's output.
pub fn trimmed_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// First line containing `label`.
pub fn find_line<'a>(lines: &[&'a str], label: &str) -> Option<&'a str> {
    lines.iter().copied().find(|line| line.contains(label))
}

/// Drop the first `count` whitespace-separated tokens and re-join the rest with single spaces.
///
/// `"Kernel Version: Darwin 23.1.0"` with `count = 2` becomes `"Darwin 23.1.0"`.
pub fn drop_tokens(line: &str, count: usize) -> String {
    line.split_whitespace()
        .skip(count)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First run of ASCII digits anywhere in `text`.
pub fn first_digits(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Parse a whole (trimmed) value as an unsigned integer.
pub fn parse_u32(field: &'static str, value: &str) -> Result<u32, ProbeError> {
    let trimmed = value.trim();
    trimmed
        .parse::<u32>()
        .map_err(|_| ProbeError::InvalidInteger {
            field,
            value: trimmed.to_string(),
        })
}

/// Parse the first integer found in `text`, failing with `ParseNotFound` when there is none.
pub fn first_integer(
    field: &'static str,
    text: &str,
    source_name: &str,
    marker: &str,
) -> Result<u32, ProbeError> {
    let digits = first_digits(text).ok_or_else(|| ProbeError::ParseNotFound {
        source_name: source_name.to_string(),
        marker: marker.to_string(),
    })?;
    parse_u32(field, digits)
}

/// Integer division that reports a zero processor count instead of panicking.
pub fn per_processor(field: &'static str, total: u32, processors: u32) -> Result<u32, ProbeError> {
    total
        .checked_div(processors)
        .ok_or(ProbeError::DivisionByZero { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_tokens_rejoins_with_single_spaces() {
        assert_eq!(
            drop_tokens("model name\t: Intel(R)  Core(TM) i7-8700K", 3),
            "Intel(R) Core(TM) i7-8700K"
        );
        assert_eq!(
            drop_tokens("System Version: macOS 14.1 (23B74)", 2),
            "macOS 14.1 (23B74)"
        );
        assert_eq!(drop_tokens("model name :", 3), "");
    }

    #[test]
    fn first_digits_skips_leading_text() {
        assert_eq!(first_digits("cpu cores\t: 12"), Some("12"));
        assert_eq!(
            first_digits("Total Number of Cores: 10 (8 performance and 2 efficiency)"),
            Some("10")
        );
        assert_eq!(first_digits("no numbers here"), None);
    }

    #[test]
    fn parse_u32_rejects_non_numeric_output() {
        assert_eq!(parse_u32("total_num_of_threads", "  8\n").ok(), Some(8));
        match parse_u32("total_num_of_threads", "eight") {
            Err(ProbeError::InvalidInteger { field, value }) => {
                assert_eq!(field, "total_num_of_threads");
                assert_eq!(value, "eight");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn first_integer_reports_missing_marker() {
        let err = first_integer("num_of_cores_of_a_processor", "", "/proc/cpuinfo", "cpu cores")
            .unwrap_err();
        assert!(matches!(
            err,
            ProbeError::ParseNotFound { ref marker, .. } if marker == "cpu cores"
        ));
    }

    #[test]
    fn per_processor_guards_zero_divisor() {
        assert_eq!(per_processor("cores", 8, 2).ok(), Some(4));
        assert!(matches!(
            per_processor("num_of_threads_of_a_processor", 8, 0),
            Err(ProbeError::DivisionByZero {
                field: "num_of_threads_of_a_processor"
            })
        ));
    }

    #[test]
    fn find_line_uses_substring_match() {
        let lines: Vec<&str> = trimmed_lines("  Chip: Apple M2\n\n  Memory: 16 GB\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(find_line(&lines, "Memory"), Some("Memory: 16 GB"));
        assert_eq!(find_line(&lines, "Processor Name"), None);
    }
}
