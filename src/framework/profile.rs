//! Parser for the per-test coverage profile emitted by instrumented test
//! binaries.
//!
//! Line-oriented text. A `_testName:<name>` sentinel opens a test's section;
//! everything until the next sentinel belongs to that test. Data lines have
//! the shape `path:startLine.startCol,endLine.endCol numStatements count`;
//! entries with `count <= 0` were never executed and are discarded. A leading
//! `mode:` header is tolerated.

use log::debug;
use std::collections::HashMap;

use crate::core::Scope;

pub const TEST_SENTINEL: &str = "_testName";

pub fn parse_per_test_profile(text: &str) -> HashMap<String, Vec<Scope>> {
    let mut coverage: HashMap<String, Vec<Scope>> = HashMap::new();
    let mut current_test: Option<String> = None;

    for line in text.lines() {
        let Some((head, rest)) = line.split_once(':') else {
            continue;
        };
        let head = head.trim();

        if head == TEST_SENTINEL {
            let name = rest.trim().to_string();
            coverage.entry(name.clone()).or_default();
            current_test = Some(name);
            continue;
        }
        if head == "mode" {
            continue;
        }
        let Some(test_name) = current_test.as_ref() else {
            continue;
        };

        match parse_data_line(head, rest) {
            Some(Some(scope)) => {
                coverage.entry(test_name.clone()).or_default().push(scope);
            }
            Some(None) => {} // uncovered, discarded
            None => debug!("skipping malformed coverage line: {line}"),
        }
    }

    coverage
}

/// `Some(Some(scope))` for a covered block, `Some(None)` for an uncovered one,
/// `None` when the line does not parse.
fn parse_data_line(path: &str, rest: &str) -> Option<Option<Scope>> {
    let mut fields = rest.split_whitespace();
    let coordinates = fields.next()?;
    let _num_statements = fields.next()?;
    let count: i64 = fields.next()?.parse().ok()?;

    let (start, end) = coordinates.split_once(',')?;
    let (start_line, start_col) = parse_position(start)?;
    let (end_line, end_col) = parse_position(end)?;

    if count <= 0 {
        return Some(None);
    }

    Some(Some(Scope {
        path: path.to_string(),
        func_name: String::new(),
        start_line,
        start_col,
        end_line,
        end_col,
    }))
}

fn parse_position(position: &str) -> Option<(usize, usize)> {
    let (line, col) = position.split_once('.')?;
    Some((line.parse().ok()?, col.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn splits_sections_per_test() {
        let profile = indoc! {"
            mode: set
            _testName:TestAdd
            pkg/math.go:3.2,5.10 2 1
            pkg/math.go:8.2,9.4 1 1
            _testName:TestSub
            pkg/math.go:12.2,14.10 2 1
        "};

        let coverage = parse_per_test_profile(profile);
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage["TestAdd"].len(), 2);
        assert_eq!(coverage["TestSub"].len(), 1);

        let first = &coverage["TestAdd"][0];
        assert_eq!(first.path, "pkg/math.go");
        assert_eq!(first.start_line, 3);
        assert_eq!(first.start_col, 2);
        assert_eq!(first.end_line, 5);
        assert_eq!(first.end_col, 10);
        assert!(first.func_name.is_empty());
    }

    #[test]
    fn uncovered_blocks_are_discarded() {
        let profile = indoc! {"
            mode: set
            _testName:TestAdd
            pkg/math.go:3.2,5.10 2 0
            pkg/math.go:8.2,9.4 1 -1
            pkg/math.go:12.2,14.10 2 3
        "};

        let coverage = parse_per_test_profile(profile);
        assert_eq!(coverage["TestAdd"].len(), 1);
        assert_eq!(coverage["TestAdd"][0].start_line, 12);
    }

    #[test]
    fn test_with_only_uncovered_blocks_still_gets_an_entry() {
        let profile = indoc! {"
            mode: set
            _testName:TestIdle
            pkg/math.go:3.2,5.10 2 0
        "};

        let coverage = parse_per_test_profile(profile);
        assert_eq!(coverage["TestIdle"].len(), 0);
    }

    #[test]
    fn malformed_and_headerless_lines_are_skipped() {
        let profile = indoc! {"
            mode: set
            pkg/math.go:3.2,5.10 2 1
            _testName:TestAdd
            not a data line
            pkg/math.go:garbage 2 1
            pkg/math.go:3.2,5.10 2 1
        "};

        let coverage = parse_per_test_profile(profile);
        // Data before the first sentinel has no owner and is dropped.
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage["TestAdd"].len(), 1);
    }
}
