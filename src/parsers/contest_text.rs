//! 候选人文本解析
//!
//! 输入格式：顶格的行是选举名称，可带 `(N)` 表示应选人数；
//! 缩进的行属于当前选举，`Reporting Units:` 开头的是报告单位，其余是候选人。
//!
//! ```text
//! Mayor (1)
//!  Reporting Units: 12
//!  Alice Smith
//!  Bob Jones
//! ```

use crate::models::contest::ContestDataset;

const REPORTING_UNITS_LABEL: &str = "Reporting Units:";
const DEFAULT_VOTE_FOR: u32 = 1;

/// 解析候选人文本，按出现顺序返回所有选举
///
/// 纯函数，不会失败：空文本返回空列表，无法归属的缩进行直接丢弃。
pub fn parse_contest_text(text: &str) -> Vec<ContestDataset> {
    let mut contests = Vec::new();
    let mut current: Option<ContestDataset> = None;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        // 顶格：新的选举
        if !line.starts_with(|c: char| c == ' ' || c == '\t') {
            if let Some(finished) = current.take() {
                contests.push(finished);
            }
            current = Some(parse_header(line));
            continue;
        }

        // 缩进：还没有选举可以挂靠时丢弃
        let Some(contest) = current.as_mut() else {
            continue;
        };

        let content = line.trim();
        match content.strip_prefix(REPORTING_UNITS_LABEL) {
            Some(units) => contest.reporting_units = units.trim().to_string(),
            None => contest.candidates.push(content.to_string()),
        }
    }

    contests.extend(current);
    contests
}

/// 解析选举名称行：`Title (N)`
fn parse_header(line: &str) -> ContestDataset {
    if line.contains(')') {
        if let Some((title, rest)) = line.split_once('(') {
            let count = rest.split_once(')').map_or(rest, |(count, _)| count);
            let vote_for = count
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .unwrap_or(DEFAULT_VOTE_FOR);

            let title = match title.trim() {
                "" => line.trim(),
                t => t,
            };
            return ContestDataset::new(title, vote_for);
        }
    }

    ContestDataset::new(line.trim(), DEFAULT_VOTE_FOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mayor_example() {
        let text = "Mayor (1)\n Reporting Units: 12\n Alice Smith\n Bob Jones\n";
        let contests = parse_contest_text(text);

        assert_eq!(contests.len(), 1);
        assert_eq!(contests[0].title, "Mayor");
        assert_eq!(contests[0].vote_for, 1);
        assert_eq!(contests[0].reporting_units, "12");
        assert_eq!(contests[0].candidates, vec!["Alice Smith", "Bob Jones"]);
    }

    #[test]
    fn test_vote_for_variants() {
        let parse_one = |line: &str| parse_contest_text(line).remove(0);

        assert_eq!(parse_one("City Council (3)").vote_for, 3);
        assert_eq!(parse_one("City Council (3)").title, "City Council");
        assert_eq!(parse_one("Treasurer").vote_for, 1);
        assert_eq!(parse_one("Treasurer (abc)").vote_for, 1);
        assert_eq!(parse_one("Treasurer (abc)").title, "Treasurer");
        assert_eq!(parse_one("Treasurer ( 2 )").vote_for, 2);
        assert_eq!(parse_one("Treasurer (0)").vote_for, 1);
    }

    #[test]
    fn test_header_without_closing_paren_is_plain_title() {
        let contests = parse_contest_text("Judge (Seat 4");
        assert_eq!(contests[0].title, "Judge (Seat 4");
        assert_eq!(contests[0].vote_for, 1);
    }

    #[test]
    fn test_header_with_only_count_keeps_full_line() {
        let contests = parse_contest_text("(2)\n  Someone");
        assert_eq!(contests[0].title, "(2)");
        assert_eq!(contests[0].vote_for, 2);
    }

    #[test]
    fn test_multiple_contests_keep_order() {
        let text = "Mayor (1)\n  Alice\n\n\tBob\nProposition A\n  Yes\n  No\nSheriff (1)\n";
        let contests = parse_contest_text(text);

        let titles: Vec<&str> = contests.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Mayor", "Proposition A", "Sheriff"]);
        assert_eq!(contests[0].candidates, vec!["Alice", "Bob"]);
        assert_eq!(contests[1].candidates, vec!["Yes", "No"]);
        assert!(contests[2].candidates.is_empty());
    }

    #[test]
    fn test_indented_lines_before_first_contest_are_dropped() {
        let text = "   Orphan Candidate\n  Reporting Units: 4\nMayor\n  Alice";
        let contests = parse_contest_text(text);

        assert_eq!(contests.len(), 1);
        assert_eq!(contests[0].candidates, vec!["Alice"]);
        assert_eq!(contests[0].reporting_units, "");
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(parse_contest_text("").is_empty());
        assert!(parse_contest_text("   \n\t\n  ").is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let contests = parse_contest_text("Mayor (2)\r\n  Alice\r\n  Bob\r\n");
        assert_eq!(contests[0].vote_for, 2);
        assert_eq!(contests[0].candidates, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let text = "Mayor (1)\n Reporting Units: 12\n Alice Smith\nCouncil (2)\n Carol\n Dan\n";
        assert_eq!(parse_contest_text(text), parse_contest_text(text));
    }
}
