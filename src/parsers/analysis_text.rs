//! 模型回答的启发式解析
//!
//! 模型返回的是自由文本，这里逐行做关键词匹配（不区分大小写）把它拆成结构化结果。
//! 规则都以 (分类, 关键词表) 的形式放在常量里，按顺序匹配，第一个命中的生效。
//!
//! 已知弱点：候选人 / 选举名只截取关键词后面固定数量的单词，名字里带关键词时可能截错。

use crate::models::findings::{Findings, IssueType, Level, MissingOval, OtherIssue, Sections};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    GeneralObservations,
    SpecificFindings,
    Recommendations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    MissingOval,
    Confidence,
    GeneralIssue,
}

/// 最近创建的条目，供后续的置信度行补充说明
#[derive(Debug, Clone, Copy)]
enum LastItem {
    Oval(usize),
    Issue(usize),
}

type Rules<T> = &'static [(T, &'static [&'static str])];

/// 段落标题；标题行本身不记录
const SECTION_RULES: Rules<Section> = &[
    (
        Section::GeneralObservations,
        &["general observation", "overall", "summary"],
    ),
    (
        Section::SpecificFindings,
        &["specific finding", "findings", "issues found"],
    ),
    (
        Section::Recommendations,
        &["recommendation", "suggest", "next steps"],
    ),
];

const LINE_RULES: Rules<LineKind> = &[
    (
        LineKind::MissingOval,
        &[
            "missing oval",
            "no oval",
            "oval missing",
            "oval is missing",
            "ovals are missing",
            "without oval",
            "without an oval",
            "lacks oval",
            "lacks an oval",
            "missing its oval",
            "missing their oval",
        ],
    ),
    (
        LineKind::Confidence,
        &[
            "confidence:",
            "confidence level:",
            "high confidence",
            "medium confidence",
            "low confidence",
        ],
    ),
    (
        LineKind::GeneralIssue,
        &["issue", "problem", "error", "anomaly", "concern"],
    ),
];

const ISSUE_TYPE_RULES: Rules<IssueType> = &[
    (IssueType::Formatting, &["format", "layout", "alignment"]),
    (IssueType::Spelling, &["spelling", "misspell", "typo"]),
    (IssueType::MissingContent, &["missing", "absent", "not found"]),
];

const SEVERITY_RULES: Rules<Level> = &[
    (Level::High, &["critical", "severe", "major"]),
    (Level::Low, &["minor", "small", "slight"]),
];

const CONFIDENCE_RULES: Rules<Level> = &[
    (Level::High, &["high"]),
    (Level::Medium, &["medium"]),
    (Level::Low, &["low"]),
];

const CANDIDATE_MARKERS: &[&str] = &["for ", "candidate "];
const CANDIDATE_WORDS: usize = 3;

const CONTEST_KEYWORDS: &[&str] = &["contest", "race", "election", "office", "position"];
const CONTEST_WORDS: usize = 5;
/// 往前后各看几行找选举名
const CONTEXT_RANGE: usize = 3;

const CLEAN_SUMMARY: &str =
    "No issues detected. All candidates and choices appear to have proper voting ovals.";
const CLEAN_CONFIDENCE_SUMMARY: &str = "Analysis completed successfully with no concerns found.";
const MIXED_CONFIDENCE_SUMMARY: &str = "Mixed confidence levels in findings";

/// 把模型回答解析为 [`Findings`]
///
/// 任何输入都不会失败，匹配不上的行只是不被归类。
pub fn parse_analysis_text(analysis: &str) -> Findings {
    let lines: Vec<&str> = analysis.split('\n').collect();

    let mut findings = Findings {
        detailed_analysis: analysis.to_string(),
        ..Default::default()
    };
    let mut section: Option<Section> = None;
    let mut last_item: Option<LastItem> = None;

    for (index, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();

        if let Some(next) = classify(&lower, SECTION_RULES) {
            section = Some(next);
            continue;
        }

        match classify(&lower, LINE_RULES) {
            Some(LineKind::MissingOval) => {
                findings.missing_ovals.push(MissingOval {
                    description: strip_markdown(line),
                    candidate: extract_candidate(line),
                    contest: extract_contest(&lines, index),
                    confidence: classify(&lower, CONFIDENCE_RULES).unwrap_or_default(),
                    raw_text: line.to_string(),
                    confidence_details: None,
                });
                last_item = Some(LastItem::Oval(findings.missing_ovals.len() - 1));
            }
            Some(LineKind::Confidence) => {
                let details = Some(line.to_string());
                match last_item {
                    Some(LastItem::Oval(i)) => findings.missing_ovals[i].confidence_details = details,
                    Some(LastItem::Issue(i)) => findings.other_issues[i].confidence_details = details,
                    None => {}
                }
            }
            Some(LineKind::GeneralIssue) => {
                findings.other_issues.push(OtherIssue {
                    description: strip_markdown(line),
                    issue_type: classify(&lower, ISSUE_TYPE_RULES).unwrap_or(IssueType::General),
                    severity: classify(&lower, SEVERITY_RULES).unwrap_or_default(),
                    raw_text: line.to_string(),
                    confidence_details: None,
                });
                last_item = Some(LastItem::Issue(findings.other_issues.len() - 1));
            }
            None => {}
        }

        if let Some(section) = section {
            bucket(&mut findings.sections, section).push(strip_markdown(line));
        }
    }

    summarize(&mut findings);
    findings
}

/// 去掉粗体 / 斜体 / 标题标记
pub fn strip_markdown(text: &str) -> String {
    text.replace("**", "")
        .replace('*', "")
        .replace("##", "")
        .replace('#', "")
        .trim()
        .to_string()
}

/// 返回第一条命中的规则
fn classify<T: Copy>(lower: &str, rules: Rules<T>) -> Option<T> {
    rules
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(kind, _)| *kind)
}

fn bucket(sections: &mut Sections, section: Section) -> &mut Vec<String> {
    match section {
        Section::GeneralObservations => &mut sections.general_observations,
        Section::SpecificFindings => &mut sections.specific_findings,
        Section::Recommendations => &mut sections.recommendations,
    }
}

/// "for X Y Z" / "candidate X Y Z" 后面的前几个词
fn extract_candidate(line: &str) -> Option<String> {
    let lower = line.to_lowercase();

    for marker in CANDIDATE_MARKERS {
        if !lower.contains(marker) {
            continue;
        }
        // 大小写不一致时 split 找不到，继续下一个标记
        if let Some(after) = line.split(marker).nth(1) {
            let words: Vec<&str> = after.split(' ').take(CANDIDATE_WORDS).collect();
            let name = words.join(" ");
            return Some(name.trim_matches(|c| c == '.' || c == ',').to_string());
        }
    }

    None
}

/// 在附近几行里找 contest / race / ... 后面的文字
fn extract_contest(lines: &[&str], index: usize) -> Option<String> {
    let start = index.saturating_sub(CONTEXT_RANGE);
    let end = (index + CONTEXT_RANGE + 1).min(lines.len());

    for line in &lines[start..end] {
        let lower = line.to_lowercase();
        for keyword in CONTEST_KEYWORDS {
            if !lower.contains(keyword) {
                continue;
            }
            if let Some(after) = line.split(keyword).nth(1) {
                let trimmed = after.trim_matches(|c| matches!(c, '.' | ',' | ':' | ' '));
                let words: Vec<&str> = trimmed.split(' ').take(CONTEST_WORDS).collect();
                let name = words.join(" ");
                if !name.is_empty() {
                    return Some(name);
                }
            }
        }
    }

    None
}

fn summarize(findings: &mut Findings) {
    findings.recount();

    let missing = findings.missing_ovals.len();
    let other = findings.other_issues.len();

    if missing == 0 && other == 0 {
        findings.summary = CLEAN_SUMMARY.to_string();
        findings.confidence_summary = CLEAN_CONFIDENCE_SUMMARY.to_string();
        return;
    }

    let mut parts = Vec::new();
    if missing > 0 {
        parts.push(plural(missing, "missing oval"));
    }
    if other > 0 {
        parts.push(plural(other, "other issue"));
    }
    findings.summary = format!("Found {} that require attention.", parts.join(" and "));

    let high = findings.high_confidence_count();
    findings.confidence_summary = if high > 0 {
        plural(high, "high-confidence finding")
    } else {
        MIXED_CONFIDENCE_SUMMARY.to_string()
    };
}

fn plural(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}
