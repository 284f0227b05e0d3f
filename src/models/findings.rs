use serde::{Deserialize, Serialize};

/// 置信度 / 严重程度共用的三档
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    High,
    #[default]
    Medium,
    Low,
}

/// 其他问题的类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Formatting,
    Spelling,
    MissingContent,
    General,
}

/// 缺少投票椭圆的候选人
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissingOval {
    pub description: String,
    pub candidate: Option<String>,
    pub contest: Option<String>,
    pub confidence: Level,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence_details: Option<String>,
}

/// 其他视觉问题
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtherIssue {
    pub description: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Level,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence_details: Option<String>,
}

/// 按段落归类的原文
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Sections {
    pub general_observations: Vec<String>,
    pub specific_findings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// 模型回答的结构化结果
///
/// `total_issues` 总是由两个列表的长度重新计算，不单独赋值。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Findings {
    pub missing_ovals: Vec<MissingOval>,
    pub other_issues: Vec<OtherIssue>,
    pub summary: String,
    pub confidence_summary: String,
    pub total_issues: usize,
    pub detailed_analysis: String,
    pub sections: Sections,
}

impl Findings {
    pub fn recount(&mut self) {
        self.total_issues = self.missing_ovals.len() + self.other_issues.len();
    }

    pub fn high_confidence_count(&self) -> usize {
        self.missing_ovals
            .iter()
            .filter(|oval| oval.confidence == Level::High)
            .count()
    }
}
