//! Major categories and the free-form major name → category lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MajorCategory {
    #[serde(rename = "CS")]
    ComputerScience,
    #[serde(rename = "EE")]
    ElectricalEngineering,
    #[serde(rename = "ME")]
    MechanicalEngineering,
    Finance,
    Business,
    #[default]
    #[serde(other)]
    Other,
}

impl MajorCategory {
    /// Categories close enough to count as a partial match.
    pub fn related(self) -> &'static [MajorCategory] {
        use MajorCategory::*;
        match self {
            ComputerScience => &[ElectricalEngineering, MechanicalEngineering],
            ElectricalEngineering => &[ComputerScience, MechanicalEngineering],
            MechanicalEngineering => &[ComputerScience, ElectricalEngineering],
            Finance => &[Business],
            Business => &[Finance],
            Other => &[],
        }
    }

    pub fn is_related_to(self, other: MajorCategory) -> bool {
        self.related().contains(&other)
    }

    /// Parses a stored category code ("CS", "EE", ...). Unknown codes are `Other`.
    pub fn from_code(code: &str) -> MajorCategory {
        match code.trim() {
            "CS" => MajorCategory::ComputerScience,
            "EE" => MajorCategory::ElectricalEngineering,
            "ME" => MajorCategory::MechanicalEngineering,
            "Finance" => MajorCategory::Finance,
            "Business" => MajorCategory::Business,
            _ => MajorCategory::Other,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            MajorCategory::ComputerScience => "CS",
            MajorCategory::ElectricalEngineering => "EE",
            MajorCategory::MechanicalEngineering => "ME",
            MajorCategory::Finance => "Finance",
            MajorCategory::Business => "Business",
            MajorCategory::Other => "Other",
        }
    }
}

impl fmt::Display for MajorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

const MAJOR_TABLE: &[(&str, MajorCategory)] = &[
    ("计算机科学与技术", MajorCategory::ComputerScience),
    ("软件工程", MajorCategory::ComputerScience),
    ("网络工程", MajorCategory::ComputerScience),
    ("信息安全", MajorCategory::ComputerScience),
    ("数据科学与大数据技术", MajorCategory::ComputerScience),
    ("人工智能", MajorCategory::ComputerScience),
    ("物联网工程", MajorCategory::ComputerScience),
    ("computer science", MajorCategory::ComputerScience),
    ("software engineering", MajorCategory::ComputerScience),
    ("data science", MajorCategory::ComputerScience),
    ("电子信息工程", MajorCategory::ElectricalEngineering),
    ("通信工程", MajorCategory::ElectricalEngineering),
    ("电气工程及其自动化", MajorCategory::ElectricalEngineering),
    ("自动化", MajorCategory::ElectricalEngineering),
    ("电子科学与技术", MajorCategory::ElectricalEngineering),
    ("electrical engineering", MajorCategory::ElectricalEngineering),
    ("机械工程", MajorCategory::MechanicalEngineering),
    ("机械设计制造及其自动化", MajorCategory::MechanicalEngineering),
    ("mechanical engineering", MajorCategory::MechanicalEngineering),
    ("金融学", MajorCategory::Finance),
    ("经济学", MajorCategory::Finance),
    ("国际经济与贸易", MajorCategory::Finance),
    ("finance", MajorCategory::Finance),
    ("economics", MajorCategory::Finance),
    ("工商管理", MajorCategory::Business),
    ("市场营销", MajorCategory::Business),
    ("会计学", MajorCategory::Business),
    ("business administration", MajorCategory::Business),
    ("accounting", MajorCategory::Business),
    ("marketing", MajorCategory::Business),
];

/// Resolves a major name to its category.
///
/// Exact (case-insensitive) match first, then containment in either direction,
/// first table entry wins. Empty names are `Other`.
pub fn categorize_major(major: &str) -> MajorCategory {
    let name = major.trim().to_lowercase();
    if name.is_empty() {
        return MajorCategory::Other;
    }

    if let Some((_, category)) = MAJOR_TABLE.iter().find(|(known, _)| *known == name) {
        return *category;
    }

    MAJOR_TABLE
        .iter()
        .find(|(known, _)| name.contains(known) || known.contains(name.as_str()))
        .map(|(_, category)| *category)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(categorize_major("软件工程"), MajorCategory::ComputerScience);
        assert_eq!(categorize_major("金融学"), MajorCategory::Finance);
        assert_eq!(categorize_major("Computer Science"), MajorCategory::ComputerScience);
    }

    #[test]
    fn test_containment_match() {
        assert_eq!(
            categorize_major("计算机科学与技术(卓越班)"),
            MajorCategory::ComputerScience
        );
        assert_eq!(categorize_major("Applied Economics"), MajorCategory::Finance);
    }

    #[test]
    fn test_unknown_is_other() {
        assert_eq!(categorize_major("历史学"), MajorCategory::Other);
        assert_eq!(categorize_major("   "), MajorCategory::Other);
    }

    #[test]
    fn test_relatedness_is_symmetric() {
        use MajorCategory::*;
        let all = [
            ComputerScience,
            ElectricalEngineering,
            MechanicalEngineering,
            Finance,
            Business,
            Other,
        ];
        for a in all {
            for b in all {
                assert_eq!(a.is_related_to(b), b.is_related_to(a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_serde_codes() {
        let category: MajorCategory = serde_json::from_str(r#""EE""#).unwrap();
        assert_eq!(category, MajorCategory::ElectricalEngineering);
        let unknown: MajorCategory = serde_json::from_str(r#""Biology""#).unwrap();
        assert_eq!(unknown, MajorCategory::Other);
        assert_eq!(
            serde_json::to_string(&MajorCategory::ComputerScience).unwrap(),
            r#""CS""#
        );
    }
}
