//! Tier Resolver: maps an institution name to a coarse prestige tier and its fixed score.
//!
//! Lookup is an exact match on the trimmed name. Anything not in the table lands in
//! `Tier::Four`. The built-in table can be replaced at startup from a JSON file in the
//! `{ "tier_definitions": ..., "university_tiers": ... }` layout.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Ordered prestige tiers. `Zero` is the most prestigious, `Four` is the default bucket.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Tier {
    Zero,
    One,
    Two,
    Three,
    #[default]
    Four,
}

impl Tier {
    pub const ALL: [Tier; 5] = [Tier::Zero, Tier::One, Tier::Two, Tier::Three, Tier::Four];

    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Number of tiers between `self` and `other`.
    pub fn distance(self, other: Tier) -> u8 {
        self.rank().abs_diff(other.rank())
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Zero => "Tier 0",
            Tier::One => "Tier 1",
            Tier::Two => "Tier 2",
            Tier::Three => "Tier 3",
            Tier::Four => "Tier 4",
        }
    }

    /// Parses a tier label. Unknown labels return `None`.
    pub fn parse(label: &str) -> Option<Tier> {
        let normalized = label.trim().to_ascii_lowercase().replace(['_', ' '], "");
        match normalized.as_str() {
            "tier0" | "0" => Some(Tier::Zero),
            "tier1" | "1" => Some(Tier::One),
            "tier2" | "2" => Some(Tier::Two),
            "tier3" | "3" => Some(Tier::Three),
            "tier4" | "4" => Some(Tier::Four),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Case rows carry free-form tier labels ("Tier 2", "未知", ""). Unknown labels are unranked.
impl From<String> for Tier {
    fn from(label: String) -> Self {
        Tier::parse(&label).unwrap_or_default()
    }
}

impl From<Tier> for String {
    fn from(tier: Tier) -> Self {
        tier.label().to_string()
    }
}

#[derive(Debug, Error)]
pub enum TierTableError {
    #[error("failed to read tier table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tier table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown tier label '{0}' in tier table")]
    UnknownTier(String),

    #[error("tier table is missing a fixed score for {0}")]
    MissingScore(Tier),
}

#[derive(Debug, Deserialize)]
struct TierDefinition {
    fixed_score: f64,
}

/// On-disk layout of the tier table.
#[derive(Debug, Deserialize)]
struct TierTableFile {
    tier_definitions: HashMap<String, TierDefinition>,
    #[serde(default)]
    university_tiers: HashMap<String, Vec<String>>,
}

/// Static institution → tier lookup with a fixed score per tier.
#[derive(Debug, Clone)]
pub struct TierResolver {
    by_name: HashMap<String, Tier>,
    scores: [f64; 5],
    source: String,
}

impl TierResolver {
    /// Resolves an institution name. Total: unknown or empty names map to `Tier::Four`.
    pub fn resolve(&self, institution: &str) -> (f64, Tier) {
        let cleaned = institution.trim();
        let tier = self.by_name.get(cleaned).copied().unwrap_or_default();
        debug!(institution = cleaned, tier = %tier, "resolved institution tier");
        (self.score(tier), tier)
    }

    pub fn tier_of(&self, institution: &str) -> Tier {
        self.resolve(institution).1
    }

    pub fn score(&self, tier: Tier) -> f64 {
        self.scores[tier.rank() as usize]
    }

    /// Where the table came from ("builtin" or a file path). Reported by /health.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn from_json(raw: &str, source: impl Into<String>) -> Result<Self, TierTableError> {
        let file: TierTableFile = serde_json::from_str(raw)?;

        let mut scores = [None; 5];
        for (label, definition) in &file.tier_definitions {
            let tier = Tier::parse(label).ok_or_else(|| TierTableError::UnknownTier(label.clone()))?;
            scores[tier.rank() as usize] = Some(definition.fixed_score);
        }

        let mut resolved = [0.0; 5];
        for tier in Tier::ALL {
            resolved[tier.rank() as usize] =
                scores[tier.rank() as usize].ok_or(TierTableError::MissingScore(tier))?;
        }

        let mut by_name = HashMap::new();
        for (label, names) in &file.university_tiers {
            let tier = Tier::parse(label).ok_or_else(|| TierTableError::UnknownTier(label.clone()))?;
            for name in names {
                by_name.insert(name.trim().to_string(), tier);
            }
        }

        Ok(Self {
            by_name,
            scores: resolved,
            source: source.into(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, TierTableError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TierTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let resolver = Self::from_json(&raw, path.display().to_string())?;
        info!(
            "Loaded tier table from {} ({} institutions)",
            path.display(),
            resolver.by_name.len()
        );
        Ok(resolver)
    }
}

/// Fixed score per tier: the midpoint of each tier's capability band
/// (99–100, 95–98, 85–94, 75–84, 60–74).
const BUILTIN_SCORES: [f64; 5] = [99.0, 96.0, 89.0, 79.0, 67.0];

const TIER_0: &[&str] = &["清华大学", "北京大学"];

const TIER_1: &[&str] = &[
    "北京航空航天大学",
    "北京理工大学",
    "中国人民大学",
    "哈尔滨工业大学",
    "复旦大学",
    "南京大学",
    "浙江大学",
    "中国科学技术大学",
    "上海交通大学",
    "西安交通大学",
];

const TIER_2: &[&str] = &[
    "中国农业大学",
    "南开大学",
    "北京师范大学",
    "天津大学",
    "吉林大学",
    "大连理工大学",
    "同济大学",
    "东北大学",
    "华东师范大学",
    "东南大学",
    "厦门大学",
    "山东大学",
    "中国海洋大学",
    "武汉大学",
    "华中科技大学",
    "湖南大学",
    "中南大学",
    "国防科学技术大学",
    "中山大学",
    "华南理工大学",
    "四川大学",
    "电子科技大学",
    "重庆大学",
    "西北工业大学",
    "西北农林科技大学",
    "兰州大学",
    "中央民族大学",
    "南方科技大学",
    "深圳大学",
    "上海财经大学",
    "对外经济贸易大学",
    "中央财经大学",
    "中国政法大学",
    "西安电子科技大学",
    "北京邮电大学",
    "南京航空航天大学",
    "南京理工大学",
    "西南财经大学",
    "华中师范大学",
    "中国科学院大学",
    "首都医科大学",
    "东北财经大学",
    "上海科技大学",
];

const TIER_3: &[&str] = &[
    "北京交通大学",
    "北京工业大学",
    "北京科技大学",
    "北京化工大学",
    "北京林业大学",
    "中国传媒大学",
    "中央音乐学院",
    "北京中医药大学",
    "北京外国语大学",
    "中国地质大学(北京)",
    "中国矿业大学(北京)",
    "中国石油大学(北京)",
    "华北电力大学",
    "北京体育大学",
    "上海外国语大学",
    "上海大学",
    "东华大学",
    "华东理工大学",
    "第二军医大学",
    "天津医科大学",
    "苏州大学",
    "中国矿业大学",
    "南京邮电大学",
    "河海大学",
    "江南大学",
    "南京农业大学",
    "南京师范大学",
    "中国药科大学",
    "西北大学",
    "长安大学",
    "陕西师范大学",
    "第四军医大学",
    "武汉理工大学",
    "中南财经政法大学",
    "华中农业大学",
    "中国地质大学(武汉)",
    "西南交通大学",
    "四川农业大学",
    "哈尔滨工程大学",
    "东北林业大学",
    "东北农业大学",
    "辽宁大学",
    "大连海事大学",
    "东北师范大学",
    "延边大学",
    "暨南大学",
    "华南师范大学",
    "湖南师范大学",
    "安徽大学",
    "合肥工业大学",
    "河北工业大学",
    "郑州大学",
    "中国石油大学(华东)",
    "新疆大学",
    "石河子大学",
    "云南大学",
    "广西大学",
    "贵州大学",
    "海南大学",
    "内蒙古大学",
    "南昌大学",
    "宁夏大学",
    "青海大学",
    "太原理工大学",
    "西藏大学",
    "福州大学",
];

impl Default for TierResolver {
    fn default() -> Self {
        let mut by_name = HashMap::new();
        for (tier, names) in [
            (Tier::Zero, TIER_0),
            (Tier::One, TIER_1),
            (Tier::Two, TIER_2),
            (Tier::Three, TIER_3),
        ] {
            for name in names {
                by_name.insert((*name).to_string(), tier);
            }
        }

        Self {
            by_name,
            scores: BUILTIN_SCORES,
            source: "builtin".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_exact_match_resolves_tier_and_score() {
        let resolver = TierResolver::default();
        assert_eq!(resolver.resolve("清华大学"), (99.0, Tier::Zero));
        assert_eq!(resolver.resolve("浙江大学"), (96.0, Tier::One));
        assert_eq!(resolver.resolve("福州大学"), (79.0, Tier::Three));
    }

    #[test]
    fn test_name_is_trimmed_before_lookup() {
        let resolver = TierResolver::default();
        assert_eq!(resolver.tier_of("  复旦大学 \n"), Tier::One);
    }

    #[test]
    fn test_unknown_and_empty_names_default_to_tier_four() {
        let resolver = TierResolver::default();
        assert_eq!(resolver.resolve("Unknown Polytechnic"), (67.0, Tier::Four));
        assert_eq!(resolver.resolve(""), (67.0, Tier::Four));
    }

    #[test]
    fn test_no_fuzzy_matching() {
        let resolver = TierResolver::default();
        // Substring of a Tier 1 name is not a match.
        assert_eq!(resolver.tier_of("浙江"), Tier::Four);
    }

    #[test]
    fn test_scores_decrease_with_tier() {
        let resolver = TierResolver::default();
        for pair in Tier::ALL.windows(2) {
            assert!(resolver.score(pair[0]) > resolver.score(pair[1]));
        }
    }

    #[test]
    fn test_tier_label_serde() {
        let tier: Tier = serde_json::from_str(r#""Tier 2""#).unwrap();
        assert_eq!(tier, Tier::Two);
        let unknown: Tier = serde_json::from_str(r#""未知""#).unwrap();
        assert_eq!(unknown, Tier::Four);
        assert_eq!(serde_json::to_string(&Tier::One).unwrap(), r#""Tier 1""#);
    }

    #[test]
    fn test_distance_is_symmetric() {
        assert_eq!(Tier::Zero.distance(Tier::Four), 4);
        assert_eq!(Tier::Four.distance(Tier::Zero), 4);
        assert_eq!(Tier::Two.distance(Tier::Two), 0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "tier_definitions": {{
                    "Tier 0": {{"fixed_score": 100}},
                    "Tier 1": {{"fixed_score": 90}},
                    "Tier 2": {{"fixed_score": 80}},
                    "Tier 3": {{"fixed_score": 70}},
                    "Tier 4": {{"fixed_score": 60}}
                }},
                "university_tiers": {{
                    "Tier 1": ["Example University"]
                }}
            }}"#
        )
        .unwrap();

        let resolver = TierResolver::from_file(file.path()).unwrap();
        assert_eq!(resolver.resolve("Example University"), (90.0, Tier::One));
        assert_eq!(resolver.resolve("清华大学"), (60.0, Tier::Four));
        assert_ne!(resolver.source(), "builtin");
    }

    #[test]
    fn test_load_rejects_missing_tier_score() {
        let raw = r#"{"tier_definitions": {"Tier 0": {"fixed_score": 100}}}"#;
        let err = TierResolver::from_json(raw, "inline").unwrap_err();
        assert!(matches!(err, TierTableError::MissingScore(Tier::One)));
    }

    #[test]
    fn test_load_rejects_unknown_label() {
        let raw = r#"{"tier_definitions": {"Tier 9": {"fixed_score": 1}}}"#;
        let err = TierResolver::from_json(raw, "inline").unwrap_err();
        assert!(matches!(err, TierTableError::UnknownTier(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TierResolver::from_file(Path::new("/nonexistent/tiers.json")).unwrap_err();
        assert!(matches!(err, TierTableError::Io { .. }));
    }
}
