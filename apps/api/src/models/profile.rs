use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grading scale a GPA is reported on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpaScale {
    #[default]
    #[serde(rename = "4.0")]
    Four,
    #[serde(rename = "5.0")]
    Five,
    #[serde(rename = "100")]
    Hundred,
}

impl GpaScale {
    pub fn max(self) -> f64 {
        match self {
            GpaScale::Four => 4.0,
            GpaScale::Five => 5.0,
            GpaScale::Hundred => 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestKind {
    Toefl,
    Ielts,
    Gre,
    Gmat,
}

/// Tests in the same family can be compared after conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFamily {
    Language,
    Graduate,
}

impl TestKind {
    pub fn family(self) -> TestFamily {
        match self {
            TestKind::Toefl | TestKind::Ielts => TestFamily::Language,
            TestKind::Gre | TestKind::Gmat => TestFamily::Graduate,
        }
    }

    pub fn scale_max(self) -> f64 {
        match self {
            TestKind::Toefl => 120.0,
            TestKind::Ielts => 9.0,
            TestKind::Gre => 340.0,
            TestKind::Gmat => 800.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TestKind::Toefl => "TOEFL",
            TestKind::Ielts => "IELTS",
            TestKind::Gre => "GRE",
            TestKind::Gmat => "GMAT",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TOEFL" => Ok(TestKind::Toefl),
            "IELTS" => Ok(TestKind::Ielts),
            "GRE" => Ok(TestKind::Gre),
            "GMAT" => Ok(TestKind::Gmat),
            other => Err(format!("unknown test type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestScore {
    pub kind: TestKind,
    pub total: f64,
}

impl TestScore {
    pub fn new(kind: TestKind, total: f64) -> Self {
        Self { kind, total }
    }

    /// Present and on the test's own scale.
    pub fn is_valid(&self) -> bool {
        self.total.is_finite() && self.total > 0.0 && self.total <= self.kind.scale_max()
    }
}

/// One research / internship / other entry. Accepts the `name` or `company` key for the title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default, alias = "name", alias = "company")]
    pub title: String,
    #[serde(default, alias = "position")]
    pub role: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Experience {
    pub fn text(&self) -> String {
        [
            self.title.as_str(),
            self.role.as_deref().unwrap_or_default(),
            self.description.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConstraints {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub majors: Vec<String>,
    #[serde(default)]
    pub degree_type: Option<String>,
}

/// The applicant's background. Immutable once an analysis task starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub institution: String,
    pub major: String,
    pub gpa: f64,
    #[serde(default)]
    pub gpa_scale: GpaScale,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub tests: Vec<TestScore>,
    #[serde(default)]
    pub research_experiences: Vec<Experience>,
    #[serde(default)]
    pub internship_experiences: Vec<Experience>,
    #[serde(default)]
    pub other_experiences: Vec<Experience>,
    #[serde(default)]
    pub targets: TargetConstraints,
}

impl Profile {
    /// First TOEFL or IELTS score, the one compared against case language scores.
    pub fn language_test(&self) -> Option<&TestScore> {
        self.tests
            .iter()
            .find(|t| t.kind.family() == TestFamily::Language)
    }

    /// All experience entries flattened into one text blob for similarity matching.
    pub fn experience_text(&self) -> String {
        self.research_experiences
            .iter()
            .chain(&self.internship_experiences)
            .chain(&self.other_experiences)
            .map(Experience::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Checks the fields an analysis cannot run without. Returns a readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if self.institution.trim().is_empty() || self.major.trim().is_empty() {
            return Err("institution and major are required".to_string());
        }
        if self.targets.countries.is_empty() || self.targets.majors.is_empty() {
            return Err("at least one target country and target major are required".to_string());
        }
        if !self.gpa.is_finite() || self.gpa <= 0.0 || self.gpa > self.gpa_scale.max() {
            return Err(format!(
                "gpa must be between 0 and {} for the selected scale",
                self.gpa_scale.max()
            ));
        }
        if let Some(test) = self.tests.iter().find(|t| !t.is_valid()) {
            return Err(format!(
                "{} score must be between 0 and {}",
                test.kind,
                test.kind.scale_max()
            ));
        }
        Ok(())
    }
}
