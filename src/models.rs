use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillCategories {
    #[serde(default)]
    pub programming_languages: Vec<String>,
    #[serde(default)]
    pub frameworks_and_tools: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillCategory {
    ProgrammingLanguages,
    FrameworksAndTools,
    Certifications,
    Technologies,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 4] = [
        SkillCategory::ProgrammingLanguages,
        SkillCategory::FrameworksAndTools,
        SkillCategory::Certifications,
        SkillCategory::Technologies,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SkillCategory::ProgrammingLanguages => "Programming Languages",
            SkillCategory::FrameworksAndTools => "Frameworks & Tools",
            SkillCategory::Certifications => "Certifications",
            SkillCategory::Technologies => "Technologies",
        }
    }
}

impl FromStr for SkillCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "programming_languages" | "languages" => Ok(SkillCategory::ProgrammingLanguages),
            "frameworks_and_tools" | "frameworks" | "tools" => Ok(SkillCategory::FrameworksAndTools),
            "certifications" => Ok(SkillCategory::Certifications),
            "technologies" => Ok(SkillCategory::Technologies),
            _ => Err(format!(
                "Unknown skill category '{}'. Available: programming_languages, frameworks_and_tools, certifications, technologies",
                s
            )),
        }
    }
}

impl SkillCategories {
    pub fn get(&self, category: SkillCategory) -> &[String] {
        match category {
            SkillCategory::ProgrammingLanguages => &self.programming_languages,
            SkillCategory::FrameworksAndTools => &self.frameworks_and_tools,
            SkillCategory::Certifications => &self.certifications,
            SkillCategory::Technologies => &self.technologies,
        }
    }

    fn get_mut(&mut self, category: SkillCategory) -> &mut Vec<String> {
        match category {
            SkillCategory::ProgrammingLanguages => &mut self.programming_languages,
            SkillCategory::FrameworksAndTools => &mut self.frameworks_and_tools,
            SkillCategory::Certifications => &mut self.certifications,
            SkillCategory::Technologies => &mut self.technologies,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemotePreference {
    #[default]
    Remote,
    Hybrid,
    Onsite,
}

impl fmt::Display for RemotePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemotePreference::Remote => "remote",
            RemotePreference::Hybrid => "hybrid",
            RemotePreference::Onsite => "onsite",
        };
        f.pad(s)
    }
}

impl FromStr for RemotePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" => Ok(RemotePreference::Remote),
            "hybrid" => Ok(RemotePreference::Hybrid),
            "onsite" | "on-site" => Ok(RemotePreference::Onsite),
            _ => Err(format!("Unknown remote preference '{}'. Use remote, hybrid or onsite", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub skills: SkillCategories,
    pub experience_years: f64,
    #[serde(default)]
    pub preferred_roles: Vec<String>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    pub weekly_application_goal: u32,
    #[serde(default)]
    pub preferred_industries: Vec<String>,
    #[serde(default)]
    pub remote_preference: RemotePreference,
}

impl UserProfile {
    /// Returns a copy with `skill` appended to `category`. Blank input leaves
    /// the profile unchanged.
    pub fn with_skill_added(&self, category: SkillCategory, skill: &str) -> UserProfile {
        let mut updated = self.clone();
        let skill = skill.trim();
        if !skill.is_empty() {
            updated.skills.get_mut(category).push(skill.to_string());
        }
        updated
    }

    pub fn with_skill_removed(&self, category: SkillCategory, skill: &str) -> UserProfile {
        let mut updated = self.clone();
        updated.skills.get_mut(category).retain(|s| s != skill);
        updated
    }
}

/// Splits a comma-separated form value into trimmed, non-empty entries.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(alias = "id")]
    pub job_id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(alias = "application_url")]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<Vec<String>>,
    #[serde(default)]
    pub salary_range: Option<SalaryRange>,
    #[serde(default)]
    pub posted_date: Option<String>,
    #[serde(default)]
    pub is_remote: Option<bool>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Interviewing,
    Offered,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Interviewing,
        ApplicationStatus::Offered,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                format!(
                    "Unknown status '{}'. Available: applied, interviewing, offered, accepted, rejected",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: String,
    pub job_id: String,
    pub user_id: String,
    pub status: ApplicationStatus,
    pub applied_date: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub notes: Option<String>,
    // snapshot captured when the application was created
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub job_url: Option<String>,
}

/// Body of the create-application request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub job_id: String,
    pub user_id: String,
    pub company: String,
    pub title: String,
    pub job_url: String,
}

impl NewApplication {
    pub fn snapshot(job: &Job, user_id: &str) -> Self {
        Self {
            job_id: job.job_id.clone(),
            user_id: user_id.to_string(),
            company: job.company.clone(),
            title: job.title.clone(),
            job_url: job.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserializes_categorized_skills() {
        let json = r#"{
            "user_id": "test123",
            "name": "Ada",
            "email": "ada@example.com",
            "skills": {
                "programming_languages": ["Rust", "Python"],
                "frameworks_and_tools": ["Tokio"],
                "certifications": [],
                "technologies": ["Postgres"]
            },
            "experience_years": 4.5,
            "preferred_roles": ["Backend Engineer"],
            "preferred_locations": ["Berlin"],
            "weekly_application_goal": 12,
            "preferred_industries": [],
            "remote_preference": "hybrid"
        }"#;

        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.skills.programming_languages, vec!["Rust", "Python"]);
        assert_eq!(profile.experience_years, 4.5);
        assert_eq!(profile.remote_preference, RemotePreference::Hybrid);
    }

    #[test]
    fn test_flat_skills_are_rejected() {
        let json = r#"{
            "user_id": "u", "name": "n", "email": "e",
            "skills": ["Rust"],
            "experience_years": 1, "weekly_application_goal": 5
        }"#;
        assert!(serde_json::from_str::<UserProfile>(json).is_err());
    }

    #[test]
    fn test_job_accepts_id_alias_and_optional_fields() {
        let json = r#"{
            "id": "abc",
            "title": "Engineer",
            "company": "Acme",
            "location": "Remote",
            "application_url": "https://acme.test/jobs/abc",
            "source": "linkedin"
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.job_id, "abc");
        assert_eq!(job.url, "https://acme.test/jobs/abc");
        assert!(job.salary_range.is_none());
        assert!(job.requirements.is_none());
    }

    #[test]
    fn test_partial_salary_range_is_rejected() {
        let json = r#"{
            "job_id": "abc", "title": "t", "company": "c", "url": "u",
            "salary_range": {"min": 100000, "currency": "USD"}
        }"#;
        assert!(serde_json::from_str::<Job>(json).is_err());
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("Interviewing".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Interviewing);
        assert_eq!(ApplicationStatus::Accepted.to_string(), "accepted");
        assert!("ghosted".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_skill_add_and_remove() {
        let profile = UserProfile {
            user_id: "u".to_string(),
            name: "n".to_string(),
            email: "e".to_string(),
            skills: SkillCategories::default(),
            experience_years: 2.0,
            preferred_roles: vec![],
            preferred_locations: vec![],
            weekly_application_goal: 10,
            preferred_industries: vec![],
            remote_preference: RemotePreference::Remote,
        };

        let added = profile.with_skill_added(SkillCategory::Technologies, "  Kafka ");
        assert_eq!(added.skills.technologies, vec!["Kafka"]);
        assert!(profile.skills.technologies.is_empty());

        let unchanged = added.with_skill_added(SkillCategory::Technologies, "   ");
        assert_eq!(unchanged, added);

        let removed = added.with_skill_removed(SkillCategory::Technologies, "Kafka");
        assert!(removed.skills.technologies.is_empty());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("Rust, Go ,, Zig"), vec!["Rust", "Go", "Zig"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_skill_category_from_str() {
        assert_eq!("frameworks-and-tools".parse::<SkillCategory>().unwrap(), SkillCategory::FrameworksAndTools);
        assert!("hobbies".parse::<SkillCategory>().is_err());
    }
}
