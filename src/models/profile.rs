use serde::{Deserialize, Serialize};

use crate::models::rules::PatternRule;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    pub fn display_name(&self) -> String {
        if !self.full_name.trim().is_empty() {
            self.full_name.trim().to_string()
        } else {
            format!("{} {}", self.first_name, self.last_name).trim().to_string()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub school: String,
    pub degree: String,
    pub major: String,
    pub graduation_date: Option<String>,
    pub gpa: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkAuthorization {
    pub authorized_to_work: Option<bool>,
    pub require_visa_sponsorship: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    pub programming_languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub tools: Vec<String>,
    pub technologies: Vec<String>,
}

impl Skills {
    pub fn flatten(&self) -> Vec<&str> {
        self.programming_languages
            .iter()
            .chain(&self.frameworks)
            .chain(&self.tools)
            .chain(&self.technologies)
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub title: String,
    pub company: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub description: String,
}

/// 申请人资料，只读
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantProfile {
    pub contact: Contact,
    pub education: Education,
    pub work_authorization: WorkAuthorization,
    pub skills: Skills,
    pub experience: Vec<Experience>,
    pub projects: Vec<Project>,
    /// 常见问题的标准回答，排在配置规则之后
    pub standard_answers: Vec<PatternRule>,
}

impl ApplicantProfile {
    /// 给生成式回答用的摘要
    pub fn summary_text(&self) -> String {
        let mut parts = Vec::new();

        let name = self.contact.display_name();
        if !name.is_empty() {
            parts.push(format!("Name: {}", name));
        }

        let skills = self.skills.flatten();
        if !skills.is_empty() {
            let top: Vec<&str> = skills.into_iter().take(20).collect();
            parts.push(format!("Technical Skills: {}", top.join(", ")));
        }

        if !self.experience.is_empty() {
            let items: Vec<String> = self
                .experience
                .iter()
                .take(3)
                .map(|exp| {
                    let mut text = format!("{} at {}", exp.title, exp.company);
                    if !exp.description.is_empty() {
                        text.push_str(": ");
                        text.push_str(&truncate_chars(&exp.description, 200));
                    }
                    text
                })
                .collect();
            parts.push(format!("Experience: {}", items.join("; ")));
        }

        let edu = &self.education;
        if !edu.school.is_empty() || !edu.degree.is_empty() {
            let mut text = format!("Education: {} in {}", edu.degree, edu.major);
            if !edu.school.is_empty() {
                text.push_str(&format!(" from {}", edu.school));
            }
            if let Some(date) = &edu.graduation_date {
                text.push_str(&format!(" (Expected: {})", date));
            }
            if let Some(gpa) = &edu.gpa {
                text.push_str(&format!(" | GPA: {}", gpa));
            }
            parts.push(text);
        }

        if !self.projects.is_empty() {
            let items: Vec<String> = self
                .projects
                .iter()
                .take(3)
                .map(|p| {
                    if p.description.is_empty() {
                        p.name.clone()
                    } else {
                        format!("{}: {}", p.name, truncate_chars(&p.description, 150))
                    }
                })
                .collect();
            parts.push(format!("Projects: {}", items.join("; ")));
        }

        parts.join("\n\n")
    }

    /// 返回缺失的必要字段
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        let contact = [
            ("first_name", &self.contact.first_name),
            ("last_name", &self.contact.last_name),
            ("email", &self.contact.email),
            ("phone", &self.contact.phone),
        ];
        for (name, value) in contact {
            if value.trim().is_empty() {
                missing.push(format!("contact.{}", name));
            }
        }
        let education = [
            ("school", &self.education.school),
            ("degree", &self.education.degree),
            ("major", &self.education.major),
        ];
        for (name, value) in education {
            if value.trim().is_empty() {
                missing.push(format!("education.{}", name));
            }
        }
        if self.skills.flatten().is_empty() {
            missing.push("skills".to_string());
        }
        missing
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ApplicantProfile {
        serde_json::from_str(
            r#"{
                "contact": {"first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com", "phone": "555"},
                "education": {"school": "Texas A&M University", "degree": "BS", "major": "Computer Science"},
                "skills": {"programming_languages": ["Rust", "Python"]},
                "experience": [{"title": "Intern", "company": "Acme"}],
                "standard_answers": [{"match": "salary", "answer": "Negotiable"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn summary_mentions_school_and_skills() {
        let summary = sample().summary_text();
        assert!(summary.contains("Name: Ada Lovelace"));
        assert!(summary.contains("Rust, Python"));
        assert!(summary.contains("from Texas A&M University"));
        assert!(summary.contains("Intern at Acme"));
    }

    #[test]
    fn complete_profile_has_no_missing_fields() {
        assert!(sample().missing_fields().is_empty());
        let empty = ApplicantProfile::default();
        let missing = empty.missing_fields();
        assert!(missing.contains(&"contact.email".to_string()));
        assert!(missing.contains(&"skills".to_string()));
    }
}
