use crate::PipelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CannedEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CannedCategory {
    pub category: String,
    pub entries: Vec<CannedEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CannedAnswerTable {
    categories: Vec<CannedCategory>,
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn entry(question: &str, answer: &str) -> CannedEntry {
    CannedEntry {
        question: question.to_string(),
        answer: answer.to_string(),
    }
}

impl CannedAnswerTable {
    pub fn new(categories: Vec<CannedCategory>) -> Result<Self, PipelineError> {
        for category in &categories {
            if category.category.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "canned answer category without a name".to_string(),
                ));
            }
            if let Some(blank) = category
                .entries
                .iter()
                .find(|entry| entry.question.trim().is_empty() || entry.answer.trim().is_empty())
            {
                return Err(PipelineError::InvalidConfig(format!(
                    "blank canned question or answer in category {}: {:?}",
                    category.category, blank.question
                )));
            }
        }
        Ok(Self { categories })
    }

    pub fn builtin() -> Self {
        Self {
            categories: vec![
                CannedCategory {
                    category: "Basic Introduction".to_string(),
                    entries: vec![
                        entry(
                            "Hi, how are you?",
                            "I'm doing great, thank you for asking! I'm EduMind, your educational assistant. How can I help you with your studies today?",
                        ),
                        entry(
                            "What is your name?",
                            "My name is EduMind. I answer questions about your courses and the institution's documents.",
                        ),
                        entry(
                            "What can you do?",
                            "I can answer questions using the institution's documents, remember what we talked about earlier in this conversation, and point you to the right resources.",
                        ),
                        entry(
                            "Who created you?",
                            "I was built by the EduMind team to support students and staff with their educational queries.",
                        ),
                    ],
                },
                CannedCategory {
                    category: "Using EduMind".to_string(),
                    entries: vec![
                        entry(
                            "How do I clear my chat history?",
                            "Use the clear history action. In the terminal chat, type /clear.",
                        ),
                        entry(
                            "Do you remember my previous questions?",
                            "Yes. Within a session I use your earlier questions and my answers as context for follow-up questions.",
                        ),
                        entry(
                            "Where do your answers come from?",
                            "Answers come from the documents loaded at startup. When they do not cover your question, I will tell you that I don't know.",
                        ),
                    ],
                },
                CannedCategory {
                    category: "Farewell".to_string(),
                    entries: vec![
                        entry("Thank you", "You're welcome! Good luck with your studies."),
                        entry("Goodbye", "Goodbye! Come back any time you have a question."),
                    ],
                },
            ],
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let categories: Vec<CannedCategory> = serde_json::from_str(json).map_err(|error| {
            PipelineError::InvalidConfig(format!("invalid canned answer table: {error}"))
        })?;
        Self::new(categories)
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path).map_err(|error| {
            PipelineError::InvalidConfig(format!(
                "cannot read canned answers from {}: {error}",
                path.display()
            ))
        })?;
        Self::from_json_str(&json)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CannedCategory> {
        self.categories.iter()
    }

    pub fn category(&self, name: &str) -> Option<&CannedCategory> {
        let wanted = normalize(name);
        self.categories
            .iter()
            .find(|category| normalize(&category.category) == wanted)
    }

    /// Answer for `message` in `category`, or in any category when none is
    /// selected. Matching ignores case and surrounding whitespace.
    pub fn lookup(&self, category: Option<&str>, message: &str) -> Option<&str> {
        let wanted = normalize(message);
        if wanted.is_empty() {
            return None;
        }

        match category {
            Some(name) => self
                .category(name)
                .and_then(|category| find_answer(category, &wanted)),
            None => self
                .categories
                .iter()
                .find_map(|category| find_answer(category, &wanted)),
        }
    }
}

fn find_answer<'t>(category: &'t CannedCategory, normalized_question: &str) -> Option<&'t str> {
    category
        .entries
        .iter()
        .find(|entry| normalize(&entry.question) == normalized_question)
        .map(|entry| entry.answer.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn matching_ignores_case_and_surrounding_whitespace() {
        let table = CannedAnswerTable::builtin();
        let exact = table.lookup(Some("Basic Introduction"), "Hi, how are you?");
        let shouted = table.lookup(Some("Basic Introduction"), "  hi, HOW ARE YOU?  ");

        assert!(exact.is_some());
        assert_eq!(exact, shouted);
    }

    #[test]
    fn matching_is_exact_otherwise() {
        let table = CannedAnswerTable::builtin();
        assert!(table.lookup(None, "Hi, how are you").is_none());
        assert!(table.lookup(None, "Hi,  how are you?").is_none());
        assert!(table.lookup(None, "   ").is_none());
    }

    #[test]
    fn selected_category_limits_the_search() {
        let table = CannedAnswerTable::builtin();
        assert!(table.lookup(Some("Farewell"), "Hi, how are you?").is_none());
        assert!(table.lookup(Some("farewell "), "goodbye").is_some());
        assert!(table.lookup(Some("No Such Category"), "Goodbye").is_none());
        assert!(table.lookup(None, "Goodbye").is_some());
    }

    #[test]
    fn categories_keep_declared_order() {
        let table = CannedAnswerTable::builtin();
        let names: Vec<&str> = table
            .categories()
            .map(|category| category.category.as_str())
            .collect();
        assert_eq!(names[0], "Basic Introduction");
    }

    #[test]
    fn loads_table_from_json_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("canned.json");
        fs::write(
            &path,
            r#"[{"category": "Admissions", "entries": [
                {"question": "When do applications open?", "answer": "Applications open on 1 March."}
            ]}]"#,
        )?;

        let table = CannedAnswerTable::load(&path)?;
        assert_eq!(
            table.lookup(Some("Admissions"), "when do applications open?"),
            Some("Applications open on 1 March.")
        );
        assert!(table.lookup(None, "Hi, how are you?").is_none());
        Ok(())
    }

    #[test]
    fn rejects_malformed_tables() {
        assert!(CannedAnswerTable::from_json_str("{not json").is_err());
        assert!(CannedAnswerTable::from_json_str(
            r#"[{"category": "X", "entries": [{"question": " ", "answer": "a"}]}]"#
        )
        .is_err());
        assert!(CannedAnswerTable::load(Path::new("/definitely/not/here.json")).is_err());
    }
}
