//! Built-in prompt templates.

use async_trait::async_trait;
use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::mcp::handler::{
    get_bool_arg, get_optional_string_arg, get_string_arg, get_string_array_arg, PromptProvider,
};
use crate::mcp::protocol::{
    Arguments, GetPromptResult, Prompt, PromptArgument, PromptContent, PromptMessage,
};

const CODE_REVIEW: &str = "code_review";
const DEFAULT_FOCUS_AREAS: [&str; 3] = ["code_quality", "best_practices", "security"];

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        description: description.to_string(),
        required,
    }
}

/// "best_practices" -> "Best practices"
fn format_focus_area(area: &str) -> String {
    let spaced = area.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

fn code_review_text(
    language: &str,
    focus_areas: &[String],
    experience_level: &str,
    include_suggestions: bool,
) -> String {
    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "You are an expert {} code reviewer. \
         Please conduct a thorough code review with the following guidelines:\n\n",
        language
    );
    let _ = writeln!(prompt, "**Experience Level**: {}", experience_level);
    let _ = writeln!(prompt, "**Focus Areas**:");
    for area in focus_areas {
        let _ = writeln!(prompt, "- {}", format_focus_area(area));
    }

    let _ = writeln!(prompt, "\n**Review Process**:");
    let _ = writeln!(prompt, "1. **Code Quality**: Assess readability, maintainability, and overall structure");
    let _ = writeln!(prompt, "2. **Best Practices**: Check adherence to {} conventions and standards", language);
    let _ = writeln!(prompt, "3. **Security**: Identify potential security vulnerabilities");
    let _ = writeln!(prompt, "4. **Performance**: Evaluate efficiency and optimization opportunities");
    let _ = writeln!(prompt, "5. **Testing**: Review test coverage and quality\n");

    if include_suggestions {
        let _ = writeln!(prompt, "**Output Format**:");
        let _ = writeln!(prompt, "- Provide specific, actionable feedback");
        let _ = writeln!(prompt, "- Include code snippets for improvements where applicable");
        let _ = writeln!(prompt, "- Rate the overall code quality (1-10 scale)");
        let _ = writeln!(prompt, "- Prioritize issues by severity (High/Medium/Low)\n");
    }

    let _ = write!(
        prompt,
        "Please provide a constructive review that helps improve code quality \
         while considering the {} experience level.",
        experience_level
    );
    prompt
}

/// Prompt provider for the built-in templates.
#[derive(Debug, Default)]
pub struct TemplatePromptProvider;

impl TemplatePromptProvider {
    pub fn new() -> Self {
        Self
    }

    fn code_review(&self, arguments: &Arguments) -> Result<GetPromptResult> {
        let language = get_string_arg(arguments, "language")?;
        let experience_level = get_optional_string_arg(arguments, "experience_level")
            .unwrap_or_else(|| "intermediate".to_string());
        let include_suggestions = get_bool_arg(arguments, "include_suggestions", true);

        let focus_areas: Vec<String> = match arguments.get("focus_areas") {
            Some(value) if value.is_array() => get_string_array_arg(arguments, "focus_areas"),
            // Comma-separated strings are accepted as well.
            Some(value) if value.is_string() => value
                .as_str()
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => DEFAULT_FOCUS_AREAS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(GetPromptResult {
            description: Some(
                "Generate a comprehensive code review prompt with customizable focus areas"
                    .to_string(),
            ),
            messages: vec![PromptMessage {
                role: "system".to_string(),
                content: PromptContent::Text {
                    text: code_review_text(
                        &language,
                        &focus_areas,
                        &experience_level,
                        include_suggestions,
                    ),
                },
            }],
        })
    }
}

#[async_trait]
impl PromptProvider for TemplatePromptProvider {
    fn list(&self) -> Vec<Prompt> {
        vec![Prompt {
            name: CODE_REVIEW.to_string(),
            description: "Generate a comprehensive code review prompt with customizable focus areas"
                .to_string(),
            arguments: vec![
                argument("language", "Programming language of the code being reviewed", true),
                argument(
                    "focus_areas",
                    "Areas to focus on during review (e.g., security, performance, maintainability)",
                    false,
                ),
                argument(
                    "experience_level",
                    "Target experience level (beginner, intermediate, advanced)",
                    false,
                ),
                argument(
                    "include_suggestions",
                    "Whether to include improvement suggestions",
                    false,
                ),
            ],
        }]
    }

    async fn get(&self, name: &str, arguments: &Arguments) -> Result<GetPromptResult> {
        match name {
            CODE_REVIEW => self.code_review(arguments),
            _ => Err(Error::PromptNotFound(name.to_string())),
        }
    }
}
