use anyhow::{Context, Result};
use colored::*;

use crate::schema::{FormSchema, Question, QuestionType};

const WIDTH: usize = 60;

/// Read-only terminal mock of a form, the way a respondent would see it with every
/// input disabled. Never mutates the schema.
pub struct FormPreview {
    colorful: bool,
}

impl FormPreview {
    pub fn new(colorful: bool) -> Self {
        Self { colorful }
    }

    pub fn render(&self, schema: Option<&FormSchema>) -> String {
        match schema {
            Some(schema) => self.render_form(schema),
            None => self.render_placeholder(),
        }
    }

    fn render_placeholder(&self) -> String {
        let rule = "┄".repeat(WIDTH);
        format!(
            "{rule}\n{}\n{}\n{rule}\n",
            self.paint("Form Preview", |s| s.bold()),
            self.paint("Your generated form will appear here.", |s| s.dimmed()),
        )
    }

    fn render_form(&self, schema: &FormSchema) -> String {
        let mut out = String::new();
        out.push_str(&self.paint(&schema.title, |s| s.bold().bright_white()));
        out.push('\n');
        if let Some(description) = schema.description() {
            out.push_str(&self.paint(description, |s| s.dimmed()));
            out.push('\n');
        }
        out.push_str(&"─".repeat(WIDTH));
        out.push('\n');

        for question in &schema.questions {
            if let Some(block) = self.render_question(question) {
                out.push('\n');
                out.push_str(&block);
            }
        }
        out
    }

    fn render_question(&self, question: &Question) -> Option<String> {
        let mut block = question.text.clone();
        if question.is_required {
            block.push(' ');
            block.push_str(&self.paint("*", |s| s.red()));
        }
        block.push('\n');

        match question.kind {
            QuestionType::MultipleChoice => {
                for option in question.choice_options() {
                    block.push_str(&format!("  ( ) {}\n", option));
                }
            }
            QuestionType::Checkbox => {
                for option in question.choice_options() {
                    block.push_str(&format!("  [ ] {}\n", option));
                }
            }
            QuestionType::ShortAnswer => {
                block.push_str(&self.input_box(&["Your answer"]));
            }
            QuestionType::LongAnswer => {
                block.push_str(&self.input_box(&["Your detailed answer", "", "", ""]));
            }
            QuestionType::Unsupported(_) => return None,
        }
        Some(block)
    }

    fn input_box(&self, rows: &[&str]) -> String {
        let inner = WIDTH - 6;
        let mut out = format!("  ┌{}┐\n", "─".repeat(inner));
        for row in rows {
            let padded = format!(" {:<width$}", row, width = inner - 1);
            out.push_str(&format!("  │{}│\n", self.paint(&padded, |s| s.dimmed())));
        }
        out.push_str(&format!("  └{}┘\n", "─".repeat(inner)));
        out
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.colorful {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Pretty-printed JSON, two-space indented.
pub fn render_json(schema: &FormSchema) -> Result<String> {
    schema
        .to_pretty_json()
        .context("Failed to serialize form schema")
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("Clipboard is not available")?;
    clipboard
        .set_text(text.to_string())
        .context("Failed to copy to clipboard")
}
