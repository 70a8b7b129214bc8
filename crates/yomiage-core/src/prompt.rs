//! OCR instruction template
//!
//! The instruction sent with every OCR request is data, not code: it carries a version
//! label so that output changes can be traced back to the prompt that produced them.

use std::path::Path;

use anyhow::Context;

/// Version label of the built-in instruction
pub const DEFAULT_PROMPT_VERSION: &str = "v1";

/// Version label used when a template is loaded from a file without an explicit version
pub const CUSTOM_PROMPT_VERSION: &str = "custom";

const DEFAULT_OCR_PROMPT: &str = "画像内のテキストを正確に読み取って、そのまま出力してください。新聞記事のような段組の場合、読む順序を論理的に判断して下さい。読みたいと思って撮った記事以外のテキストは含まないで下さい。読み取ったテキストのみを出力し、説明や注釈は一切加えないで下さい。";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    version: String,
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            version: DEFAULT_PROMPT_VERSION.to_string(),
            text: DEFAULT_OCR_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(version: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            text: text.into(),
        }
    }

    /// Load the instruction text from a UTF-8 file
    pub fn from_file(path: impl AsRef<Path>, version: Option<&str>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read OCR prompt from {}", path.display()))?;
        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("OCR prompt file {} is empty", path.display());
        }

        Ok(Self::new(version.unwrap_or(CUSTOM_PROMPT_VERSION), text))
    }

    /// Load from `path` when given, otherwise fall back to the built-in instruction
    pub fn load(path: Option<&str>, version: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path, version),
            None => {
                let mut template = Self::default();
                if let Some(version) = version {
                    template.version = version.to_string();
                }
                Ok(template)
            }
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Instruction text sent alongside the image
    pub fn render(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_prompt() {
        let template = PromptTemplate::default();
        assert_eq!(template.version(), "v1");
        assert!(template.render().contains("段組"));
        assert!(template.render().ends_with("一切加えないで下さい。"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Transcribe the text.").unwrap();

        let template = PromptTemplate::from_file(file.path(), None).unwrap();
        assert_eq!(template.version(), "custom");
        assert_eq!(template.render(), "Transcribe the text.");

        let template = PromptTemplate::load(file.path().to_str(), Some("v2")).unwrap();
        assert_eq!(template.version(), "v2");
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(PromptTemplate::from_file(file.path(), None).is_err());
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(PromptTemplate::load(Some("/nonexistent/prompt.txt"), None).is_err());
    }
}
