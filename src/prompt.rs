use crate::image::ImageInput;

/// Joined exactly as the form has always sent it, including the missing
/// space before the caption request.
pub const INSTRUCTION_TEXT: &str = concat!(
    "You are a highly knowledgeable scientific image analysis expert. ",
    "Your task is to examine the following image in detail. ",
    "Provide a comprehensive, factual, and scientifically accurate explanation ",
    "of what the image depicts. ",
    "Highlight key elements and their significance, and present your analysis ",
    "in clear, well-structured markdown format. ",
    "If applicable, include any relevant scientific terminology to enhance the explanation. ",
    "Assume the reader has a basic understanding of scientific concepts.",
    "Create a detailed image caption in bold explaining in short."
);

pub const CONTEXT_HEADING: &str = "Additional Context Provided by the User:";

/// The fixed instruction, followed by the user's context verbatim when there
/// is any.
pub fn build_prompt(user_context: Option<&str>) -> String {
    match user_context {
        Some(context) if !context.is_empty() => {
            format!("{INSTRUCTION_TEXT}\n\n{CONTEXT_HEADING}\n{context}")
        }
        _ => INSTRUCTION_TEXT.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub instruction_text: &'static str,
    pub user_context: Option<String>,
    pub image: ImageInput,
}

impl PromptRequest {
    /// Context only counts when the "add details" toggle is on.
    pub fn new(image: ImageInput, show_details: bool, details: Option<String>) -> Self {
        let user_context = details.filter(|text| show_details && !text.is_empty());
        Self {
            instruction_text: INSTRUCTION_TEXT,
            user_context,
            image,
        }
    }

    pub fn prompt_text(&self) -> String {
        build_prompt(self.user_context.as_deref())
    }
}
