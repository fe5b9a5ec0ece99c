/// Instructions sent ahead of the user's text
const INSTRUCTIONS: &str = "I want you to act as a translator. I will speak to you in any language \
and you will detect the language, translate it and answer in the corrected and improved version \
of my text, in English and Japanese with bullet points. Keep the meaning same. I want you to only \
reply the correction, the improvements and nothing else, do not write explanations. Do you understand?";

/// Build the full prompt for one translation request.
///
/// The text is placed verbatim between double quotes. Quotes inside the text
/// are not escaped, so a caller can close the quotation early.
pub fn build_prompt(text: &str) -> String {
    format!("\n{}\n\nMy text is: \"{}\"\n", INSTRUCTIONS, text)
}
