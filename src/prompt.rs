//! Prompt construction for article generation

/// Stylistic requirements listed in every prompt, after the word count
pub const STYLE_REQUIREMENTS: [&str; 7] = [
    "Natural human writing style with personality",
    "Varied sentence structure and paragraph length",
    "Rich, precise vocabulary appropriate for the topic",
    "Flawless grammar and punctuation",
    "Include a compelling, attention-grabbing title",
    "Maintain consistent tone throughout",
    "Add relevant examples or analogies where appropriate",
];

/// Render the generation prompt.
///
/// Pure and deterministic. The trailing format section asks the model for
/// a title line followed by the content; nothing enforces it on the reply.
pub fn build_prompt(topic: &str, style: &str, research: &str, word_range: (u32, u32)) -> String {
    let (min_words, max_words) = word_range;
    let mut prompt = format!(
        "Write a {} about {} using this research context: {}.\n\nRequirements:\n- {}-{} words\n",
        style, topic, research, min_words, max_words
    );
    for requirement in STYLE_REQUIREMENTS {
        prompt.push_str("- ");
        prompt.push_str(requirement);
        prompt.push('\n');
    }
    prompt.push_str(
        "\nFormat:\n[Title: Your Creative Title Here]\n[Content: Your article content here...]\n",
    );
    prompt
}
