//! Prompt assembly and fallback answers

/// Separator between retrieved chunks in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// The first `max_chars` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

pub fn join_context<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    chunks.into_iter().collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

pub fn build_prompt(context: &str, question: &str, context_chars: usize) -> String {
    format!(
        "Use the context from the insurance policy to answer the user's question.\n\
\n\
Context:\n\
{context}\n\
\n\
Question:\n\
{question}\n\
\n\
Answer:",
        context = truncate_chars(context, context_chars),
        question = question,
    )
}

/// Shown when the model call fails
pub fn fallback_answer(context: &str, fallback_chars: usize) -> String {
    format!(
        "(Fallback) Relevant content:\n\n{}",
        truncate_chars(context, fallback_chars)
    )
}

/// Shown when no model is configured
pub fn offline_answer(context: &str, fallback_chars: usize) -> String {
    format!(
        "(API not loaded) Relevant content:\n\n{}",
        truncate_chars(context, fallback_chars)
    )
}
