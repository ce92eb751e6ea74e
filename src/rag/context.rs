//! Formatting of retrieved chunks and composition of the model input.
//!
//! The composed prompt always reads instructions, then retrieved context, then the user's
//! literal question. Models treat the three sections differently, so the order is fixed.

use crate::ragie::ScoredChunk;

/// Instructions used when the caller supplies none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Use the provided context from the retrieved documents to answer the user's question accurately and comprehensively. If the context doesn't contain relevant information, say so clearly.";
/// Header introducing the context block.
pub const CONTEXT_HEADER: &str = "RETRIEVED CONTEXT FROM DOCUMENTS:";
/// Prefix of the question line.
pub const QUESTION_HEADER: &str = "USER QUESTION:";
/// Source label for chunks without a document name.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Render one chunk as a numbered block. `rank` is 1-based.
pub fn format_chunk(rank: usize, chunk: &ScoredChunk) -> String {
    format!(
        "[Chunk {rank}] (Score: {score:.4})\nSource: {source}\nContent: {text}",
        score = chunk.score(),
        source = chunk.document_name().unwrap_or(UNKNOWN_SOURCE),
        text = chunk.text(),
    )
}

/// Render every chunk in the order received, separated by a blank line.
///
/// No chunks yields the empty string.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| format_chunk(index + 1, chunk))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Pick the caller's instructions verbatim, or the default when absent or empty.
pub fn resolve_system_prompt(system_prompt: Option<&str>) -> &str {
    system_prompt
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
}

/// Build the full model input.
pub fn compose_prompt(system_prompt: &str, context: &str, query: &str) -> String {
    format!("{system_prompt}\n\n{CONTEXT_HEADER}\n{context}\n\n{QUESTION_HEADER} {query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(text: &str, score: f64, document_name: Option<&str>) -> ScoredChunk {
        serde_json::from_value(json!({
            "text": text,
            "score": score,
            "document_metadata": { "document_name": document_name }
        }))
        .expect("chunk")
    }

    #[test]
    fn formats_numbered_blocks_in_received_order() {
        let chunks = vec![
            chunk("Refunds within 30 days.", 0.9, Some("policy.pdf")),
            chunk("Email support for refunds.", 0.7, Some("faq.txt")),
            chunk("Shipping is free.", 0.2, Some("shipping.md")),
        ];
        let context = format_context(&chunks);
        let blocks: Vec<&str> = context.split("\n\n").collect();

        assert_eq!(blocks.len(), 3);
        for (index, block) in blocks.iter().enumerate() {
            assert!(block.starts_with(&format!("[Chunk {}]", index + 1)));
        }
        assert_eq!(
            blocks[1],
            "[Chunk 2] (Score: 0.7000)\nSource: faq.txt\nContent: Email support for refunds."
        );
    }

    #[test]
    fn empty_chunk_list_gives_empty_context() {
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn score_is_rounded_to_four_places() {
        let rendered = format_chunk(1, &chunk("x", 0.123456, Some("a.txt")));
        assert!(rendered.contains("(Score: 0.1235)"));
    }

    #[test]
    fn integer_score_renders_with_four_places() {
        let whole: ScoredChunk =
            serde_json::from_value(json!({ "text": "x", "score": 1 })).expect("chunk");
        assert!(format_chunk(1, &whole).contains("(Score: 1.0000)"));
    }

    #[test]
    fn missing_or_empty_name_is_unknown() {
        let nameless = chunk("x", 0.5, None);
        assert!(format_chunk(1, &nameless).contains("Source: Unknown"));
        let bare: ScoredChunk =
            serde_json::from_value(json!({ "text": "x", "score": 0.5 })).expect("chunk");
        assert!(format_chunk(1, &bare).contains("Source: Unknown"));
        assert!(format_chunk(1, &chunk("x", 0.5, Some(""))).contains("Source: Unknown"));
    }

    #[test]
    fn custom_system_prompt_replaces_default() {
        assert_eq!(
            resolve_system_prompt(Some("Answer in French.")),
            "Answer in French."
        );
        assert_eq!(resolve_system_prompt(Some("")), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(resolve_system_prompt(None), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn prompt_sections_keep_their_order() {
        let context = format_context(&[chunk("Refunds within 30 days.", 0.9, Some("policy.pdf"))]);
        let prompt = compose_prompt("Answer in French.", &context, "What is the refund policy?");

        assert!(prompt.starts_with("Answer in French."));
        let header = prompt.find(CONTEXT_HEADER).expect("context header");
        let block = prompt.find("[Chunk 1]").expect("context block");
        let question = prompt
            .find("USER QUESTION: What is the refund policy?")
            .expect("question line");
        assert!(header < block && block < question);
        assert!(prompt.ends_with("What is the refund policy?"));
    }

    #[test]
    fn prompt_with_empty_context_keeps_headers() {
        let prompt = compose_prompt(DEFAULT_SYSTEM_PROMPT, "", "Anything?");
        assert_eq!(
            prompt,
            format!("{DEFAULT_SYSTEM_PROMPT}\n\n{CONTEXT_HEADER}\n\n\nUSER QUESTION: Anything?")
        );
    }
}
