//! Paragraph chunking for document indexing

/// Split text into chunks of at most `max_chars` characters
///
/// Paragraphs (blank-line separated) are combined until the limit; a single
/// paragraph over the limit is split on sentence boundaries, and a sentence
/// over the limit is hard-wrapped.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if paragraph.chars().count() <= max_chars {
            pieces.push(paragraph.to_string());
        } else {
            pieces.extend(split_sentences(paragraph, max_chars));
        }
    }

    combine_until_limit(pieces, max_chars)
}

fn split_sentences(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in paragraph.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && current.chars().count() > 1 {
            sentences.push(std::mem::take(&mut current).trim().to_string());
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }

    let mut out = Vec::new();
    for sentence in sentences {
        if sentence.chars().count() <= max_chars {
            out.push(sentence);
        } else {
            let chars: Vec<char> = sentence.chars().collect();
            out.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
        }
    }
    combine_until_limit(out, max_chars)
}

fn combine_until_limit(pieces: Vec<String>, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        let extra = if current.is_empty() { 0 } else { 2 };
        if !current.is_empty() && current.chars().count() + extra + piece.chars().count() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&piece);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
