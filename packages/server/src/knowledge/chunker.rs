/// Split text into retrieval chunks of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) are packed together while they fit.
/// A paragraph longer than `max_chars` is cut at character boundaries.
/// Blank input yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let normalized = text.replace("\r\n", "\n");

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        let len = paragraph.chars().count();

        if len > max_chars {
            flush(&mut chunks, &mut current, &mut current_len);
            chunks.extend(split_long(paragraph, max_chars));
            continue;
        }

        if !current.is_empty() && current_len + 2 + len > max_chars {
            flush(&mut chunks, &mut current, &mut current_len);
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(paragraph);
        current_len += len;
    }

    flush(&mut chunks, &mut current, &mut current_len);
    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
    *current_len = 0;
}

fn split_long(paragraph: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
