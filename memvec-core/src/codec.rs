//! pgvector text interchange: `[n1,n2,...,nk]`, comma separated, no spaces.

/// Render a vector the way pgvector casts it to text.
pub fn format_vector(vector: &[f32]) -> String {
    let body: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", body.join(","))
}

/// Parse the text form of a pgvector value.
///
/// The first and last characters are dropped unchecked and every element that
/// fails to parse becomes NaN. Nothing here reports malformed input.
pub fn parse_vector(text: &str) -> Vec<f32> {
    let mut chars = text.chars();
    chars.next();
    chars.next_back();
    chars
        .as_str()
        .split(',')
        .map(|part| part.trim().parse::<f32>().unwrap_or(f32::NAN))
        .collect()
}
