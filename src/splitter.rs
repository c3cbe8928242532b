/// Splits one delimited line into trimmed fields.
///
/// A `"` toggles quoted mode and is dropped from the output; the delimiter only
/// separates fields outside quotes. Doubled quotes get no special treatment, so
/// a literal `"` inside a quoted field cannot be expressed.
pub fn split_line(line: &str) -> Vec<String> {
    split_line_with(line, ',')
}

pub fn split_line_with(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    fields.push(current.trim().to_string());
    fields
}
