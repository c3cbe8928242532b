/// Format whole currency units with period thousands separators: $1.234.567
pub fn money(val: i64) -> String {
    let negative = val < 0;
    let digits = val.unsigned_abs().to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Report dates are written day first: 05/03/2024
pub fn day_first(date: chrono::NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Lower-case ASCII slug for file names: "Domani Providencia" -> "domani_providencia"
pub fn slug(label: &str) -> String {
    let mut out = String::new();
    for c in label.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}
