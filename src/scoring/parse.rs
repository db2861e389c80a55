/// Parse a user-typed score against a criterion's maximum.
///
/// Accepts `.` or `,` as the decimal separator. Returns `None` for anything
/// that is not a finite number in `[0, max_score]`, including empty input.
/// The value is returned unrounded.
pub fn parse_score(raw_value: &str, max_score: f64) -> Option<f64> {
    let value = parse_number(raw_value)?;
    if value < 0.0 || value > max_score {
        return None;
    }
    Some(value)
}

/// Normalise a raw value at the end of an edit session.
///
/// Unparsable or empty input becomes `""`. Anything else is clamped to
/// `[0, max_score]`, rounded to 2 decimals and formatted without trailing
/// zeros. Applying it twice gives the same string as applying it once.
pub fn clamp_and_format(raw_value: &str, max_score: f64) -> String {
    match parse_number(raw_value) {
        Some(value) => format!("{}", round_within(value, max_score)),
        None => String::new(),
    }
}

/// Clamp to `[0, max_score]` and round to 2 decimals without leaving that
/// range. When rounding would exceed a maximum that is not a whole number of
/// cents (e.g. 9.999), the largest 2-decimal value below it is used instead.
pub fn round_within(value: f64, max_score: f64) -> f64 {
    let upper = max_score.max(0.0);
    let rounded = round_to_cents(value.clamp(0.0, upper));
    if rounded <= upper {
        return rounded;
    }

    let mut floored = round_to_cents((upper * 100.0).floor() / 100.0);
    while floored > upper && floored > 0.0 {
        floored = round_to_cents(floored - 0.01);
    }
    floored.max(0.0)
}

/// Round half away from zero to 2 decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // -0.0 would display as "-0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Round to 2 decimals and render with the shortest representation
/// ("7", "7.5", "7.46").
pub fn format_decimal(value: f64) -> String {
    format!("{}", round_to_cents(value))
}

fn parse_number(raw_value: &str) -> Option<f64> {
    let trimmed = raw_value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}
