use std::cmp::Ordering;

/// Canonical string form of a team number cell.
///
/// Integral values lose padding and float suffixes (`" 0254"` and `"254.0"`
/// both become `"254"`), so that the team selector, the document metadata and
/// the saved-analysis keys all agree. Anything else is only trimmed.
pub fn normalize_team_number(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(number) = trimmed.parse::<u64>() {
        return number.to_string();
    }

    if let Ok(number) = trimmed.parse::<f64>() {
        if number.is_finite() && number >= 0.0 && number.fract() == 0.0 && number < 1e15 {
            return (number as u64).to_string();
        }
    }

    trimmed.to_string()
}

/// Numeric team numbers first in numeric order, then the rest lexically.
pub fn compare_team_numbers(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sorted, de-duplicated list of team numbers.
pub fn sorted_team_numbers<I, S>(teams: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = teams.into_iter().map(Into::into).collect();
    out.sort_by(|a, b| compare_team_numbers(a, b));
    out.dedup();
    out
}
