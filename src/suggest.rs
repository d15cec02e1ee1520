use strsim::levenshtein;

/// maximum edit distance for a "did you mean" hint
const FUZZY_THRESHOLD: usize = 2;

/// closest candidate to `query` by Levenshtein distance (case-insensitive)
pub fn closest<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let query_lower = query.to_lowercase();

    let mut matches: Vec<_> = candidates
        .into_iter()
        .map(|c| (c, levenshtein(&query_lower, &c.to_lowercase())))
        .filter(|(_, distance)| *distance <= FUZZY_THRESHOLD)
        .collect();

    matches.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    matches.first().map(|(c, _)| *c)
}

/// render an optional suggestion as a message suffix
pub fn hint(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest() {
        let names = ["toNumber", "toString", "count"];
        assert_eq!(closest("tonumbr", names), Some("toNumber"));
        assert_eq!(closest("cont", names), Some("count"));
        assert_eq!(closest("somethingelse", names), None);
    }

    #[test]
    fn test_hint() {
        assert_eq!(hint(Some("upper")), " (did you mean 'upper'?)");
        assert_eq!(hint(None), "");
    }
}
