//! "Did you mean" suggestions for unknown attribute and type names

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Closest candidate to `input`, if any is within the suggestion distance
pub fn closest_match<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|candidate| (strsim::levenshtein(input, candidate), candidate))
        .filter(|(distance, _)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

/// Render a suggestion as a sentence suffix, or an empty string
pub fn did_you_mean(suggestion: Option<&str>) -> String {
    suggestion
        .map(|s| format!(" Did you mean '{}'?", s))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_match() {
        let candidates = ["description", "cache_parameter_group_family", "parameter_name_values"];
        assert_eq!(
            closest_match("descripton", candidates),
            Some("description".to_string())
        );
        assert_eq!(closest_match("something_else", candidates), None);
        assert_eq!(closest_match("description", candidates), None);
    }

    #[test]
    fn test_did_you_mean() {
        assert_eq!(did_you_mean(Some("spec")), " Did you mean 'spec'?");
        assert_eq!(did_you_mean(None), "");
    }
}
