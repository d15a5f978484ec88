/// Canonical identity of a team: member player ids sorted ascending and joined with `,`.
///
/// Returns an empty string when there are no members.
#[must_use]
pub fn team_signature(player_ids: &[i64]) -> String {
    let mut ids = player_ids.to_vec();
    ids.sort_unstable();
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_join() {
        assert_eq!(team_signature(&[3, 1, 2, 5, 4]), "1,2,3,4,5");
    }

    #[test]
    fn test_empty() {
        assert_eq!(team_signature(&[]), "");
    }

    #[test]
    fn test_permutations_agree() {
        let base = team_signature(&[10, 200, 3000, 40, 5]);
        assert_eq!(team_signature(&[5, 40, 3000, 200, 10]), base);
        assert_eq!(team_signature(&[3000, 5, 10, 40, 200]), base);
        assert_eq!(base, "5,10,40,200,3000");
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(team_signature(&[10, 9]), "9,10");
    }
}
