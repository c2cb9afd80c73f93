use crate::scan::Repository;

/// Filter `repos` down to fuzzy matches on the repository name, best first.
///
/// An empty query keeps the full list untouched. Ties are broken by name so
/// the ordering is deterministic.
pub fn filter(query: &str, repos: Vec<Repository>) -> Vec<Repository> {
    let query = query.trim();
    if query.is_empty() {
        return repos;
    }

    let mut scored: Vec<(u32, Repository)> = repos
        .into_iter()
        .filter_map(|repo| score_match(query, &repo.name).map(|score| (score, repo)))
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    scored.into_iter().map(|(_, repo)| repo).collect()
}

/// Score `query` against `name`, or None when the query is not a
/// case-insensitive subsequence of the name.
///
/// Higher is better: consecutive matched runs and prefix matches earn
/// bonuses, and shorter names edge out longer ones.
fn score_match(query: &str, name: &str) -> Option<u32> {
    let name_lower = name.to_lowercase();
    let query_chars: Vec<char> = query.to_lowercase().chars().collect();
    let name_chars: Vec<char> = name_lower.chars().collect();

    if query_chars.is_empty() {
        return Some(1);
    }

    let positions = find_match_positions(&query_chars, &name_chars)?;

    let mut score: u32 = 100;

    // Runs of >= 2 consecutively matched characters
    let mut consecutive_bonus: u32 = 0;
    let mut run_length: u32 = 1;
    for window in positions.windows(2) {
        if window[1] == window[0] + 1 {
            run_length += 1;
        } else {
            if run_length >= 2 {
                consecutive_bonus = consecutive_bonus.saturating_add(run_length * 10);
            }
            run_length = 1;
        }
    }
    if run_length >= 2 {
        consecutive_bonus = consecutive_bonus.saturating_add(run_length * 10);
    }
    score = score.saturating_add(consecutive_bonus);

    // Matches anchored at the start of the name
    if positions.first() == Some(&0) {
        let prefix_len = positions
            .iter()
            .enumerate()
            .take_while(|&(ref i, &pos)| pos == *i)
            .count();
        score = score.saturating_add(prefix_len as u32 * 50);
    }

    // Shorter names score slightly higher
    score = score.saturating_add(255 - name.len().min(255) as u32);

    Some(score)
}

/// Greedy left-to-right subsequence match; None if any query character is
/// missing.
fn find_match_positions(query: &[char], target: &[char]) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(query.len());
    let mut target_idx = 0;

    for &qc in query {
        let mut found = false;
        while target_idx < target.len() {
            if target[target_idx] == qc {
                positions.push(target_idx);
                target_idx += 1;
                found = true;
                break;
            }
            target_idx += 1;
        }
        if !found {
            return None;
        }
    }

    Some(positions)
}
