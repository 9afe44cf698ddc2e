//! Entity Resolution
//!
//! Matches a free-text mention against a directory list (cost centers,
//! cards, categories, offered options). Ties are never broken by guessing:
//! several equally good candidates come back as `Ambiguous`.

use expense_agent_core::{DirectoryEntry, DirectoryMatch, ResolutionResult};
use expense_agent_text_processing::{tokenize, NormalizedText};

/// Folded, whitespace-collapsed form used for comparisons
fn comparable(text: &str) -> String {
    tokenize(text)
        .into_iter()
        .map(|t| t.folded)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `needle` appears in `haystack` as whole words
fn contains_words(haystack: &str, needle: &str) -> bool {
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

fn first_word(text: &str) -> &str {
    text.split(' ').next().unwrap_or("")
}

/// Directory matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityResolver;

impl EntityResolver {
    /// Resolve `query` against `entries`.
    ///
    /// Exact match, then substring in either direction (query of two
    /// characters or more), then first-word match. The first stage with any
    /// hit decides.
    pub fn resolve<'a, E, I>(query: &str, entries: I) -> ResolutionResult
    where
        E: DirectoryEntry + ?Sized + 'a,
        I: IntoIterator<Item = &'a E>,
    {
        let query = comparable(query);
        if query.is_empty() {
            return ResolutionResult::NotFound;
        }

        let candidates: Vec<(&E, String)> = entries
            .into_iter()
            .map(|e| (e, comparable(e.entry_name())))
            .filter(|(_, name)| !name.is_empty())
            .collect();

        let exact: Vec<&E> = candidates
            .iter()
            .filter(|(_, name)| *name == query)
            .map(|(e, _)| *e)
            .collect();
        if !exact.is_empty() {
            return Self::decide(exact);
        }

        if query.chars().count() >= 2 {
            let partial: Vec<&E> = candidates
                .iter()
                .filter(|(_, name)| name.contains(&query) || contains_words(&query, name))
                .map(|(e, _)| *e)
                .collect();
            if !partial.is_empty() {
                return Self::decide(partial);
            }
        }

        let head = first_word(&query);
        let by_first_word: Vec<&E> = candidates
            .iter()
            .filter(|(_, name)| first_word(name) == head)
            .map(|(e, _)| *e)
            .collect();
        if !by_first_word.is_empty() {
            return Self::decide(by_first_word);
        }

        ResolutionResult::NotFound
    }

    fn decide<E: DirectoryEntry + ?Sized>(hits: Vec<&E>) -> ResolutionResult {
        let mut matches: Vec<DirectoryMatch> = Vec::with_capacity(hits.len());
        for hit in hits {
            if !matches.iter().any(|m| m.id == hit.entry_id()) {
                matches.push(DirectoryMatch::from_entry(hit));
            }
        }
        if matches.len() == 1 {
            ResolutionResult::Resolved(matches.remove(0))
        } else {
            ResolutionResult::Ambiguous {
                candidates: matches,
            }
        }
    }

    /// Which offered option an answer picks: a 1-based index or a name match
    pub fn pick_option(answer: &NormalizedText, options: &[String]) -> Option<String> {
        if let [only] = answer.tokens.as_slice() {
            if let Ok(index) = only.folded.parse::<usize>() {
                return index
                    .checked_sub(1)
                    .and_then(|i| options.get(i))
                    .cloned();
            }
        }

        let entries: Vec<DirectoryMatch> = options
            .iter()
            .enumerate()
            .map(|(i, name)| DirectoryMatch {
                id: i.to_string(),
                name: name.clone(),
            })
            .collect();
        if let Some(hit) = Self::resolve(&answer.original, &entries).resolved() {
            return Some(hit.name.clone());
        }

        // "o Silva": fall back to single words, accepted when they agree
        let mut picked: Option<&DirectoryMatch> = None;
        for token in answer.tokens.iter().filter(|t| t.folded.chars().count() >= 3) {
            if let ResolutionResult::Resolved(hit) = Self::resolve(&token.folded, &entries) {
                let hit = entries.iter().find(|e| e.id == hit.id)?;
                match picked {
                    Some(prev) if prev.id != hit.id => return None,
                    _ => picked = Some(hit),
                }
            }
        }
        picked.map(|m| m.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expense_agent_config::LexiconConfig;
    use expense_agent_core::{Card, CostCenter};
    use expense_agent_text_processing::TextNormalizer;

    fn people() -> Vec<CostCenter> {
        vec![
            CostCenter { id: "1".into(), name: "Felipe Silva".into() },
            CostCenter { id: "2".into(), name: "Felipe Souza".into() },
            CostCenter { id: "3".into(), name: "Ana Luíza".into() },
        ]
    }

    #[test]
    fn test_shared_first_name_is_ambiguous() {
        let result = EntityResolver::resolve("Felipe", &people());
        assert_eq!(
            result.candidate_names(),
            vec!["Felipe Silva".to_string(), "Felipe Souza".to_string()]
        );
    }

    #[test]
    fn test_exact_match_ignores_case_and_accents() {
        let result = EntityResolver::resolve("ana luiza", &people());
        assert_eq!(result.resolved().map(|m| m.id.as_str()), Some("3"));
    }

    #[test]
    fn test_substring_single_hit() {
        let result = EntityResolver::resolve("souza", &people());
        assert_eq!(result.resolved().map(|m| m.name.as_str()), Some("Felipe Souza"));
    }

    #[test]
    fn test_query_containing_name() {
        let cards = vec![Card { id: "k1".into(), name: "Latam".into(), is_active: true }];
        let result = EntityResolver::resolve("latam pass", &cards);
        assert!(result.is_resolved());
    }

    #[test]
    fn test_first_word_match() {
        let result = EntityResolver::resolve("Ana Maria", &people());
        assert_eq!(result.resolved().map(|m| m.id.as_str()), Some("3"));
    }

    #[test]
    fn test_not_found() {
        assert_eq!(EntityResolver::resolve("Carlos", &people()), ResolutionResult::NotFound);
        assert_eq!(EntityResolver::resolve("  ", &people()), ResolutionResult::NotFound);
    }

    #[test]
    fn test_single_letter_does_not_substring_match() {
        assert_eq!(EntityResolver::resolve("z", &people()), ResolutionResult::NotFound);
    }

    #[test]
    fn test_pick_option() {
        let normalizer = TextNormalizer::new(&LexiconConfig::default()).unwrap();
        let options = vec!["Felipe Silva".to_string(), "Felipe Souza".to_string()];

        let by_index = normalizer.normalize("2");
        assert_eq!(
            EntityResolver::pick_option(&by_index, &options).as_deref(),
            Some("Felipe Souza")
        );

        let by_name = normalizer.normalize("o Silva");
        assert_eq!(
            EntityResolver::pick_option(&by_name, &options).as_deref(),
            Some("Felipe Silva")
        );

        let out_of_range = normalizer.normalize("5");
        assert_eq!(EntityResolver::pick_option(&out_of_range, &options), None);
    }
}
