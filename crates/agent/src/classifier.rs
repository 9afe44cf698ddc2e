//! Category Classification
//!
//! Picks the transaction category from the organization's category list.
//! An explicit mention is resolved like any other entity; otherwise the
//! description is matched against the keyword taxonomy and the first name
//! of the rule's fallback chain that exists in the directory wins.

use expense_agent_config::CategoryTaxonomy;
use expense_agent_core::{Category, DirectoryMatch, OrgDirectory, ResolutionResult};
use expense_agent_text_processing::{find_phrase, fold, tokenize, Token};

use crate::resolver::EntityResolver;

type Phrase = Vec<String>;

#[derive(Debug, Clone)]
struct CompiledRule {
    keywords: Vec<Phrase>,
    /// Target first, then its fallbacks
    chain: Vec<String>,
}

#[derive(Debug, Clone)]
struct CompiledCorrection {
    keywords: Vec<Phrase>,
    when: Vec<String>,
    chain: Vec<String>,
}

fn phrases(keywords: &[String]) -> Vec<Phrase> {
    keywords
        .iter()
        .map(|k| tokenize(k).into_iter().map(|t| t.folded).collect::<Phrase>())
        .filter(|p| !p.is_empty())
        .collect()
}

fn chain(target: &str, fallback: &[String]) -> Vec<String> {
    std::iter::once(target.to_string())
        .chain(fallback.iter().cloned())
        .collect()
}

fn hits(tokens: &[Token], keywords: &[Phrase]) -> bool {
    keywords.iter().any(|k| find_phrase(tokens, k).is_some())
}

/// Keyword classifier with per-organization fallback
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<CompiledRule>,
    corrections: Vec<CompiledCorrection>,
    catch_all: String,
}

impl CategoryClassifier {
    pub fn new(taxonomy: &CategoryTaxonomy) -> Self {
        Self {
            rules: taxonomy
                .rules
                .iter()
                .map(|r| CompiledRule {
                    keywords: phrases(&r.keywords),
                    chain: chain(&r.target, &r.fallback),
                })
                .collect(),
            corrections: taxonomy
                .corrections
                .iter()
                .map(|c| CompiledCorrection {
                    keywords: phrases(&c.keywords),
                    when: c.when.iter().map(|w| fold(w)).collect(),
                    chain: chain(&c.target, &c.fallback),
                })
                .collect(),
            catch_all: taxonomy.catch_all.clone(),
        }
    }

    /// Resolve an explicit category mention ("categoria lazer").
    ///
    /// A mention matching nothing lands in the catch-all category.
    pub fn classify_explicit(&self, mention: &str, directory: &OrgDirectory) -> ResolutionResult {
        let categories = directory.expense_categories();
        match EntityResolver::resolve(mention, categories.iter().copied()) {
            ResolutionResult::NotFound => {
                tracing::debug!(mention, "Category mention not found, using catch-all");
                self.catch_all(directory)
            }
            found => found,
        }
    }

    /// Infer the category from the description
    pub fn infer(&self, description: &str, directory: &OrgDirectory) -> ResolutionResult {
        let tokens = tokenize(description);
        let categories = directory.expense_categories();

        let inferred = self
            .rules
            .iter()
            .find(|rule| hits(&tokens, &rule.keywords))
            .and_then(|rule| first_existing(&rule.chain, &categories));

        let Some(mut category) = inferred else {
            return self.catch_all(directory);
        };

        let folded_name = fold(&category.name);
        for correction in &self.corrections {
            if correction.when.contains(&folded_name) && hits(&tokens, &correction.keywords) {
                if let Some(corrected) = first_existing(&correction.chain, &categories) {
                    tracing::debug!(from = %category.name, to = %corrected.name, "Category corrected");
                    category = corrected;
                    break;
                }
            }
        }

        ResolutionResult::Resolved(category)
    }

    /// The catch-all category, or the first expense category when the
    /// organization has none by that name
    pub fn catch_all(&self, directory: &OrgDirectory) -> ResolutionResult {
        let categories = directory.expense_categories();
        if let Some(found) = first_existing(std::slice::from_ref(&self.catch_all), &categories) {
            return ResolutionResult::Resolved(found);
        }
        match categories.first() {
            Some(first) => {
                tracing::warn!(
                    catch_all = %self.catch_all,
                    using = %first.name,
                    "Catch-all category missing from directory"
                );
                ResolutionResult::Resolved(DirectoryMatch::from_entry(*first))
            }
            None => ResolutionResult::NotFound,
        }
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(&CategoryTaxonomy::default())
    }
}

/// First name in `chain` present in the category list, compared folded
fn first_existing(chain: &[String], categories: &[&Category]) -> Option<DirectoryMatch> {
    chain.iter().find_map(|name| {
        let wanted = fold(name.trim());
        categories
            .iter()
            .find(|c| fold(c.name.trim()) == wanted)
            .map(|c| DirectoryMatch::from_entry(*c))
    })
}
