//! Column matcher
//!
//! Scores source/target column pairs by normalized name similarity and
//! classifies their type compatibility. Assignment is greedy in target
//! column order and fully deterministic: ties go to the source column with
//! the lower ordinal.

use mapsmith_core::{Compatibility, TableSchema};

/// Extensible synonym table for common naming variants
///
/// Each group is a set of tokens considered equivalent during matching;
/// the first member of a group is its canonical form.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    groups: Vec<Vec<String>>,
}

impl SynonymTable {
    /// Built-in groups covering common key and measure naming variants
    pub fn builtin() -> Self {
        let groups = [
            vec!["code", "key", "id"],
            vec!["value", "val", "amount"],
            vec!["name", "label", "title"],
            vec!["description", "desc"],
            vec!["timestamp", "ts", "time"],
            vec!["country", "nation"],
            vec!["year", "yr"],
            vec!["population", "pop", "capita"],
            vec!["number", "num"],
        ];
        Self {
            groups: groups
                .into_iter()
                .map(|g| g.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }

    /// Built-in groups plus caller-supplied extras (from config)
    pub fn with_extra_groups(extra: &[Vec<String>]) -> Self {
        let mut table = Self::builtin();
        for group in extra {
            if group.len() > 1 {
                table.groups.push(group.iter().map(|s| s.to_lowercase()).collect());
            }
        }
        table
    }

    /// Canonical form of a token: the first member of its group, or the
    /// token itself
    pub fn canonical<'a>(&'a self, token: &'a str) -> &'a str {
        for group in &self.groups {
            if group.iter().any(|t| t == token) {
                return &group[0];
            }
        }
        token
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Split a column name into lowercase tokens
///
/// Handles snake_case, kebab-case, spaces, and camelCase boundaries.
pub(crate) fn tokenize(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_upper = false;

    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == ' ' || ch == '.' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_upper = false;
        } else {
            // An uppercase letter after a lowercase run starts a new token;
            // acronym runs like "GDP" stay together.
            if ch.is_uppercase() && !current.is_empty() && !prev_upper {
                tokens.push(std::mem::take(&mut current));
            }
            current.extend(ch.to_lowercase());
            prev_upper = ch.is_uppercase();
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn canonical_tokens(name: &str, synonyms: &SynonymTable) -> Vec<String> {
    let mut tokens: Vec<String> = tokenize(name)
        .iter()
        .map(|t| synonyms.canonical(t).to_string())
        .collect();
    tokens.sort();
    tokens
}

fn is_subset(smaller: &[String], larger: &[String]) -> bool {
    !smaller.is_empty() && smaller.iter().all(|t| larger.contains(t))
}

/// Normalized name similarity, 0-100
///
/// Exact normalized equality scores 100; synonym-equivalent token sets
/// score 96; a token subset (e.g. `value` against `numeric_value`) scores
/// 85; anything else falls back to edit-distance ratios.
pub fn name_similarity(a: &str, b: &str, synonyms: &SynonymTable) -> u8 {
    let norm_a = tokenize(a).join("");
    let norm_b = tokenize(b).join("");
    if norm_a == norm_b {
        return 100;
    }

    let canon_a = canonical_tokens(a, synonyms);
    let canon_b = canonical_tokens(b, synonyms);
    if canon_a == canon_b {
        return 96;
    }
    if is_subset(&canon_a, &canon_b) || is_subset(&canon_b, &canon_a) {
        return 85;
    }

    let lev = strsim::normalized_levenshtein(&norm_a, &norm_b);
    let jw = strsim::jaro_winkler(&norm_a, &norm_b);
    (lev.max(jw) * 100.0).round() as u8
}

/// Similarity between table names, with warehouse layer prefixes stripped
///
/// `staging_gdp` against `dim_gdp` compares `gdp` with `gdp`.
pub fn table_name_similarity(a: &str, b: &str, synonyms: &SynonymTable) -> u8 {
    name_similarity(strip_layer_prefix(a), strip_layer_prefix(b), synonyms)
}

fn strip_layer_prefix(name: &str) -> &str {
    const PREFIXES: [&str; 7] = ["staging_", "stg_", "raw_", "src_", "dim_", "fact_", "agg_"];
    for prefix in PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            return rest;
        }
    }
    name
}

/// One scored target-column decision
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatch {
    /// Target column name
    pub target: String,

    /// Chosen source column, or None when no candidate cleared the
    /// threshold
    pub source: Option<String>,

    /// Similarity score of the chosen pair (0 when unmatched)
    pub score: u8,

    /// Type compatibility of the chosen pair
    pub compatibility: Option<Compatibility>,
}

/// Matcher output: per-target decisions plus leftover source columns
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// Decisions in target column order
    pub matches: Vec<ColumnMatch>,

    /// Source columns no target claimed, in source order
    pub unused_sources: Vec<String>,
}

impl MatchOutcome {
    /// Number of targets that found a source
    pub fn matched_count(&self) -> usize {
        self.matches.iter().filter(|m| m.source.is_some()).count()
    }
}

/// Greedily match source columns to target columns
///
/// For each target column, in order, the unused source column with the
/// highest name similarity wins if it clears `threshold`. Output is
/// deterministic for identical input.
pub fn match_columns(
    source: &TableSchema,
    target: &TableSchema,
    threshold: u8,
    synonyms: &SynonymTable,
) -> MatchOutcome {
    let mut used = vec![false; source.columns.len()];
    let mut matches = Vec::with_capacity(target.columns.len());

    for target_col in &target.columns {
        let mut best: Option<(usize, u8)> = None;
        for (idx, source_col) in source.columns.iter().enumerate() {
            if used[idx] {
                continue;
            }
            let score = name_similarity(&source_col.name, &target_col.name, synonyms);
            // Strictly-greater keeps the lower ordinal on ties.
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((idx, score));
            }
        }

        match best {
            Some((idx, score)) if score >= threshold => {
                used[idx] = true;
                let source_col = &source.columns[idx];
                let compatibility = source_col
                    .field_type
                    .compatibility(target_col.field_type);
                tracing::debug!(
                    source = %source_col.name,
                    target = %target_col.name,
                    score,
                    ?compatibility,
                    "column matched"
                );
                matches.push(ColumnMatch {
                    target: target_col.name.clone(),
                    source: Some(source_col.name.clone()),
                    score,
                    compatibility: Some(compatibility),
                });
            }
            _ => {
                tracing::debug!(target = %target_col.name, "no source column cleared threshold");
                matches.push(ColumnMatch {
                    target: target_col.name.clone(),
                    source: None,
                    score: 0,
                    compatibility: None,
                });
            }
        }
    }

    let unused_sources = source
        .columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| !used[*idx])
        .map(|(_, c)| c.name.clone())
        .collect();

    MatchOutcome {
        matches,
        unused_sources,
    }
}
