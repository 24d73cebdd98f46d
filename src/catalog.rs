//! Index of the robot and tool descriptor files available under the resources directory,
//! and resolution of the noisy names found in instructions to those files.
//!
//! Name resolution escalates through these tiers, the first hit wins:
//!
//! 1. display name (file base name) equal ignoring case,
//! 2. normalized name equal to a normalized key,
//! 3. same after synonym rewriting ("drilling" into "drill"),
//! 4. robots only: normalized name contained in a normalized key,
//! 5. tools only, when a [`CandidateMatcher`] is available: the matcher picks one of the
//!    display names.
//!
//! Finding nothing is a normal outcome, not an error.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::semantic::{CandidateMatcher, NoSemantics};
use crate::simplify_name::{Synonyms, normalize_name};

/// Which of the tiers resolved the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    DisplayName,
    Normalized,
    Synonym,
    Substring,
    Semantic,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchTier::DisplayName => "display name",
            MatchTier::Normalized => "normalized name",
            MatchTier::Synonym => "synonym",
            MatchTier::Substring => "substring",
            MatchTier::Semantic => "semantic",
        };
        f.write_str(name)
    }
}

/// Resolved resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMatch {
    /// Base name of the descriptor file, case preserved.
    pub display_name: String,
    pub path: PathBuf,
    pub tier: MatchTier,
}

/// Descriptor files of one category, keyed by normalized base name.
#[derive(Debug, Clone, Default)]
pub struct ResourceIndex {
    locations: BTreeMap<String, PathBuf>,
    display_names: BTreeMap<String, String>,
}

impl ResourceIndex {
    /// List descriptor files with the given extension directly in `dir`. A missing or
    /// unreadable directory gives an empty index. Files are visited in path order, and when
    /// two names normalize to the same key the first one is kept.
    pub fn scan(dir: &Path, extension: &str) -> Self {
        let mut index = ResourceIndex::default();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No resources in {}: {}", dir.display(), e);
                return index;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == extension))
            .collect();
        paths.sort();

        for path in paths {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let key = normalize_name(&stem);
            if key.is_empty() {
                warn!("Ignoring {}: name has no letters or digits", path.display());
                continue;
            }
            if let Some(existing) = index.locations.get(&key) {
                warn!(
                    "{} and {} have the same normalized name '{}', keeping the first",
                    existing.display(),
                    path.display(),
                    key
                );
                continue;
            }
            index.display_names.insert(key.clone(), stem);
            index.locations.insert(key, path);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Display names, in key order.
    pub fn display_names(&self) -> Vec<String> {
        self.display_names.values().cloned().collect()
    }

    fn found(&self, key: &str, tier: MatchTier) -> Option<ResourceMatch> {
        let path = self.locations.get(key)?;
        let display_name = self.display_names.get(key)?;
        Some(ResourceMatch { display_name: display_name.clone(), path: path.clone(), tier })
    }

    /// Tiers 1 to 3, shared by both categories.
    fn match_deterministic(&self, name: &str, synonyms: &Synonyms) -> Option<ResourceMatch> {
        let lowered = name.to_lowercase();
        if let Some((key, _)) = self.display_names.iter().find(|(_, display)| display.to_lowercase() == lowered) {
            return self.found(key, MatchTier::DisplayName);
        }

        let normalized = normalize_name(name);
        if let Some(found) = self.found(&normalized, MatchTier::Normalized) {
            return Some(found);
        }

        let rewritten = normalize_name(&synonyms.rewrite(name));
        self.found(&rewritten, MatchTier::Synonym)
    }

    fn match_substring(&self, name: &str) -> Option<ResourceMatch> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return None;
        }
        let key = self.locations.keys().find(|key| key.contains(&normalized))?;
        self.found(key, MatchTier::Substring)
    }

    fn match_semantic(&self, name: &str, matcher: &dyn CandidateMatcher) -> Option<ResourceMatch> {
        if !matcher.is_available() || self.is_empty() {
            return None;
        }
        let candidates = self.display_names();
        let picked = match matcher.pick(name, &candidates) {
            Ok(picked) => picked?,
            Err(e) => {
                warn!("Semantic matching of '{}' failed: {}", name, e);
                return None;
            }
        };
        let Some((key, _)) = self.display_names.iter().find(|(_, display)| **display == picked) else {
            warn!("Semantic matcher returned '{}', which is not a candidate", picked);
            return None;
        };
        self.found(key, MatchTier::Semantic)
    }
}

/// Robots and tools found under the resources directory. Rebuilt, never updated.
#[derive(Clone)]
pub struct ResourceCatalog {
    robots: ResourceIndex,
    tools: ResourceIndex,
    synonyms: Synonyms,
    matcher: Arc<dyn CandidateMatcher>,
}

impl ResourceCatalog {
    /// Scan the robot and tool directories of the configuration. Semantic matching is off
    /// until a matcher is given with [`ResourceCatalog::with_matcher`].
    pub fn build(config: &PipelineConfig) -> Self {
        let robots = ResourceIndex::scan(&config.robots_path(), &config.extension);
        let tools = ResourceIndex::scan(&config.tools_path(), &config.extension);
        info!(
            robots = robots.len(),
            tools = tools.len(),
            "Resource catalog built from {}",
            config.resources_root.display()
        );
        ResourceCatalog {
            robots,
            tools,
            synonyms: Synonyms::new(&config.synonyms),
            matcher: Arc::new(NoSemantics),
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn CandidateMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn robots(&self) -> &ResourceIndex {
        &self.robots
    }

    pub fn tools(&self) -> &ResourceIndex {
        &self.tools
    }

    pub fn match_robot(&self, name: &str) -> Option<ResourceMatch> {
        let found = self
            .robots
            .match_deterministic(name, &self.synonyms)
            .or_else(|| self.robots.match_substring(name));
        log_match("robot", name, &found);
        found
    }

    pub fn match_tool(&self, name: &str) -> Option<ResourceMatch> {
        let found = self
            .tools
            .match_deterministic(name, &self.synonyms)
            .or_else(|| self.tools.match_semantic(name, self.matcher.as_ref()));
        log_match("tool", name, &found);
        found
    }
}

fn log_match(category: &str, name: &str, found: &Option<ResourceMatch>) {
    match found {
        Some(m) => debug!("{} '{}' resolved to {} by {}", category, name, m.display_name, m.tier),
        None => debug!("{} '{}' not found", category, name),
    }
}
