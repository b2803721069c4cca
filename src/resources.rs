use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tracing::info;

use crate::data::{self, SeasonDataset, opt_env};
use crate::error::PredictError;
use crate::kg::{self, KnowledgeGraph};
use crate::models::{self, ClassificationPipeline, RegressionPipeline};
use crate::sample_data;

/// Process-wide per-season resources: the loaded pipelines, the season
/// dataset, and the knowledge graph built from it. Read-only after load.
pub struct SeasonResources {
    pub season: String,
    pub dataset: SeasonDataset,
    pub kg: KnowledgeGraph,
    pub regressor: RegressionPipeline,
    pub classifier: ClassificationPipeline,
}

// Explicit cache keyed by the season string. The season set is static, so
// entries are never invalidated.
static SEASON_CACHE: Lazy<Mutex<HashMap<String, Arc<SeasonResources>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Load (or reuse) the expensive resources for a season.
pub fn load_season(season: &str) -> Result<Arc<SeasonResources>, PredictError> {
    {
        let cache = SEASON_CACHE.lock().expect("season cache lock poisoned");
        if let Some(resources) = cache.get(season) {
            return Ok(Arc::clone(resources));
        }
    }

    let dataset = data::load_season_dataset(season).map_err(|err| {
        PredictError::ResourceMissing(format!("No season data available for {season}: {err}"))
    })?;
    let (regressor, classifier) = models::load_models(season)?;
    let kg = kg::build_knowledge_graph(&dataset);
    info!(
        season,
        players = dataset.players.len(),
        entities = kg.entity_count(),
        relations = kg.relation_count(),
        "season resources loaded"
    );

    let resources = Arc::new(SeasonResources {
        season: season.to_string(),
        dataset,
        kg,
        regressor,
        classifier,
    });

    let mut cache = SEASON_CACHE.lock().expect("season cache lock poisoned");
    let entry = cache
        .entry(season.to_string())
        .or_insert_with(|| Arc::clone(&resources));
    Ok(Arc::clone(entry))
}

/// Seasons offered in the UI selector. `HOOPS_SEASONS` (comma separated)
/// overrides the default set.
pub fn season_choices() -> Vec<String> {
    if let Some(raw) = opt_env("HOOPS_SEASONS") {
        let seasons: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !seasons.is_empty() {
            return seasons;
        }
    }
    sample_data::SUPPORTED_SEASONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_returns_the_same_instance() {
        let a = load_season("2023-24").expect("sample season loads");
        let b = load_season("2023-24").expect("sample season loads");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn default_season_choices_are_supported() {
        let choices = season_choices();
        assert!(!choices.is_empty());
        for season in &choices {
            assert!(sample_data::SUPPORTED_SEASONS.contains(&season.as_str()));
        }
    }
}
