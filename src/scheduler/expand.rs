//! Job expansion: endpoint pair resolution and the geo × pair × id
//! cross product.

use std::collections::BTreeMap;

use crate::error_handling::{ErrorStats, ErrorType};
use crate::models::{EndpointEntry, HeaderTemplate, IdValue, JobConfig, PairSpec};

/// A resolved endpoint pair, both sides present in the catalog and
/// eligible for the job's platform.
#[derive(Debug, Clone)]
pub(crate) struct EndpointPair {
    pub entry_a: EndpointEntry,
    pub entry_b: EndpointEntry,
}

/// One unit of work: an endpoint pair under one geo and one ID value.
#[derive(Debug, Clone)]
pub(crate) struct ComparisonCell {
    /// Generation-order index; the job's output is sorted by it.
    pub index: usize,
    pub pair: EndpointPair,
    pub geo: Option<String>,
    pub id: Option<IdValue>,
    /// Concrete request headers, geo header already pinned.
    pub headers: BTreeMap<String, String>,
}

fn find_endpoint<'a>(
    catalog: &'a [EndpointEntry],
    key: &str,
    platform: &str,
) -> Option<&'a EndpointEntry> {
    catalog
        .iter()
        .find(|e| e.key == key && e.supports_platform(platform))
}

/// Resolves a job's pair specs against the platform-filtered catalog.
///
/// Unresolved keys are never fatal: they are logged, counted, and recorded
/// as warnings while the rest of the job proceeds.
pub(crate) fn resolve_pairs(
    job: &JobConfig,
    catalog: &[EndpointEntry],
    stats: &ErrorStats,
) -> (Vec<EndpointPair>, Vec<String>) {
    let mut pairs = Vec::new();
    let mut warnings = Vec::new();

    let mut resolve_one = |key_a: &str, key_b: &str| {
        let entry_a = find_endpoint(catalog, key_a, &job.platform);
        let entry_b = find_endpoint(catalog, key_b, &job.platform);
        match (entry_a, entry_b) {
            (Some(a), Some(b)) => pairs.push(EndpointPair {
                entry_a: a.clone(),
                entry_b: b.clone(),
            }),
            _ => {
                let missing = if entry_a.is_none() { key_a } else { key_b };
                let warning = format!(
                    "Endpoint '{missing}' not found for platform '{}'; pair skipped",
                    job.platform
                );
                log::warn!("Job {}: {warning}", job.name);
                stats.increment(ErrorType::EndpointSkipped);
                warnings.push(warning);
            }
        }
    };

    for spec in job.pair_specs() {
        match spec {
            PairSpec::SelfCompare(key) => resolve_one(&key, &key),
            PairSpec::ExplicitPair {
                endpoint_a,
                endpoint_b,
            } => resolve_one(&endpoint_a, &endpoint_b),
            PairSpec::LegacyList(keys) => {
                for key in keys {
                    resolve_one(&key, &key);
                }
            }
        }
    }

    (pairs, warnings)
}

/// The ID values a pair fans out over.
///
/// When the endpoint declares an ID category with configured values, all of
/// them apply (only the first in quick mode). Otherwise a single sentinel
/// "no substitution" entry keeps the pair running once.
pub(crate) fn id_values(
    pair: &EndpointPair,
    ids: &BTreeMap<String, Vec<IdValue>>,
    quick_mode: bool,
) -> Vec<Option<IdValue>> {
    let category = pair
        .entry_a
        .id_category
        .as_deref()
        .or(pair.entry_b.id_category.as_deref());
    if let Some(category) = category {
        if let Some(values) = ids.get(category) {
            if !values.is_empty() {
                let take = if quick_mode { 1 } else { values.len() };
                return values.iter().take(take).cloned().map(Some).collect();
            }
        }
    }
    vec![None]
}

/// Expands one job into its full cell cross product: geo × pair × id.
pub(crate) fn build_cells(
    job: &JobConfig,
    template: &HeaderTemplate,
    catalog: &[EndpointEntry],
    ids: &BTreeMap<String, Vec<IdValue>>,
    stats: &ErrorStats,
) -> (Vec<ComparisonCell>, Vec<String>) {
    let (pairs, warnings) = resolve_pairs(job, catalog, stats);
    let geos = template.geo_values(job.quick_mode);

    let mut cells = Vec::new();
    let mut index = 0;
    for geo in &geos {
        let headers = template.materialize(geo.as_deref());
        for pair in &pairs {
            for id in id_values(pair, ids, job.quick_mode) {
                cells.push(ComparisonCell {
                    index,
                    pair: pair.clone(),
                    geo: geo.clone(),
                    id,
                    headers: headers.clone(),
                });
                index += 1;
            }
        }
    }
    (cells, warnings)
}
