//! CLI subcommand handlers

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use careroute::{
    config::RoutingConfig, nearest_hospitals, AssignmentOrchestrator, EngineConfig,
    EngineError, FileRouteCache, GraphBuilder, InMemoryRecordStore, InMemoryRouteCache,
    OrsClient, RecordFilter, RecordStore, RoadDistanceResolver, RouteCache,
};
use colored::Colorize;
use serde::Serialize;

use crate::{config, output::OutputHandler};

/// Show the current graph
pub fn show_graph(
    orchestrator: &AssignmentOrchestrator<InMemoryRecordStore>,
    show_edges: bool,
    output: &OutputHandler,
) -> Result<()> {
    let view = orchestrator.graph_view()?;

    if output.json {
        return output.print_json(&view);
    }

    output.print_graph(&orchestrator.graph_spec(), &view, show_edges);
    Ok(())
}

/// Build every topology over the dataset and time it
pub fn compare_topologies(
    store: &InMemoryRecordStore,
    config: &EngineConfig,
    k: Option<usize>,
    radius_km: Option<f64>,
    output: &OutputHandler,
) -> Result<()> {
    let points = store
        .patients()
        .iter()
        .map(|p| p.point())
        .chain(store.hospitals().iter().map(|h| h.point()));
    let benchmarks = GraphBuilder::new(points).compare_topologies(
        k.unwrap_or(config.graph.k_neighbors),
        radius_km.unwrap_or(config.graph.radius_km),
    );

    if output.json {
        return output.print_json(&benchmarks);
    }

    output.print_topology_benchmarks(&benchmarks);
    Ok(())
}

/// Run every algorithm for one patient
pub fn compare(
    orchestrator: &AssignmentOrchestrator<InMemoryRecordStore>,
    code: &str,
    output: &OutputHandler,
) -> Result<()> {
    let report = match orchestrator.compare_all_algorithms(code) {
        Ok(report) => report,
        Err(e) if e.is_not_found() => return not_found(output, code),
        Err(e) => return Err(e.into()),
    };

    if output.json {
        return output.print_json(&report);
    }

    output.print_report(&report);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignResult<'a> {
    #[serde(flatten)]
    best: &'a careroute::BestAssignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    road: Option<&'a careroute::RoadDistance>,
}

/// Pick the final hospital for one patient
///
/// With a resolver, the road distance to the chosen hospital is resolved too.
pub async fn assign(
    orchestrator: &AssignmentOrchestrator<InMemoryRecordStore>,
    code: &str,
    resolver: Option<&RoadDistanceResolver>,
    output: &OutputHandler,
) -> Result<()> {
    let best = match orchestrator.assign_best_hospital(code) {
        Ok(best) => best,
        Err(e) if e.is_not_found() => return not_found(output, code),
        Err(e) => return Err(e.into()),
    };

    let road = match (resolver, &best.hospital) {
        (Some(resolver), Some(hospital)) => {
            let origin = careroute::Coordinate::new(best.patient.lat, best.patient.lon);
            let destination = careroute::Coordinate::new(hospital.lat, hospital.lon);
            Some(resolver.resolve(origin, destination).await)
        }
        _ => None,
    };

    if output.json {
        return output.print_json(&AssignResult {
            best: &best,
            road: road.as_ref(),
        });
    }

    output.print_best(&best, road.as_ref());
    Ok(())
}

/// List the hospitals nearest to a patient
pub fn nearest(
    store: &InMemoryRecordStore,
    code: &str,
    top_k: usize,
    output: &OutputHandler,
) -> Result<()> {
    let Some(patient) = store.find_patient_by_code(code)? else {
        return not_found(output, code);
    };

    let ranked = nearest_hospitals(&patient, store.hospitals(), top_k);

    if output.json {
        let rows: Vec<serde_json::Value> = ranked
            .iter()
            .map(|(h, d)| serde_json::json!({ "hospital": h, "distanceKm": d }))
            .collect();
        return output.print_json(&rows);
    }

    output.print_header(&format!("Nearest hospitals to {}", patient.code));
    if ranked.is_empty() {
        output.print_info("No hospitals in dataset.");
        return Ok(());
    }
    let (hospitals, distances): (Vec<_>, Vec<_>) = ranked.into_iter().unzip();
    output.print_hospitals_table(&hospitals, Some(&distances));
    Ok(())
}

/// List patients
pub fn list_patients(
    store: &InMemoryRecordStore,
    filter: &RecordFilter,
    output: &OutputHandler,
) -> Result<()> {
    let patients = store.list_patients(filter)?;

    if output.json {
        return output.print_json(&patients);
    }

    output.print_header(&format!("Patients{}", region_suffix(filter)));
    if patients.is_empty() {
        output.print_info("No patients found.");
        return Ok(());
    }
    output.print_patients_table(&patients);
    Ok(())
}

/// List hospitals
pub fn list_hospitals(
    store: &InMemoryRecordStore,
    filter: &RecordFilter,
    output: &OutputHandler,
) -> Result<()> {
    let hospitals = store.list_hospitals(filter)?;

    if output.json {
        return output.print_json(&hospitals);
    }

    output.print_header(&format!("Hospitals{}", region_suffix(filter)));
    if hospitals.is_empty() {
        output.print_info("No hospitals found.");
        return Ok(());
    }
    output.print_hospitals_table(&hospitals, None);
    Ok(())
}

/// Show the effective configuration
pub fn show_config(config: &EngineConfig, output: &OutputHandler) -> Result<()> {
    if output.json {
        return output.print_json(config);
    }

    output.print_header("Configuration");
    println!(
        "  {} {}",
        "Default path:".dimmed(),
        config::config_path().display()
    );
    println!(
        "  {} {}",
        "ORS key:".dimmed(),
        if config.routing.api_key().is_some() {
            "set".bright_green()
        } else {
            "not set".yellow()
        }
    );
    println!();
    print!("{}", config::to_toml(config)?);
    Ok(())
}

/// Write a default configuration file
pub fn init_config(path: &Path, output: &OutputHandler) -> Result<()> {
    if path.exists() {
        output.print_warning(&format!("Config already exists: {}", path.display()));
        return Ok(());
    }

    config::save(&EngineConfig::default(), path)?;
    output.print_success(&format!("Wrote default config to {}", path.display()));
    Ok(())
}

/// Road distance resolver over ORS with the configured cache
///
/// `None` when no API key is available.
pub async fn road_resolver(
    routing: &RoutingConfig,
    api_key: Option<String>,
) -> Result<Option<RoadDistanceResolver>> {
    let Some(api_key) = api_key.or_else(|| routing.api_key()) else {
        return Ok(None);
    };

    let client = OrsClient::new(api_key, routing).context("Failed to create routing client")?;

    let cache: Arc<dyn RouteCache> = match &routing.cache_dir {
        Some(dir) => Arc::new(
            FileRouteCache::open(dir)
                .await
                .with_context(|| format!("Failed to open route cache at {}", dir))?,
        ),
        None => Arc::new(InMemoryRouteCache::new()),
    };

    Ok(Some(RoadDistanceResolver::new(Arc::new(client), cache)))
}

/// Process exit code for an unknown patient; 2 is taken by usage errors
pub const EXIT_NOT_FOUND: u8 = 3;

/// Report an unknown patient and fail with [`EngineError::PatientNotFound`]
fn not_found(output: &OutputHandler, code: &str) -> Result<()> {
    let error = EngineError::PatientNotFound(code.to_string());
    if output.json {
        output.print_json(&serde_json::json!({ "error": "not_found", "code": code }))?;
    } else {
        output.print_error(&error.to_string());
    }
    Err(error.into())
}

/// Whether a command failed because the patient does not exist
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<EngineError>()
        .is_some_and(EngineError::is_not_found)
}

fn region_suffix(filter: &RecordFilter) -> String {
    match &filter.region {
        Some(region) => format!(" (region: {})", region),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use careroute::{Hospital, Patient};

    use super::*;

    fn store() -> InMemoryRecordStore {
        InMemoryRecordStore::new(
            vec![Patient::new("P1", -12.05, -77.04).with_region("Lima")],
            vec![
                Hospital::new("H1", -12.06, -77.03).with_region("Lima"),
                Hospital::new("H2", -13.52, -71.97).with_region("Cusco"),
            ],
        )
    }

    #[test]
    fn test_region_suffix() {
        assert_eq!(region_suffix(&RecordFilter::all()), "");
        assert_eq!(region_suffix(&RecordFilter::in_region("Lima")), " (region: Lima)");
    }

    #[test]
    fn test_handlers_on_small_dataset() {
        let output = OutputHandler::new(true);
        let store = store();

        list_patients(&store, &RecordFilter::all(), &output).unwrap();
        list_hospitals(&store, &RecordFilter::in_region("Cusco"), &output).unwrap();
        nearest(&store, "P1", 1, &output).unwrap();
        compare_topologies(&store, &EngineConfig::default(), Some(1), None, &output).unwrap();

        let orchestrator = AssignmentOrchestrator::new(store, EngineConfig::default()).unwrap();
        show_graph(&orchestrator, false, &output).unwrap();
        compare(&orchestrator, "P1", &output).unwrap();
    }

    #[test]
    fn test_unknown_patient_is_distinguishable() {
        for json in [false, true] {
            let output = OutputHandler::new(json);
            let orchestrator =
                AssignmentOrchestrator::new(store(), EngineConfig::default()).unwrap();

            let err = compare(&orchestrator, "NOPE", &output).unwrap_err();
            assert!(is_not_found(&err));
            let err = nearest(orchestrator.store(), "NOPE", 3, &output).unwrap_err();
            assert!(is_not_found(&err));
        }
    }

    #[tokio::test]
    async fn test_assign_unknown_patient() {
        let output = OutputHandler::new(true);
        let orchestrator = AssignmentOrchestrator::new(store(), EngineConfig::default()).unwrap();

        let err = assign(&orchestrator, "NOPE", None, &output).await.unwrap_err();
        assert!(is_not_found(&err));
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let err = anyhow::Error::from(EngineError::InvalidTopology("ring".to_string()));
        assert!(!is_not_found(&err));
        assert!(!is_not_found(&anyhow::anyhow!("Patient not found: P1")));
    }

    #[tokio::test]
    async fn test_assign_without_road() {
        let output = OutputHandler::new(true);
        let orchestrator = AssignmentOrchestrator::new(store(), EngineConfig::default()).unwrap();

        assign(&orchestrator, "P1", None, &output).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolver_requires_key() {
        let routing = RoutingConfig {
            api_key_env: "CAREROUTE_TEST_UNSET_KEY".to_string(),
            ..RoutingConfig::default()
        };
        assert!(road_resolver(&routing, None).await.unwrap().is_none());

        let dir = tempfile::tempdir().unwrap();
        let routing = RoutingConfig {
            cache_dir: Some(dir.path().join("routes").display().to_string()),
            ..routing
        };
        let resolver = road_resolver(&routing, Some("key".to_string())).await.unwrap();
        assert!(resolver.is_some());
        assert!(dir.path().join("routes").is_dir());
    }

    #[test]
    fn test_init_config_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = OutputHandler::new(false);

        init_config(&path, &output).unwrap();
        std::fs::write(&path, "[graph]\nkNeighbors = 3\n").unwrap();
        init_config(&path, &output).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[graph]\nkNeighbors = 3\n");
    }
}
