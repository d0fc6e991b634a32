//! Output formatting and terminal rendering
//!
//! Every command renders either colored tables or, with `--json`, the raw
//! serialized result.

use anyhow::Result;
use careroute::{
    AlgorithmRun, BestAssignment, ComparisonReport, GraphSpec, GraphView, Hospital, Patient,
    PathComparison, RoadDistance, RunPayload, TopologyBenchmark,
};
use colored::Colorize;
use serde::Serialize;

/// Render an optional distance
fn fmt_km(km: Option<f64>) -> String {
    match km {
        Some(km) => format!("{:.2} km", km),
        None => "-".to_string(),
    }
}

/// Shorten a value to fit a table column
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

/// Output handler for terminal display
pub struct OutputHandler {
    pub json: bool,
}

impl OutputHandler {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print a value as pretty JSON
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a section header
    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", format!("▶ {}", text).bright_yellow().bold());
        println!("{}", "─".repeat(60).dimmed());
    }

    /// Print a success message
    pub fn print_success(&self, text: &str) {
        println!("{} {}", "✓".bright_green(), text.bright_white());
    }

    /// Print an error message
    pub fn print_error(&self, text: &str) {
        println!("{} {}", "✗".bright_red(), text.bright_red());
    }

    /// Print a warning message
    pub fn print_warning(&self, text: &str) {
        println!("{} {}", "⚠".bright_yellow(), text.yellow());
    }

    /// Print an info message
    pub fn print_info(&self, text: &str) {
        println!("{} {}", "ℹ".bright_blue(), text);
    }

    fn print_field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<18} {}", format!("{}:", label).dimmed(), value);
    }

    /// Print the current graph, optionally with its edge list
    pub fn print_graph(&self, spec: &GraphSpec, view: &GraphView, show_edges: bool) {
        self.print_header(&format!("Graph: {}", spec.topology.label()));
        self.print_field("Topology", spec.topology);
        self.print_field("k", spec.k);
        self.print_field("Radius", format!("{} km", spec.radius_km));
        self.print_field("Nodes", view.total_nodes);
        self.print_field("Edge entries", view.total_edges);

        if show_edges && !view.edges.is_empty() {
            println!();
            println!(
                "  {:<14} {:<14} {:>10}",
                "FROM".dimmed(),
                "TO".dimmed(),
                "KM".dimmed()
            );
            for edge in &view.edges {
                println!(
                    "  {:<14} {:<14} {:>10.2}",
                    truncate(&edge.from, 14).bright_white(),
                    truncate(&edge.to, 14),
                    edge.weight
                );
            }
        }
    }

    /// Print the topology construction benchmark
    pub fn print_topology_benchmarks(&self, benchmarks: &[TopologyBenchmark]) {
        self.print_header("Topology Comparison");
        println!(
            "  {:<16} {:<14} {:>10} {:>8} {:>8}",
            "ALGORITHM".dimmed(),
            "BIG-O".dimmed(),
            "TIME (ms)".dimmed(),
            "NODES".dimmed(),
            "EDGES".dimmed()
        );
        for bench in benchmarks {
            println!(
                "  {:<16} {:<14} {:>10.3} {:>8} {:>8}",
                bench.algorithm.bright_white(),
                bench.big_o,
                bench.time_ms,
                bench.nodes,
                bench.edges
            );
        }
    }

    /// Print a full algorithm comparison for one patient
    pub fn print_report(&self, report: &ComparisonReport) {
        self.print_header(&format!("Algorithm Comparison: {}", report.patient.code));
        self.print_field("Report", report.report_id);
        self.print_field("Generated", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        self.print_field("Specialty", &report.specialty_required);
        self.print_field("Graph", report.graph.topology);
        self.print_field("Candidates", report.candidate_count);

        println!();
        println!("  {}", "Assignment".bright_cyan().bold());
        for run in &report.assignment_algorithms {
            self.print_assignment_run(run);
        }

        println!();
        println!("  {}", "Network".bright_cyan().bold());
        for run in &report.network_algorithms {
            self.print_network_run(run);
        }
    }

    fn print_assignment_run(&self, run: &AlgorithmRun) {
        let Some(outcome) = run.assignment() else {
            return;
        };

        let result = match (&outcome.hospital, &outcome.failure) {
            (Some(h), _) => format!("{} ({})", h.code, fmt_km(outcome.distance_km))
                .bright_green()
                .to_string(),
            (None, Some(failure)) => failure.to_string().yellow().to_string(),
            (None, None) => "unassigned".dimmed().to_string(),
        };

        println!(
            "    {:<20} {:<10} {:>9.3} ms  {}",
            run.name.bright_white(),
            run.big_o.dimmed(),
            run.time_ms,
            result
        );

        if let Some(paths) = &outcome.paths {
            self.print_paths(paths);
        }
    }

    fn print_paths(&self, paths: &PathComparison) {
        for path in [&paths.dijkstra, &paths.bellman_ford] {
            let route = if path.found() {
                format!("{} via {}", fmt_km(path.distance_km), path.path_nodes.join(" → "))
            } else {
                "no path".to_string()
            };
            println!(
                "      {:<16} {:>9.3} ms  {}",
                path.algorithm.dimmed(),
                path.time_ms,
                route
            );
        }
        if !paths.consistent {
            println!("      {}", "⚠ shortest path algorithms disagree".yellow());
        }
    }

    fn print_network_run(&self, run: &AlgorithmRun) {
        let result = match &run.payload {
            RunPayload::SpanningForest {
                mst_cost,
                edge_count,
            } => format!("cost {:.2} km over {} edges", mst_cost, edge_count),
            RunPayload::MaxFlow {
                source,
                sink,
                max_flow,
            } => format!("max flow {} ({} → {})", max_flow, source, sink),
            RunPayload::Assignment(_) => String::new(),
        };

        println!(
            "    {:<20} {:<10} {:>9.3} ms  {}",
            run.name.bright_white(),
            run.big_o.dimmed(),
            run.time_ms,
            result
        );
    }

    /// Print the final assignment, with the road distance when one was resolved
    pub fn print_best(&self, best: &BestAssignment, road: Option<&RoadDistance>) {
        self.print_header(&format!("Assignment: {}", best.patient.code));
        self.print_field("Severity", format!("{:?}", best.patient.severity));
        self.print_field("Specialty", &best.specialty_required);

        let Some(hospital) = &best.hospital else {
            self.print_warning("No strategy produced an assignment");
            return;
        };

        if let Some(kind) = best.algorithm_used {
            self.print_field("Algorithm", kind.name());
        }
        self.print_field(
            "Hospital",
            format!(
                "{} {}",
                hospital.code.bright_green().bold(),
                hospital.name.as_deref().unwrap_or_default()
            ),
        );
        if let Some(region) = &hospital.region {
            self.print_field("Region", region);
        }
        self.print_field("Straight line", fmt_km(best.distance_km));

        if let Some(road) = road {
            let label = if road.is_road() { "Road" } else { "Road (fallback)" };
            let duration = road
                .duration_min
                .map(|m| format!(", {:.0} min", m))
                .unwrap_or_default();
            self.print_field(label, format!("{}{}", fmt_km(Some(road.distance_km)), duration));
        }

        if let Some(paths) = &best.paths {
            println!();
            self.print_paths(paths);
        }
    }

    /// Print a table of patients
    pub fn print_patients_table(&self, patients: &[Patient]) {
        println!(
            "  {:<12} {:<10} {:<14} {:>10} {:>10}  {}",
            "CODE".dimmed(),
            "SEVERITY".dimmed(),
            "REGION".dimmed(),
            "LAT".dimmed(),
            "LON".dimmed(),
            "DIAGNOSIS".dimmed()
        );
        for p in patients {
            println!(
                "  {:<12} {:<10} {:<14} {:>10.4} {:>10.4}  {}",
                truncate(&p.code, 12).bright_white(),
                format!("{:?}", p.severity),
                truncate(p.region.as_deref().unwrap_or("-"), 14),
                p.lat,
                p.lon,
                truncate(p.diagnosis.as_deref().unwrap_or("-"), 40).dimmed()
            );
        }
    }

    /// Print a table of hospitals, with distances when given
    pub fn print_hospitals_table(&self, hospitals: &[Hospital], distances: Option<&[f64]>) {
        println!(
            "  {:<10} {:<28} {:<14} {:>8} {:>10}",
            "CODE".dimmed(),
            "NAME".dimmed(),
            "REGION".dimmed(),
            "CAPACITY".dimmed(),
            "DISTANCE".dimmed()
        );
        for (i, h) in hospitals.iter().enumerate() {
            let capacity = match h.capacity {
                Some(c) if c > 0 => c.to_string(),
                _ => "∞".to_string(),
            };
            let distance = distances.and_then(|d| d.get(i).copied());
            println!(
                "  {:<10} {:<28} {:<14} {:>8} {:>10}",
                truncate(&h.code, 10).bright_white(),
                truncate(h.name.as_deref().unwrap_or("-"), 28),
                truncate(h.region.as_deref().unwrap_or("-"), 14),
                capacity,
                fmt_km(distance)
            );
        }
    }
}
