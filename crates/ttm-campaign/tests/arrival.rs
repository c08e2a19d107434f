mod common;

use common::{CONTAINER, StubSolver, campaign_dir};
use ttm_boundary::AuditLog;
use ttm_campaign::{Campaign, CampaignError, CampaignEvent, CampaignState};
use ttm_core::RegionName;
use ttm_project::BoundarySlots;
use ttm_project::slots::cargo_patch;
use ttm_results::Phase;

const AMBIENTS: [f64; 3] = [285.0, 286.0, 287.0];
const ARRIVAL_K: f64 = 298.15;

fn transported(root: &std::path::Path, yaml: &str, solver: &mut StubSolver) -> Campaign {
    let root = campaign_dir(root, yaml, &AMBIENTS);
    let mut campaign = Campaign::open(&root).unwrap();
    let mut weather = campaign.weather_source();
    campaign.run_transport(solver, &mut weather, None).unwrap();
    campaign
}

#[test]
fn arrival_before_transport_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let root = campaign_dir(dir.path(), CONTAINER, &AMBIENTS);
    let mut campaign = Campaign::open(&root).unwrap();
    let mut weather = campaign.weather_source();
    let err = campaign
        .run_arrival(&mut StubSolver::default(), &mut weather, None)
        .unwrap_err();
    assert!(matches!(err, CampaignError::Configuration { .. }), "{err}");
}

#[test]
fn arrival_relaxes_cargo_to_destination_ambient() {
    let dir = tempfile::tempdir().unwrap();
    let mut solver = StubSolver::relaxing(0.5);
    let mut campaign = transported(dir.path(), CONTAINER, &mut solver);

    let mut states = Vec::new();
    let mut record = |e: CampaignEvent| states.push(e.state);
    let mut weather = campaign.weather_source();
    let summary = campaign
        .run_arrival(&mut solver, &mut weather, Some(&mut record))
        .unwrap();

    assert!(summary.converged);
    assert!((summary.ambient_k - ARRIVAL_K).abs() < 1e-9);
    assert!(summary.deviation_k <= 1.0);
    assert!(summary.chunks_run >= 1);
    assert_eq!(states.first(), Some(&CampaignState::TransportComplete));
    assert_eq!(states.get(1), Some(&CampaignState::ArrivalRunning(0)));
    assert_eq!(states.last(), Some(&CampaignState::ArrivalComplete));

    let chunk_s = campaign.definition().tuning.arrival_chunk_s;
    assert_eq!(
        campaign.tree().latest_time_s().unwrap(),
        7200.0 + summary.chunks_run as f64 * chunk_s
    );

    let cargo = RegionName::battery(0, 0);
    let air = RegionName::interior_air();
    let slots = BoundarySlots::new(campaign.store_mut());
    assert!(!slots.regions().unwrap().contains(&air));
    let boundary = slots.convective(&cargo, &cargo_patch(&cargo)).unwrap().unwrap();
    assert_eq!(boundary.ambient_k, summary.ambient_k);
    assert!(boundary.wall.is_some());
    assert_eq!(slots.initial_temperature_k(&cargo).unwrap(), None);

    let rows = AuditLog::new(campaign.layout().arrival_record()).rows().unwrap();
    assert_eq!(rows.len(), summary.chunks_run);
    let (last_t, last_c) = rows[rows.len() - 1];
    assert_eq!(last_t, summary.chunks_run as f64 * chunk_s);
    assert!((last_c - 25.0).abs() <= 1.0);

    let mut weather = campaign.weather_source();
    let post = campaign.postprocess(&mut weather, Phase::Arrival).unwrap();
    assert_eq!(post.regions.len(), 1);
    assert!(campaign.layout().arrival_csv(&cargo).is_file());
}

#[test]
fn converged_arrival_reruns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut solver = StubSolver::relaxing(0.5);
    let mut campaign = transported(dir.path(), CONTAINER, &mut solver);
    let mut weather = campaign.weather_source();
    let first = campaign.run_arrival(&mut solver, &mut weather, None).unwrap();
    let record = std::fs::read_to_string(campaign.layout().arrival_record()).unwrap();

    let mut campaign = Campaign::open(campaign.layout().root()).unwrap();
    let mut again = StubSolver::relaxing(0.5);
    let mut weather = campaign.weather_source();
    let second = campaign.run_arrival(&mut again, &mut weather, None).unwrap();
    assert!(second.converged);
    assert_eq!(second.chunks_run, 0);
    assert_eq!(again.advances(), 0);
    assert_eq!(second.deviation_k, first.deviation_k);
    assert_eq!(
        std::fs::read_to_string(campaign.layout().arrival_record()).unwrap(),
        record
    );
}

#[test]
fn arrival_stops_at_chunk_limit() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!("{CONTAINER}tuning:\n  max_arrival_chunks: 2\n");
    let mut solver = StubSolver::relaxing(0.9);
    let mut campaign = transported(dir.path(), &yaml, &mut solver);
    let mut weather = campaign.weather_source();
    let summary = campaign.run_arrival(&mut solver, &mut weather, None).unwrap();
    assert!(!summary.converged);
    assert_eq!(summary.chunks_run, 2);
    assert!(summary.deviation_k > 1.0);
}
