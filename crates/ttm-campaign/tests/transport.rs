mod common;

use std::fs;
use std::path::Path;

use common::{CAR, CONTAINER, StubSolver, WALL_OFFSET_K, campaign_dir};
use ttm_boundary::AuditLog;
use ttm_campaign::{Campaign, CampaignError, CampaignEvent, CampaignState, MeshStatus};
use ttm_convection::{Regime, natural};
use ttm_core::RegionName;
use ttm_core::units::{k, m};
use ttm_project::{BoundarySlots, load_yaml};
use ttm_results::Phase;

const CONTAINER_HEIGHT_M: f64 = 2.3855;

fn run(campaign: &mut Campaign, solver: &mut StubSolver) -> Vec<CampaignState> {
    let mut weather = campaign.weather_source();
    let mut states = Vec::new();
    let mut record = |e: CampaignEvent| states.push(e.state);
    campaign
        .run_transport(solver, &mut weather, Some(&mut record))
        .unwrap();
    states
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

fn log_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn three_waypoints_run_two_segments() {
    let dir = tempfile::tempdir().unwrap();
    let root = campaign_dir(dir.path(), CONTAINER, &[285.0, 286.0, 287.0]);
    let mut campaign = Campaign::open(&root).unwrap();
    let mut solver = StubSolver::default();
    let mut weather = campaign.weather_source();
    let mut states = Vec::new();
    let mut record = |e: CampaignEvent| states.push(e.state);
    let summary = campaign
        .run_transport(&mut solver, &mut weather, Some(&mut record))
        .unwrap();

    assert_eq!(
        states,
        vec![
            CampaignState::Unbuilt,
            CampaignState::MeshBuilt,
            CampaignState::Running(0),
            CampaignState::SegmentComplete(0),
            CampaignState::Running(1),
            CampaignState::SegmentComplete(1),
            CampaignState::TransportComplete,
        ]
    );
    assert_eq!(summary.mesh, MeshStatus::Built);
    assert_eq!(summary.resumed_from_s, 0.0);
    assert_eq!(summary.duration_s, 7200.0);
    assert_eq!(solver.advances(), 2);
    assert_eq!(campaign.tree().latest_time_s().unwrap(), 7200.0);

    let [first, second] = summary.boundaries.as_slice() else {
        panic!("expected two boundaries, got {}", summary.boundaries.len());
    };
    assert_eq!(first.wall_temperature_k, campaign.definition().initial_temperature_k());
    assert_eq!(second.coefficient.regime, Regime::Natural);
    let wall_k = first.ambient_k - WALL_OFFSET_K;
    assert_eq!(second.wall_temperature_k, wall_k);
    let expected = natural(m(CONTAINER_HEIGHT_M), k(wall_k), k(second.ambient_k))
        .unwrap()
        .value;
    let h = second.coefficient.value_w_per_m2k;
    assert!((h - expected).abs() <= 1e-6 * expected, "{h} vs {expected}");

    let layout = campaign.layout();
    assert_eq!(
        log_names(&layout.logs_dir()),
        vec![
            "log.chtMultiRegionFoam_2021-06-01_00-00-00".to_string(),
            "log.chtMultiRegionFoam_2021-06-01_01-00-00".to_string(),
        ]
    );
    let coefficients = AuditLog::new(layout.coefficient_log()).rows().unwrap();
    assert_eq!(coefficients.len(), 2);
    assert_eq!(coefficients[1], (3600.0, h));
    let speeds = AuditLog::new(layout.speed_log()).rows().unwrap();
    assert_eq!(speeds.iter().map(|(t, _)| *t).collect::<Vec<_>>(), vec![0.0, 3600.0]);

    let mut weather = campaign.weather_source();
    let post = campaign.postprocess(&mut weather, Phase::Transport).unwrap();
    assert_eq!(post.regions.len(), 2);
    assert!(post.cargo.is_some());
    assert_eq!(post.wall_heat_flux_patches, vec!["bottom", "carrier"]);
    let cargo = RegionName::battery(0, 0);
    assert!(layout.temperature_csv(&cargo).is_file());
    assert!(layout.temperature_csv(&RegionName::interior_air()).is_file());
    assert!(layout.wall_heat_flux_dir().join("carrier.csv").is_file());
}

#[test]
fn rerun_after_completion_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = campaign_dir(dir.path(), CONTAINER, &[285.0, 286.0, 287.0]);
    let mut campaign = Campaign::open(&root).unwrap();
    run(&mut campaign, &mut StubSolver::default());
    let coefficients = read(&campaign.layout().coefficient_log());

    let mut campaign = Campaign::open(&root).unwrap();
    let mut solver = StubSolver::default();
    let mut weather = campaign.weather_source();
    let summary = campaign.run_transport(&mut solver, &mut weather, None).unwrap();
    assert_eq!(summary.mesh, MeshStatus::Existing);
    assert!(summary.boundaries.is_empty());
    assert!(solver.steps.is_empty());
    assert_eq!(read(&campaign.layout().coefficient_log()), coefficients);
}

#[test]
fn resumed_run_matches_uninterrupted_run() {
    let ambients = [285.0, 289.0, 283.0, 287.0];
    let dir = tempfile::tempdir().unwrap();

    let straight = campaign_dir(&dir.path().join("straight"), CONTAINER, &ambients);
    let mut campaign = Campaign::open(&straight).unwrap();
    run(&mut campaign, &mut StubSolver::relaxing(0.5));

    let killed = campaign_dir(&dir.path().join("killed"), CONTAINER, &ambients);
    let mut campaign = Campaign::open(&killed).unwrap();
    run(&mut campaign, &mut StubSolver::relaxing(0.5));
    // Kill during the last segment: its output is gone, a half-written
    // directory is left behind, fragments and audit rows are stale.
    let case = campaign.layout().case_dir();
    fs::remove_dir_all(case.join("10800")).unwrap();
    fs::create_dir_all(case.join("9000").join("battery0_0")).unwrap();

    let mut campaign = Campaign::open(&killed).unwrap();
    let mut solver = StubSolver::relaxing(0.5);
    let mut weather = campaign.weather_source();
    let summary = campaign.run_transport(&mut solver, &mut weather, None).unwrap();
    assert_eq!(summary.resumed_from_s, 7200.0);
    assert_eq!(summary.boundaries.len(), 1);
    assert_eq!(summary.boundaries[0].segment_index, 2);
    assert!(!case.join("9000").exists());

    let a = Campaign::open(&straight).unwrap();
    let b = Campaign::open(&killed).unwrap();
    for (x, y) in [
        (a.layout().coefficient_log(), b.layout().coefficient_log()),
        (a.layout().speed_log(), b.layout().speed_log()),
    ] {
        assert_eq!(read(&x), read(&y));
    }

    for campaign in [&a, &b] {
        let mut weather = campaign.weather_source();
        campaign.postprocess(&mut weather, Phase::Transport).unwrap();
    }
    for region in [RegionName::interior_air(), RegionName::battery(0, 0)] {
        assert_eq!(
            read(&a.layout().temperature_csv(&region)),
            read(&b.layout().temperature_csv(&region))
        );
    }
    assert_eq!(
        read(&a.layout().wall_heat_flux_dir().join("carrier.csv")),
        read(&b.layout().wall_heat_flux_dir().join("carrier.csv"))
    );

    // The re-run segment's log is archived next to the killed one.
    let names = log_names(&b.layout().logs_dir());
    assert!(names.contains(&"log.chtMultiRegionFoam_2021-06-01_02-00-00".to_string()));
    assert!(names.contains(&"log.chtMultiRegionFoam_2021-06-01_02-00-00_1".to_string()));
}

#[test]
fn stalled_solver_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = campaign_dir(dir.path(), CONTAINER, &[285.0, 286.0]);
    let mut campaign = Campaign::open(&root).unwrap();
    let mut solver = StubSolver {
        stall: true,
        ..StubSolver::default()
    };
    let mut weather = campaign.weather_source();
    let err = campaign.run_transport(&mut solver, &mut weather, None).unwrap_err();
    assert!(
        matches!(err, CampaignError::SolverDidNotAdvance { from_s, to_s } if from_s == 0.0 && to_s == 3600.0),
        "{err}"
    );
}

#[test]
fn cpu_cores_are_fixed_once_decomposed() {
    let dir = tempfile::tempdir().unwrap();
    let root = campaign_dir(dir.path(), CONTAINER, &[285.0, 286.0]);
    let mut campaign = Campaign::open(&root).unwrap();

    assert!(matches!(campaign.set_cpu_cores(0), Err(CampaignError::Configuration { .. })));
    campaign.set_cpu_cores(2).unwrap();

    let case = campaign.layout().case_dir();
    for i in 0..2 {
        fs::create_dir_all(case.join(format!("processor{i}"))).unwrap();
    }
    let err = campaign.set_cpu_cores(3).unwrap_err();
    assert!(matches!(err, CampaignError::Configuration { .. }), "{err}");
    campaign.set_cpu_cores(2).unwrap();
    let def = load_yaml(&campaign.layout().campaign_file()).unwrap();
    assert_eq!(def.solver.cpu_cores, Some(2));
}

#[test]
fn car_transport_drops_the_interior_air() {
    let dir = tempfile::tempdir().unwrap();
    let root = campaign_dir(dir.path(), CAR, &[285.0, 286.0]);
    let mut campaign = Campaign::open(&root).unwrap();
    let mut solver = StubSolver::default();
    let summary = {
        let mut weather = campaign.weather_source();
        campaign.run_transport(&mut solver, &mut weather, None).unwrap()
    };
    assert_eq!(summary.boundaries.len(), 1);

    let air = RegionName::interior_air();
    let cargo = RegionName::battery(0, 0);
    let slots = BoundarySlots::new(campaign.store_mut());
    assert_eq!(slots.regions().unwrap(), vec![cargo.clone()]);
    let case = campaign.layout().case_dir();
    assert!(case.join("3600").join(cargo.as_str()).is_dir());
    assert!(!case.join("3600").join(air.as_str()).exists());
}
