//! External CFD solver interface.
//!
//! Every step is one blocking invocation inside the case directory. The
//! solver's own parallelism is opaque to the campaign.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};
use ttm_core::RegionName;

use crate::error::{CampaignError, CampaignResult};

#[derive(Debug, Clone, PartialEq)]
pub enum SolverStep {
    /// Background mesh, snapping and region splitting.
    BuildMesh,
    /// Split the case over `processor<N>` directories.
    Decompose,
    /// Push configured boundary and initial values into the fields.
    ApplyBoundaries,
    /// Advance to the configured end time.
    Advance,
    /// Merge the latest decomposed time into the case directory.
    Reconstruct,
    /// Point-sample the probe list of one region at one output time.
    Sample { region: RegionName, time: String },
}

impl fmt::Display for SolverStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverStep::BuildMesh => f.write_str("mesh"),
            SolverStep::Decompose => f.write_str("decompose"),
            SolverStep::ApplyBoundaries => f.write_str("apply-boundaries"),
            SolverStep::Advance => f.write_str("advance"),
            SolverStep::Reconstruct => f.write_str("reconstruct"),
            SolverStep::Sample { region, time } => write!(f, "sample {region}@{time}"),
        }
    }
}

pub trait Solver {
    /// Run `step` in `case_dir` and return once it has exited.
    fn run(&mut self, step: &SolverStep, case_dir: &Path) -> CampaignResult<()>;
}

/// Runs the solver tool chain as child processes.
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    /// Transient multi-region application.
    pub application: String,
    /// Case-relative mesh build script.
    pub mesh_script: String,
    pub mpi_launcher: String,
    pub cpu_cores: usize,
    /// Log file of the application inside the case directory.
    pub solver_log: String,
}

impl ProcessSolver {
    pub fn new(cpu_cores: usize, solver_log: impl Into<String>) -> Self {
        Self {
            application: "chtMultiRegionFoam".to_string(),
            mesh_script: "./Allmesh".to_string(),
            mpi_launcher: "mpirun".to_string(),
            cpu_cores: cpu_cores.max(1),
            solver_log: solver_log.into(),
        }
    }

    fn parallel(&self, program: &str, args: &[&str]) -> (String, Vec<String>) {
        let mut all: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        if self.cpu_cores > 1 {
            let mut launch = vec![
                "-np".to_string(),
                self.cpu_cores.to_string(),
                program.to_string(),
            ];
            launch.append(&mut all);
            launch.push("-parallel".to_string());
            (self.mpi_launcher.clone(), launch)
        } else {
            (program.to_string(), all)
        }
    }

    /// Program and arguments for `step`.
    pub fn command(&self, step: &SolverStep) -> (String, Vec<String>) {
        let plain = |program: &str, args: &[&str]| {
            (
                program.to_string(),
                args.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
            )
        };
        match step {
            SolverStep::BuildMesh => plain(&self.mesh_script, &[]),
            SolverStep::Decompose => plain("decomposePar", &["-allRegions", "-force"]),
            SolverStep::ApplyBoundaries => self.parallel("changeDictionary", &["-allRegions"]),
            SolverStep::Advance => self.parallel(&self.application, &[]),
            SolverStep::Reconstruct => plain("reconstructPar", &["-allRegions", "-latestTime"]),
            SolverStep::Sample { region, time } => plain(
                "postProcess",
                &["-func", "probes", "-region", region.as_str(), "-time", time.as_str()],
            ),
        }
    }

    pub fn log_name(&self, step: &SolverStep) -> String {
        match step {
            SolverStep::Advance => self.solver_log.clone(),
            SolverStep::BuildMesh => "log.mesh".to_string(),
            SolverStep::Decompose => "log.decomposePar".to_string(),
            SolverStep::ApplyBoundaries => "log.changeDictionary".to_string(),
            SolverStep::Reconstruct => "log.reconstructPar".to_string(),
            SolverStep::Sample { .. } => "log.postProcess".to_string(),
        }
    }
}

impl Solver for ProcessSolver {
    fn run(&mut self, step: &SolverStep, case_dir: &Path) -> CampaignResult<()> {
        let (program, args) = self.command(step);
        let log = File::create(case_dir.join(self.log_name(step)))?;
        let err_log = log.try_clone()?;
        info!(step = %step, program = %program, "starting solver step");
        let status = Command::new(&program)
            .args(&args)
            .current_dir(case_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(err_log))
            .status()?;
        if !status.success() {
            return Err(CampaignError::SolverFailed {
                step: step.clone(),
                status: status.to_string(),
            });
        }
        debug!(step = %step, "solver step finished");
        Ok(())
    }
}
