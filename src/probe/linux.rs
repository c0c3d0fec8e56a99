//! Linux strategy
//!
//! Reads the CPU descriptor source once with `cat`, then derives each field
//! from `grep | sort -u | wc -l` chains run stage by stage over stdin.

use std::path::Path;

use tracing::{debug, warn};

use super::command::{capture, command_line, CommandRunner};
use super::text::{drop_tokens, first_integer, parse_u32, per_processor, trimmed_lines};
use super::{ProbeError, ProbeSettings};
use crate::profile::{HyperThreading, OsType, PlatformProfile};

pub(super) const REQUIRED_TOOLS: &[&str] = &["cat", "grep", "sort", "wc", "uname"];

type Stage<'a> = (&'a str, &'a [&'a str]);

const SORT_UNIQUE: Stage<'static> = ("sort", &["-u"]);
const COUNT_LINES: Stage<'static> = ("wc", &["-l"]);

fn grep<'a>(args: &'a [&'a str]) -> Stage<'a> {
    ("grep", args)
}

pub(super) fn probe(
    runner: &dyn CommandRunner,
    settings: &ProbeSettings,
) -> Result<PlatformProfile, ProbeError> {
    let kernel_release = capture(runner, "uname", &["-r"])?;
    let kernel_version = capture(runner, "uname", &["-v"])?;
    let cpu_type = capture(runner, "uname", &["-m"])?;
    let system_version = read_issue(runner, &settings.issue_path)?;

    let source = settings.cpuinfo_path.to_string_lossy().into_owned();
    let cpuinfo = capture(runner, "cat", &[source.as_str()])?;

    let models_text = pipeline(runner, &cpuinfo, &[grep(&["model name"]), SORT_UNIQUE])?;
    let cpu_models = parse_model_names(&models_text);
    let cpu_model = cpu_models
        .first()
        .cloned()
        .ok_or_else(|| ProbeError::ParseNotFound {
            source_name: source.clone(),
            marker: "model name".to_string(),
        })?;

    let packages_text = pipeline(
        runner,
        &cpuinfo,
        &[grep(&["physical id"]), SORT_UNIQUE, COUNT_LINES],
    )?;
    let num_of_processors = parse_u32("num_of_processors", &packages_text)?;

    let cores_text = pipeline(runner, &cpuinfo, &[grep(&["cpu cores"]), SORT_UNIQUE])?;
    let num_of_cores_of_a_processor =
        first_integer("num_of_cores_of_a_processor", &cores_text, &source, "cpu cores")?;

    let threads_text = pipeline(runner, &cpuinfo, &[grep(&["-c", "^processor"])])?;
    let total_num_of_threads = parse_u32("total_num_of_threads", &threads_text)?;

    let topology = Topology::derive(
        num_of_processors,
        num_of_cores_of_a_processor,
        total_num_of_threads,
    )?;
    debug!(?topology, "linux topology");

    Ok(PlatformProfile {
        os_type: OsType::Linux,
        kernel_release: Some(kernel_release),
        kernel_version: Some(kernel_version),
        system_version: Some(system_version),
        cpu_type: Some(cpu_type),
        cpu_model: Some(cpu_model),
        cpu_models: Some(cpu_models),
        num_of_processors: Some(topology.processors),
        num_of_cores_of_a_processor: Some(topology.cores_per_processor),
        total_num_of_cores: Some(topology.total_cores),
        num_of_threads_of_a_processor: Some(topology.threads_per_processor),
        total_num_of_threads: topology.total_threads,
        hyper_threading: topology.hyper_threading,
    })
}

/// Distribution banner; an unreadable banner is an empty string, not an error.
fn read_issue(runner: &dyn CommandRunner, path: &Path) -> Result<String, ProbeError> {
    let path = path.to_string_lossy().into_owned();
    let output = runner.run("cat", &[path.as_str()], None)?;
    if output.success() {
        Ok(output.stdout.trim().to_string())
    } else {
        warn!(path = %path, status = ?output.status, "could not read OS banner");
        Ok(String::new())
    }
}

/// Feed `input` through each stage in turn, like a shell pipeline without the shell.
fn pipeline(
    runner: &dyn CommandRunner,
    input: &str,
    stages: &[Stage<'_>],
) -> Result<String, ProbeError> {
    let mut data = input.to_string();
    for &(program, args) in stages {
        let output = runner.run(program, args, Some(&data))?;
        match output.status {
            Some(0) => {}
            // grep: no lines selected
            Some(1) if program == "grep" => {}
            status => {
                return Err(ProbeError::CommandExecution {
                    command: command_line(program, args),
                    status,
                })
            }
        }
        data = output.stdout;
    }
    Ok(data)
}

/// Model strings from sorted-unique `model name` lines.
///
/// The first three tokens (`model`, `name`, `:`) are dropped and the rest re-joined
/// with single spaces; lines left blank are discarded. Lines that only differed in
/// the key prefix collapse into one entry.
pub(super) fn parse_model_names(lines: &str) -> Vec<String> {
    let mut models: Vec<String> = trimmed_lines(lines)
        .map(|line| drop_tokens(line, 3))
        .filter(|model| !model.is_empty())
        .collect();
    models.sort();
    models.dedup();
    models
}

/// Package / core / thread counts of a Linux host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Topology {
    pub processors: u32,
    pub cores_per_processor: u32,
    pub total_cores: u32,
    pub total_threads: u32,
    pub threads_per_processor: u32,
    pub hyper_threading: HyperThreading,
}

impl Topology {
    pub(super) fn derive(
        processors: u32,
        cores_per_processor: u32,
        total_threads: u32,
    ) -> Result<Self, ProbeError> {
        let total_cores = cores_per_processor.saturating_mul(processors);
        let threads_per_processor =
            per_processor("num_of_threads_of_a_processor", total_threads, processors)?;
        Ok(Self {
            processors,
            cores_per_processor,
            total_cores,
            total_threads,
            threads_per_processor,
            hyper_threading: HyperThreading::from_counts(total_cores, total_threads),
        })
    }
}
