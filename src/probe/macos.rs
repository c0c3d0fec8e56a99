//! macOS strategy
//!
//! Reads `system_profiler` overviews. Unlike Linux, the thread count is derived
//! from the Hyper-Threading flag rather than the other way around.

use super::command::{capture, CommandRunner};
use super::text::{drop_tokens, find_line, first_integer, per_processor, trimmed_lines};
use super::ProbeError;
use crate::profile::{HyperThreading, OsType, PlatformProfile};

pub(super) const REQUIRED_TOOLS: &[&str] = &["uname", "system_profiler"];

const SOFTWARE_SOURCE: &str = "system_profiler SPSoftwareDataType";
const HARDWARE_SOURCE: &str = "system_profiler SPHardwareDataType";

pub(super) fn probe(runner: &dyn CommandRunner) -> Result<PlatformProfile, ProbeError> {
    let kernel_release = capture(runner, "uname", &["-r"])?;
    let cpu_type = capture(runner, "uname", &["-m"])?;

    let software = SoftwareOverview::parse(&capture(
        runner,
        "system_profiler",
        &["SPSoftwareDataType"],
    )?)?;
    let hardware = HardwareOverview::parse(&capture(
        runner,
        "system_profiler",
        &["SPHardwareDataType"],
    )?)?;

    Ok(PlatformProfile {
        os_type: OsType::Macos,
        kernel_release: Some(kernel_release),
        kernel_version: Some(software.kernel_version),
        system_version: Some(software.system_version),
        cpu_type: Some(cpu_type),
        cpu_model: Some(hardware.cpu_model.clone()),
        cpu_models: Some(vec![hardware.cpu_model]),
        num_of_processors: Some(hardware.processors),
        num_of_cores_of_a_processor: Some(hardware.cores_per_processor),
        total_num_of_cores: Some(hardware.total_cores),
        num_of_threads_of_a_processor: Some(hardware.threads_per_processor),
        total_num_of_threads: hardware.total_threads,
        hyper_threading: hardware.hyper_threading,
    })
}

/// Fields read from `SPSoftwareDataType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SoftwareOverview {
    pub kernel_version: String,
    pub system_version: String,
}

impl SoftwareOverview {
    pub(super) fn parse(output: &str) -> Result<Self, ProbeError> {
        let lines: Vec<&str> = trimmed_lines(output).collect();
        Ok(Self {
            kernel_version: labelled_value(&lines, "Kernel Version", SOFTWARE_SOURCE)?,
            system_version: labelled_value(&lines, "System Version", SOFTWARE_SOURCE)?,
        })
    }
}

/// Fields read from `SPHardwareDataType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct HardwareOverview {
    pub cpu_model: String,
    pub processors: u32,
    pub total_cores: u32,
    pub cores_per_processor: u32,
    pub total_threads: u32,
    pub threads_per_processor: u32,
    pub hyper_threading: HyperThreading,
}

impl HardwareOverview {
    pub(super) fn parse(output: &str) -> Result<Self, ProbeError> {
        let lines: Vec<&str> = trimmed_lines(output).collect();

        // Apple silicon reports a single `Chip:` package instead of `Processor Name:`.
        let chip = lines.iter().copied().find(|line| line.starts_with("Chip:"));
        let cpu_model = match (find_line(&lines, "Processor Name"), chip) {
            (Some(line), _) => drop_tokens(line, 2),
            (None, Some(line)) => drop_tokens(line, 1),
            (None, None) => return Err(not_found(HARDWARE_SOURCE, "Processor Name")),
        };

        let processors = match (find_line(&lines, "Number of Processors"), chip) {
            (Some(line), _) => first_integer(
                "num_of_processors",
                line,
                HARDWARE_SOURCE,
                "Number of Processors",
            )?,
            (None, Some(_)) => 1,
            (None, None) => return Err(not_found(HARDWARE_SOURCE, "Number of Processors")),
        };

        let cores_line = find_line(&lines, "Total Number of Cores")
            .ok_or_else(|| not_found(HARDWARE_SOURCE, "Total Number of Cores"))?;
        let total_cores = first_integer(
            "total_num_of_cores",
            cores_line,
            HARDWARE_SOURCE,
            "Total Number of Cores",
        )?;
        let cores_per_processor =
            per_processor("num_of_cores_of_a_processor", total_cores, processors)?;

        // A missing Hyper-Threading line means disabled, not unknown.
        let hyper_threading = if lines
            .iter()
            .any(|line| line.contains("Hyper-Threading Technology") && line.contains("Enabled"))
        {
            HyperThreading::Enabled
        } else {
            HyperThreading::Disabled
        };
        let threads_per_core = match hyper_threading {
            HyperThreading::Enabled => 2,
            _ => 1,
        };
        let total_threads = total_cores.saturating_mul(threads_per_core);
        let threads_per_processor =
            per_processor("num_of_threads_of_a_processor", total_threads, processors)?;

        Ok(Self {
            cpu_model,
            processors,
            total_cores,
            cores_per_processor,
            total_threads,
            threads_per_processor,
            hyper_threading,
        })
    }
}

/// Value of a `Label Words: value` line with the two label tokens dropped.
fn labelled_value(lines: &[&str], label: &str, source_name: &str) -> Result<String, ProbeError> {
    find_line(lines, label)
        .map(|line| drop_tokens(line, 2))
        .ok_or_else(|| not_found(source_name, label))
}

fn not_found(source_name: &str, marker: &str) -> ProbeError {
    ProbeError::ParseNotFound {
        source_name: source_name.to_string(),
        marker: marker.to_string(),
    }
}
