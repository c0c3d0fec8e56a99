//! FreeBSD strategy
//!
//! `sysctl` exposes totals only, so the per-package breakdown stays unknown.

use super::command::{capture, CommandRunner};
use super::text::parse_u32;
use super::ProbeError;
use crate::profile::{HyperThreading, OsType, PlatformProfile};

pub(super) const REQUIRED_TOOLS: &[&str] = &["uname", "sysctl"];

const HYPERTHREADING_SYSCTL: &str = "machdep.hyperthreading_allowed";

pub(super) fn probe(runner: &dyn CommandRunner) -> Result<PlatformProfile, ProbeError> {
    // One `uname -r` serves all three version fields.
    let release = capture(runner, "uname", &["-r"])?;
    let cpu_type = capture(runner, "uname", &["-m"])?;
    let cpu_model = sysctl(runner, "hw.model")?;
    let total_num_of_cores = parse_u32("total_num_of_cores", &sysctl(runner, "kern.smp.cores")?)?;
    let total_num_of_threads = parse_u32("total_num_of_threads", &sysctl(runner, "kern.smp.cpus")?)?;
    let hyper_threading = parse_hyperthreading(&sysctl(runner, HYPERTHREADING_SYSCTL)?)?;

    Ok(PlatformProfile {
        os_type: OsType::Freebsd,
        kernel_release: Some(release.clone()),
        kernel_version: Some(release.clone()),
        system_version: Some(release),
        cpu_type: Some(cpu_type),
        cpu_model: Some(cpu_model.clone()),
        cpu_models: Some(vec![cpu_model]),
        num_of_processors: None,
        num_of_cores_of_a_processor: None,
        total_num_of_cores: Some(total_num_of_cores),
        num_of_threads_of_a_processor: None,
        total_num_of_threads,
        hyper_threading,
    })
}

fn sysctl(runner: &dyn CommandRunner, name: &str) -> Result<String, ProbeError> {
    capture(runner, "sysctl", &["-n", name])
}

/// `1` is enabled, `0` disabled; anything else is an error.
pub(super) fn parse_hyperthreading(value: &str) -> Result<HyperThreading, ProbeError> {
    match value.trim() {
        "1" => Ok(HyperThreading::Enabled),
        "0" => Ok(HyperThreading::Disabled),
        other => Err(ProbeError::UnexpectedOutput {
            command: format!("sysctl -n {HYPERTHREADING_SYSCTL}"),
            output: other.to_string(),
        }),
    }
}
