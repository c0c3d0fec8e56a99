//! Platform probing
//!
//! The host OS family selects one [`Strategy`]. Each strategy checks that its
//! tools are on the search path, runs them in sequence, and parses their text
//! output into a [`PlatformProfile`]. Any failure aborts the whole query.

pub mod command;
mod error;
mod freebsd;
mod linux;
mod macos;
pub mod text;

use std::path::PathBuf;

use tracing::info;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use error::ProbeError;

use crate::profile::{CpuProfile, OsType, PlatformProfile, RuntimeInfo};

/// OS family of the running host.
pub fn detect_os() -> OsType {
    os_type_from_tag(std::env::consts::OS)
}

/// Map a kernel/platform tag to an OS family. Unrecognized tags are `Other`.
pub fn os_type_from_tag(tag: &str) -> OsType {
    match tag.trim().to_ascii_lowercase().as_str() {
        "linux" => OsType::Linux,
        "macos" | "darwin" => OsType::Macos,
        "freebsd" => OsType::Freebsd,
        "windows" | "win32" | "nt" => OsType::Windows,
        _ => OsType::Other,
    }
}

/// Paths read by the Linux strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// CPU descriptor source
    pub cpuinfo_path: PathBuf,
    /// Distribution banner
    pub issue_path: PathBuf,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            cpuinfo_path: PathBuf::from("/proc/cpuinfo"),
            issue_path: PathBuf::from("/etc/issue"),
        }
    }
}

/// Per-platform information strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Linux,
    Macos,
    FreeBsd,
    /// No tools are run; only the runtime's scheduler count is reported.
    Unsupported(OsType),
}

impl Strategy {
    pub fn for_os(os: OsType) -> Self {
        match os {
            OsType::Linux => Strategy::Linux,
            OsType::Macos => Strategy::Macos,
            OsType::Freebsd => Strategy::FreeBsd,
            OsType::Windows | OsType::Other => Strategy::Unsupported(os),
        }
    }

    pub fn os_type(&self) -> OsType {
        match self {
            Strategy::Linux => OsType::Linux,
            Strategy::Macos => OsType::Macos,
            Strategy::FreeBsd => OsType::Freebsd,
            Strategy::Unsupported(os) => *os,
        }
    }

    /// Tools that must be on the search path before probing starts.
    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            Strategy::Linux => linux::REQUIRED_TOOLS,
            Strategy::Macos => macos::REQUIRED_TOOLS,
            Strategy::FreeBsd => freebsd::REQUIRED_TOOLS,
            Strategy::Unsupported(_) => &[],
        }
    }

    /// Produce this platform's profile fragment.
    pub fn probe(
        &self,
        runner: &dyn CommandRunner,
        settings: &ProbeSettings,
        schedulers: u32,
    ) -> Result<PlatformProfile, ProbeError> {
        command::ensure_tools(runner, self.required_tools())?;
        match self {
            Strategy::Linux => linux::probe(runner, settings),
            Strategy::Macos => macos::probe(runner),
            Strategy::FreeBsd => freebsd::probe(runner),
            Strategy::Unsupported(os) => Ok(PlatformProfile::unknown(*os, schedulers)),
        }
    }
}

/// Runs one strategy against a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct Prober<R> {
    runner: R,
    settings: ProbeSettings,
}

impl<R: CommandRunner> Prober<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            settings: ProbeSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ProbeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Full profile of the running host.
    pub fn profile(&self, runtime: &RuntimeInfo) -> Result<CpuProfile, ProbeError> {
        self.profile_for(detect_os(), runtime)
    }

    /// Full profile using the strategy for `os`.
    pub fn profile_for(&self, os: OsType, runtime: &RuntimeInfo) -> Result<CpuProfile, ProbeError> {
        let strategy = Strategy::for_os(os);
        info!(os = os.as_str(), ?strategy, "probing host");
        let platform = strategy.probe(&self.runner, &self.settings, runtime.schedulers)?;
        Ok(CpuProfile::assemble(platform, runtime))
    }
}

/// Get the full profile of this host with default settings.
pub fn all_profile() -> Result<CpuProfile, ProbeError> {
    Prober::new(SystemRunner::default()).profile(&RuntimeInfo::current())
}

#[cfg(test)]
mod tests {
    use super::command::fake::ScriptedRunner;
    use super::*;
    use crate::profile::HyperThreading;

    fn runtime() -> RuntimeInfo {
        RuntimeInfo {
            release: 1,
            version: "1.0.0".to_string(),
            schedulers: 12,
        }
    }

    fn scripted_for(os: OsType) -> ScriptedRunner {
        match os {
            OsType::Linux => ScriptedRunner::new()
                .with_tools(linux::REQUIRED_TOOLS)
                .respond("uname -r", "6.8.0\n")
                .respond("uname -v", "#1 SMP\n")
                .respond("uname -m", "x86_64\n")
                .respond("cat /etc/issue", "Arch Linux \\r (\\l)\n")
                .respond(
                    "cat /proc/cpuinfo",
                    "processor\t: 0\nmodel name\t: AMD Ryzen 5 3600\nphysical id\t: 0\ncpu cores\t: 1\n",
                ),
            OsType::Macos => ScriptedRunner::new()
                .with_tools(macos::REQUIRED_TOOLS)
                .respond("uname -r", "23.1.0\n")
                .respond("uname -m", "arm64\n")
                .respond(
                    "system_profiler SPSoftwareDataType",
                    "System Version: macOS 14.1 (23B74)\nKernel Version: Darwin 23.1.0\n",
                )
                .respond(
                    "system_profiler SPHardwareDataType",
                    "Chip: Apple M1\nTotal Number of Cores: 8 (4 performance and 4 efficiency)\n",
                ),
            OsType::Freebsd => ScriptedRunner::new()
                .with_tools(freebsd::REQUIRED_TOOLS)
                .respond("uname -r", "14.1-RELEASE\n")
                .respond("uname -m", "amd64\n")
                .respond("sysctl -n hw.model", "AMD EPYC 7B13\n")
                .respond("sysctl -n kern.smp.cores", "2\n")
                .respond("sysctl -n kern.smp.cpus", "4\n")
                .respond("sysctl -n machdep.hyperthreading_allowed", "1\n"),
            OsType::Windows | OsType::Other => ScriptedRunner::new(),
        }
    }

    #[test]
    fn tags_map_to_families() {
        assert_eq!(os_type_from_tag("linux"), OsType::Linux);
        assert_eq!(os_type_from_tag("Darwin"), OsType::Macos);
        assert_eq!(os_type_from_tag("macos"), OsType::Macos);
        assert_eq!(os_type_from_tag("freebsd"), OsType::Freebsd);
        assert_eq!(os_type_from_tag("windows"), OsType::Windows);
        assert_eq!(os_type_from_tag("sunos"), OsType::Other);
        assert_eq!(os_type_from_tag("openbsd"), OsType::Other);
        assert_eq!(os_type_from_tag(""), OsType::Other);
    }

    #[test]
    fn profile_os_type_matches_requested_family() {
        for os in [
            OsType::Linux,
            OsType::Macos,
            OsType::Freebsd,
            OsType::Windows,
            OsType::Other,
        ] {
            let prober = Prober::new(scripted_for(os));
            let profile = prober.profile_for(os, &runtime()).unwrap();
            assert_eq!(profile.platform.os_type, os);
            assert_eq!(Strategy::for_os(os).os_type(), os);
        }
    }

    #[test]
    fn unsupported_platform_reports_scheduler_count_only() {
        let prober = Prober::new(ScriptedRunner::new());
        let profile = prober.profile_for(OsType::Other, &runtime()).unwrap();
        let platform = &profile.platform;

        assert_eq!(platform.total_num_of_threads, 12);
        assert_eq!(platform.hyper_threading, HyperThreading::Unknown);
        assert_eq!(platform.num_of_processors, None);
        assert_eq!(platform.num_of_cores_of_a_processor, None);
        assert_eq!(platform.total_num_of_cores, None);
        assert_eq!(platform.num_of_threads_of_a_processor, None);
        assert_eq!(platform.cpu_model, None);
        assert_eq!(platform.cpu_models, None);
        assert!(prober.runner().calls().is_empty());
    }

    #[test]
    fn missing_tool_fails_before_any_spawn() {
        for (os, tool) in [
            (OsType::Linux, "wc"),
            (OsType::Linux, "uname"),
            (OsType::Freebsd, "sysctl"),
            (OsType::Macos, "system_profiler"),
        ] {
            let prober = Prober::new(scripted_for(os).without_tool(tool));
            let err = prober.profile_for(os, &runtime()).unwrap_err();
            assert!(
                matches!(err, ProbeError::ToolNotFound(ref missing) if missing == tool),
                "{os:?}: {err}"
            );
            assert!(prober.runner().calls().is_empty());
        }
    }

    #[test]
    fn linux_invariants_hold() {
        let profile = Prober::new(scripted_for(OsType::Linux))
            .profile_for(OsType::Linux, &runtime())
            .unwrap();
        let p = &profile.platform;
        let total_cores = p.total_num_of_cores.unwrap();

        assert_eq!(
            total_cores,
            p.num_of_cores_of_a_processor.unwrap() * p.num_of_processors.unwrap()
        );
        assert_eq!(
            p.hyper_threading == HyperThreading::Enabled,
            total_cores < p.total_num_of_threads
        );
    }

    #[test]
    fn macos_invariants_hold() {
        let profile = Prober::new(scripted_for(OsType::Macos))
            .profile_for(OsType::Macos, &runtime())
            .unwrap();
        let p = &profile.platform;
        let total_cores = p.total_num_of_cores.unwrap();
        let factor = if p.hyper_threading == HyperThreading::Enabled { 2 } else { 1 };

        assert_eq!(p.total_num_of_threads, total_cores * factor);
        assert_eq!(
            p.num_of_cores_of_a_processor.unwrap() * p.num_of_processors.unwrap(),
            total_cores
        );
    }

    #[test]
    fn runtime_identifiers_are_merged() {
        let profile = Prober::new(scripted_for(OsType::Freebsd))
            .profile_for(OsType::Freebsd, &runtime())
            .unwrap();
        assert_eq!(profile.runtime_release, 1);
        assert_eq!(profile.runtime_version, "1.0.0");
        assert_eq!(profile.platform.total_num_of_threads, 4);
    }

    #[test]
    fn required_tools_per_strategy() {
        assert_eq!(
            Strategy::Linux.required_tools(),
            &["cat", "grep", "sort", "wc", "uname"]
        );
        assert_eq!(Strategy::FreeBsd.required_tools(), &["uname", "sysctl"]);
        assert_eq!(Strategy::Macos.required_tools(), &["uname", "system_profiler"]);
        assert!(Strategy::Unsupported(OsType::Windows)
            .required_tools()
            .is_empty());
    }
}
