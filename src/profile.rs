//! CPU profile record
//!
//! A platform strategy produces a [`PlatformProfile`]; the assembler merges it
//! with caller-supplied [`RuntimeInfo`] into the final flat [`CpuProfile`].
//! Values that could not be determined are `None` and serialize as `"unknown"`.

use serde::{Serialize, Serializer};
use sysinfo::System;
use tracing::debug;

/// Marker printed for values that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
    Linux,
    Macos,
    Freebsd,
    Windows,
    Other,
}

impl OsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Linux => "linux",
            OsType::Macos => "macos",
            OsType::Freebsd => "freebsd",
            OsType::Windows => "windows",
            OsType::Other => "other",
        }
    }
}

/// Simultaneous multithreading status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HyperThreading {
    Enabled,
    Disabled,
    Unknown,
}

impl HyperThreading {
    /// SMT is on when there are more logical threads than physical cores.
    pub fn from_counts(total_cores: u32, total_threads: u32) -> Self {
        if total_cores < total_threads {
            HyperThreading::Enabled
        } else {
            HyperThreading::Disabled
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HyperThreading::Enabled => "enabled",
            HyperThreading::Disabled => "disabled",
            HyperThreading::Unknown => UNKNOWN,
        }
    }
}

/// Fields produced by one platform strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub os_type: OsType,
    #[serde(serialize_with = "or_unknown")]
    pub kernel_release: Option<String>,
    #[serde(serialize_with = "or_unknown")]
    pub kernel_version: Option<String>,
    #[serde(serialize_with = "or_unknown")]
    pub system_version: Option<String>,
    /// Machine architecture, e.g. `x86_64` or `arm64`
    #[serde(serialize_with = "or_unknown")]
    pub cpu_type: Option<String>,
    #[serde(serialize_with = "or_unknown")]
    pub cpu_model: Option<String>,
    /// Distinct model names, in sorted order
    #[serde(serialize_with = "or_unknown")]
    pub cpu_models: Option<Vec<String>>,
    /// Physical packages (sockets)
    #[serde(serialize_with = "or_unknown")]
    pub num_of_processors: Option<u32>,
    #[serde(serialize_with = "or_unknown")]
    pub num_of_cores_of_a_processor: Option<u32>,
    #[serde(serialize_with = "or_unknown")]
    pub total_num_of_cores: Option<u32>,
    #[serde(serialize_with = "or_unknown")]
    pub num_of_threads_of_a_processor: Option<u32>,
    /// Logical threads; always known
    pub total_num_of_threads: u32,
    pub hyper_threading: HyperThreading,
}

impl PlatformProfile {
    /// Profile for platforms without a probing strategy: only the thread count is known.
    pub fn unknown(os_type: OsType, total_num_of_threads: u32) -> Self {
        Self {
            os_type,
            kernel_release: None,
            kernel_version: None,
            system_version: None,
            cpu_type: None,
            cpu_model: None,
            cpu_models: None,
            num_of_processors: None,
            num_of_cores_of_a_processor: None,
            total_num_of_cores: None,
            num_of_threads_of_a_processor: None,
            total_num_of_threads,
            hyper_threading: HyperThreading::Unknown,
        }
    }
}

fn or_unknown<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(value) => value.serialize(serializer),
        None => serializer.serialize_str(UNKNOWN),
    }
}

/// Identifiers of the calling runtime, merged into every profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    /// Numeric release of the runtime
    pub release: u32,
    /// Full version string
    pub version: String,
    /// Logical execution units the runtime schedules onto
    pub schedulers: u32,
}

impl RuntimeInfo {
    /// Runtime identifiers of this process.
    pub fn current() -> Self {
        Self {
            release: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or_default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            schedulers: schedulable_units(),
        }
    }
}

fn schedulable_units() -> u32 {
    let count = std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or_else(|err| {
            debug!(error = %err, "available_parallelism failed, asking sysinfo");
            let mut sys = System::new();
            sys.refresh_cpu_all();
            sys.cpus().len()
        });
    u32::try_from(count.max(1)).unwrap_or(u32::MAX)
}

/// The complete, flat CPU profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuProfile {
    #[serde(flatten)]
    pub platform: PlatformProfile,
    pub runtime_release: u32,
    pub runtime_version: String,
}

impl CpuProfile {
    /// Merge a strategy's fragment with the runtime identifiers.
    pub fn assemble(platform: PlatformProfile, runtime: &RuntimeInfo) -> Self {
        Self {
            platform,
            runtime_release: runtime.release,
            runtime_version: runtime.version.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Boxed table for terminal output
    pub fn display(&self) -> String {
        const WIDTH: usize = 62;
        let p = &self.platform;
        let mut output = String::new();

        output.push_str(&format!("╔{}╗\n", "═".repeat(WIDTH)));
        output.push_str(&format!("║{:^WIDTH$}║\n", "CPU PROFILE"));
        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));

        let format_line = |label: &str, content: &str| -> String {
            let content_width = WIDTH.saturating_sub(1 + label.chars().count());
            let content: String = content.chars().take(content_width).collect();
            format!("║ {label}{content:<content_width$}║\n")
        };

        output.push_str(&format_line("OS:       ", p.os_type.as_str()));
        output.push_str(&format_line("System:   ", text_or_unknown(&p.system_version)));
        output.push_str(&format_line("Kernel:   ", text_or_unknown(&p.kernel_release)));
        if let Some(version) = &p.kernel_version {
            output.push_str(&format_line("          ", version));
        }

        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));

        output.push_str(&format_line("CPU:      ", text_or_unknown(&p.cpu_model)));
        if let Some(models) = p.cpu_models.as_ref().filter(|models| models.len() > 1) {
            for model in models.iter().skip(1) {
                output.push_str(&format_line("          ", model));
            }
        }
        output.push_str(&format_line("Arch:     ", text_or_unknown(&p.cpu_type)));
        output.push_str(&format_line(
            "Packages: ",
            &count_or_unknown(p.num_of_processors),
        ));
        output.push_str(&format_line(
            "Cores:    ",
            &format!(
                "{} total, {} per package",
                count_or_unknown(p.total_num_of_cores),
                count_or_unknown(p.num_of_cores_of_a_processor)
            ),
        ));
        output.push_str(&format_line(
            "Threads:  ",
            &format!(
                "{} total, {} per package",
                p.total_num_of_threads,
                count_or_unknown(p.num_of_threads_of_a_processor)
            ),
        ));
        output.push_str(&format_line("SMT:      ", p.hyper_threading.as_str()));

        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));
        output.push_str(&format_line(
            "Runtime:  ",
            &format!("{} (release {})", self.runtime_version, self.runtime_release),
        ));
        output.push_str(&format!("╚{}╝", "═".repeat(WIDTH)));

        output
    }
}

fn text_or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

fn count_or_unknown(value: Option<u32>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |count| count.to_string())
}
