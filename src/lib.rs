//! cpu-profile - CPU and host profile detection
//!
//! Reports vendor/model, package, core and thread counts, SMT status and
//! kernel/OS version by running the platform's own introspection tools
//! (`uname`, `/proc/cpuinfo`, `sysctl`, `system_profiler`) and parsing
//! their text output into one flat [`CpuProfile`].
//!
//! ```no_run
//! let profile = cpu_profile::all_profile()?;
//! println!("{} threads", profile.platform.total_num_of_threads);
//! # Ok::<(), cpu_profile::ProbeError>(())
//! ```

pub mod config;
pub mod deps;
pub mod probe;
pub mod profile;

pub use probe::{all_profile, detect_os, ProbeError, Prober, Strategy};
pub use profile::{CpuProfile, HyperThreading, OsType, PlatformProfile, RuntimeInfo};
