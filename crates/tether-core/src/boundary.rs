//! Versioned embedding boundary
//!
//! The host is built against one boundary version and the library may ship
//! another. Hosts check [`Capability::min_version`] against
//! [`EmbeddingBoundary::version`] before calling, rather than trapping errors.

use crate::background::Pending;
use crate::crash::CrashReporterController;
use crate::error::CoreError;
use crate::host::{HostAttachment, InstanceArgs};
use crate::profile::Profile;
use crate::runtime::Runtime;
use crate::Result;

/// Version implemented by this library
pub const BOUNDARY_VERSION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateInstance,
    GetProfile,
    EnumerateProfiles,
    RemoteDebugging,
    CrashReporter,
}

impl Capability {
    pub fn min_version(&self) -> u32 {
        match self {
            Capability::CreateInstance | Capability::GetProfile => 1,
            Capability::EnumerateProfiles | Capability::RemoteDebugging => 2,
            Capability::CrashReporter => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CreateInstance => "create_embedding_instance",
            Capability::GetProfile => "get_profile",
            Capability::EnumerateProfiles => "enumerate_profile_names",
            Capability::RemoteDebugging => "set_remote_debugging_enabled",
            Capability::CrashReporter => "crash_reporter",
        }
    }
}

pub trait EmbeddingBoundary {
    fn version(&self) -> u32;

    fn supports(&self, capability: Capability) -> bool {
        self.version() >= capability.min_version()
    }

    fn require(&self, capability: Capability) -> Result<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(CoreError::Unsupported {
                capability: capability.as_str(),
                required: capability.min_version(),
                available: self.version(),
            })
        }
    }

    fn create_embedding_instance(&self, args: InstanceArgs) -> Result<HostAttachment>;

    fn get_profile(&self, name: &str) -> Result<Profile>;

    fn enumerate_profile_names(&self) -> Result<Pending<Vec<String>>>;

    fn set_remote_debugging_enabled(&self, enabled: bool) -> Result<()>;

    fn crash_reporter(&self) -> Result<CrashReporterController>;
}

impl EmbeddingBoundary for Runtime {
    fn version(&self) -> u32 {
        BOUNDARY_VERSION
    }

    fn create_embedding_instance(&self, args: InstanceArgs) -> Result<HostAttachment> {
        Runtime::create_embedding_instance(self, args)
    }

    fn get_profile(&self, name: &str) -> Result<Profile> {
        Runtime::get_profile(self, name)
    }

    fn enumerate_profile_names(&self) -> Result<Pending<Vec<String>>> {
        Runtime::enumerate_profile_names(self)
    }

    fn set_remote_debugging_enabled(&self, enabled: bool) -> Result<()> {
        Runtime::set_remote_debugging_enabled(self, enabled)
    }

    fn crash_reporter(&self) -> Result<CrashReporterController> {
        Runtime::crash_reporter(self)
    }
}

/// A runtime exposed at an older boundary version. Calls beyond that version
/// fail with [`CoreError::Unsupported`].
#[derive(Clone)]
pub struct BoundaryProxy {
    runtime: Runtime,
    version: u32,
}

impl BoundaryProxy {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            version: BOUNDARY_VERSION,
        }
    }

    pub fn with_version(runtime: Runtime, version: u32) -> Self {
        Self {
            runtime,
            version: version.min(BOUNDARY_VERSION),
        }
    }
}

impl EmbeddingBoundary for BoundaryProxy {
    fn version(&self) -> u32 {
        self.version
    }

    fn create_embedding_instance(&self, args: InstanceArgs) -> Result<HostAttachment> {
        self.require(Capability::CreateInstance)?;
        self.runtime.create_embedding_instance(args)
    }

    fn get_profile(&self, name: &str) -> Result<Profile> {
        self.require(Capability::GetProfile)?;
        self.runtime.get_profile(name)
    }

    fn enumerate_profile_names(&self) -> Result<Pending<Vec<String>>> {
        self.require(Capability::EnumerateProfiles)?;
        self.runtime.enumerate_profile_names()
    }

    fn set_remote_debugging_enabled(&self, enabled: bool) -> Result<()> {
        self.require(Capability::RemoteDebugging)?;
        self.runtime.set_remote_debugging_enabled(enabled)
    }

    fn crash_reporter(&self) -> Result<CrashReporterController> {
        self.require(Capability::CrashReporter)?;
        self.runtime.crash_reporter()
    }
}
