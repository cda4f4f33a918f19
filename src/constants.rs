// -
// Well-known tree locations

/// Section holding the service's own bookkeeping options
pub const CONFIGURATION_SECTION: &str = "/DIRAC/Configuration";

pub const NAME_OPTION: &str = "/DIRAC/Configuration/Name";
pub const VERSION_OPTION: &str = "/DIRAC/Configuration/Version";
pub const MASTER_SERVER_OPTION: &str = "/DIRAC/Configuration/MasterServer";
pub const SERVERS_OPTION: &str = "/DIRAC/Configuration/Servers";

/// Version of a store that never saw a commit
pub const UNINITIALIZED_VERSION: &str = "0";

/// Identification a peer must return on ping to be accepted as a slave
pub const CONFIGURATION_SERVER_ROLE: &str = "Configuration/Server";

// -
// Backups

pub(crate) const BACKUP_EXTENSION: &str = "zip";
pub(crate) const BACKUP_TEMP_PREFIX: &str = ".temp-";
pub(crate) const DEFAULT_COMMITTER: &str = "unknown";

/// chrono format of version stamps; lexicographic order follows time
pub(crate) const VERSION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
