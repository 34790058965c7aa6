//! Path & Environment — locate the SVault data directory, format byte
//! counts for display, and probe the machine's local IPv4 address.
//!
//! None of these touch vault state; they are pure, side-effect-free helpers
//! shared by the other components.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::errors::{Result, SVaultError};

/// Name of the directory under the user's home directory that holds all
/// SVault state (the object store file and, transiently, mount points).
const DATA_DIR_NAME: &str = ".svault";

/// Returns `$HOME/.svault`, creating it if it does not already exist.
///
/// Resolving the home directory is the one truly fatal failure mode in the
/// whole crate (spec.md §7): callers at the process boundary should treat
/// an `Err` here as cause to terminate, but that decision belongs to the
/// caller, not this library.
pub fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        SVaultError::NoDataDir("could not determine the current user's home directory".into())
    })?;

    let dir = home.join(DATA_DIR_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Format a byte count using binary units (1024-multiples), matching the
/// KB/MB/GB breakpoints a user would expect from a file manager.
///
/// Below 1024 bytes the plain count is shown ("`<n> bytes`"). At and above
/// 1024 the value is scaled and printed with two decimal places.
pub fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if n < 1024 {
        return format!("{n} bytes");
    }

    let bytes = n as f64;
    if bytes < MB {
        format!("{:.2} KB", bytes / KB)
    } else if bytes < GB {
        format!("{:.2} MB", bytes / MB)
    } else {
        format!("{:.2} GB", bytes / GB)
    }
}

/// Returns the first non-loopback IPv4 address of any local interface,
/// falling back to `0.0.0.0` if none can be found (no interfaces, or the
/// underlying platform query failed).
pub fn local_ipv4() -> Ipv4Addr {
    match local_ip_address::local_ip() {
        Ok(std::net::IpAddr::V4(addr)) if !addr.is_loopback() => addr,
        _ => Ipv4Addr::UNSPECIFIED,
    }
}
