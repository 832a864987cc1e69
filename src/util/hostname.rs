//! Local host name lookup for metric identifiers.

/// Fallback when the host name cannot be determined.
const DEFAULT_HOSTNAME: &str = "localhost";

/// Returns the host name reported by the OS.
///
/// Falls back to `HOSTNAME` from the environment, then to `localhost`.
pub fn hostname() -> String {
    system_hostname()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string())
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is a valid writable buffer of the given length.
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if ret != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Some(String::from_utf8_lossy(&buf[..len]).into_owned())
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}
