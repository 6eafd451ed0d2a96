//! Hostname detection for Datadog log entries.

use std::env;

use log::warn;

/// Hostname used when every lookup fails.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// Resolve the hostname reported with each entry.
///
/// Tries, in order: `DD_HOSTNAME`, `HOSTNAME`, the system hostname, then
/// [`UNKNOWN_HOSTNAME`]. Empty values are skipped.
pub fn resolve_hostname() -> String {
    resolve_with(|name| env::var(name).ok(), system_hostname)
}

fn resolve_with(
    env_lookup: impl Fn(&str) -> Option<String>,
    system: impl FnOnce() -> Option<String>,
) -> String {
    ["DD_HOSTNAME", "HOSTNAME"]
        .into_iter()
        .find_map(|var| env_lookup(var).filter(|value| !value.is_empty()))
        .or_else(|| system().filter(|value| !value.is_empty()))
        .unwrap_or_else(|| {
            warn!("FemtoDatadogDevice could not determine hostname, using {UNKNOWN_HOSTNAME:?}");
            UNKNOWN_HOSTNAME.to_owned()
        })
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name.into_string().ok(),
        Err(err) => {
            warn!("FemtoDatadogDevice failed to read system hostname: {err}");
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    env::var("COMPUTERNAME").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[rstest]
    #[case(&[("DD_HOSTNAME", "dd-host"), ("HOSTNAME", "plain")], Some("sys"), "dd-host")]
    #[case(&[("DD_HOSTNAME", ""), ("HOSTNAME", "plain")], Some("sys"), "plain")]
    #[case(&[], Some("sys"), "sys")]
    #[case(&[("HOSTNAME", "")], Some(""), "unknown")]
    #[case(&[], None, "unknown")]
    fn follows_lookup_order(
        #[case] env: &'static [(&'static str, &'static str)],
        #[case] system: Option<&'static str>,
        #[case] expected: &str,
    ) {
        let resolved = resolve_with(env_of(env), || system.map(str::to_owned));
        assert_eq!(resolved, expected);
    }

    #[test]
    fn real_lookup_is_never_empty() {
        assert!(!resolve_hostname().is_empty());
    }
}
