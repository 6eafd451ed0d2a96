//! Process-wide table mapping device names to constructors.
//!
//! The table is pre-populated with `appending`, `file`, `http` and
//! `datadog`. Applications add their own devices with [`register_device`].
//! Device specifications such as `"datadog[api-key];file[/var/log/app.log]"`
//! are parsed with [`parse_device_spec`] and instantiated with
//! [`create_devices`].

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{
    datadog::FemtoDatadogDevice,
    error::DeviceBuildError,
    http_device::{DEFAULT_ENDPOINT, FemtoHttpDevice, HttpDeviceConfig},
};

use super::{FemtoAppendingDevice, FemtoDeviceTrait, FemtoFileDevice};

/// Builds a device from the arguments of its specification.
pub type DeviceConstructor = fn(&[String]) -> Result<Box<dyn FemtoDeviceTrait>, DeviceBuildError>;

static REGISTRY: Lazy<RwLock<HashMap<String, DeviceConstructor>>> =
    Lazy::new(|| RwLock::new(builtin_devices()));

fn builtin_devices() -> HashMap<String, DeviceConstructor> {
    let builtins: [(&str, DeviceConstructor); 4] = [
        ("appending", build_appending),
        ("file", build_file),
        ("http", build_http),
        ("datadog", build_datadog),
    ];
    builtins
        .into_iter()
        .map(|(name, ctor)| (name.to_owned(), ctor))
        .collect()
}

fn build_appending(_args: &[String]) -> Result<Box<dyn FemtoDeviceTrait>, DeviceBuildError> {
    Ok(Box::new(FemtoAppendingDevice::new()))
}

fn build_file(args: &[String]) -> Result<Box<dyn FemtoDeviceTrait>, DeviceBuildError> {
    let path = required_arg(args, "file", "a path")?;
    Ok(Box::new(FemtoFileDevice::open(path)?))
}

fn build_http(args: &[String]) -> Result<Box<dyn FemtoDeviceTrait>, DeviceBuildError> {
    let endpoint = args.first().map_or(DEFAULT_ENDPOINT, String::as_str);
    Ok(Box::new(FemtoHttpDevice::new(
        endpoint,
        HttpDeviceConfig::default(),
    )?))
}

fn build_datadog(args: &[String]) -> Result<Box<dyn FemtoDeviceTrait>, DeviceBuildError> {
    let api_key = required_arg(args, "datadog", "an API key")?;
    Ok(Box::new(FemtoDatadogDevice::new(api_key)?))
}

fn required_arg<'a>(
    args: &'a [String],
    device: &str,
    what: &str,
) -> Result<&'a str, DeviceBuildError> {
    args.first()
        .map(String::as_str)
        .filter(|arg| !arg.is_empty())
        .ok_or_else(|| DeviceBuildError::InvalidConfig(format!("{device} device requires {what}")))
}

/// Register `constructor` under `name`, replacing any previous entry.
pub fn register_device(name: &str, constructor: DeviceConstructor) {
    REGISTRY.write().insert(name.to_ascii_lowercase(), constructor);
}

/// Whether a constructor is registered under `name`.
pub fn is_registered(name: &str) -> bool {
    REGISTRY.read().contains_key(&name.to_ascii_lowercase())
}

/// Instantiate the device registered under `name`.
pub fn create_device(
    name: &str,
    args: &[String],
) -> Result<Box<dyn FemtoDeviceTrait>, DeviceBuildError> {
    let constructor = REGISTRY
        .read()
        .get(&name.to_ascii_lowercase())
        .copied()
        .ok_or_else(|| DeviceBuildError::UnknownDevice(name.to_owned()))?;
    constructor(args)
}

/// One parsed entry of a device specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSpec {
    pub name: String,
    pub args: Vec<String>,
}

impl DeviceSpec {
    /// Instantiate through the registry.
    pub fn create(&self) -> Result<Box<dyn FemtoDeviceTrait>, DeviceBuildError> {
        create_device(&self.name, &self.args)
    }
}

/// Parse `name[arg1,arg2];other` into its entries.
///
/// Entries are separated by `;` and blank entries are skipped. A name starts
/// with a letter and continues with letters, digits or `_`. Arguments sit
/// between the first `[` and the last `]`, are split on `,` and trimmed.
pub fn parse_device_spec(spec: &str) -> Result<Vec<DeviceSpec>, DeviceBuildError> {
    spec.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect()
}

/// Parse `spec` and instantiate every entry, in order.
pub fn create_devices(spec: &str) -> Result<Vec<Box<dyn FemtoDeviceTrait>>, DeviceBuildError> {
    parse_device_spec(spec)?
        .iter()
        .map(DeviceSpec::create)
        .collect()
}

fn parse_entry(entry: &str) -> Result<DeviceSpec, DeviceBuildError> {
    let invalid = |reason: &str| {
        DeviceBuildError::InvalidConfig(format!("invalid device spec {entry:?}: {reason}"))
    };
    let (name, rest) = match entry.find('[') {
        Some(open) => (entry[..open].trim(), Some(&entry[open + 1..])),
        None => (entry, None),
    };

    let mut chars = name.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid("name must start with a letter"));
    }

    let args = match rest {
        None => Vec::new(),
        Some(rest) => {
            let close = rest
                .rfind(']')
                .ok_or_else(|| invalid("missing closing ']'"))?;
            if !rest[close + 1..].trim().is_empty() {
                return Err(invalid("unexpected text after ']'"));
            }
            let inner = rest[..close].trim();
            if inner.is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(|arg| arg.trim().to_owned()).collect()
            }
        }
    };

    Ok(DeviceSpec {
        name: name.to_ascii_lowercase(),
        args,
    })
}
