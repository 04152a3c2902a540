//! Programmer registration and dispatch
//!
//! A programmer string is `name` or `name:key1=value1,key2=value2`. The name
//! picks the transport; the options are handed to that transport's parser.

use std::io::Write;

use gbcom_core::{RunSummary, Runner, Script};

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "ft4222")]
    programmers.push(ProgrammerInfo {
        name: "ft4222",
        description: "FT4222H SPI master + GPIO (spi=,gpio=,spispeed=,cs=,cpha=,timeout=)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        description: "In-memory bus emulator for dry runs (fill=<hex>,delay=<on|off>)",
    });

    programmers
}

/// Comma-separated list of programmer names
pub fn programmer_names_short() -> String {
    let names: Vec<_> = available_programmers().iter().map(|p| p.name).collect();
    if names.is_empty() {
        "none (enable features at compile time)".to_string()
    } else {
        names.join(", ")
    }
}

/// One `name - description` line per programmer
pub fn programmer_descriptions() -> String {
    available_programmers()
        .iter()
        .map(|p| format!("  {:8} - {}", p.name, p.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parsed programmer string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name
    pub name: String,
    /// Key-value parameters, in the order given
    pub params: Vec<(String, String)>,
}

impl ProgrammerParams {
    /// Parameters as borrowed pairs
    pub fn options(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a programmer string into name and parameters
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = Vec::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.push((key.to_string(), value.to_string()));
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Open the programmer named in `programmer`, then load the script and run it
///
/// `load` is only called once the transport is open. Read results go to
/// `out`. The transport is released before returning, whether or not the
/// run succeeded.
pub fn run_script<F, W>(
    programmer: &str,
    load: F,
    out: W,
) -> Result<RunSummary, Box<dyn std::error::Error>>
where
    F: FnOnce() -> gbcom_core::Result<Script>,
    W: Write,
{
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "ft4222")]
        "ft4222" => run_ft4222(&params, load, out),
        #[cfg(feature = "dummy")]
        "dummy" => run_dummy(&params, load, out),
        name => Err(format!(
            "Unknown programmer: {} [available: {}]",
            name,
            programmer_names_short()
        )
        .into()),
    }
}

#[cfg(feature = "ft4222")]
fn run_ft4222<F, W>(
    params: &ProgrammerParams,
    load: F,
    out: W,
) -> Result<RunSummary, Box<dyn std::error::Error>>
where
    F: FnOnce() -> gbcom_core::Result<Script>,
    W: Write,
{
    use gbcom_ft4222::{parse_options, Ft4222Bridge};

    let config = parse_options(&params.options())?;
    let mut bridge = Ft4222Bridge::open(&config)?;

    let result = load().and_then(|script| {
        let (spi, gpio) = bridge.split();
        Runner::new(spi, gpio, out).run(&script)
    });

    match result {
        Ok(summary) => {
            bridge.close()?;
            Ok(summary)
        }
        Err(e) => {
            if let Err(close_err) = bridge.close() {
                log::warn!("can't close FT4222H: {}", close_err);
            }
            Err(e.into())
        }
    }
}

#[cfg(feature = "dummy")]
fn run_dummy<F, W>(
    params: &ProgrammerParams,
    load: F,
    out: W,
) -> Result<RunSummary, Box<dyn std::error::Error>>
where
    F: FnOnce() -> gbcom_core::Result<Script>,
    W: Write,
{
    use gbcom_dummy::{DummyBus, DummyConfig, DummyPin};

    let mut config = DummyConfig::default();
    for (key, value) in params.options() {
        match key {
            "fill" => {
                let hex = value.trim_start_matches("0x").trim_start_matches("0X");
                config.fill = u32::from_str_radix(hex, 16)
                    .map_err(|e| format!("Invalid fill value '{}': {}", value, e))?;
            }
            "delay" => {
                config.real_delay = match value {
                    "on" | "1" | "true" => true,
                    "off" | "0" | "false" => false,
                    _ => return Err(format!("Invalid delay value: {}", value).into()),
                }
            }
            _ => log::warn!("Unknown dummy option: {}={}", key, value),
        }
    }

    log::info!("Using dummy bus (fill = 0x{:08X})", config.fill);
    let bus = DummyBus::new(config);
    let script = load()?;
    let summary = Runner::new(bus, DummyPin::new(), out).run(&script)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_params() {
        let params = parse_programmer_params("ft4222").unwrap();
        assert_eq!(params.name, "ft4222");
        assert!(params.params.is_empty());

        let params = parse_programmer_params("ft4222:spi=1,cpha=leading").unwrap();
        assert_eq!(params.name, "ft4222");
        assert_eq!(params.options(), vec![("spi", "1"), ("cpha", "leading")]);

        assert!(parse_programmer_params("ft4222:spi").is_err());
    }

    fn empty_script() -> gbcom_core::Result<Script> {
        Ok(Script::parse("op addr data\n"))
    }

    #[test]
    fn test_unknown_programmer() {
        let err = run_script("ch341a", empty_script, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("Unknown programmer"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_run_dummy() {
        let load = || -> gbcom_core::Result<Script> {
            Ok(Script::parse(
                "op addr data\n\
                 wi 0000001C 0000BEEF\n\
                 ri 0000001C\n\
                 ri 00000020\n\
                 s 0\n",
            ))
        };

        let mut out = Vec::new();
        let summary = run_script("dummy:fill=0,delay=off", load, &mut out).unwrap();
        assert_eq!(summary.executed, 4);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0x0000BEEF\n0x00000000\n"
        );
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_run_dummy_bad_option() {
        assert!(run_script("dummy:fill=xyz", empty_script, Vec::new()).is_err());
        assert!(run_script("dummy:delay=later", empty_script, Vec::new()).is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_load_failure_is_reported() {
        let load = || -> gbcom_core::Result<Script> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into())
        };
        assert!(run_script("dummy", load, Vec::new()).is_err());
    }
}
