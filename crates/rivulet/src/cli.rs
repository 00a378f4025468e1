//! Flag parsing for the client binary.

pub const USAGE: &str = "usage: rivulet-client [-c|--crypto] [-b|--benchmark|--eval]";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Run the cipher handshake before sending data.
    pub crypto: bool,
    /// Benchmark workload: many small payloads, short ack timeout, quiet logs.
    pub benchmark: bool,
}

pub fn parse<I>(args: I) -> Result<Options, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    for arg in args {
        match arg.as_str() {
            "-c" | "--crypto" => options.crypto = true,
            "-b" | "--benchmark" | "--eval" => options.benchmark = true,
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(options)
}
