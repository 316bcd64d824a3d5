use core::{num::ParseIntError, time::Duration};
use lazypool::Processor;

/// Why a line could not be processed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DelayError {
    #[error("line {line:?} is not a number: {source}")]
    NotANumber { line: String, source: ParseIntError },
}

/// Treats each payload as a delay in milliseconds: sleeps for that long, then
/// yields the payload unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayProcessor;

impl Processor<String> for DelayProcessor {
    type Output = String;
    type Error = DelayError;

    async fn process(&self, payload: String) -> Result<String, DelayError> {
        let delay = parse_delay(&payload)?;
        tokio::time::sleep(delay).await;
        Ok(payload)
    }
}

/// Parses a line as a non-negative number of milliseconds. Surrounding
/// whitespace is ignored.
pub fn parse_delay(line: &str) -> Result<Duration, DelayError> {
    line.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|source| DelayError::NotANumber {
            line: line.to_string(),
            source,
        })
}
