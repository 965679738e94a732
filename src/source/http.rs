//! Published-sheet CSV over HTTP.
//!
//! Uses the synchronous `ureq` client. The URL is expected to return the
//! sheet as CSV (e.g. a "publish to web" CSV link); credentials are out of
//! scope.

use std::time::Duration;

use super::file::rows_from_csv;
use super::{DataSource, SourceError};
use crate::records::RawRow;

#[derive(Debug, Clone)]
pub struct HttpCsvSource {
    url: String,
    timeout: Duration,
}

impl HttpCsvSource {
    pub fn new(url: &str, timeout_ms: u64) -> Self {
        Self {
            url: url.trim().to_string(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn http_error(&self, message: impl ToString) -> SourceError {
        SourceError::Http {
            url: self.url.clone(),
            message: message.to_string(),
        }
    }
}

impl DataSource for HttpCsvSource {
    fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError> {
        let response = ureq::get(&self.url)
            .timeout(self.timeout)
            .call()
            .map_err(|e| self.http_error(e))?;
        let body = response
            .into_string()
            .map_err(|e| self.http_error(e))?;
        Ok(rows_from_csv(body.as_bytes())?)
    }

    fn describe(&self) -> String {
        format!("http-csv:{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_http_error() {
        // Port 9 (discard) on localhost is almost never listening.
        let mut source = HttpCsvSource::new("http://127.0.0.1:9/sheet.csv", 500);
        match source.fetch() {
            Err(SourceError::Http { url, .. }) => assert!(url.ends_with("sheet.csv")),
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }
}
