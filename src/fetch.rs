//! Record retrieval.
//!
//! A [`RecordSource`] turns an accession into the raw text of its `GBSeq`
//! XML record. [`EutilsClient`] queries NCBI E-utilities over HTTP,
//! [`LocalXmlSource`] reads previously saved records from a directory.

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::{CdsError, Result};

/// Body returned by efetch when the history query matched nothing.
pub const EMPTY_RESULT_MARKER: &str = "<ERROR>Empty result - nothing to do</ERROR>";

/// Body returned by the sequence viewer for an unknown accession.
pub const UNKNOWN_ID_MARKER: &str = "Failed to understand id";

/// Anything that can produce the raw record text of an accession.
pub trait RecordSource: Sync {
    fn fetch(&self, accession: &str) -> Result<String>;
}

/// NCBI E-utilities client (esearch with history, then efetch as XML).
pub struct EutilsClient {
    client: Client,
    base: String,
}

impl EutilsClient {
    /// Create a new client from the run configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(
            http_client(config.timeout_secs)?,
            &config.eutils_base,
        ))
    }

    pub(crate) fn with_client(client: Client, base: &str) -> Self {
        EutilsClient {
            client,
            base: base.to_string(),
        }
    }

    fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}{}", self.base, endpoint);
        log::debug!("GET {} {:?}", url, query);
        let body = self
            .client
            .get(&url)
            .query(query)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(body)
    }
}

impl RecordSource for EutilsClient {
    fn fetch(&self, accession: &str) -> Result<String> {
        let term = format!("{}[accn]", accession);
        let search = self.get(
            "esearch.fcgi",
            &[("db", "nuccore"), ("term", term.as_str()), ("usehistory", "y")],
        )?;

        let web_env = extract_tag(&search, "WebEnv").ok_or_else(|| {
            CdsError::UpstreamProtocol(format!("esearch for {} returned no WebEnv", accession))
        })?;
        let query_key = extract_tag(&search, "QueryKey").ok_or_else(|| {
            CdsError::UpstreamProtocol(format!("esearch for {} returned no QueryKey", accession))
        })?;

        let record = self.get(
            "efetch.fcgi",
            &[
                ("db", "nuccore"),
                ("query_key", query_key),
                ("WebEnv", web_env),
                ("rettype", "gb"),
                ("retmode", "xml"),
            ],
        )?;

        if record.contains(EMPTY_RESULT_MARKER) {
            return Err(CdsError::EmptyUpstreamResult(accession.to_string()));
        }
        Ok(record)
    }
}

/// Saved records in a directory, as `<accession>.xml` or `<accession>.xml.gz`.
pub struct LocalXmlSource {
    dir: PathBuf,
}

impl LocalXmlSource {
    pub fn new(dir: &Path) -> Self {
        LocalXmlSource {
            dir: dir.to_path_buf(),
        }
    }

    fn candidates(&self, accession: &str) -> [PathBuf; 2] {
        [
            self.dir.join(format!("{}.xml", accession)),
            self.dir.join(format!("{}.xml.gz", accession)),
        ]
    }
}

impl RecordSource for LocalXmlSource {
    fn fetch(&self, accession: &str) -> Result<String> {
        let Some(path) = self.candidates(accession).into_iter().find(|p| p.exists()) else {
            return Err(CdsError::EmptyUpstreamResult(accession.to_string()));
        };

        let mut file = File::open(&path)?;
        let mut text = String::new();
        if path.to_string_lossy().ends_with(".gz") {
            GzDecoder::new(file).read_to_string(&mut text)?;
        } else {
            file.read_to_string(&mut text)?;
        }

        if text.trim().is_empty() || text.contains(EMPTY_RESULT_MARKER) {
            return Err(CdsError::EmptyUpstreamResult(accession.to_string()));
        }
        Ok(text)
    }
}

/// GFF3 and FASTA downloads through the NCBI sequence viewer.
pub struct SviewerClient {
    client: Client,
    base: String,
}

impl SviewerClient {
    /// Create a new client from the run configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(
            http_client(config.timeout_secs)?,
            &config.sviewer_base,
        ))
    }

    pub(crate) fn with_client(client: Client, base: &str) -> Self {
        SviewerClient {
            client,
            base: base.to_string(),
        }
    }

    /// Download one report (`gff3` or `fasta`) for an accession.
    pub fn report(&self, accession: &str, report: &str) -> Result<String> {
        let body = self
            .client
            .get(&self.base)
            .query(&[("db", "nuccore"), ("report", report), ("id", accession)])
            .send()?
            .error_for_status()?
            .text()?;

        if body.contains(UNKNOWN_ID_MARKER) {
            return Err(CdsError::EmptyUpstreamResult(accession.to_string()));
        }
        Ok(body)
    }
}

fn http_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Text between `<tag>` and `</tag>`, if both are present.
pub fn extract_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(text[start..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_stub::{client, serve};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const ESEARCH: &str = "<eSearchResult><Count>1</Count><QueryKey>1</QueryKey>\
                           <WebEnv>MCID_42</WebEnv></eSearchResult>";
    const RECORD: &str = "<GBSet><GBSeq><GBSeq_locus>NC_1</GBSeq_locus></GBSeq></GBSet>";

    #[test]
    fn test_eutils_search_then_fetch() {
        let server = serve(vec![
            ("/esearch.fcgi", ESEARCH.to_string()),
            ("/efetch.fcgi", RECORD.to_string()),
        ]);
        let source = EutilsClient::with_client(client(), &server.base);

        assert_eq!(source.fetch("NC_1").unwrap(), RECORD);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("GET /esearch.fcgi?"));
        assert!(requests[0].contains("db=nuccore"));
        assert!(requests[0].contains("term=NC_1%5Baccn%5D"));
        assert!(requests[0].contains("usehistory=y"));
        assert!(requests[1].starts_with("GET /efetch.fcgi?"));
        assert!(requests[1].contains("query_key=1"));
        assert!(requests[1].contains("WebEnv=MCID_42"));
        assert!(requests[1].contains("rettype=gb"));
        assert!(requests[1].contains("retmode=xml"));
    }

    #[test]
    fn test_eutils_missing_history_fields() {
        for search in [
            "<eSearchResult><QueryKey>1</QueryKey></eSearchResult>",
            "<eSearchResult><WebEnv>MCID_42</WebEnv></eSearchResult>",
        ] {
            let server = serve(vec![
                ("/esearch.fcgi", search.to_string()),
                ("/efetch.fcgi", RECORD.to_string()),
            ]);
            let source = EutilsClient::with_client(client(), &server.base);

            let err = source.fetch("NC_1").unwrap_err();
            assert!(matches!(err, CdsError::UpstreamProtocol(_)));
            assert_eq!(server.requests().len(), 1);
        }
    }

    #[test]
    fn test_eutils_empty_result_marker() {
        let server = serve(vec![
            ("/esearch.fcgi", ESEARCH.to_string()),
            (
                "/efetch.fcgi",
                format!("<eFetchResult>\n{}\n</eFetchResult>", EMPTY_RESULT_MARKER),
            ),
        ]);
        let source = EutilsClient::with_client(client(), &server.base);

        let err = source.fetch("NC_404").unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn test_sviewer_reports() {
        let server = serve(vec![
            ("report=gff3&id=NC_1", "##gff-version 3\n".to_string()),
            ("report=fasta&id=NC_1", ">NC_1\nACGT\n".to_string()),
            ("id=NC_BAD", format!("{}: NC_BAD", UNKNOWN_ID_MARKER)),
        ]);
        let viewer = SviewerClient::with_client(client(), &format!("{}viewer.cgi", server.base));

        assert_eq!(viewer.report("NC_1", "gff3").unwrap(), "##gff-version 3\n");
        assert_eq!(viewer.report("NC_1", "fasta").unwrap(), ">NC_1\nACGT\n");
        assert!(viewer.report("NC_BAD", "gff3").unwrap_err().is_empty_result());

        let requests = server.requests();
        assert!(requests[0].starts_with("GET /viewer.cgi?db=nuccore&report=gff3&id=NC_1 "));
    }

    #[test]
    fn test_extract_tag() {
        let search = "<eSearchResult><Count>1</Count><QueryKey>1</QueryKey>\
                      <WebEnv>MCID_65f1a2</WebEnv></eSearchResult>";
        assert_eq!(extract_tag(search, "QueryKey"), Some("1"));
        assert_eq!(extract_tag(search, "WebEnv"), Some("MCID_65f1a2"));
        assert_eq!(extract_tag(search, "IdList"), None);
    }

    #[test]
    fn test_local_source_plain() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("NC_1.xml"), "<GBSeq_locus>NC_1</GBSeq_locus>\n").unwrap();

        let source = LocalXmlSource::new(dir.path());
        let text = source.fetch("NC_1").unwrap();
        assert!(text.contains("NC_1"));
    }

    #[test]
    fn test_local_source_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("NC_2.xml.gz")).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(b"<GBSeq_locus>NC_2</GBSeq_locus>\n").unwrap();
        encoder.finish().unwrap();

        let source = LocalXmlSource::new(dir.path());
        assert!(source.fetch("NC_2").unwrap().contains("NC_2"));
    }

    #[test]
    fn test_local_source_missing_is_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalXmlSource::new(dir.path());
        let err = source.fetch("NC_404").unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn test_local_source_empty_marker() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("NC_3.xml"), EMPTY_RESULT_MARKER).unwrap();
        let source = LocalXmlSource::new(dir.path());
        assert!(source.fetch("NC_3").unwrap_err().is_empty_result());
    }
}
