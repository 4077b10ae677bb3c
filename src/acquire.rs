//! Acquisition of expert statements from the Finnish Parliament open data
//! service
//!
//! The service publishes a CSV file listing every expert statement, along
//! with the URL of the corresponding PDF document. We keep the statements
//! from one drafting year that are not written in Swedish, save their
//! metadata locally, then download the documents one by one.

use crate::{
    batch::BatchSummary,
    config::{DownloadConfig, RetryPolicy},
    language,
    progress::{ProgressConfig, ProgressReport, ProgressTracker, Work},
    Result,
};
use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate};
use csv_async::{AsyncReaderBuilder, AsyncWriterBuilder};
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::{
    io::{self, ErrorKind},
    path::Path,
    pin::pin,
};
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use url::Url;

/// Location of the 2015-2019 expert statement metadata
pub const METADATA_URL: &str = "https://eduskunta-avoindata-documents-prod.s3-eu-west-1.amazonaws.com/expert-statement/Asiantuntijalausunnot-2015-2019-csv.csv";

/// Columns of the metadata CSV that we keep, in local file order
pub const METADATA_COLUMNS: [&str; 5] = [
    "Valiokunta",
    "Asian tunnus",
    "Laadintapäivämäärä",
    "Asiantuntijalausunnon kuvaus",
    "Url",
];

/// HTTP statuses that are worth retrying
const TRANSIENT_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Fetch metadata, keep the interesting statements, download their documents
pub async fn run(config: &DownloadConfig, report: &ProgressReport) -> Result<BatchSummary> {
    tokio::fs::create_dir_all(&config.document_dir)
        .await
        .with_context(|| format!("creating {}", config.document_dir.display()))?;
    let client = Client::builder()
        .connect_timeout(config.retry.timeout)
        .build()
        .context("setting up the HTTP client")?;

    let metadata = fetch_metadata(&client, &config.metadata_url).await?;
    let metadata = filter_metadata(metadata, config.year);
    println!("Found metadata for {} documents", metadata.len());
    save_metadata(&config.metadata_path, &metadata).await?;

    Ok(download_documents(config, &client, &metadata, report).await)
}

/// Expert statement metadata
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct MetadataRecord {
    /// Parliamentary committee which requested the statement
    #[serde(rename = "Valiokunta")]
    pub committee: Box<str>,

    /// Identifier of the case under consideration, e.g. "HE 15/2018 vp"
    #[serde(rename = "Asian tunnus")]
    pub case_id: Box<str>,

    /// Drafting date, in ISO format
    #[serde(rename = "Laadintapäivämäärä")]
    pub drafting_date: Box<str>,

    /// Free-form description, usually naming the author organization
    #[serde(rename = "Asiantuntijalausunnon kuvaus")]
    pub description: Box<str>,

    /// Location of the document, may be empty
    #[serde(rename = "Url")]
    pub url: Box<str>,
}
//
impl MetadataRecord {
    /// Year on which the statement was drafted, if the date is valid
    pub fn drafting_year(&self) -> Option<i32> {
        NaiveDate::parse_from_str(&self.drafting_date, "%Y-%m-%d")
            .ok()
            .map(|date| date.year())
    }

    /// Name of the local copy of the document
    ///
    /// This is the percent-decoded last segment of the document URL's path.
    pub fn document_file_name(&self) -> Result<String> {
        let url = Url::parse(&self.url).with_context(|| format!("parsing URL {:?}", self.url))?;
        // Decoding after splitting rejects encoded slashes instead of
        // truncating the name at them
        let segment = url.path().rsplit('/').next().unwrap_or_default();
        let name = urlencoding::decode(segment)
            .with_context(|| format!("decoding file name of {url}"))?
            .into_owned();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            bail!("{url} does not end with a usable file name");
        }
        Ok(name)
    }

    /// Fields in [`METADATA_COLUMNS`] order
    fn fields(&self) -> [&str; 5] {
        [
            &self.committee,
            &self.case_id,
            &self.drafting_date,
            &self.description,
            &self.url,
        ]
    }
}

/// Download and decode the remote metadata CSV
pub async fn fetch_metadata(client: &Client, url: &str) -> Result<Vec<MetadataRecord>> {
    let context = || format!("downloading metadata from {url}");
    let response = client
        .get(url)
        .send()
        .await
        .and_then(Response::error_for_status)
        .with_context(context)?;

    // Feed the response body to the CSV decoder as it comes in
    let csv_bytes = StreamReader::new(Box::pin(
        response
            .bytes_stream()
            // Translate reqwest errors into I/O errors
            .map_err(|e| io::Error::new(ErrorKind::Other, e)),
    ));
    let mut records = pin!(AsyncReaderBuilder::new()
        .create_deserializer(csv_bytes)
        .into_deserialize::<MetadataRecord>());

    let mut metadata = Vec::new();
    while let Some(record) = records.next().await {
        metadata.push(record.with_context(context)?);
    }
    log::debug!("Downloaded metadata for {} statements", metadata.len());
    Ok(metadata)
}

/// Keep statements from a certain drafting year which have a document and
/// are not likely to be written in Swedish
pub fn filter_metadata(metadata: Vec<MetadataRecord>, year: i32) -> Vec<MetadataRecord> {
    metadata
        .into_iter()
        .filter(|record| {
            if record.url.is_empty() {
                return false;
            }
            let Some(drafting_year) = record.drafting_year() else {
                log::warn!(
                    "Ignoring {} statement with invalid drafting date {:?}",
                    record.case_id,
                    record.drafting_date
                );
                return false;
            };
            if drafting_year != year {
                return false;
            }
            if language::most_likely_swedish(&record.description) {
                log::trace!("Rejected Swedish statement {record:?}");
                return false;
            }
            true
        })
        .collect()
}

/// Save metadata to a local CSV file
pub async fn save_metadata(path: &Path, metadata: &[MetadataRecord]) -> Result<()> {
    let context = || format!("saving metadata to {}", path.display());
    let file = tokio::fs::File::create(path).await.with_context(context)?;
    let mut writer = AsyncWriterBuilder::new()
        .has_headers(false)
        .create_writer(file);
    writer
        .write_record(METADATA_COLUMNS)
        .await
        .with_context(context)?;
    for record in metadata {
        writer
            .write_record(record.fields())
            .await
            .with_context(context)?;
    }
    writer.flush().await.with_context(context)?;
    Ok(())
}

/// Download the documents of a set of statements, one at a time
///
/// Failed downloads are logged and skipped.
pub async fn download_documents(
    config: &DownloadConfig,
    client: &Client,
    metadata: &[MetadataRecord],
    report: &ProgressReport,
) -> BatchSummary {
    let documents = report.add(
        "Downloading documents",
        ProgressConfig::new(Work::Documents(metadata.len())),
    );
    let bytes = report.add(
        "Downloaded data",
        ProgressConfig::new(Work::Bytes(0)).allow_adding_work(),
    );
    let mut summary = BatchSummary::new("download");
    for record in metadata {
        tokio::time::sleep(config.request_delay).await;
        let result = async {
            let file_name = record.document_file_name()?;
            let destination = config.document_dir.join(file_name);
            download_file(client, &record.url, &destination, config.retry, &bytes).await
        }
        .await;
        summary.record(&record.url, result);
        documents.make_progress(1);
    }
    bytes.done_adding_work();
    bytes.finish();
    documents.finish();
    summary
}

/// Download a single file, retrying transient failures
pub async fn download_file(
    client: &Client,
    url: &str,
    destination: &Path,
    retry: RetryPolicy,
    bytes: &ProgressTracker,
) -> Result<()> {
    let response = send_with_retry(client, url, retry).await?;
    let expected_len = response.content_length();
    if let Some(len) = expected_len {
        bytes.add_work(len);
    }

    let result = save_body(response, destination, retry, |len| {
        if expected_len.is_some() {
            bytes.make_progress(len);
        }
    })
    .await
    .with_context(|| format!("downloading {url} to {}", destination.display()));
    if result.is_err() {
        // Don't leave a truncated document behind
        let _ = tokio::fs::remove_file(destination).await;
    }
    result
}

/// Send a GET request, retrying on connection failures and transient server
/// errors with exponential backoff
async fn send_with_retry(client: &Client, url: &str, policy: RetryPolicy) -> Result<Response> {
    let mut retry = 0;
    loop {
        let can_retry = retry < policy.max_retries;
        match client.get(url).send().await {
            Ok(response) if can_retry && TRANSIENT_STATUSES.contains(&response.status()) => {
                log::warn!("Got {} from {url}, will retry", response.status());
            }
            Ok(response) => {
                return response
                    .error_for_status()
                    .with_context(|| format!("requesting {url}"));
            }
            Err(e) if can_retry && (e.is_connect() || e.is_timeout()) => {
                log::warn!("Failed to reach {url} ({e}), will retry");
            }
            Err(e) => return Err(e).with_context(|| format!("requesting {url}")),
        }
        tokio::time::sleep(policy.backoff(retry)).await;
        retry += 1;
    }
}

/// Stream a response body into a file, with a bound on each read
async fn save_body(
    response: Response,
    destination: &Path,
    policy: RetryPolicy,
    mut on_chunk: impl FnMut(u64),
) -> Result<()> {
    let mut file = tokio::fs::File::create(destination).await?;
    let mut body = pin!(response.bytes_stream());
    while let Some(chunk) = tokio::time::timeout(policy.timeout, body.next())
        .await
        .context("timed out while reading the response")?
    {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        on_chunk(chunk.len() as u64);
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{net::SocketAddr, path::PathBuf, time::Duration};
    use tokio::{io::AsyncReadExt, net::TcpListener, task::JoinHandle};

    fn record(drafting_date: &str, description: &str, url: &str) -> MetadataRecord {
        MetadataRecord {
            committee: "Talousvaliokunta".into(),
            case_id: "HE 1/2018 vp".into(),
            drafting_date: drafting_date.into(),
            description: description.into(),
            url: url.into(),
        }
    }

    /// Serve a fixed sequence of HTTP responses, one connection each, and
    /// return the server's base URL
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (base, tokio::spawn(respond(listener, responses)))
    }

    /// Answer successive connections with the given responses
    async fn respond(listener: TcpListener, responses: Vec<(u16, &'static str)>) {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let len = socket.read(&mut buf).await.unwrap();
                if len == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..len]);
            }
            let headers = format!(
                "HTTP/1.1 {status} Test\r\nContent-Length: {}\r\nConnection: close",
                body.len()
            );
            let response = format!("{headers}\r\n\r\n{body}");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    }

    /// Address on which nothing listens, at least for now
    async fn closed_address() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    fn bytes_tracker() -> ProgressTracker {
        ProgressReport::new().add(
            "test",
            ProgressConfig::new(Work::Bytes(0)).allow_adding_work(),
        )
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn metadata_filtering() {
        let metadata = vec![
            record("2018-03-01", "Valtiovarainministeriö", "https://x/a.pdf"),
            record("2018-03-02", "Kuntaliitto", ""),
            record("2017-12-31", "Kuntaliitto", "https://x/b.pdf"),
            record("2018-05-05", "Ahvenanmaan maakuntahallitus", "https://x/c.pdf"),
            record("2018-05-06", "Ahvenanmaan maakuntahallitus suomennos 1", "https://x/d.pdf"),
            record("not a date", "Kuntaliitto", "https://x/e.pdf"),
        ];
        let kept = filter_metadata(metadata, 2018);
        let urls = kept.iter().map(|r| &*r.url).collect::<Vec<_>>();
        assert_eq!(urls, ["https://x/a.pdf", "https://x/d.pdf"]);
    }

    #[test]
    fn document_file_names() {
        let name = |url: &str| record("2018-01-01", "", url).document_file_name();
        let attachment = "https://avoindata.eduskunta.fi/attachment/member/pdf";
        assert_eq!(
            name(&format!("{attachment}/EDK-2018-AK-1234%C3%A4.pdf?x=1")).unwrap(),
            "EDK-2018-AK-1234ä.pdf"
        );
        assert_eq!(name("https://x/dir/Lausunto%20A.pdf").unwrap(), "Lausunto A.pdf");
        assert!(name("https://x/dir/").is_err());
        assert!(name("https://x/dir/a%2Fb.pdf").is_err());
        assert!(name("not a url").is_err());
    }

    #[tokio::test]
    async fn metadata_is_saved_with_fixed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        let metadata = [record("2018-03-01", "Kuntaliitto, lausunto", "https://x/a.pdf")];
        save_metadata(&path, &metadata).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Valiokunta,Asian tunnus,Laadintapäivämäärä,Asiantuntijalausunnon kuvaus,Url\n\
             Talousvaliokunta,HE 1/2018 vp,2018-03-01,\"Kuntaliitto, lausunto\",https://x/a.pdf\n"
        );

        // The header is written even if no statement was kept
        save_metadata(&path, &[]).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Valiokunta,Asian tunnus,Laadintapäivämäärä,Asiantuntijalausunnon kuvaus,Url\n"
        );
    }

    #[tokio::test]
    async fn remote_metadata_is_decoded() {
        let csv = "Id,Valiokunta,Asian tunnus,Laadintapäivämäärä,\
                   Asiantuntijalausunnon kuvaus,Url\n\
                   1,Sivistysvaliokunta,HE 2/2018 vp,2018-02-02,Opetushallitus,https://x/a.pdf\n\
                   2,Sivistysvaliokunta,HE 2/2018 vp,2018-02-03,Kuntaliitto,\n";
        let (base, server) = serve(vec![(200, csv)]).await;
        let metadata = fetch_metadata(&Client::new(), &format!("{base}/metadata.csv"))
            .await
            .unwrap();
        server.await.unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(&*metadata[0].committee, "Sivistysvaliokunta");
        assert_eq!(&*metadata[0].description, "Opetushallitus");
        assert_eq!(metadata[0].drafting_year(), Some(2018));
        assert!(metadata[1].url.is_empty());
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let (base, server) = serve(vec![(503, "busy"), (502, "busy"), (200, "%PDF-1.5")]).await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("doc.pdf");
        let bytes = bytes_tracker();
        download_file(
            &Client::new(),
            &format!("{base}/doc.pdf"),
            &destination,
            fast_retry(3),
            &bytes,
        )
        .await
        .unwrap();
        server.await.unwrap();
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "%PDF-1.5");
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let (base, server) = serve(vec![(500, "oops"), (500, "oops")]).await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("doc.pdf");
        let bytes = bytes_tracker();
        let result = download_file(
            &Client::new(),
            &format!("{base}/doc.pdf"),
            &destination,
            fast_retry(1),
            &bytes,
        )
        .await;
        server.await.unwrap();
        assert!(result.is_err());
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn unreachable_servers_are_given_up_on() {
        let address = closed_address().await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("doc.pdf");
        let result = download_file(
            &Client::new(),
            &format!("http://{address}/doc.pdf"),
            &destination,
            fast_retry(2),
            &bytes_tracker(),
        )
        .await;
        assert!(result.is_err());
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn refused_connections_are_retried() {
        let address = closed_address().await;
        let server = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let listener = TcpListener::bind(address).await.unwrap();
            respond(listener, vec![(200, "%PDF-1.5")]).await;
        });
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("doc.pdf");
        let retry = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
        };
        download_file(
            &Client::new(),
            &format!("http://{address}/doc.pdf"),
            &destination,
            retry,
            &bytes_tracker(),
        )
        .await
        .unwrap();
        server.await.unwrap();
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "%PDF-1.5");
    }

    #[tokio::test]
    async fn failed_documents_do_not_stop_the_batch() {
        let (base, server) = serve(vec![(404, "missing"), (200, "%PDF-1.5")]).await;
        let dir = tempfile::tempdir().unwrap();
        let config = DownloadConfig {
            metadata_path: dir.path().join("metadata.csv"),
            document_dir: PathBuf::from(dir.path()),
            metadata_url: METADATA_URL.into(),
            year: 2018,
            request_delay: Duration::ZERO,
            retry: fast_retry(3),
        };
        let metadata = [
            record("2018-01-01", "A", &format!("{base}/docs/Missing.pdf")),
            record("2018-01-02", "B", &format!("{base}/docs/Lausunto%20B.pdf")),
        ];
        let summary =
            download_documents(&config, &Client::new(), &metadata, &ProgressReport::new()).await;
        server.await.unwrap();
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.skipped().len(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Lausunto B.pdf")).unwrap(),
            "%PDF-1.5"
        );
        assert!(!dir.path().join("Missing.pdf").exists());
    }
}
