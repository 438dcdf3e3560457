//! End-to-end tests against a live server on an ephemeral port.

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use byteorder::{LittleEndian, ReadBytesExt};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use zipstream::archive::{ArchiveProducer, CommandProducer, ProducerHandle};
use zipstream::config::{ArchiveConfig, ServerConfig};
use zipstream::error::NOT_FOUND_MESSAGE;
use zipstream::server::{self, AppState};
use zipstream::ArchiveError;

/// Returns fixed bytes and counts how many producers were started.
struct CountingProducer {
    data: Vec<u8>,
    starts: AtomicUsize,
}

impl CountingProducer {
    fn new(data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            data,
            starts: AtomicUsize::new(0),
        })
    }

    fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl ArchiveProducer for CountingProducer {
    fn start(&self, _dir: &Path) -> Result<ProducerHandle, ArchiveError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(ProducerHandle::from_reader(Cursor::new(self.data.clone())))
    }
}

struct TestServer {
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
    _temp: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Base directory with `photos/abc123/` holding two files of 250,000 bytes
/// in total, plus an index page.
fn fixture() -> (TempDir, ServerConfig) {
    let temp = TempDir::new().unwrap();
    let photos = temp.path().join("photos");
    let album = photos.join("abc123");
    std::fs::create_dir_all(&album).unwrap();
    std::fs::create_dir_all(temp.path().join("secret")).unwrap();

    let noise: Vec<u8> = (0..250_000u32)
        .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
        .collect();
    std::fs::write(album.join("1.jpg"), &noise[..150_000]).unwrap();
    std::fs::write(album.join("2.jpg"), &noise[150_000..]).unwrap();

    let index = temp.path().join("index.html");
    std::fs::write(&index, "<h1>Photos</h1>").unwrap();

    let config = ServerConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        index_page: index,
        logging: false,
        zip_program: "zip".to_string(),
        archive: ArchiveConfig::new(photos.canonicalize().unwrap()),
    };
    (temp, config)
}

async fn spawn_server(temp: TempDir, state: AppState) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server::serve(listener, state, async {
        let _ = rx.await;
    }));
    TestServer {
        addr,
        _shutdown: tx,
        _temp: temp,
    }
}

fn zip_available() -> bool {
    std::process::Command::new("zip")
        .arg("-v")
        .output()
        .is_ok_and(|out| out.status.success())
}

#[tokio::test]
async fn test_streams_producer_output() {
    let (temp, config) = fixture();
    let data: Vec<u8> = (0..300_000u32).map(|i| (i % 253) as u8).collect();
    let producer = CountingProducer::new(data.clone());
    let state = AppState::with_producer(&config, producer.clone()).unwrap();
    let server = spawn_server(temp, state).await;

    let resp = reqwest::get(server.url("/archive/abc123/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "multipart/form-data");
    assert_eq!(
        resp.headers()["content-disposition"],
        r#"attachment; filename="photos.zip""#
    );

    let body = resp.bytes().await.unwrap();
    assert_eq!(body.as_ref(), data.as_slice());
    assert_eq!(producer.starts(), 1);
}

#[tokio::test]
async fn test_missing_archive_is_404_without_spawning() {
    let (temp, config) = fixture();
    let producer = CountingProducer::new(Vec::new());
    let state = AppState::with_producer(&config, producer.clone()).unwrap();
    let server = spawn_server(temp, state).await;

    for path in ["/archive/doesnotexist/", "/archive/..%2Fsecret/"] {
        let resp = reqwest::get(server.url(path)).await.unwrap();
        assert_eq!(resp.status(), 404, "{path}");
        assert_eq!(resp.text().await.unwrap(), NOT_FOUND_MESSAGE);
    }
    assert_eq!(producer.starts(), 0);
}

#[tokio::test]
async fn test_spawn_failure_is_500() {
    let (temp, config) = fixture();
    let producer = Arc::new(CommandProducer::zip("zipstream-no-such-program"));
    let state = AppState::with_producer(&config, producer).unwrap();
    let server = spawn_server(temp, state).await;

    let resp = reqwest::get(server.url("/archive/abc123/")).await.unwrap();
    assert_eq!(resp.status(), 500);
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_index_page_read_fresh() {
    let (temp, config) = fixture();
    let index: PathBuf = config.index_page.clone();
    let state = AppState::with_producer(&config, CountingProducer::new(Vec::new())).unwrap();
    let server = spawn_server(temp, state).await;

    let resp = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    assert_eq!(resp.text().await.unwrap(), "<h1>Photos</h1>");

    std::fs::write(&index, "<h1>Updated</h1>").unwrap();
    let resp = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "<h1>Updated</h1>");
}

#[tokio::test]
async fn test_client_disconnect_mid_stream() {
    let (temp, config) = fixture();
    let producer = CountingProducer::new(vec![7u8; 50 * 102_400]);
    let state = AppState::with_producer(&config, producer.clone()).unwrap();
    let server = spawn_server(temp, state).await;

    let mut resp = reqwest::get(server.url("/archive/abc123/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.chunk().await.unwrap().is_some());
    drop(resp);

    // The server keeps serving after a dropped download
    let resp = reqwest::get(server.url("/archive/doesnotexist/")).await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_real_zip_archive() {
    if !zip_available() {
        eprintln!("zip is not installed, skipping");
        return;
    }

    let (temp, config) = fixture();
    let state = AppState::new(&config).unwrap();
    let server = spawn_server(temp, state).await;

    let resp = reqwest::get(server.url("/archive/abc123/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.bytes().await.unwrap();

    assert_eq!(&body[..4], b"PK\x03\x04");

    // End of central directory record: signature, then entry counts at +10
    let eocd = body
        .windows(4)
        .rposition(|w| w == b"PK\x05\x06")
        .expect("missing end of central directory");
    let mut record = Cursor::new(&body[eocd + 4..]);
    let _disk = record.read_u16::<LittleEndian>().unwrap();
    let _cd_disk = record.read_u16::<LittleEndian>().unwrap();
    let _entries_on_disk = record.read_u16::<LittleEndian>().unwrap();
    let entries = record.read_u16::<LittleEndian>().unwrap();
    assert_eq!(entries, 2);
}
