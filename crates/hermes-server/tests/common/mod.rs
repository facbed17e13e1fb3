//! Shared test support: the reference handler set and a raw-socket HTTP
//! client, so the wire behavior (keep-alive, chunking, premature close) is
//! fully under the tests' control.
#![allow(dead_code)]

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONNECTION;
use http::{HeaderMap, HeaderValue, StatusCode};

use hermes_core::{
    default_handle, BodyConsumer, BodyProducer, BoxError, ExceptionHandler, HttpHandler,
    HttpRequest, HttpResponder, RouteSpec, TargetType,
};
use hermes_server::{HttpService, HttpServiceBuilder};

/// Aggregation cap used by every test service, as in the reference suite.
pub const TEST_CHUNK_LIMIT: usize = 75 * 1024;

static TRACING: std::sync::Once = std::sync::Once::new();

/// Installs the test tracing subscriber once; `RUST_LOG` controls the
/// filter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Observable counters for the streaming-upload consumers.
#[derive(Debug, Default)]
pub struct StreamStats {
    pub chunks: AtomicUsize,
    pub finished: AtomicUsize,
    pub errors: AtomicUsize,
    /// Terminal errors delivered to the `/stream/upload/fail` consumer.
    pub fail_errors: AtomicUsize,
}

/// Error type translated to 303 by [`TestExceptionHandler`].
#[derive(Debug)]
pub struct CustomError;

impl std::fmt::Display for CustomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("custom failure")
    }
}

impl std::error::Error for CustomError {}

/// Maps [`CustomError`] to `303 See Other`, everything else to the default
/// translation.
pub struct TestExceptionHandler;

impl ExceptionHandler for TestExceptionHandler {
    fn handle(
        &self,
        cause: &BoxError,
        request: &HttpRequest,
        responder: &dyn HttpResponder,
    ) -> Result<(), BoxError> {
        if cause.downcast_ref::<CustomError>().is_some() {
            responder.send_status(StatusCode::SEE_OTHER);
        } else {
            default_handle(cause, request, responder);
        }
        Ok(())
    }
}

/// The reference handler set.
pub struct TestHandler {
    stats: Arc<StreamStats>,
}

impl TestHandler {
    pub fn new() -> (Self, Arc<StreamStats>) {
        let stats = Arc::new(StreamStats::default());
        (
            Self {
                stats: Arc::clone(&stats),
            },
            stats,
        )
    }
}

struct CountingConsumer {
    total: usize,
    stats: Arc<StreamStats>,
}

impl BodyConsumer for CountingConsumer {
    fn chunk(&mut self, data: Bytes, _responder: &dyn HttpResponder) -> Result<(), BoxError> {
        self.total += data.len();
        self.stats.chunks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn finished(&mut self, responder: &dyn HttpResponder) -> Result<(), BoxError> {
        self.stats.finished.fetch_add(1, Ordering::SeqCst);
        responder.send_string(StatusCode::OK, &format!("Uploaded:{}", self.total));
        Ok(())
    }

    fn handle_error(&mut self, _cause: &BoxError) {
        self.stats.errors.fetch_add(1, Ordering::SeqCst);
    }
}

/// Accepts the first chunk, then violates its own precondition on the
/// second; the pipeline must route the failure through `handle_error`.
struct FailingUploadConsumer {
    count: usize,
    stats: Arc<StreamStats>,
}

impl BodyConsumer for FailingUploadConsumer {
    fn chunk(&mut self, _data: Bytes, _responder: &dyn HttpResponder) -> Result<(), BoxError> {
        self.count += 1;
        if self.count > 1 {
            return Err("chunk error".into());
        }
        Ok(())
    }

    fn finished(&mut self, responder: &dyn HttpResponder) -> Result<(), BoxError> {
        responder.send_status(StatusCode::OK);
        Ok(())
    }

    fn handle_error(&mut self, _cause: &BoxError) {
        self.stats.fail_errors.fetch_add(1, Ordering::SeqCst);
    }
}

struct FileConsumer {
    path: PathBuf,
    file: Option<File>,
}

impl BodyConsumer for FileConsumer {
    fn chunk(&mut self, data: Bytes, _responder: &dyn HttpResponder) -> Result<(), BoxError> {
        if let Some(file) = &mut self.file {
            file.write_all(&data)?;
            file.flush()?;
        }
        Ok(())
    }

    fn finished(&mut self, responder: &dyn HttpResponder) -> Result<(), BoxError> {
        self.file = None;
        responder.send_status(StatusCode::OK);
        Ok(())
    }

    fn handle_error(&mut self, _cause: &BoxError) {
        self.file = None;
        let _ = std::fs::remove_file(&self.path);
    }
}

struct FailingConsumer {
    fail_on: String,
}

impl BodyConsumer for FailingConsumer {
    fn chunk(&mut self, _data: Bytes, _responder: &dyn HttpResponder) -> Result<(), BoxError> {
        match self.fail_on.as_str() {
            "chunk" => Err(Box::new(CustomError)),
            "error" => Err("plain chunk failure".into()),
            _ => Ok(()),
        }
    }

    fn finished(&mut self, responder: &dyn HttpResponder) -> Result<(), BoxError> {
        if self.fail_on == "finish" {
            return Err(Box::new(CustomError));
        }
        responder.send_status(StatusCode::OK);
        Ok(())
    }

    fn handle_error(&mut self, _cause: &BoxError) {}
}

struct RepeatProducer {
    chunk: String,
    repeat: i64,
    times: i64,
    success_file: String,
    failure_file: String,
}

impl BodyProducer for RepeatProducer {
    fn next_chunk(&mut self) -> Result<Bytes, BoxError> {
        if self.times < self.repeat {
            let piece = format!("{} {}", self.chunk, self.times);
            self.times += 1;
            Ok(Bytes::from(piece))
        } else {
            Ok(Bytes::new())
        }
    }

    fn finished(&mut self) -> Result<(), BoxError> {
        File::create(&self.success_file)?;
        Ok(())
    }

    fn handle_error(&mut self, cause: Option<&BoxError>) {
        let detail = cause.map_or_else(|| "unknown".to_string(), ToString::to_string);
        let _ = std::fs::write(&self.failure_file, detail);
    }
}

fn close_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers
}

impl HttpHandler for TestHandler {
    fn base_path(&self) -> &str {
        "/test/v1"
    }

    fn routes(&self) -> Vec<RouteSpec> {
        let upload_stats = Arc::clone(&self.stats);
        let upload_fail_stats = Arc::clone(&self.stats);

        vec![
            RouteSpec::get("/sleep/{seconds}")
                .path_param("seconds", TargetType::Int)
                .buffered(|_, responder, args| {
                    let seconds = u64::try_from(args.int(0)).unwrap_or(0);
                    std::thread::sleep(Duration::from_secs(seconds));
                    responder.send_status(StatusCode::OK);
                    Ok(())
                }),
            RouteSpec::get("/panic").buffered(|_, _, _| panic!("deliberate handler panic")),
            RouteSpec::get("/resource").buffered(|_, responder, _| {
                responder.send_json(
                    StatusCode::OK,
                    serde_json::json!({"status": "Handled get in resource end-point"}),
                );
                Ok(())
            }),
            RouteSpec::get("/tweets/{id}")
                .path_param("id", TargetType::Text)
                .buffered(|_, responder, args| {
                    let id = args.text(0).unwrap_or_default();
                    responder.send_json(
                        StatusCode::OK,
                        serde_json::json!({
                            "status": format!("Handled get in tweets end-point, id: {id}")
                        }),
                    );
                    Ok(())
                }),
            RouteSpec::put("/tweets/{id}")
                .path_param("id", TargetType::Text)
                .buffered(|_, responder, args| {
                    let id = args.text(0).unwrap_or_default();
                    responder.send_json(
                        StatusCode::OK,
                        serde_json::json!({
                            "status": format!("Handled put in tweets end-point, id: {id}")
                        }),
                    );
                    Ok(())
                }),
            RouteSpec::delete("/facebook/{id}/message")
                .path_param("id", TargetType::Text)
                .buffered(|_, _, _| Ok(())),
            RouteSpec::put("/facebook/{id}/message")
                .path_param("id", TargetType::Text)
                .buffered(|request, responder, args| {
                    let id = args.text(0).unwrap_or_default();
                    let content = String::from_utf8_lossy(request.body());
                    responder.send_json(
                        StatusCode::OK,
                        serde_json::json!({
                            "result": format!(
                                "Handled put in tweets end-point, id: {id}. Content: {content}"
                            )
                        }),
                    );
                    Ok(())
                }),
            RouteSpec::post("/facebook/{id}/message")
                .path_param("id", TargetType::Text)
                .buffered(|request, responder, args| {
                    let id = args.text(0).unwrap_or_default();
                    let content = String::from_utf8_lossy(request.body());
                    responder.send_json(
                        StatusCode::OK,
                        serde_json::json!({
                            "result": format!(
                                "Handled post in tweets end-point, id: {id}. Content: {content}"
                            )
                        }),
                    );
                    Ok(())
                }),
            RouteSpec::get("/user/{userId}/message/{messageId}")
                .path_param("userId", TargetType::Text)
                .path_param("messageId", TargetType::Int)
                .buffered(|_, responder, args| {
                    responder.send_json(
                        StatusCode::OK,
                        serde_json::json!({
                            "result": format!(
                                "Handled multiple path parameters {} {}",
                                args.text(0).unwrap_or_default(),
                                args.int(1)
                            )
                        }),
                    );
                    Ok(())
                }),
            // Same output with the parameters declared in the opposite order
            // from their appearance in the path.
            RouteSpec::get("/message/{messageId}/user/{userId}")
                .path_param("userId", TargetType::Text)
                .path_param("messageId", TargetType::Int)
                .buffered(|_, responder, args| {
                    responder.send_json(
                        StatusCode::OK,
                        serde_json::json!({
                            "result": format!(
                                "Handled multiple path parameters {} {}",
                                args.text(0).unwrap_or_default(),
                                args.int(1)
                            )
                        }),
                    );
                    Ok(())
                }),
            // Deliberate mismatch: the pattern binds {id}, the parameter
            // declaration asks for "userid".
            RouteSpec::get("/NotRoutable/{id}")
                .path_param("userid", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder
                        .send_string(StatusCode::OK, args.text(0).unwrap_or_default());
                    Ok(())
                }),
            RouteSpec::get("/multi-match/**").buffered(|_, responder, _| {
                responder.send_string(StatusCode::OK, "multi-match-*");
                Ok(())
            }),
            RouteSpec::get("/multi-match/{param}")
                .path_param("param", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_string(
                        StatusCode::OK,
                        &format!("multi-match-param-{}", args.text(0).unwrap_or_default()),
                    );
                    Ok(())
                }),
            RouteSpec::get("/multi-match/foo").buffered(|_, responder, _| {
                responder.send_string(StatusCode::OK, "multi-match-get-actual-foo");
                Ok(())
            }),
            RouteSpec::put("/multi-match/foo").buffered(|_, responder, _| {
                responder.send_string(StatusCode::OK, "multi-match-put-actual-foo");
                Ok(())
            }),
            RouteSpec::get("/multi-match/{param}/bar")
                .path_param("param", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_string(
                        StatusCode::OK,
                        &format!("multi-match-param-bar-{}", args.text(0).unwrap_or_default()),
                    );
                    Ok(())
                }),
            RouteSpec::get("/multi-match/foo/{param}")
                .path_param("param", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_string(
                        StatusCode::OK,
                        &format!("multi-match-get-foo-param-{}", args.text(0).unwrap_or_default()),
                    );
                    Ok(())
                }),
            RouteSpec::get("/multi-match/foo/{param}/bar")
                .path_param("param", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_string(
                        StatusCode::OK,
                        &format!("multi-match-foo-param-bar-{}", args.text(0).unwrap_or_default()),
                    );
                    Ok(())
                }),
            RouteSpec::get("/multi-match/foo/bar/{param}")
                .path_param("param", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_string(
                        StatusCode::OK,
                        &format!("multi-match-foo-bar-param-{}", args.text(0).unwrap_or_default()),
                    );
                    Ok(())
                }),
            RouteSpec::get("/multi-match/foo/{param}/bar/baz")
                .path_param("param", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_string(
                        StatusCode::OK,
                        &format!(
                            "multi-match-foo-param-bar-baz-{}",
                            args.text(0).unwrap_or_default()
                        ),
                    );
                    Ok(())
                }),
            RouteSpec::get("/multi-match/foo/bar/{param}/{id}")
                .path_param("param", TargetType::Text)
                .path_param("id", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_string(
                        StatusCode::OK,
                        &format!(
                            "multi-match-foo-bar-param-{}-id-{}",
                            args.text(0).unwrap_or_default(),
                            args.text(1).unwrap_or_default()
                        ),
                    );
                    Ok(())
                }),
            RouteSpec::get("/apps/{app-id}/versions/{version-id}/create").buffered(
                |_, responder, _| {
                    responder.send_string(StatusCode::OK, "new");
                    Ok(())
                },
            ),
            RouteSpec::get("/apps/{app-id}/{type}/{id}/{action}").buffered(|_, responder, _| {
                responder.send_string(StatusCode::OK, "old");
                Ok(())
            }),
            RouteSpec::put("/stream/upload").streaming(move |_, _, _| {
                Ok(Some(Box::new(CountingConsumer {
                    total: 0,
                    stats: Arc::clone(&upload_stats),
                })))
            }),
            RouteSpec::put("/stream/upload/fail").streaming(move |_, _, _| {
                Ok(Some(Box::new(FailingUploadConsumer {
                    count: 0,
                    stats: Arc::clone(&upload_fail_stats),
                })))
            }),
            RouteSpec::put("/stream/upload/file")
                .header_param("File-Path", TargetType::Text)
                .streaming(|_, _, args| {
                    let path = PathBuf::from(
                        args.text(0)
                            .ok_or_else(|| BoxError::from("File-Path header missing"))?,
                    );
                    let file = File::create(&path)?;
                    Ok(Some(Box::new(FileConsumer {
                        path,
                        file: Some(file),
                    })))
                }),
            RouteSpec::put("/aggregate/upload").buffered(|request, responder, _| {
                responder.send_string(
                    StatusCode::OK,
                    &format!("Uploaded:{}", request.body().len()),
                );
                Ok(())
            }),
            // Echo the POST body back one byte per chunk.
            RouteSpec::post("/chunk").buffered(|request, responder, _| {
                let body = request.body().clone();
                let mut chunker = responder.send_chunk_start(StatusCode::OK, None);
                for i in 0..body.len() {
                    chunker.send_chunk(body.slice(i..i + 1))?;
                }
                chunker.close()?;
                Ok(())
            }),
            RouteSpec::get("/produceBody")
                .query_param("chunk", TargetType::Text)
                .query_param("repeat", TargetType::Int)
                .query_param("successFile", TargetType::Text)
                .query_param("failureFile", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_content(
                        StatusCode::OK,
                        Box::new(RepeatProducer {
                            chunk: args.text(0).unwrap_or_default().to_string(),
                            repeat: args.int(1),
                            times: 0,
                            success_file: args.text(2).unwrap_or_default().to_string(),
                            failure_file: args.text(3).unwrap_or_default().to_string(),
                        }),
                        HeaderMap::new(),
                    );
                    Ok(())
                }),
            RouteSpec::get("/uexception").buffered(|_, _, _| Err("User Exception".into())),
            RouteSpec::get("/noresponse").buffered(|_, _, _| Ok(())),
            RouteSpec::get("/stringQueryParam/{path}")
                .path_param("path", TargetType::Text)
                .query_param("name", TargetType::Text)
                .buffered(|_, responder, args| {
                    responder.send_string(
                        StatusCode::OK,
                        &format!(
                            "{}:{}",
                            args.text(0).unwrap_or_default(),
                            args.text(1).unwrap_or("null")
                        ),
                    );
                    Ok(())
                }),
            RouteSpec::get("/primitiveQueryParam")
                .query_param("age", TargetType::Int)
                .buffered(|_, responder, args| {
                    responder.send_string(StatusCode::OK, &args.int(0).to_string());
                    Ok(())
                }),
            RouteSpec::get("/sortedSetQueryParam")
                .query_param("id", TargetType::IntSortedSet)
                .buffered(|_, responder, args| {
                    let joined = args
                        .int_set(0)
                        .map(|set| {
                            set.iter()
                                .map(ToString::to_string)
                                .collect::<Vec<String>>()
                                .join(",")
                        })
                        .unwrap_or_default();
                    responder.send_string(StatusCode::OK, &joined);
                    Ok(())
                }),
            RouteSpec::get("/listHeaderParam")
                .header_param("name", TargetType::TextList)
                .buffered(|_, responder, args| {
                    responder.send_string(StatusCode::OK, &args.text_list(0).join(","));
                    Ok(())
                }),
            RouteSpec::get("/defaultValue")
                .query_param_with_default("age", TargetType::Int, "30")
                .query_param_with_default("name", TargetType::Text, "hello")
                .header_param_with_default("hobby", TargetType::TextList, "casking")
                .buffered(|_, responder, args| {
                    responder.send_json(
                        StatusCode::OK,
                        serde_json::json!({
                            "age": args.int(0),
                            "name": args.text(1).unwrap_or_default(),
                            "hobby": args.text_list(2),
                        }),
                    );
                    Ok(())
                }),
            RouteSpec::get("/connectionClose").buffered(|_, responder, _| {
                responder.send_string_with_headers(
                    StatusCode::OK,
                    "Close connection",
                    close_headers(),
                );
                Ok(())
            }),
            RouteSpec::post("/uploadReject").streaming(|_, responder, _| {
                responder.send_string_with_headers(
                    StatusCode::BAD_REQUEST,
                    "Rejected",
                    close_headers(),
                );
                Ok(None)
            }),
            RouteSpec::post("/customException").buffered(|_, _, _| Err(Box::new(CustomError))),
            RouteSpec::post("/stream/customException")
                .header_param("failOn", TargetType::Text)
                .streaming(|_, _, args| {
                    let fail_on = args.text(0).unwrap_or_default().to_string();
                    if fail_on == "start" {
                        return Err(Box::new(CustomError));
                    }
                    Ok(Some(Box::new(FailingConsumer { fail_on })))
                }),
        ]
    }
}

/// A started service plus everything a test needs to talk to it.
pub struct TestService {
    pub service: HttpService,
    pub addr: SocketAddr,
    pub stats: Arc<StreamStats>,
}

impl TestService {
    /// Starts the reference service with the default test configuration.
    pub fn start() -> Self {
        Self::start_with(|builder| builder)
    }

    /// Starts the reference service after applying `configure` to the
    /// builder.
    pub fn start_with(configure: impl FnOnce(HttpServiceBuilder) -> HttpServiceBuilder) -> Self {
        init_tracing();
        let (handler, stats) = TestHandler::new();
        let builder = HttpService::builder()
            .set_host("127.0.0.1")
            .set_port(0)
            .set_worker_thread_pool_size(4)
            .set_exec_thread_pool_size(8)
            .set_http_chunk_limit(TEST_CHUNK_LIMIT)
            .set_exception_handler(TestExceptionHandler)
            .add_http_handler(handler);
        let service = configure(builder).build().expect("service build");
        let addr = service.start().expect("service start");
        Self {
            service,
            addr,
            stats,
        }
    }
}

impl Drop for TestService {
    fn drop(&mut self) {
        let _ = self.service.stop();
    }
}

/// Parsed response from the raw client.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

/// Minimal blocking HTTP/1.1 client over one socket.
pub struct RawClient {
    reader: BufReader<TcpStream>,
}

impl RawClient {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("read timeout");
        Self {
            reader: BufReader::new(stream),
        }
    }

    fn stream(&mut self) -> &mut TcpStream {
        self.reader.get_mut()
    }

    /// Writes raw bytes to the socket.
    pub fn send_raw(&mut self, data: &[u8]) {
        self.stream().write_all(data).expect("write");
        self.stream().flush().expect("flush");
    }

    /// Writes a full request with `Content-Length` framing.
    pub fn send_request(
        &mut self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) {
        let mut request = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n");
        for (name, value) in headers {
            request.push_str(&format!("{name}: {value}\r\n"));
        }
        request.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
        self.send_raw(request.as_bytes());
        if !body.is_empty() {
            self.send_raw(body);
        }
    }

    /// Shuts down the write half so the server observes a half-close.
    pub fn shutdown_write(&mut self) {
        let _ = self.stream().shutdown(std::net::Shutdown::Write);
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read line");
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Reads one response, honoring `Content-Length` and chunked framing.
    pub fn read_response(&mut self) -> RawResponse {
        let status_line = self.read_line();
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .unwrap_or_else(|| panic!("malformed status line: {status_line:?}"));

        let mut headers = Vec::new();
        loop {
            let line = self.read_line();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let chunked = headers
            .iter()
            .any(|(name, value)| {
                name.eq_ignore_ascii_case("transfer-encoding")
                    && value.eq_ignore_ascii_case("chunked")
            });
        let content_length = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok());

        let body = if chunked {
            self.read_chunked_body()
        } else if let Some(length) = content_length {
            let mut body = vec![0u8; length];
            self.reader.read_exact(&mut body).expect("read body");
            body
        } else {
            let mut body = Vec::new();
            self.reader.read_to_end(&mut body).expect("read body");
            body
        };

        RawResponse {
            status,
            headers,
            body,
        }
    }

    fn read_chunked_body(&mut self) -> Vec<u8> {
        let mut body = Vec::new();
        loop {
            let size_line = self.read_line();
            let size = usize::from_str_radix(size_line.split(';').next().unwrap_or("0"), 16)
                .unwrap_or_else(|_| panic!("malformed chunk size: {size_line:?}"));
            if size == 0 {
                // Trailer section ends with an empty line.
                while !self.read_line().is_empty() {}
                return body;
            }
            let mut chunk = vec![0u8; size];
            self.reader.read_exact(&mut chunk).expect("read chunk");
            body.extend_from_slice(&chunk);
            let mut crlf = [0u8; 2];
            self.reader.read_exact(&mut crlf).expect("chunk crlf");
        }
    }

    /// Everything remaining on the socket, until the server closes it.
    pub fn read_to_end(&mut self) -> Vec<u8> {
        let mut data = Vec::new();
        self.reader.read_to_end(&mut data).expect("read to end");
        data
    }
}

/// One-shot request on a fresh `Connection: close` socket.
pub fn request(addr: SocketAddr, method: &str, path: &str) -> RawResponse {
    request_with(addr, method, path, &[("Connection", "close")], b"")
}

/// One-shot request with extra headers and a body.
pub fn request_with(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> RawResponse {
    let mut client = RawClient::connect(addr);
    client.send_request(method, path, headers, body);
    client.read_response()
}

/// Asserts a 200 response with exactly this body.
pub fn assert_content(addr: SocketAddr, method: &str, path: &str, expected: &str) {
    let response = request(addr, method, path);
    assert_eq!(response.status, 200, "{method} {path}");
    assert_eq!(response.text(), expected, "{method} {path}");
}

/// Polls `condition` for up to `timeout`, panicking when it never holds.
pub fn wait_for(timeout: Duration, what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("timed out waiting for {what}");
}
