use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const ASSET_PATH: &str = "/vip/address/index-min.js";
pub const STREET_PATH: &str = "/locationservice/addr/output_address_town_array.do";

#[derive(Clone)]
pub enum StreetReply {
    Body(String),
    Status(u16),
    Delayed(Duration, String),
}

/// Canned upstream data: one address script plus street replies keyed by
/// county id and `lang` value.
#[derive(Clone, Default)]
pub struct AreaFixture {
    asset: Option<String>,
    streets: HashMap<(u64, String), StreetReply>,
}

impl AreaFixture {
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: Some(asset.into()),
            streets: HashMap::new(),
        }
    }

    pub fn streets(mut self, county_id: u64, lang: &str, reply: StreetReply) -> Self {
        self.streets.insert((county_id, lang.to_string()), reply);
        self
    }
}

#[derive(Clone, Default)]
struct RequestLog {
    asset: Arc<AtomicUsize>,
    streets: Arc<AtomicUsize>,
}

pub struct MockAreaServer {
    url: String,
    log: RequestLog,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockAreaServer {
    pub async fn start(fixture: AreaFixture) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock HTTP listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let fixture = Arc::new(fixture);
        let log = RequestLog::default();

        let service_log = log.clone();
        let make_service = make_service_fn(move |_| {
            let fixture = fixture.clone();
            let log = service_log.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    serve_request(fixture.clone(), log.clone(), req)
                }))
            }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock HTTP server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            log,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn asset_url(&self) -> String {
        format!("{}{}", self.url, ASSET_PATH)
    }

    pub fn street_endpoint(&self) -> String {
        format!("{}{}", self.url, STREET_PATH)
    }

    pub fn asset_requests(&self) -> usize {
        self.log.asset.load(Ordering::SeqCst)
    }

    pub fn street_requests(&self) -> usize {
        self.log.streets.load(Ordering::SeqCst)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(
    fixture: Arc<AreaFixture>,
    log: RequestLog,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::GET {
        return Ok(status(StatusCode::METHOD_NOT_ALLOWED, "Unsupported method"));
    }

    match req.uri().path() {
        ASSET_PATH => {
            log.asset.fetch_add(1, Ordering::SeqCst);
            Ok(match &fixture.asset {
                Some(asset) => Response::new(Body::from(asset.clone())),
                None => status(StatusCode::NOT_FOUND, "no asset"),
            })
        }
        STREET_PATH => {
            log.streets.fetch_add(1, Ordering::SeqCst);
            let query = parse_query(req.uri().query().unwrap_or_default());
            let county = query
                .get("l3")
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or_default();
            let lang = query.get("lang").cloned().unwrap_or_default();

            let reply = fixture.streets.get(&(county, lang)).cloned();
            Ok(match reply {
                Some(StreetReply::Body(body)) => Response::new(Body::from(body)),
                Some(StreetReply::Status(code)) => status(
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    "scripted failure",
                ),
                Some(StreetReply::Delayed(delay, body)) => {
                    tokio::time::sleep(delay).await;
                    Response::new(Body::from(body))
                }
                None => Response::new(Body::from("callback({success:true,result:[]})")),
            })
        }
        _ => Ok(status(StatusCode::NOT_FOUND, "unknown path")),
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn status(code: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = code;
    response
}
