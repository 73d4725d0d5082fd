//! A stateful stub server: a control plane that installs rules and a mock
//! listener that replays them.
//!
//! Every client gets its own instance. Mock requests name the instance in
//! their path and may narrow matching to one scenario:
//! `/instances/{id}[/scenarios/{name}]/{resource path}`.

use std::{collections::HashMap, convert::Infallible, future::Future, net::SocketAddr, sync::Arc};

use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Body, Bytes, Incoming},
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    Request, Response, StatusCode,
};
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use serde::Serialize;
use thiserror::Error;
use tokio::{net::TcpListener, sync::RwLock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::{
    interchange::{
        Command, ControlPlaneError, InstallResponse, InstanceId, InstanceResponse, Method,
        ResetResponse, ScenarioStateResponse, ThenState, INSTANCE_SEGMENT,
    },
    matcher::{MockRoute, RequestView, RuleBook},
};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot accept connection: {0}")]
    Accept(#[source] std::io::Error),
}

pub struct Binding {
    pub port: u16,
    pub listener: TcpListener,
}

pub async fn bind_socket(addr: SocketAddr) -> Result<Binding, ServerError> {
    let bind_error = |source| ServerError::Bind { addr, source };
    let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
    let port = listener.local_addr().map_err(bind_error)?.port();
    Ok(Binding { port, listener })
}

/// Server state: one rule book per connected client. Clients sharing a
/// server never see each other's rules.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<RwLock<State>>,
}

struct State {
    mock_url: String,
    instances: HashMap<InstanceId, RuleBook>,
}

impl ServerState {
    pub fn new(mock_port: u16) -> Self {
        Self::with_mock_url(format!("http://127.0.0.1:{mock_port}"))
    }

    /// `mock_url` is the mock listener's address; each instance is served
    /// under `{mock_url}/instances/{id}`.
    pub fn with_mock_url(mock_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(State {
                mock_url: mock_url.into(),
                instances: HashMap::new(),
            })),
        }
    }

    async fn create_instance(&self) -> InstanceResponse {
        let id = InstanceId(uuid7::uuid7().to_string());
        let mut state = self.inner.write().await;
        state.instances.insert(id.clone(), RuleBook::default());
        info!(instance = %id, live = state.instances.len(), "instance created");
        InstanceResponse {
            url: format!(
                "{}/{INSTANCE_SEGMENT}/{id}",
                state.mock_url.trim_end_matches('/')
            ),
            instance: id,
        }
    }

    async fn with_instance<T>(
        &self,
        id: &InstanceId,
        f: impl FnOnce(&mut RuleBook) -> T,
    ) -> Result<T, ControlPlaneError> {
        let mut state = self.inner.write().await;
        state
            .instances
            .get_mut(id)
            .map(f)
            .ok_or(ControlPlaneError::InstanceNotFound)
    }

    async fn respond(&self, instance: &str, request: &RequestView) -> Option<ThenState> {
        let mut state = self.inner.write().await;
        state
            .instances
            .get_mut(&InstanceId(instance.to_string()))
            .and_then(|book| book.respond(request))
    }
}

pub async fn handle_control_plane<T>(
    req: Request<T>,
    state: ServerState,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    T: Body,
    T::Error: std::fmt::Debug,
{
    if req.method() != hyper::Method::POST {
        return Ok(text_response(405, "Method Not Allowed"));
    }
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(?err, "cannot read control plane body");
            let error = ControlPlaneError::MalformedCommand(String::from("unreadable body"));
            return Ok(json_response(error.status(), &error));
        }
    };
    let command = match serde_json::from_slice::<Command>(&body) {
        Ok(command) => command,
        Err(err) => {
            warn!(%err, "malformed command");
            let error = ControlPlaneError::MalformedCommand(err.to_string());
            return Ok(json_response(error.status(), &error));
        }
    };
    Ok(match execute(command, &state).await {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, "command rejected");
            json_response(error.status(), &error)
        }
    })
}

async fn execute(
    command: Command,
    state: &ServerState,
) -> Result<Response<Full<Bytes>>, ControlPlaneError> {
    let response = match command {
        Command::CreateInstance => json_response(200, &state.create_instance().await),
        Command::InstallMocks { instance, mocks } => {
            let (installed, total) = state
                .with_instance(&instance, |book| (book.install(mocks), book.len()))
                .await?;
            info!(%instance, installed, total, "rules installed");
            json_response(200, &InstallResponse { installed })
        }
        Command::ScenarioState { instance, scenario } => {
            let current = state
                .with_instance(&instance, |book| book.scenario_state(&scenario))
                .await?;
            json_response(200, &ScenarioStateResponse { state: current })
        }
        Command::ResetScenario { instance, scenario } => {
            let removed = state
                .with_instance(&instance, |book| book.reset_scenario(&scenario))
                .await?;
            info!(%instance, %scenario, removed, "scenario reset");
            json_response(200, &ResetResponse { removed })
        }
        Command::ResetAllScenarios { instance } => {
            let removed = state
                .with_instance(&instance, |book| book.reset_all_scenarios())
                .await?;
            info!(%instance, removed, "all scenarios reset");
            json_response(200, &ResetResponse { removed })
        }
    };
    Ok(response)
}

pub async fn handle_mock<T>(
    req: Request<T>,
    state: ServerState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let Some(route) = MockRoute::parse(req.uri().path()) else {
        warn!(path = %req.uri().path(), "request outside any instance");
        return Ok(text_response(404, "Not Found"));
    };
    let mut request = RequestView {
        method: Method::try_from(req.method()).ok(),
        path: route.path.to_string(),
        scenario: route.scenario.map(String::from),
        ..Default::default()
    }
    .with_query_string(req.uri().query().unwrap_or(""));
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    match state.respond(route.instance, &request).await {
        Some(then) => {
            debug!(
                method = %req.method(),
                path = %request.path,
                scenario = ?request.scenario,
                status = then.status,
                "stub matched"
            );
            Ok(then_response(then))
        }
        None => {
            warn!(
                method = %req.method(),
                path = %request.path,
                scenario = ?request.scenario,
                "no stub matched"
            );
            Ok(text_response(404, "Not Found"))
        }
    }
}

fn then_response(then: ThenState) -> Response<Full<Bytes>> {
    let mut response = with_status(Response::new(Full::new(Bytes::from(then.body))), then.status);
    for (name, value) in then.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => warn!(%name, "skipping invalid response header"),
        }
    }
    response
}

fn json_response<T: Serialize>(status: u16, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = with_status(Response::new(Full::new(Bytes::from(bytes))), status);
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            warn!(%err, "cannot serialize response");
            text_response(500, "Internal Server Error")
        }
    }
}

fn text_response(status: u16, text: &'static str) -> Response<Full<Bytes>> {
    with_status(Response::new(Full::new(Bytes::from_static(text.as_bytes()))), status)
}

fn with_status(mut response: Response<Full<Bytes>>, status: u16) -> Response<Full<Bytes>> {
    *response.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
}

pub async fn run_controlplane(
    listener: TcpListener,
    state: ServerState,
) -> Result<(), ServerError> {
    serve(listener, move |req| handle_control_plane(req, state.clone())).await
}

pub async fn run_mock(listener: TcpListener, state: ServerState) -> Result<(), ServerError> {
    serve(listener, move |req| handle_mock(req, state.clone())).await
}

async fn serve<F, Fut>(listener: TcpListener, handler: F) -> Result<(), ServerError>
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<Response<Full<Bytes>>, Infallible>> + Send + 'static,
{
    loop {
        let (stream, _) = listener.accept().await.map_err(ServerError::Accept)?;
        let io = TokioIo::new(stream);
        let service = ServiceBuilder::new()
            .layer(CorsLayer::permissive())
            .service(tower::service_fn(handler.clone()));

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, TowerToHyperService::new(service))
                .await
            {
                warn!(?err, "error serving connection");
            }
        });
    }
}
