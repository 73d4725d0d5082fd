//! JSON commands over a bare hyper connection to the control plane.

use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Bytes, Incoming},
    header::{CONTENT_TYPE, HOST},
    Method, Request, Response, Uri,
};
use hyper_util::rt::TokioIo;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Where commands go: `host:port` to dial and the path to post to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ControlPlaneAddress {
    authority: String,
    path: String,
}

impl ControlPlaneAddress {
    fn parse(url: &str) -> Option<Self> {
        let uri = url.parse::<Uri>().ok()?;
        let host = uri.host()?;
        let port = uri.port_u16().unwrap_or(80);
        let path = uri
            .path_and_query()
            .map_or("/", |path| path.as_str())
            .to_string();
        Some(Self {
            authority: format!("{host}:{port}"),
            path,
        })
    }
}

pub struct NetworkClient;

impl NetworkClient {
    /// POSTs `message` as JSON to the control plane, decoding a success
    /// body as `U` and a failure body as `E`.
    pub async fn send<T, U, E>(
        control_plane_url: &str,
        message: &T,
    ) -> Result<U, ClientNetworkError<E>>
    where
        T: Serialize,
        U: DeserializeOwned,
        E: DeserializeOwned,
    {
        let address =
            ControlPlaneAddress::parse(control_plane_url).ok_or(ClientNetworkError::<E>::InvalidUrl)?;
        let body =
            serde_json::to_vec(message).map_err(|_| ClientNetworkError::<E>::FailedToSerializeCommand)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(address.path.as_str())
            .header(HOST, address.authority.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|_| ClientNetworkError::<E>::FailedToSerializeCommand)?;

        let response = post::<E>(&address.authority, request).await?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|_| ClientNetworkError::<E>::FailedToConnectToMockServer)?
            .to_bytes();
        debug!(authority = %address.authority, %status, "control plane responded");

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(|_| ClientNetworkError::ResponseDeserializeError)
        } else {
            let error = serde_json::from_slice(&bytes)
                .map_err(|_| ClientNetworkError::<E>::ResponseDeserializeError)?;
            Err(ClientNetworkError::Response(error))
        }
    }
}

async fn post<E>(
    authority: &str,
    request: Request<Full<Bytes>>,
) -> Result<Response<Incoming>, ClientNetworkError<E>> {
    let stream = TcpStream::connect(authority)
        .await
        .map_err(|_| ClientNetworkError::<E>::FailedToConnectToMockServer)?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|_| ClientNetworkError::<E>::FailedToConnectToMockServer)?;

    tokio::task::spawn(async move {
        if let Err(err) = conn.await {
            warn!(?err, "control plane connection failed");
        }
    });

    sender
        .send_request(request)
        .await
        .map_err(|_| ClientNetworkError::FailedToConnectToMockServer)
}

#[derive(Error, Debug, PartialEq)]
pub enum ClientNetworkError<E> {
    #[error("Failed to deserialize response")]
    ResponseDeserializeError,
    #[error("Control plane rejected the command")]
    Response(E),
    #[error("Failed to connect to mock server")]
    FailedToConnectToMockServer,
    #[error("Failed to serialize command")]
    FailedToSerializeCommand,
    #[error("Control plane URL is not valid")]
    InvalidUrl,
}
