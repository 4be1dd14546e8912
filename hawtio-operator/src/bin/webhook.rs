//! Hawtio CRD Conversion Webhook Server
//!
//! Serves `ConversionReview` requests for the Hawtio CRD, upgrading `v1alpha1`
//! objects to `v1`. Downgrades are always rejected.

use hawtio_operator::crd::CONVERSION_PATH;
use hawtio_operator::webhook::review;
use kube::core::conversion::{ConversionRequest, ConversionReview};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::env;
use std::net::SocketAddr;
use tokio::fs;
use tracing::{error, info};

/// Default webhook server port (HTTPS)
const DEFAULT_WEBHOOK_PORT: u16 = 8443;

/// Default TLS certificate path (mounted by Kubernetes)
const DEFAULT_TLS_CERT_PATH: &str = "/certs/tls.crt";

/// Default TLS private key path (mounted by Kubernetes)
const DEFAULT_TLS_KEY_PATH: &str = "/certs/tls.key";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hawtio_operator=info".parse()?)
                .add_directive("hawtio_conversion_webhook=info".parse()?),
        )
        .init();

    info!("Hawtio conversion webhook starting");

    let port: u16 = env::var("WEBHOOK_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_WEBHOOK_PORT);

    let tls_cert = env::var("TLS_CERT_FILE").unwrap_or_else(|_| DEFAULT_TLS_CERT_PATH.to_string());
    let tls_key = env::var("TLS_KEY_FILE").unwrap_or_else(|_| DEFAULT_TLS_KEY_PATH.to_string());

    info!(
        port = port,
        tls_cert = %tls_cert,
        tls_key = %tls_key,
        "Webhook configuration loaded"
    );

    let cert_pem = fs::read(&tls_cert).await?;
    let key_pem = fs::read(&tls_key).await?;

    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice()).collect::<Result<Vec<_>, _>>()?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())?
        .ok_or_else(|| anyhow::anyhow!("No private key found in {tls_key}"))?;

    let mut tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    tls_config.alpn_protocols = vec![b"http/1.1".to_vec()];

    let tls_acceptor = tokio_rustls::TlsAcceptor::from(std::sync::Arc::new(tls_config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Webhook server listening");

    loop {
        let (stream, _peer_addr) = listener.accept().await?;
        let acceptor = tls_acceptor.clone();

        tokio::spawn(async move {
            match acceptor.accept(stream).await {
                Ok(tls_stream) => {
                    let io = hyper_util::rt::TokioIo::new(tls_stream);
                    let service = hyper::service::service_fn(handle_request);

                    if let Err(e) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!(error = %e, "Connection error");
                    }
                }
                Err(e) => {
                    error!(error = %e, "TLS handshake failed");
                }
            }
        });
    }
}

/// Handle incoming HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, CONVERSION_PATH) => Ok(convert(req).await),
        (&Method::GET, "/healthz") => Ok(build_response(StatusCode::OK, "OK")),
        (&Method::GET, "/readyz") => Ok(build_response(StatusCode::OK, "Ready")),
        _ => Ok(build_response(StatusCode::NOT_FOUND, "Not Found")),
    }
}

async fn convert(req: Request<hyper::body::Incoming>) -> Response<Full<Bytes>> {
    let body_bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(error = %e, "Failed to read request body");
            return error_response("Failed to read request body");
        }
    };

    let conversion_review: ConversionReview = match serde_json::from_slice(&body_bytes) {
        Ok(review) => review,
        Err(e) => {
            error!(error = %e, "Failed to parse ConversionReview");
            return error_response("Invalid ConversionReview format");
        }
    };

    let request = match ConversionRequest::from_review(conversion_review) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "ConversionReview missing request");
            return error_response("Missing request in ConversionReview");
        }
    };

    match serde_json::to_vec(&review(request)) {
        Ok(json) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to build conversion review response");
                error_response("Failed to build response")
            }),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            error_response("Failed to serialize response")
        }
    }
}

fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to build response");
            Response::new(Full::new(Bytes::from("Internal Error")))
        })
}

fn error_response(message: &str) -> Response<Full<Bytes>> {
    build_response(StatusCode::BAD_REQUEST, message.to_string())
}
