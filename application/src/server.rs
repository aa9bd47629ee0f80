//! HTTP server of the GraphQL API.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::MatchedPath,
    response::{IntoResponse, Response},
    routing::{on, MethodFilter},
    Extension, Json, Router,
};
use axum_client_ip::InsecureClientIp;
use derive_more::Debug;
use http::{header, HeaderValue, Method};
use itertools::Itertools as _;
use juniper::{http::GraphQLBatchResponse, DefaultScalarValue, ScalarValue};
use juniper_axum::extract::JuniperRequest;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{field, Span};

use crate::{api, config, Context, Service};

/// Path the GraphQL API is served on.
pub const GRAPHQL_PATH: &str = "/graphql";

/// Builds the [`Router`] serving the GraphQL API over the provided
/// [`Service`].
///
/// # Errors
///
/// If any of the configured CORS origins is not a valid header value.
pub fn router(
    service: Service,
    cors: &config::Cors,
) -> Result<Router, http::header::InvalidHeaderValue> {
    Ok(Router::new()
        .route(
            GRAPHQL_PATH,
            on(MethodFilter::GET.or(MethodFilter::POST), graphql),
        )
        .layer(Extension(Arc::new(api::schema())))
        .layer(Extension(service))
        .layer(cors_layer(&cors.origins)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(record_response),
        ))
}

/// Creates a [`CorsLayer`] allowing the provided `origins`.
///
/// A `*` among the `origins` allows any origin.
fn cors_layer(
    origins: &[String],
) -> Result<CorsLayer, http::header::InvalidHeaderValue> {
    let allowed = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> =
            origins.iter().map(|o| o.parse()).try_collect()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(allowed))
}

/// Creates a [`Span`] covering the whole handling of the provided request.
fn request_span(req: &http::Request<Body>) -> Span {
    let headers = req.headers();
    let uri = req.uri();

    tracing::info_span!(
        "HTTP request",
        http.client_ip = InsecureClientIp::from(headers, req.extensions())
            .map(|ip| ip.0.to_string())
            .ok(),
        http.flavor = ?req.version(),
        http.host = uri.host(),
        http.method = req.method().as_str(),
        http.route = req
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str),
        http.scheme = uri.scheme().map(http::uri::Scheme::as_str),
        http.target = uri.path_and_query().map(http::uri::PathAndQuery::as_str),
        http.user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok()),
        http.status_code = field::Empty,
    )
}

/// Records the status of the provided [`Response`] into the request [`Span`]
/// and logs how long it took.
fn record_response(res: &Response, latency: Duration, span: &Span) {
    let status = res.status();
    _ = span.record("http.status_code", field::display(status.as_u16()));

    let duration = format!("{}ms", latency.as_millis());
    if status.is_client_error() || status.is_server_error() {
        tracing::error!(%duration);
    } else {
        tracing::info!(%duration);
    }
}

/// [`juniper`] GraphQL response.
#[derive(Debug)]
pub struct JuniperResponse<S = DefaultScalarValue>
where
    S: ScalarValue,
{
    /// Status code of the response, in case it contains errors.
    pub status_code: http::StatusCode,

    /// Underlying GraphQL response.
    #[debug(skip)]
    pub response: GraphQLBatchResponse<S>,
}

impl<S> IntoResponse for JuniperResponse<S>
where
    S: ScalarValue,
{
    fn into_response(self) -> Response {
        let status = if self.response.is_ok() {
            http::StatusCode::OK
        } else {
            self.status_code
        };
        (status, Json(self.response)).into_response()
    }
}

/// GraphQL API handler.
pub async fn graphql(
    Extension(schema): Extension<Arc<api::Schema>>,
    context: Context,
    JuniperRequest(request): JuniperRequest,
) -> JuniperResponse {
    let response = request.execute(&*schema, &context).await;
    JuniperResponse {
        status_code: context.error_status_code(),
        response,
    }
}
