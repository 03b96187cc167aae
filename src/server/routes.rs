use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, warn};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::sheets::CachedSheetClient;

use super::rate_limit::{Limited, RateLimiter};

const BANNER: &str = "sheet-relay is running. Sheet data is served at /api/sheet-data\n";

#[derive(Serialize)]
struct ErrorResponse {
  error: String,
  details: Option<String>,
}

#[derive(Debug)]
struct RateLimited(Limited);

impl warp::reject::Reject for RateLimited {}

/// All routes with rate limiting, error recovery, CORS and request tracing applied.
pub fn routes(
  client: Arc<CachedSheetClient>,
  limiter: Arc<RateLimiter>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
  let index = warp::path::end().and(warp::get()).map(|| BANNER);

  let sheet_data = warp::path!("api" / "sheet-data")
    .and(warp::get())
    .and(with_client(client))
    .and_then(get_sheet_data);

  let cors = warp::cors()
    .allow_any_origin()
    .allow_methods(vec!["GET", "OPTIONS"]);

  rate_limit(limiter)
    .and(index.or(sheet_data))
    .recover(handle_rejection)
    .with(cors)
    .with(warp::trace::request())
}

fn with_client(
  client: Arc<CachedSheetClient>,
) -> impl Filter<Extract = (Arc<CachedSheetClient>,), Error = Infallible> + Clone {
  warp::any().map(move || client.clone())
}

fn rate_limit(limiter: Arc<RateLimiter>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
  warp::addr::remote()
    .and_then(move |addr: Option<SocketAddr>| {
      let limiter = limiter.clone();
      async move {
        let ip = addr.map(|a| a.ip());
        limiter.check(ip).map_err(|limited| {
          warn!(client = ?ip, retry_after = limited.retry_after_secs, "rate limited");
          warp::reject::custom(RateLimited(limited))
        })
      }
    })
    .untuple_one()
}

async fn get_sheet_data(client: Arc<CachedSheetClient>) -> Result<Response, Infallible> {
  match client.get_data().await {
    Ok(result) => {
      debug!(source = ?result.source, cached_at = %result.cached_at, "serving sheet data");
      let reply = warp::reply::json(&*result.data);
      Ok(warp::reply::with_header(reply, "x-cache", result.source.header_value()).into_response())
    }
    Err(e) => {
      error!("Failed to fetch sheet data: {:#}", e);
      Ok(error_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to fetch sheet data",
        Some(format!("{:#}", e)),
      ))
    }
  }
}

fn error_reply(status: StatusCode, error: &str, details: Option<String>) -> Response {
  let body = ErrorResponse {
    error: error.to_string(),
    details,
  };
  warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
  if let Some(RateLimited(limited)) = err.find::<RateLimited>() {
    let reply = error_reply(
      StatusCode::TOO_MANY_REQUESTS,
      "Too many requests",
      Some(format!(
        "Rate limit exceeded, retry in {} seconds",
        limited.retry_after_secs
      )),
    );
    return Ok(
      warp::reply::with_header(reply, "retry-after", limited.retry_after_secs.to_string())
        .into_response(),
    );
  }

  if err.is_not_found() {
    return Ok(error_reply(StatusCode::NOT_FOUND, "Not found", None));
  }

  if err.find::<warp::reject::MethodNotAllowed>().is_some() {
    return Ok(error_reply(
      StatusCode::METHOD_NOT_ALLOWED,
      "Method not allowed",
      None,
    ));
  }

  error!("Unhandled rejection: {:?}", err);
  Ok(error_reply(
    StatusCode::INTERNAL_SERVER_ERROR,
    "Internal server error",
    Some(format!("{:?}", err)),
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::ManualClock;
  use crate::config::RateLimitConfig;
  use crate::sheets::mock::{example_grid_body, test_config, MockUpstream};
  use crate::sheets::parser::SheetFormat;
  use serde_json::{json, Value};
  use warp::hyper::body::Bytes;

  struct Harness {
    upstream: MockUpstream,
    client: Arc<CachedSheetClient>,
    limiter: Arc<RateLimiter>,
  }

  async fn harness(status: u16, body: Value, max_requests: u32) -> Harness {
    let upstream = MockUpstream::spawn(status, body).await;
    let clock = Arc::new(ManualClock::new());
    let client = CachedSheetClient::new(&test_config(&upstream, SheetFormat::Grid))
      .unwrap()
      .with_clock(clock.clone());
    let limiter = RateLimiter::new(RateLimitConfig {
      max_requests,
      window_secs: 60,
    })
    .with_clock(clock);

    Harness {
      upstream,
      client: Arc::new(client),
      limiter: Arc::new(limiter),
    }
  }

  impl Harness {
    async fn get(&self, path: &str) -> warp::http::Response<Bytes> {
      self.get_from(path, "10.0.0.1:5000").await
    }

    async fn get_from(&self, path: &str, remote: &str) -> warp::http::Response<Bytes> {
      let filter = routes(self.client.clone(), self.limiter.clone());
      warp::test::request()
        .method("GET")
        .path(path)
        .remote_addr(remote.parse().unwrap())
        .header("origin", "https://status.example.com")
        .reply(&filter)
        .await
    }
  }

  fn body_json(response: &warp::http::Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
  }

  #[tokio::test]
  async fn test_index_banner() {
    let h = harness(200, example_grid_body(), 100).await;
    let response = h.get("/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(std::str::from_utf8(response.body())
      .unwrap()
      .contains("running"));
    assert_eq!(h.upstream.hits(), 0);
  }

  #[tokio::test]
  async fn test_sheet_data_served_and_cached() {
    let h = harness(200, example_grid_body(), 100).await;

    let first = h.get("/api/sheet-data").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-cache"], "MISS");
    assert_eq!(
      body_json(&first),
      json!({
        "Sheet1": {
          "API": {
            "Subheading": {"Latency": {"colour": "Gray"}},
            "Compliant": 42,
            "Total": "100",
            "Mising": "5",
            "%Compliant": "95%"
          }
        }
      })
    );

    let second = h.get("/api/sheet-data").await;
    assert_eq!(second.headers()["x-cache"], "HIT");
    assert_eq!(second.body(), first.body());
    assert_eq!(h.upstream.hits(), 1);
  }

  #[tokio::test]
  async fn test_upstream_failure_is_500_with_details() {
    let h = harness(503, json!({"error": "unavailable"}), 100).await;
    let response = h.get("/api/sheet-data").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(&response);
    assert_eq!(body["error"], "Failed to fetch sheet data");
    let details = body["details"].as_str().unwrap();
    assert!(details.contains("503"));
    assert!(!details.contains("test-key"));

    h.upstream.respond_with(200, example_grid_body());
    let response = h.get("/api/sheet-data").await;
    assert_eq!(response.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn test_rate_limit_per_client() {
    let h = harness(200, example_grid_body(), 2).await;

    assert_eq!(h.get("/").await.status(), StatusCode::OK);
    assert_eq!(h.get("/api/sheet-data").await.status(), StatusCode::OK);

    let limited = h.get("/api/sheet-data").await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers()["retry-after"], "60");
    assert_eq!(body_json(&limited)["error"], "Too many requests");

    let other = h.get_from("/api/sheet-data", "10.0.0.2:5000").await;
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(h.upstream.hits(), 1);
  }

  #[tokio::test]
  async fn test_unknown_path_is_404() {
    let h = harness(200, example_grid_body(), 100).await;
    let response = h.get("/api/other").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(&response)["error"], "Not found");
  }

  #[tokio::test]
  async fn test_cors_header_present() {
    let h = harness(200, example_grid_body(), 100).await;
    let response = h.get("/api/sheet-data").await;

    assert!(response
      .headers()
      .contains_key("access-control-allow-origin"));
  }
}
