//! Local stand-in for the Sheets API used by tests.

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use warp::http::StatusCode;
use warp::Filter;

use crate::config::Config;
use crate::sheets::parser::SheetFormat;

type Response = (u16, Value);

/// Serves a canned response on every path and counts requests.
pub struct MockUpstream {
  pub base: String,
  hits: Arc<AtomicUsize>,
  last_query: Arc<Mutex<Option<String>>>,
  response: Arc<Mutex<Response>>,
}

impl MockUpstream {
  pub async fn spawn(status: u16, body: Value) -> Self {
    let hits = Arc::new(AtomicUsize::new(0));
    let last_query = Arc::new(Mutex::new(None));
    let response = Arc::new(Mutex::new((status, body)));

    let route = {
      let hits = hits.clone();
      let last_query = last_query.clone();
      let response = response.clone();
      warp::any()
        .and(warp::query::raw().or(warp::any().map(String::new)).unify())
        .map(move |query: String| {
          hits.fetch_add(1, Ordering::SeqCst);
          *last_query.lock().unwrap() = Some(query);
          let (status, body) = response.lock().unwrap().clone();
          warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::from_u16(status).unwrap(),
          )
        })
    };

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    Self {
      base: format!("http://{}/v4/", addr),
      hits,
      last_query,
      response,
    }
  }

  /// Change what subsequent requests receive.
  pub fn respond_with(&self, status: u16, body: Value) {
    *self.response.lock().unwrap() = (status, body);
  }

  pub fn hits(&self) -> usize {
    self.hits.load(Ordering::SeqCst)
  }

  pub fn last_query(&self) -> Option<String> {
    self.last_query.lock().unwrap().clone()
  }
}

/// Valid configuration pointing at `upstream`, reading tab `Sheet1`.
pub fn test_config(upstream: &MockUpstream, format: SheetFormat) -> Config {
  let mut config = Config::default();
  config.sheet.api_base = upstream.base.clone();
  config.sheet.spreadsheet_id = "sheet-id".to_string();
  config.sheet.tab = "Sheet1".to_string();
  config.sheet.format = format;
  config.api_key = "test-key".to_string();
  config
}

/// Grid response for the service compliance example sheet.
pub fn example_grid_body() -> Value {
  serde_json::json!({
    "sheets": [{
      "properties": {"title": "Sheet1"},
      "data": [{"rowData": [
        {"values": [
          {"formattedValue": "Service"},
          {"formattedValue": "Subheading"},
          {"formattedValue": "Compliant"},
          {"formattedValue": "Total"},
          {"formattedValue": "Mising"},
          {"formattedValue": "% Compliant"}
        ]},
        {"values": [
          {"formattedValue": "API", "effectiveFormat": {"backgroundColor": {"red": 0.2, "green": 0.8, "blue": 0.2}}},
          {"formattedValue": "-"},
          {"formattedValue": "42"},
          {"formattedValue": "100"},
          {"formattedValue": "5"},
          {"formattedValue": "95%"}
        ]},
        {"values": [
          {"formattedValue": "-"},
          {"formattedValue": "Latency"},
          {"formattedValue": "-"},
          {"formattedValue": "-"},
          {"formattedValue": "-"},
          {"formattedValue": "-"}
        ]}
      ]}]
    }]
  })
}
