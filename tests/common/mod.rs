// weather_pusher - Push temperature readings from weather APIs to a Prometheus Pushgateway
//
// Copyright 2023 weather_pusher authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use weather_pusher::config::Location;

/// A request received by the mock server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

/// Stand-in for the weather APIs and the push gateway, bound to a random local port.
///
/// Weather API responses are chosen by location code: a weather.gov grid point
/// whose office is a number (e.g. `503/1,1`) or an OpenWeatherMap / Weatherbit
/// city ID in the range 100-999 gets a response with that status code. Every
/// other location gets a 200 with a canned reading. `PUT` requests are treated
/// as pushes and always succeed.
pub struct MockServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    pub async fn start() -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(handle).with_state(requests.clone());

        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);

        MockServer { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<Recorded> {
        self.requests().into_iter().filter(|r| r.method == Method::PUT).collect()
    }
}

pub fn location(service: &str, location_code: &str, name: &str) -> Location {
    Location {
        service: service.to_owned(),
        location_code: location_code.to_owned(),
        name: name.to_owned(),
    }
}

async fn handle(
    State(requests): State<Arc<Mutex<Vec<Recorded>>>>,
    Query(params): Query<HashMap<String, String>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: uri.path().to_owned(),
        query: uri.query().map(|q| q.to_owned()),
        body,
    });

    if method == Method::PUT {
        return StatusCode::OK.into_response();
    }

    let path = uri.path();
    if let Some(rest) = path.strip_prefix("/gridpoints/") {
        let office = rest.split('/').next().unwrap_or_default();
        let body = json!({
            "properties": {
                "periods": [{"number": 1, "name": "Tonight", "temperature": 34, "temperatureUnit": "F"}]
            }
        });
        respond(office, body)
    } else if path == "/data/2.5/forecast" {
        let id = params.get("id").map(|s| s.as_str()).unwrap_or_default();
        let body = json!({"cod": "200", "list": [{"main": {"temp": 274.26}}]});
        respond(id, body)
    } else if path == "/v2.0/current" {
        let id = params.get("city_id").map(|s| s.as_str()).unwrap_or_default();
        let body = json!({"count": 1, "data": [{"temp": -1.2}]});
        respond(id, body)
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

fn respond(code: &str, body: serde_json::Value) -> Response {
    let status = code
        .parse::<u16>()
        .ok()
        .filter(|c| (100..=999).contains(c))
        .and_then(|c| StatusCode::from_u16(c).ok())
        .unwrap_or(StatusCode::OK);

    (status, Json(body)).into_response()
}
