#![allow(dead_code)]

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::time::Duration;
use zip::write::FileOptions;
use zip::ZipWriter;

pub const GOOD_CSV: &str = "stationId,temperatureC,humidityPct,windKph
KPHX,44.5,12,10
KMIA,33.0,75,8
KHOU,35.5,62,5
KDEN,28.0,20,22
KSEA,18.0,88,4
";

pub fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub const STATIONS_CSV: &str = "stationId,latitude,longitude
KPHX,33.43,-112.01
KMIA,25.79,-80.29
KHOU,29.65,-95.28
KDEN,39.86,-104.67
";

/// Scenario is chosen by the API key segment of the request path.
async fn snapshot(Path(key): Path<String>) -> impl IntoResponse {
    let zip_response = |body: Vec<u8>| {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/zip")],
            body,
        )
            .into_response()
    };

    match key.as_str() {
        "good" => zip_response(zip_with(&[("current.csv", GOOD_CSV)])),
        "renamed" => zip_response(zip_with(&[("latest.csv", GOOD_CSV)])),
        "bad-row" => zip_response(zip_with(&[(
            "current.csv",
            "stationId,temperatureC,humidityPct\nKPHX,44.5,12\nKMIA,n/a,75\n",
        )])),
        "empty" => zip_response(zip_with(&[(
            "current.csv",
            "stationId,temperatureC,humidityPct\n",
        )])),
        "not-zip" => zip_response(b"<html>maintenance</html>".to_vec()),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            zip_response(zip_with(&[("current.csv", GOOD_CSV)]))
        }
        "unauthorized" => StatusCode::UNAUTHORIZED.into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "upstream failure").into_response(),
    }
}

/// Start a fake provider on an ephemeral port and return its base URL.
pub async fn spawn_provider() -> String {
    let app = Router::new().route("/v1/{key}/current/all.zip", get(snapshot));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
