//! Drives the real HTTP clients against a one-shot local server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nearcare::api::{GeocodeError, UpstreamError};
use nearcare::config::ApiConfig;
use nearcare::pipeline::Service;
use nearcare::{
    FacilitySearch, FacilitySource, GeoPoint, Geocoder, LocationQuery, NominatimClient,
    OverpassClient, SearchError, SearchRequest, SearchState,
};

/// Accept one connection, capture the request, answer with `status` and `body`
fn serve_once(status: &str, body: &str, delay: Duration) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();
    let body = body.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            request.push_str(&line);
        }
        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).unwrap();
        request.push_str(&String::from_utf8_lossy(&request_body));

        thread::sleep(delay);

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        // The client may already have given up (timeout test)
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
        request
    });

    (format!("http://{addr}"), handle)
}

/// An address nothing is listening on
fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn api_config(nominatim_base: &str, overpass_base: &str, timeout_secs: u64) -> ApiConfig {
    ApiConfig {
        user_agent: "nearcare-test/0.0 (test@example.com)".to_string(),
        nominatim_url: format!("{nominatim_base}/search"),
        overpass_url: format!("{overpass_base}/api/interpreter"),
        timeout_secs,
    }
}

fn new_york() -> GeoPoint {
    GeoPoint::new(40.7128, -74.006).unwrap()
}

#[test]
fn test_geocode_sends_query_and_identifies_client() {
    let (base, server) = serve_once(
        "200 OK",
        r#"[{"lat":"40.7127281","lon":"-74.0060152","display_name":"New York"}]"#,
        Duration::ZERO,
    );
    let client = NominatimClient::new(&api_config(&base, &closed_port(), 5)).unwrap();

    let point = client
        .geocode(&LocationQuery::new("New York").unwrap())
        .unwrap();
    assert_eq!(point, GeoPoint::new(40.7127281, -74.0060152).unwrap());

    let request = server.join().unwrap().to_ascii_lowercase();
    assert!(request.starts_with("get /search?"), "{request}");
    assert!(request.contains("q=new+york"), "{request}");
    assert!(request.contains("format=json"), "{request}");
    assert!(request.contains("limit=1"), "{request}");
    assert!(
        request.contains("user-agent: nearcare-test/0.0 (test@example.com)"),
        "{request}"
    );
}

#[test]
fn test_geocode_empty_list_is_not_found() {
    let (base, server) = serve_once("200 OK", "[]", Duration::ZERO);
    let client = NominatimClient::new(&api_config(&base, &closed_port(), 5)).unwrap();

    let result = client.geocode(&LocationQuery::new("qwxzzy").unwrap());
    assert_eq!(result, Err(GeocodeError::NotFound));
    server.join().unwrap();
}

#[test]
fn test_geocode_http_status() {
    let (base, server) = serve_once("429 Too Many Requests", "", Duration::ZERO);
    let client = NominatimClient::new(&api_config(&base, &closed_port(), 5)).unwrap();

    let result = client.geocode(&LocationQuery::new("Paris").unwrap());
    assert_eq!(result, Err(GeocodeError::Upstream(UpstreamError::Http(429))));
    server.join().unwrap();
}

#[test]
fn test_geocode_timeout() {
    let (base, server) = serve_once("200 OK", "[]", Duration::from_secs(3));
    let client = NominatimClient::new(&api_config(&base, &closed_port(), 1)).unwrap();

    let result = client.geocode(&LocationQuery::new("Paris").unwrap());
    assert_eq!(result, Err(GeocodeError::Upstream(UpstreamError::Timeout)));
    server.join().unwrap();
}

#[test]
fn test_geocode_connection_refused_is_network_error() {
    let client = NominatimClient::new(&api_config(&closed_port(), &closed_port(), 5)).unwrap();

    let result = client.geocode(&LocationQuery::new("Paris").unwrap());
    assert!(
        matches!(
            result,
            Err(GeocodeError::Upstream(UpstreamError::Network(_)))
        ),
        "{result:?}"
    );
}

#[test]
fn test_overpass_posts_form_query() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"elements":[{"type":"way","id":7,"center":{"lat":40.76,"lon":-73.95},"tags":{"name":"Mount Sinai"}}]}"#,
        Duration::ZERO,
    );
    let client = OverpassClient::new(&api_config(&closed_port(), &base, 5)).unwrap();

    let elements = client
        .find_facilities(new_york(), 50_000, "hospital")
        .unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].id, Some(7));

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /api/interpreter"), "{request}");
    assert!(
        request
            .to_ascii_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"),
        "{request}"
    );
    assert!(request.contains("data="), "{request}");
    assert!(request.contains("hospital"), "{request}");
}

#[test]
fn test_overpass_malformed_body() {
    let (base, server) = serve_once("200 OK", "<html>rate limited</html>", Duration::ZERO);
    let client = OverpassClient::new(&api_config(&closed_port(), &base, 5)).unwrap();

    let result = client.find_facilities(new_york(), 50_000, "hospital");
    assert!(
        matches!(result, Err(UpstreamError::MalformedResponse(_))),
        "{result:?}"
    );
    server.join().unwrap();
}

#[test]
fn test_pipeline_facility_service_unavailable() {
    let (geo_base, geo_server) = serve_once(
        "200 OK",
        r#"[{"lat":"40.7128","lon":"-74.0060"}]"#,
        Duration::ZERO,
    );
    let (ovp_base, ovp_server) = serve_once("503 Service Unavailable", "", Duration::ZERO);
    let config = api_config(&geo_base, &ovp_base, 5);
    let geocoder = NominatimClient::new(&config).unwrap();
    let facilities = OverpassClient::new(&config).unwrap();

    let state = FacilitySearch::new(&geocoder, &facilities).run(&SearchRequest::new("New York"));

    assert_eq!(
        state,
        SearchState::Failed(SearchError::UpstreamHttpError {
            service: Service::FacilityQuery,
            status: 503,
        })
    );
    geo_server.join().unwrap();
    ovp_server.join().unwrap();
}

#[test]
fn test_pipeline_unknown_place_skips_facility_query() {
    let (geo_base, geo_server) = serve_once("200 OK", "[]", Duration::ZERO);
    let config = api_config(&geo_base, &closed_port(), 5);
    let geocoder = NominatimClient::new(&config).unwrap();
    let facilities = OverpassClient::new(&config).unwrap();

    let state = FacilitySearch::new(&geocoder, &facilities).run(&SearchRequest::new("qwxzzy"));

    // Had the facility query run, it would have failed with a network error
    assert_eq!(state, SearchState::Failed(SearchError::NotFound));
    geo_server.join().unwrap();
}

#[test]
fn test_pipeline_no_facilities_is_done() {
    let (geo_base, geo_server) = serve_once(
        "200 OK",
        r#"[{"lat":"64.1466","lon":"-21.9426"}]"#,
        Duration::ZERO,
    );
    let (ovp_base, ovp_server) = serve_once("200 OK", r#"{"elements":[]}"#, Duration::ZERO);
    let config = api_config(&geo_base, &ovp_base, 5);
    let geocoder = NominatimClient::new(&config).unwrap();
    let facilities = OverpassClient::new(&config).unwrap();

    let state = FacilitySearch::new(&geocoder, &facilities)
        .run(&SearchRequest::new("Reykjavik").with_radius(100));

    let outcome = match state {
        SearchState::Done(outcome) => outcome,
        other => panic!("expected Done, got {other:?}"),
    };
    assert!(outcome.is_empty());
    assert_eq!(outcome.origin, GeoPoint::new(64.1466, -21.9426).unwrap());
    geo_server.join().unwrap();
    ovp_server.join().unwrap();
}
