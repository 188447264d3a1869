use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Records request count and latency per method/path/status.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Collapse id-shaped segments so metric cardinality stays bounded.
/// PuzzleIds look like `2026-08-07T12-30-05-482913`.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if is_puzzle_id_like(segment) || is_numeric_id(segment) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_puzzle_id_like(s: &str) -> bool {
    s.len() > 20
        && s.contains('T')
        && s.chars().all(|c| c.is_ascii_digit() || c == '-' || c == 'T')
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_id_segments() {
        assert_eq!(
            normalize_path("/api/v1/puzzles/2026-08-07T12-30-05-482913"),
            "/api/v1/puzzles/{id}"
        );
        assert_eq!(normalize_path("/api/v1/puzzles/current"), "/api/v1/puzzles/current");
        assert_eq!(normalize_path("/health"), "/health");
    }
}
