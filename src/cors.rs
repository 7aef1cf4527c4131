use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

fn add_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();

    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

// Stamped on every response, rejections and errors included
pub async fn cors(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    add_cors_headers(&mut response);
    response
}
