use axum::{extract::Request, http::header, middleware::Next, response::IntoResponse};

/// Script origins allowed on HTML pages; the hosted checkout widget is loaded
/// from the gateway's CDN.
const CHECKOUT_SCRIPT_SRC: &str = "https://js.paystack.co";

pub async fn security_headers_middleware(req: Request, next: Next) -> impl IntoResponse {
    let mut response = next.run(req).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));

    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        header::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );

    let csp = if is_html {
        format!(
            "default-src 'self'; script-src 'self' 'unsafe-inline' {src}; \
             frame-src {src} https://checkout.paystack.com; \
             style-src 'self' 'unsafe-inline'; frame-ancestors 'none'",
            src = CHECKOUT_SCRIPT_SRC
        )
    } else {
        "default-src 'none'; frame-ancestors 'none'".to_string()
    };

    if let Ok(value) = header::HeaderValue::from_str(&csp) {
        headers.insert(header::CONTENT_SECURITY_POLICY, value);
    }

    response
}
