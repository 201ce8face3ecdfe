use lambda_http::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use lambda_http::http::StatusCode;
use lambda_http::{Body, Error, Response};
use serde::Serialize;
use serde_json::json;

use crate::CorsConfig;

const ALLOWED_HEADERS: &str = "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";

/// Builds API Gateway proxy responses with a JSON content type and CORS headers.
#[derive(Debug, Clone)]
pub struct Responder {
    cors: CorsConfig,
    allowed_methods: &'static str,
}

impl Responder {
    pub fn new(cors: CorsConfig, allowed_methods: &'static str) -> Self {
        Self {
            cors,
            allowed_methods,
        }
    }

    pub fn json<T: Serialize>(&self, status: StatusCode, body: &T) -> Result<Response<Body>, Error> {
        let body = serde_json::to_string(body)?;
        let response = Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, self.cors.allow_origin.as_str())
            .header(ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS)
            .header(ACCESS_CONTROL_ALLOW_METHODS, self.allowed_methods)
            .body(Body::Text(body))?;
        Ok(response)
    }

    pub fn ok<T: Serialize>(&self, body: &T) -> Result<Response<Body>, Error> {
        self.json(StatusCode::OK, body)
    }

    pub fn bad_request(&self, message: &str) -> Result<Response<Body>, Error> {
        self.error(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(&self, message: &str) -> Result<Response<Body>, Error> {
        self.error(StatusCode::NOT_FOUND, message)
    }

    pub fn server_error(&self, message: &str) -> Result<Response<Body>, Error> {
        self.error(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(&self, message: &str) -> Result<Response<Body>, Error> {
        self.error(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable<T: Serialize>(&self, body: &T) -> Result<Response<Body>, Error> {
        self.json(StatusCode::SERVICE_UNAVAILABLE, body)
    }

    pub fn method_not_allowed(&self) -> Result<Response<Body>, Error> {
        self.error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    /// Answer a CORS preflight request
    pub fn preflight(&self) -> Result<Response<Body>, Error> {
        self.json(StatusCode::OK, &json!({}))
    }

    fn error(&self, status: StatusCode, message: &str) -> Result<Response<Body>, Error> {
        self.json(status, &json!({ "error": message }))
    }
}
