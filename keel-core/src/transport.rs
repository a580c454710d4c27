//! Transport - Seam to the vendor control-plane API
//!
//! Signing, HTTP and response decoding live behind [`Transport`]. The engine
//! never retries at this layer; retry policy belongs to `call_error` hooks.

use async_trait::async_trait;

use crate::error::ReconcileResult;
use crate::value::{Value, ValueMap};

/// Body encoding of a vendor call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// Form / query parameters with flattened `Field.N` keys
    #[default]
    Default,
    /// JSON body with nested objects and arrays
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Static addressing of one vendor service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub method: HttpMethod,
    pub content_type: ContentType,
}

impl ServiceInfo {
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            method: HttpMethod::Get,
            content_type: ContentType::Default,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Address `action` on this service with the given parameters
    pub fn request(&self, action: impl Into<String>, params: ValueMap) -> CallRequest {
        CallRequest {
            service: self.service.clone(),
            version: self.version.clone(),
            method: self.method,
            content_type: self.content_type,
            action: action.into(),
            params,
        }
    }
}

/// One vendor API request
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub service: String,
    pub version: String,
    pub method: HttpMethod,
    pub content_type: ContentType,
    pub action: String,
    pub params: ValueMap,
}

/// Authenticated request/response against the cloud control plane
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the call and return the decoded response body
    async fn do_call(&self, request: CallRequest) -> ReconcileResult<Value>;
}
