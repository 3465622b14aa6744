//! Cached HTTP response object.
//!
//! The cache core treats a [`CacheObject`] as an opaque payload plus a byte
//! size and a hit counter; the header and timing fields exist so the object
//! round-trips through the disk store unchanged for the request layer that
//! produced it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Ordered header list, name/value pairs as received.
pub type Headers = Vec<(String, String)>;

/// A cached origin response.
///
/// `hit_count` is atomic so concurrent readers of a shared `Arc<CacheObject>`
/// can record hits without a lock.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheObject {
    pub body: Vec<u8>,
    pub req_headers: Headers,
    pub resp_headers: Headers,
    /// Status code served to clients.
    pub code: u16,
    /// Status code the origin actually returned (differs on revalidation).
    pub origin_code: u16,
    pub proxy_url: String,
    pub req_time: SystemTime,
    pub req_resp_time: SystemTime,
    pub resp_resp_time: SystemTime,
    pub last_modified: Option<SystemTime>,
    /// Logical size in bytes: body plus response header bytes.
    pub size: u64,
    hit_count: AtomicU64,
}

impl CacheObject {
    /// Builds an object for a fresh origin response, computing its size.
    pub fn new(code: u16, resp_headers: Headers, body: Vec<u8>) -> Self {
        let now = SystemTime::now();
        let size = body.len() as u64 + headers_len(&resp_headers);
        Self {
            body,
            req_headers: Headers::new(),
            resp_headers,
            code,
            origin_code: code,
            proxy_url: String::new(),
            req_time: now,
            req_resp_time: now,
            resp_resp_time: now,
            last_modified: None,
            size,
            hit_count: AtomicU64::new(0),
        }
    }

    /// Builds a `200` object carrying only `body`; its size is the body length.
    ///
    /// ```
    /// use edgecache::CacheObject;
    ///
    /// let obj = CacheObject::from_body(vec![0; 40]);
    /// assert_eq!(obj.size, 40);
    /// assert_eq!(obj.hit_count(), 0);
    /// ```
    pub fn from_body(body: Vec<u8>) -> Self {
        Self::new(200, Headers::new(), body)
    }

    pub fn with_req_headers(mut self, req_headers: Headers) -> Self {
        self.req_headers = req_headers;
        self
    }

    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = proxy_url.into();
        self
    }

    pub fn with_origin_code(mut self, origin_code: u16) -> Self {
        self.origin_code = origin_code;
        self
    }

    pub fn with_last_modified(mut self, last_modified: SystemTime) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Number of cache hits recorded against this object.
    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }

    /// Records one hit and returns the new count.
    pub fn record_hit(&self) -> u64 {
        self.hit_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the first response header named `name` (ASCII case-insensitive).
    pub fn resp_header(&self, name: &str) -> Option<&str> {
        self.resp_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl Clone for CacheObject {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            req_headers: self.req_headers.clone(),
            resp_headers: self.resp_headers.clone(),
            code: self.code,
            origin_code: self.origin_code,
            proxy_url: self.proxy_url.clone(),
            req_time: self.req_time,
            req_resp_time: self.req_resp_time,
            resp_resp_time: self.resp_resp_time,
            last_modified: self.last_modified,
            size: self.size,
            hit_count: AtomicU64::new(self.hit_count()),
        }
    }
}

impl PartialEq for CacheObject {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
            && self.req_headers == other.req_headers
            && self.resp_headers == other.resp_headers
            && self.code == other.code
            && self.origin_code == other.origin_code
            && self.proxy_url == other.proxy_url
            && self.req_time == other.req_time
            && self.req_resp_time == other.req_resp_time
            && self.resp_resp_time == other.resp_resp_time
            && self.last_modified == other.last_modified
            && self.size == other.size
            && self.hit_count() == other.hit_count()
    }
}

fn headers_len(headers: &Headers) -> u64 {
    headers
        .iter()
        .map(|(name, value)| (name.len() + value.len()) as u64)
        .sum()
}
