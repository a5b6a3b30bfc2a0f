use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Request, Response, Url};

const PROTOBUF: HeaderValue = HeaderValue::from_static("application/x-protobuf");

/// Transport used to issue feed requests. Decorators such as
/// [`super::auth::ApiKey`] wrap another client and adjust the request.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// GET for a protobuf feed payload.
    async fn get_feed(&self, url: &Url) -> reqwest::Result<Response> {
        let mut req = Request::new(Method::GET, url.clone());
        req.headers_mut().insert(ACCEPT, PROTOBUF);
        self.execute(req).await
    }
}
