//! Classifiers over `reqwest::Request`

use cl_limit::classify::authority;
use reqwest::Request;

/// `host[:port]` of the request URL
pub fn host(request: &Request) -> String {
    authority(request.url()).to_string()
}

/// Full request URL
pub fn url(request: &Request) -> String {
    request.url().to_string()
}
