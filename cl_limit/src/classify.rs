//! Classifiers map a request to the key of its admission bucket.

use std::sync::Arc;

use url::Position;
use url::Url;

/// Shared classifier function
pub type Classifier<Req, K> = Arc<dyn Fn(&Req) -> K + Send + Sync>;

/// Key shared by every request when limiting globally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GlobalKey;

/// Requests that expose their destination URL
pub trait RequestTarget {
    fn target(&self) -> &Url;
}

impl RequestTarget for Url {
    fn target(&self) -> &Url {
        self
    }
}

impl<T: RequestTarget + ?Sized> RequestTarget for &T {
    fn target(&self) -> &Url {
        (**self).target()
    }
}

/// One bucket for everything
pub fn global<Req: ?Sized>(_request: &Req) -> GlobalKey {
    GlobalKey
}

/// Bucket per destination authority: `host`, or `host:port` when the URL
/// spells out a port. Empty for URLs without a host.
pub fn host<Req: RequestTarget + ?Sized>(request: &Req) -> String {
    authority(request.target()).to_string()
}

/// Bucket per full URL
pub fn url<Req: RequestTarget + ?Sized>(request: &Req) -> String {
    request.target().as_str().to_string()
}

/// `host[:port]` slice of `url`
pub fn authority(url: &Url) -> &str {
    &url[Position::BeforeHost..Position::AfterPort]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_global() {
        assert_eq!(global(&parse("https://a.example/x")), global(&parse("http://b.example/y")));
        assert_eq!(global(&42u32), GlobalKey);
    }

    #[test]
    fn test_host() {
        assert_eq!(host(&parse("https://api.example.com/v1/items?page=2")), "api.example.com");
        assert_eq!(host(&parse("http://localhost:8080/")), "localhost:8080");
        assert_eq!(host(&parse("http://[::1]:9000/x")), "[::1]:9000");

        // Default ports are normalised away by the parser
        assert_eq!(host(&parse("https://example.com:443/")), "example.com");
    }

    #[test]
    fn test_host_same_bucket_for_different_paths() {
        let a = parse("https://example.com/a");
        let b = parse("https://example.com/b?c=d");
        assert_eq!(host(&a), host(&b));
        assert_ne!(url(&a), url(&b));
    }

    #[test]
    fn test_host_without_authority() {
        assert_eq!(host(&parse("mailto:someone@example.com")), "");
    }

    #[test]
    fn test_url() {
        assert_eq!(url(&parse("https://example.com/a?b=c#d")), "https://example.com/a?b=c#d");
    }

    #[test]
    fn test_reference_target() {
        let target = parse("https://example.com/");
        let by_ref: &Url = &target;
        assert_eq!(host(&by_ref), "example.com");
    }
}
